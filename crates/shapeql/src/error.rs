//! Error types for query synthesis, response binding, and the client.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Failures while synthesizing an operation (selections, variable
/// declarations). These indicate misuse of the API and surface before
/// any request is sent.
#[derive(Debug)]
pub enum QueryError {
    /// The variable's host type has no declarable GraphQL type name.
    UnprintableType(&'static str),
    /// An unordered map was supplied where a deterministic selection is
    /// required.
    UnorderedMapNotSupported,
    /// A pair element of an ordered selection was not a `[key, value]`
    /// two-element array.
    BadPairShape(String),
    /// A variable value failed to serialize to JSON.
    Encode(serde_json::Error),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnprintableType(ty) => {
                write!(f, "cannot derive a GraphQL type name for {}", ty)
            }
            Self::UnorderedMapNotSupported => {
                write!(f, "unordered maps are not supported, use an ordered list of [key, value] pairs")
            }
            Self::BadPairShape(got) => {
                write!(f, "only [key, value] pairs of exactly 2 elements are supported, got {}", got)
            }
            Self::Encode(err) => write!(f, "encoding variable value: {}", err),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

/// Failures while binding a GraphQL response payload into a shape.
#[derive(Debug)]
pub enum DecodeError {
    /// The payload is not valid JSON.
    Parse(serde_json::Error),
    /// Non-whitespace input followed the top-level JSON value.
    ExtraInput(char),
    /// A JSON key could not be placed into any candidate destination.
    Unplaceable { key: String, places: usize },
    /// A JSON value is incompatible with the destination kind.
    Mismatch { value: &'static str, destination: &'static str },
    /// An opaque scalar destination rejected the raw JSON value.
    Scalar(serde_json::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => err.fmt(f),
            Self::ExtraInput(token) => {
                write!(f, "invalid token '{}' after top-level value", token)
            }
            Self::Unplaceable { key, places } => {
                write!(f, "struct field for {:?} doesn't exist in any of {} places to unmarshal", key, places)
            }
            Self::Mismatch { value, destination } => {
                write!(f, "cannot unmarshal {} into {} destination", value, destination)
            }
            Self::Scalar(err) => write!(f, "decoding scalar value: {}", err),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) | Self::Scalar(err) => Some(err),
            _ => None,
        }
    }
}

/// A single GraphQL error from the response `errors` array.
#[derive(Clone, Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default)]
    pub locations: Option<Vec<Location>>,
    #[serde(default)]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A line/column position in the query document.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// One segment of a GraphQL error path: a field name or an array index.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(u64),
}

/// The `errors` array of a GraphQL response, together with the
/// response-level `extensions` value when present.
///
/// Non-empty when returned. The user-visible message is the first
/// entry's message; the remaining entries stay available on the value.
#[derive(Clone, Debug, Default)]
pub struct GraphQLErrors {
    pub errors: Vec<GraphQLError>,
    pub extensions: Option<Value>,
}

impl fmt::Display for GraphQLErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.first() {
            Some(first) => f.write_str(&first.message),
            None => f.write_str("graphql error"),
        }
    }
}

impl std::error::Error for GraphQLErrors {}

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug)]
pub enum ClientError {
    /// The request envelope failed to JSON-encode.
    Encode(serde_json::Error),
    /// The HTTP request could not be constructed.
    Request(reqwest::Error),
    /// A request option failed while modifying the request.
    Option(Box<dyn std::error::Error + Send + Sync>),
    /// Network failure or cancellation during the exchange.
    Transport(reqwest::Error),
    /// The server answered with a non-200 status.
    Server { status: reqwest::StatusCode, body: Vec<u8> },
    /// The response body did not parse as a GraphQL response, or the
    /// data payload could not be bound into the destination.
    Body { err: Box<dyn std::error::Error + Send + Sync>, body: Vec<u8> },
    /// The server returned GraphQL errors. Any partial data decoded
    /// before the errors were seen is retained in the destination.
    GraphQL(GraphQLErrors),
    /// The blocking runtime could not be created.
    #[cfg(feature = "blocking")]
    Runtime(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "encoding request body: {}", err),
            Self::Request(err) => write!(f, "request error: {}", err),
            Self::Option(err) => write!(f, "request option error: {}", err),
            Self::Transport(err) => write!(f, "transport error: {}", err),
            Self::Server { status, body } => {
                write!(
                    f,
                    "non-200 OK status code: {} {} body: {:?}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or(""),
                    String::from_utf8_lossy(body)
                )
            }
            Self::Body { err, body } => {
                write!(f, "could not parse the body: {}, body: {:?}", err, String::from_utf8_lossy(body))
            }
            Self::GraphQL(errors) => errors.fmt(f),
            #[cfg(feature = "blocking")]
            Self::Runtime(err) => write!(f, "building blocking runtime: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::Request(err) | Self::Transport(err) => Some(err),
            Self::Option(err) | Self::Body { err, .. } => Some(err.as_ref()),
            Self::GraphQL(errors) => Some(errors),
            Self::Server { .. } => None,
            #[cfg(feature = "blocking")]
            Self::Runtime(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

impl ClientError {
    /// The GraphQL errors, when the server returned any.
    pub fn graphql_errors(&self) -> Option<&GraphQLErrors> {
        match self {
            Self::GraphQL(errors) => Some(errors),
            _ => None,
        }
    }
}
