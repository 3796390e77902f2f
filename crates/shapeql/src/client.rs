//! Async GraphQL client.
//!
//! The primary entry point. Construct a [`Client`] with the endpoint
//! URL, then call [`query`](Client::query) or [`mutate`](Client::mutate)
//! with a mutable reference to the shape describing the operation: the
//! operation text is synthesized from the shape, and the response data
//! is bound back into the same value.
//!
//! ```no_run
//! use shapeql::{Client, Shape, Variables};
//!
//! #[derive(Default, Shape)]
//! struct Hero {
//!     name: String,
//!     height: f64,
//! }
//!
//! #[derive(Default, Shape)]
//! struct HeroQuery {
//!     hero: Hero,
//! }
//!
//! # async fn example() -> Result<(), shapeql::ClientError> {
//! let client = Client::new("https://example.com/graphql");
//! let mut q = HeroQuery::default();
//! client.query(&mut q, Variables::new()).await?;
//! println!("{} is {}m tall", q.hero.name, q.hero.height);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::value::RawValue;

use crate::decode;
use crate::error::{ClientError, GraphQLError, GraphQLErrors};
use crate::query::{construct_mutation, construct_query, Variables};
use crate::shape::Shape;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Whether queries are sent as GET requests with the operation in the
/// query string instead of a JSON POST. Mutations always POST.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStringMode {
    Disabled,
    Enabled,
}

/// A mutation applied to the outgoing HTTP request, in order, before it
/// is sent. Build one with [`RequestOption::new`] or
/// [`RequestOption::header`].
pub struct RequestOption {
    run: Box<dyn Fn(&mut reqwest::Request) -> Result<(), BoxError> + Send + Sync>,
}

impl RequestOption {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut reqwest::Request) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Set a header on the request.
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        Self::new(move |request| {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())?;
            let value = reqwest::header::HeaderValue::from_str(&value)?;
            request.headers_mut().insert(name, value);
            Ok(())
        })
    }

    fn apply(&self, request: &mut reqwest::Request) -> Result<(), BoxError> {
        (self.run)(request)
    }
}

impl fmt::Debug for RequestOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestOption")
    }
}

/// Per-call options: an operation name for the synthesized document and
/// request mutations applied after the client's defaults.
#[derive(Debug, Default)]
pub struct CallOptions<'a> {
    pub operation_name: Option<&'a str>,
    pub request_options: Vec<RequestOption>,
}

impl<'a> CallOptions<'a> {
    pub fn operation_name(name: &'a str) -> Self {
        Self { operation_name: Some(name), ..Self::default() }
    }
}

/// A GraphQL client over an HTTP endpoint.
///
/// Safe for concurrent use: all operations take `&self` and the
/// underlying `reqwest::Client` multiplexes connections. Cancellation is
/// cooperative — dropping the future returned by an operation aborts the
/// exchange; timeouts are the supplied HTTP client's concern and surface
/// as [`ClientError::Transport`].
pub struct Client {
    http: reqwest::Client,
    url: String,
    query_string: QueryStringMode,
    default_options: Vec<RequestOption>,
}

/// The request envelope. `variables` is omitted entirely when empty.
#[derive(Serialize)]
struct RequestBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<serde_json::Value>,
}

/// The response envelope. All three keys are optional; `data` is kept
/// raw and handed to the binder undecoded.
#[derive(serde::Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Box<RawValue>>,
    #[serde(default)]
    errors: Option<Vec<GraphQLError>>,
    #[serde(default)]
    extensions: Option<serde_json::Value>,
}

impl Client {
    /// Create a client targeting the given GraphQL endpoint URL, with a
    /// default HTTP client.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            query_string: QueryStringMode::Disabled,
            default_options: Vec::new(),
        }
    }

    /// Use a custom `reqwest::Client` (timeouts, proxies, TLS setup).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Send queries as GET requests with the operation in the query
    /// string. Mutations still POST.
    pub fn enable_query_string(mut self) -> Self {
        self.query_string = QueryStringMode::Enabled;
        self
    }

    pub fn disable_query_string(mut self) -> Self {
        self.query_string = QueryStringMode::Disabled;
        self
    }

    /// Add a request option applied to every call, before per-call
    /// options.
    pub fn with_default_option(mut self, option: RequestOption) -> Self {
        self.default_options.push(option);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a query derived from `q`'s shape, binding the response
    /// data back into `q`.
    pub async fn query<Q: Shape>(&self, q: &mut Q, variables: Variables) -> Result<(), ClientError> {
        self.query_with(q, variables, CallOptions::default()).await
    }

    /// [`query`](Client::query) with per-call options.
    pub async fn query_with<Q: Shape>(
        &self,
        q: &mut Q,
        variables: Variables,
        options: CallOptions<'_>,
    ) -> Result<(), ClientError> {
        let query = construct_query::<Q>(options.operation_name, &variables);
        self.run(true, &query, &variables, &options, Some(q)).await.map(drop)
    }

    /// Execute a query derived from `Q`'s shape, returning the raw
    /// undecoded `data` payload.
    pub async fn query_raw<Q: Shape>(
        &self,
        variables: Variables,
    ) -> Result<Option<Box<RawValue>>, ClientError> {
        let options = CallOptions::default();
        let query = construct_query::<Q>(options.operation_name, &variables);
        self.run(true, &query, &variables, &options, None).await
    }

    /// Execute a mutation derived from `m`'s shape, binding the response
    /// data back into `m`.
    pub async fn mutate<M: Shape>(&self, m: &mut M, variables: Variables) -> Result<(), ClientError> {
        self.mutate_with(m, variables, CallOptions::default()).await
    }

    /// [`mutate`](Client::mutate) with per-call options.
    pub async fn mutate_with<M: Shape>(
        &self,
        m: &mut M,
        variables: Variables,
        options: CallOptions<'_>,
    ) -> Result<(), ClientError> {
        let mutation = construct_mutation::<M>(options.operation_name, &variables);
        self.run(false, &mutation, &variables, &options, Some(m)).await.map(drop)
    }

    /// Execute a mutation derived from `M`'s shape, returning the raw
    /// undecoded `data` payload.
    pub async fn mutate_raw<M: Shape>(
        &self,
        variables: Variables,
    ) -> Result<Option<Box<RawValue>>, ClientError> {
        let options = CallOptions::default();
        let mutation = construct_mutation::<M>(options.operation_name, &variables);
        self.run(false, &mutation, &variables, &options, None).await
    }

    async fn run(
        &self,
        is_query: bool,
        operation: &str,
        variables: &Variables,
        options: &CallOptions<'_>,
        dest: Option<&mut dyn Shape>,
    ) -> Result<Option<Box<RawValue>>, ClientError> {
        let mut request = self.build_request(is_query, operation, variables)?;
        for option in self.default_options.iter().chain(options.request_options.iter()) {
            option.apply(&mut request).map_err(ClientError::Option)?;
        }

        let response = self.http.execute(request).await.map_err(ClientError::Transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ClientError::Transport)?;
        if status != reqwest::StatusCode::OK {
            return Err(ClientError::Server { status, body: body.to_vec() });
        }

        let envelope: Envelope = serde_json::from_slice(&body)
            .map_err(|err| ClientError::Body { err: Box::new(err), body: body.to_vec() })?;

        // Bind whatever data arrived before looking at errors, so that a
        // partial response leaves the destination partially populated.
        if let (Some(raw), Some(dest)) = (envelope.data.as_deref(), dest) {
            decode::from_slice_dyn(raw.get().as_bytes(), dest)
                .map_err(|err| ClientError::Body { err: Box::new(err), body: body.to_vec() })?;
        }

        if let Some(errors) = envelope.errors {
            if !errors.is_empty() {
                return Err(ClientError::GraphQL(GraphQLErrors {
                    errors,
                    extensions: envelope.extensions,
                }));
            }
        }

        Ok(envelope.data)
    }

    fn build_request(
        &self,
        is_query: bool,
        operation: &str,
        variables: &Variables,
    ) -> Result<reqwest::Request, ClientError> {
        let builder = if is_query && self.query_string == QueryStringMode::Enabled {
            let mut builder = self.http.get(&self.url).query(&[("query", operation)]);
            if !variables.is_empty() {
                let json = serde_json::to_string(&variables.to_json()).map_err(ClientError::Encode)?;
                builder = builder.query(&[("variables", &json)]);
            }
            builder
        } else {
            let envelope = RequestBody {
                query: operation,
                variables: if variables.is_empty() { None } else { Some(variables.to_json()) },
            };
            let body = serde_json::to_vec(&envelope).map_err(ClientError::Encode)?;
            self.http
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
        };
        builder.build().map_err(ClientError::Request)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url)
            .field("query_string", &self.query_string)
            .finish_non_exhaustive()
    }
}
