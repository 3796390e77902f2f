//! Blocking (synchronous) GraphQL client.
//!
//! A synchronous wrapper around the async [`Client`](crate::Client).
//! Enable it with the `blocking` feature flag:
//!
//! ```toml
//! [dependencies]
//! shapeql = { version = "...", features = ["blocking"] }
//! ```
//!
//! The blocking client creates an internal tokio runtime and runs each
//! operation to completion synchronously. It mirrors the async client's
//! API surface.
//!
//! # Example
//!
//! ```no_run
//! use shapeql::blocking::Client;
//! use shapeql::{Shape, Variables};
//!
//! #[derive(Default, Shape)]
//! struct Viewer {
//!     login: String,
//! }
//!
//! #[derive(Default, Shape)]
//! struct ViewerQuery {
//!     viewer: Viewer,
//! }
//!
//! let client = Client::new("https://example.com/graphql").unwrap();
//! let mut q = ViewerQuery::default();
//! client.query(&mut q, Variables::new()).unwrap();
//! println!("logged in as {}", q.viewer.login);
//! ```

use serde_json::value::RawValue;

use crate::client::CallOptions;
use crate::error::ClientError;
use crate::query::Variables;
use crate::shape::Shape;

/// A synchronous GraphQL client.
///
/// Wraps the async [`crate::Client`] with an internal tokio runtime.
/// Every method blocks the calling thread until the operation completes.
pub struct Client {
    inner: crate::Client,
    rt: tokio::runtime::Runtime,
}

impl Client {
    /// Create a blocking client targeting the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        Self::from_client(crate::Client::new(url))
    }

    /// Wrap an already-configured async client.
    pub fn from_client(inner: crate::Client) -> Result<Self, ClientError> {
        Ok(Self { inner, rt: build_runtime()? })
    }

    pub fn query<Q: Shape>(&self, q: &mut Q, variables: Variables) -> Result<(), ClientError> {
        self.rt.block_on(self.inner.query(q, variables))
    }

    pub fn query_with<Q: Shape>(
        &self,
        q: &mut Q,
        variables: Variables,
        options: CallOptions<'_>,
    ) -> Result<(), ClientError> {
        self.rt.block_on(self.inner.query_with(q, variables, options))
    }

    pub fn query_raw<Q: Shape>(
        &self,
        variables: Variables,
    ) -> Result<Option<Box<RawValue>>, ClientError> {
        self.rt.block_on(self.inner.query_raw::<Q>(variables))
    }

    pub fn mutate<M: Shape>(&self, m: &mut M, variables: Variables) -> Result<(), ClientError> {
        self.rt.block_on(self.inner.mutate(m, variables))
    }

    pub fn mutate_with<M: Shape>(
        &self,
        m: &mut M,
        variables: Variables,
        options: CallOptions<'_>,
    ) -> Result<(), ClientError> {
        self.rt.block_on(self.inner.mutate_with(m, variables, options))
    }

    pub fn mutate_raw<M: Shape>(
        &self,
        variables: Variables,
    ) -> Result<Option<Box<RawValue>>, ClientError> {
        self.rt.block_on(self.inner.mutate_raw::<M>(variables))
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, ClientError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ClientError::Runtime)
}
