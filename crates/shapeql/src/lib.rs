//! # shapeql
//!
//! A type-safe GraphQL client: the struct shape is the query shape.
//!
//! Describe an operation as a plain Rust struct deriving [`Shape`]. The
//! client synthesizes the minified operation text from the struct's
//! layout — including inline fragments, field aliases with inline
//! arguments, and `__typename` — and binds the server's JSON response
//! back into the same struct, with GraphQL-aware placement rules that no
//! conventional JSON deserializer provides (sibling inline fragments
//! receive shared keys simultaneously; fragment fields are transparent
//! to the wire format).
//!
//! ## Quick start
//!
//! ```no_run
//! use shapeql::{Client, Shape, Variables};
//!
//! #[derive(Default, Shape)]
//! struct Me {
//!     name: String,
//!     height: f64,
//! }
//!
//! #[derive(Default, Shape)]
//! struct MeQuery {
//!     me: Me,
//! }
//!
//! # async fn example() -> Result<(), shapeql::ClientError> {
//! let client = Client::new("https://example.com/graphql");
//! let mut q = MeQuery::default();
//! // sends {"query":"{me{name,height}}"}
//! client.query(&mut q, Variables::new()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Arguments, aliases, and fragments
//!
//! Field attributes carry everything the wire format needs:
//!
//! ```ignore
//! #[derive(Default, Shape)]
//! struct TimelineItem {
//!     #[graphql("__typename")]
//!     typename: String,
//!     #[graphql("... on ClosedEvent")]
//!     closed: ClosedEvent,
//!     #[graphql("commits(last: 1)")]
//!     commits: Commits,
//! }
//! ```
//!
//! Variables are an ordered mapping built with [`Variables::set`]; each
//! value's GraphQL type is printed from its Rust type, so
//! `Option<i32>` declares `Int` and `Vec<ID>` declares `[ID!]!`.

#![recursion_limit = "256"]

extern crate self as shapeql;

#[cfg(feature = "blocking")]
pub mod blocking;
pub mod client;
pub mod decode;
pub mod error;
pub mod query;
pub mod shape;

// Re-export key types at crate root for convenience.
pub use client::{CallOptions, Client, QueryStringMode, RequestOption};
pub use error::{
    ClientError, DecodeError, GraphQLError, GraphQLErrors, Location, PathSegment, QueryError,
};
pub use query::{construct_mutation, construct_query, selection_from_pairs, InputValue, Variables};
pub use shape::{Field, ListShape, Node, OptionShape, ScalarShape, Shape, ID};
pub use shapeql_derive::{InputValue, Shape};
pub use shapeql_ident as ident;

// Used by the expansion of `scalar!`.
#[doc(hidden)]
pub use serde;
#[doc(hidden)]
pub use serde_json;
