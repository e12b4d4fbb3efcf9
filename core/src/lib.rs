//! Client core for the Parse REST API.
//!
//! # Overview
//! Builds authenticated requests for single-object fetches, class
//! collections, queries, updates, creates and deletes; parses the JSON
//! responses into loosely typed `ObjectPayload` maps; and dispatches requests
//! asynchronously, delivering each outcome to a registered listener.
//!
//! # Design
//! - `ParseClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`, so the I/O boundary is explicit.
//! - `Transport` executes the round-trip; `ReqwestTransport` is the default.
//! - `Dispatcher` wires the two together on a tokio runtime. Every failure is
//!   a typed `ParseError`, never a placeholder payload.
//! - Credentials come from `ParseConfig` (environment or JSON file), never
//!   from constants.

pub mod client;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod query;
pub mod transport;

pub use client::{ParseClient, RequestKind};
pub use codec::ObjectPayload;
pub use config::{Credentials, ParseConfig};
pub use dispatcher::{Dispatcher, RequestInfo, RequestOutcome, ResultListener};
pub use endpoint::UrlBuilder;
pub use error::ParseError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestFactory};
pub use query::{Condition, Constraint, Query};
pub use transport::{ReqwestTransport, Transport};
