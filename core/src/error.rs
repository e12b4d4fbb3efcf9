//! Error types for the Parse REST client.
//!
//! # Design
//! Every failure a single request can hit lands in one `ParseError`, which is
//! delivered through the same channel as a successful payload. `NotFound`
//! gets a dedicated variant because callers frequently distinguish "the
//! object does not exist" from "the server rejected the request." All other
//! non-2xx responses land in `Api` with the status and, when the body is a
//! Parse error object, its numeric code and message.

use thiserror::Error;

/// Errors returned by `ParseClient` parse methods, transports and the
/// `Dispatcher`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The HTTP client could not complete the round-trip (DNS, connect,
    /// TLS, timeout).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body was absent, not JSON, or not a JSON object.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The outbound payload could not be serialized to JSON.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The server returned 404 — the requested object or class does not exist.
    #[error("object not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// A single-object request was built without an object id.
    #[error("single-object request requires an object id")]
    MissingObjectId,

    /// Client configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
