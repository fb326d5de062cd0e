//! Adapter-level error type.

use thiserror::Error;

/// Errors returned by the relational and HTTP adapters.
///
/// The engine wraps these into a step failure; it never retries them.
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    /// The underlying database rejected the operation.
    #[error("database error: {0}")]
    Database(String),

    /// The outbound HTTP request could not be sent or completed.
    #[error("http request failed: {0}")]
    Http(String),

    /// The request was malformed before it ever left the process
    /// (empty or unparsable URL, null column value, …).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body was not decodable as JSON.
    #[error("failed to decode response body: {0}")]
    Decode(String),
}
