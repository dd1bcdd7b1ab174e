//! Transport error type.

use thiserror::Error;

/// Failure of a single exchange with the service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Base URL or path could not be turned into a request URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
    /// Connect or transfer timed out.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Network-level failure (DNS, refused, reset).
    #[error("connection failed: {0}")]
    Connection(String),
    /// Buffered request answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// Response body was not valid JSON.
    #[error("invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Transport returned a response variant that does not match the request mode.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    /// Reading a request part or writing the response failed locally.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Any other client-side failure.
    #[error("{0}")]
    Other(String),
}
