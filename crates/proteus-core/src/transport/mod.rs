//! Transport contract between the client core and the network.
//!
//! The downloader and the endpoint wrappers never touch HTTP directly; they
//! build a [`Request`] and hand it to a [`Transport`]. The requested
//! [`TransferMode`] selects which [`Response`] variant comes back: buffered
//! modes yield decoded JSON, stream mode yields a [`TransportResponse`] whose
//! body has not been read yet.

mod classify;
mod curl_impl;
mod error;
mod stream;

pub use classify::classify_curl_error;
pub use curl_impl::{CurlOptions, CurlTransport};
pub use error::TransportError;
pub use stream::ChannelReader;

use crate::payload::MultipartPart;
use std::fmt;
use std::io::Read;

/// Maximum number of bytes read from a non-streamed error body.
pub const ERROR_BODY_LIMIT: u64 = 64 * 1024;

/// Fallback message when an error body carries no usable `message` field.
pub const DEFAULT_ERROR_MESSAGE: &str = "unexpected error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the response body is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Buffered request and response, JSON encoded body.
    Json,
    /// Buffered response, multipart/form-data request body.
    Multipart,
    /// Response body handed back unread as a byte stream.
    Stream,
}

/// Request payload. Multipart parts own any open file handles; the transport
/// closes them once the request body has been built.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<MultipartPart>),
}

/// One call against the service, relative to the transport's base URL.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Query pairs in order. Empty values are sent as `name=`.
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub mode: TransferMode,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            mode: TransferMode::Json,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self.mode = TransferMode::Json;
        self
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = Body::Multipart(parts);
        self.mode = TransferMode::Multipart;
        self
    }

    pub fn streamed(mut self) -> Self {
        self.mode = TransferMode::Stream;
        self
    }
}

/// Lazily readable response body.
pub type BodyStream = Box<dyn Read + Send>;

/// Raw response of a stream-mode request. Status and headers are known; the
/// body is still on the wire.
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: BodyStream,
}

impl TransportResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Case-insensitive header lookup. Returns the last value when repeated.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Reads the (non-streamed) body of an error response and extracts its
    /// `message` field, falling back to [`DEFAULT_ERROR_MESSAGE`].
    pub fn error_message(self) -> String {
        let mut raw = Vec::new();
        if let Err(e) = self.body.take(ERROR_BODY_LIMIT).read_to_end(&mut raw) {
            tracing::debug!("error body unreadable: {}", e);
            return DEFAULT_ERROR_MESSAGE.to_string();
        }
        message_from_body(&raw)
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Response variant selected by the request's [`TransferMode`].
#[derive(Debug)]
pub enum Response {
    Json(serde_json::Value),
    Stream(TransportResponse),
}

/// Performs the actual network exchange.
pub trait Transport {
    fn send(&self, request: Request) -> Result<Response, TransportError>;

    /// Sends a buffered request and returns its decoded JSON body.
    fn send_json(&self, request: Request) -> Result<serde_json::Value, TransportError> {
        match self.send(request)? {
            Response::Json(value) => Ok(value),
            Response::Stream(r) => Err(TransportError::UnexpectedResponse(format!(
                "expected JSON body, got stream (HTTP {})",
                r.status
            ))),
        }
    }

    /// Sends a stream-mode request and returns the unread response.
    fn send_stream(&self, request: Request) -> Result<TransportResponse, TransportError> {
        let request = request.streamed();
        match self.send(request)? {
            Response::Stream(r) => Ok(r),
            Response::Json(_) => Err(TransportError::UnexpectedResponse(
                "expected byte stream, got decoded JSON".to_string(),
            )),
        }
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

/// Extracts the `message` field of a JSON error body.
pub fn message_from_body(raw: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| match v.get("message") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}
