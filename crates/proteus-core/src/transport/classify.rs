//! Map curl errors onto transport error kinds.

use super::TransportError;

/// Classify a curl error into a [`TransportError`].
pub fn classify_curl_error(e: &curl::Error) -> TransportError {
    if e.is_operation_timedout() {
        return TransportError::Timeout(e.to_string());
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_ssl_connect_error()
    {
        return TransportError::Connection(e.to_string());
    }
    if e.is_url_malformed() {
        return TransportError::InvalidUrl(e.to_string());
    }
    TransportError::Other(e.to_string())
}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        classify_curl_error(&e)
    }
}

impl From<curl::FormError> for TransportError {
    fn from(e: curl::FormError) -> Self {
        TransportError::Other(format!("multipart form: {}", e))
    }
}
