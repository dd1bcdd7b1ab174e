//! Download error type.

use crate::transport::TransportError;
use thiserror::Error;

/// Terminal failure of a download. `Failed` and `Transport` are both
/// "download failed"; only `Exhausted` reflects the processing-retry budget.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The service kept answering 202 past the retry budget.
    #[error("max retries reached while processing ({attempts} requests)")]
    Exhausted { attempts: u32 },
    /// The service answered with a status other than 200 or 202.
    #[error("download failed with HTTP {status}: {message}")]
    Failed { status: u16, message: String },
    /// The request itself failed (connection, timeout). Not retried.
    #[error("download failed: {0}")]
    Transport(#[source] TransportError),
}

impl DownloadError {
    /// HTTP status of a `Failed` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            DownloadError::Failed { status, .. } => Some(*status),
            DownloadError::Exhausted { .. } | DownloadError::Transport(_) => None,
        }
    }
}
