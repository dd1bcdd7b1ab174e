//! Resilient asset download.
//!
//! Polls `media/{id}/download` until the service stops answering 202
//! (still processing). A 200 hands back the open body as a
//! [`StreamedAsset`]; any other status or a transport failure is terminal.
//! The 202 loop re-polls at a fixed interval and is bounded only by the
//! policy's attempt budget:
//!
//! ```text
//! Polling --200--> Streaming
//! Polling --202, budget left--> (sleep) Polling
//! Polling --202, budget spent--> Exhausted
//! Polling --other status / transport error--> Failed
//! ```

mod asset;
mod error;
mod policy;

pub use asset::{Chunks, StreamedAsset, CHUNK_SIZE, DEFAULT_CONTENT_TYPE, RELAY_CACHE_CONTROL};
pub use error::DownloadError;
pub use policy::{DownloadPolicy, PollDecision, STATUS_PROCESSING, STATUS_READY};

use crate::transport::{Request, Transport};
use std::time::Duration;

/// Identifies a requested asset and, optionally, the format to deliver it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    id: String,
    extension: Option<String>,
}

impl AssetRef {
    /// An empty extension is the same as none.
    pub fn new(id: impl Into<String>, extension: Option<&str>) -> Self {
        Self {
            id: id.into(),
            extension: extension
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// `{id}.{extension}`, or just `{id}` without an extension.
    pub fn suggested_filename(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{}.{}", self.id, ext),
            None => self.id.clone(),
        }
    }

    /// Stream-mode request for the asset. `ext` is always sent, empty when unset.
    pub fn download_request(&self) -> Request {
        Request::get(format!("media/{}/download", self.id))
            .query("ext", self.extension.as_deref().unwrap_or(""))
            .streamed()
    }
}

/// Downloads an asset, sleeping on the current thread between 202 polls.
pub fn download<T>(
    transport: &T,
    asset: &AssetRef,
    policy: &DownloadPolicy,
) -> Result<StreamedAsset, DownloadError>
where
    T: Transport + ?Sized,
{
    download_with_sleep(transport, asset, policy, std::thread::sleep)
}

/// Like [`download`] with the pause between polls supplied by the caller.
pub fn download_with_sleep<T, S>(
    transport: &T,
    asset: &AssetRef,
    policy: &DownloadPolicy,
    mut sleep: S,
) -> Result<StreamedAsset, DownloadError>
where
    T: Transport + ?Sized,
    S: FnMut(Duration),
{
    let mut requests = 0u32;
    let mut processing_seen = 0u32;
    loop {
        requests += 1;
        let response = transport
            .send_stream(asset.download_request())
            .map_err(|e| {
                tracing::warn!("download {}: request {} failed: {}", asset.id(), requests, e);
                DownloadError::Transport(e)
            })?;

        let status = response.status;
        if status == STATUS_PROCESSING {
            processing_seen += 1;
        }
        match policy.decide(processing_seen, status) {
            PollDecision::Stream => {
                let streamed = StreamedAsset::from_response(asset, response);
                tracing::info!(
                    "download {}: ready after {} request(s), type {}, length {:?}",
                    asset.id(),
                    requests,
                    streamed.content_type(),
                    streamed.content_length()
                );
                return Ok(streamed);
            }
            PollDecision::RetryAfter(delay) => {
                drop(response);
                tracing::debug!(
                    "download {}: still processing ({}/{}), retrying in {:?}",
                    asset.id(),
                    processing_seen,
                    policy.max_retries,
                    delay
                );
                sleep(delay);
            }
            PollDecision::Exhausted => {
                drop(response);
                tracing::warn!(
                    "download {}: still processing after {} request(s), giving up",
                    asset.id(),
                    requests
                );
                return Err(DownloadError::Exhausted { attempts: requests });
            }
            PollDecision::Fail => {
                let message = response.error_message();
                tracing::warn!("download {}: HTTP {}: {}", asset.id(), status, message);
                return Err(DownloadError::Failed { status, message });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_ref_filename() {
        assert_eq!(AssetRef::new("abc", Some("mp3")).suggested_filename(), "abc.mp3");
        assert_eq!(AssetRef::new("abc", None).suggested_filename(), "abc");
        assert_eq!(AssetRef::new("abc", Some("")).suggested_filename(), "abc");
    }

    #[test]
    fn download_request_shape() {
        let req = AssetRef::new("abc", Some("mp3")).download_request();
        assert_eq!(req.path, "media/abc/download");
        assert_eq!(req.query, vec![("ext".to_string(), "mp3".to_string())]);
        let req = AssetRef::new("abc", None).download_request();
        assert_eq!(req.query, vec![("ext".to_string(), String::new())]);
    }
}
