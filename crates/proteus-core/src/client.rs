//! Endpoint surface of the media service.
//!
//! Every method is one [`Transport`] exchange except [`ProteusClient::media_download`],
//! which polls through the downloader.

use crate::checksum::HashingWriter;
use crate::config::ProteusConfig;
use crate::download::{self, AssetRef, DownloadError, DownloadPolicy, StreamedAsset};
use crate::payload::{self, EncodeError, UploadInput};
use crate::transport::{CurlTransport, Request, Transport, TransportError};
use serde_json::Value;
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("streaming media to sink failed: {0}")]
    Sink(#[source] io::Error),
}

/// Result of [`ProteusClient::save_media_local`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedMedia {
    pub content_type: String,
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the bytes written.
    pub sha256: String,
}

pub struct ProteusClient<T> {
    transport: T,
    policy: DownloadPolicy,
    transformations: Value,
    formats: Value,
}

impl ProteusClient<CurlTransport> {
    /// Builds a libcurl-backed client. Fails when url or token is unset.
    pub fn from_config(cfg: &ProteusConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let transport = CurlTransport::new(&cfg.url, cfg.token.clone(), cfg.curl_options())?;
        Ok(ProteusClient::new(transport)
            .with_download_policy(cfg.download_policy())
            .with_catalogs(cfg.transformations_json(), cfg.formats_json()))
    }
}

impl<T: Transport> ProteusClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: DownloadPolicy::default(),
            transformations: Value::Object(Default::default()),
            formats: Value::Object(Default::default()),
        }
    }

    pub fn with_download_policy(mut self, policy: DownloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_catalogs(mut self, transformations: Value, formats: Value) -> Self {
        self.transformations = transformations;
        self.formats = formats;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn download_policy(&self) -> &DownloadPolicy {
        &self.policy
    }

    pub fn media_index(&self, query: &[(&str, &str)]) -> Result<Value, ClientError> {
        let request = query
            .iter()
            .fold(Request::get("media"), |req, (k, v)| req.query(*k, *v));
        Ok(self.transport.send_json(request)?)
    }

    pub fn media_show(&self, id: &str) -> Result<Value, ClientError> {
        Ok(self.transport.send_json(Request::get(format!("media/{}", id)))?)
    }

    /// Replaces media metadata; nested entries are sent as `metadata[..]`.
    pub fn media_update(&self, id: &str, input: &UploadInput) -> Result<Value, ClientError> {
        let parts = payload::encode_metadata(input)?;
        let request = Request::post(format!("media/{}/metadata", id)).multipart(parts);
        Ok(self.transport.send_json(request)?)
    }

    pub fn media_store(&self, body: Value) -> Result<Value, ClientError> {
        Ok(self.transport.send_json(Request::post("media/store").json(body))?)
    }

    pub fn media_delete(&self, id: &str) -> Result<Value, ClientError> {
        Ok(self.transport.send_json(Request::delete(format!("media/{}", id)))?)
    }

    pub fn media_download(&self, asset: &AssetRef) -> Result<StreamedAsset, ClientError> {
        Ok(download::download(&self.transport, asset, &self.policy)?)
    }

    /// Like [`media_download`](Self::media_download) with a caller-supplied pause.
    pub fn media_download_with_sleep<S>(
        &self,
        asset: &AssetRef,
        sleep: S,
    ) -> Result<StreamedAsset, ClientError>
    where
        S: FnMut(Duration),
    {
        Ok(download::download_with_sleep(
            &self.transport,
            asset,
            &self.policy,
            sleep,
        )?)
    }

    /// Downloads the original asset and streams it into `sink`.
    pub fn save_media_local<W: Write>(
        &self,
        id: &str,
        sink: &mut W,
    ) -> Result<SavedMedia, ClientError> {
        let asset = self.media_download(&AssetRef::new(id, None))?;
        store_into(asset, sink)
    }

    pub fn categories_index(&self) -> Result<Value, ClientError> {
        Ok(self.transport.send_json(Request::get("categories"))?)
    }

    /// Multipart upload to `endpoint`. Nothing is sent when encoding fails.
    pub fn upload_file(&self, endpoint: &str, input: &UploadInput) -> Result<Value, ClientError> {
        let parts = payload::encode(input)?;
        Ok(self.transport.send_json(Request::post(endpoint).multipart(parts))?)
    }

    pub fn set_metadata(&self, endpoint: &str, input: &UploadInput) -> Result<Value, ClientError> {
        let parts = payload::encode_metadata(input)?;
        Ok(self.transport.send_json(Request::post(endpoint).multipart(parts))?)
    }

    pub fn metadata_keys(&self, key: &str) -> Result<Value, ClientError> {
        Ok(self
            .transport
            .send_json(Request::get(format!("media/metadata/{}", key)))?)
    }

    pub fn metadata_values(&self, key: &str) -> Result<Value, ClientError> {
        Ok(self
            .transport
            .send_json(Request::get(format!("media/metadata/{}/values", key)))?)
    }

    /// Preset of a media item, `None` when it cannot be fetched.
    pub fn preset_by_media(&self, id: &str) -> Option<Value> {
        match self
            .transport
            .send_json(Request::get(format!("media/{}/preset", id)))
        {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("preset for media {} unavailable: {}", id, e);
                None
            }
        }
    }

    pub fn transformations_config(&self) -> &Value {
        &self.transformations
    }

    pub fn formats_config(&self) -> &Value {
        &self.formats
    }
}

/// Drains a ready asset into `sink`, hashing on the way.
pub fn store_into<W: Write + ?Sized>(
    asset: StreamedAsset,
    sink: &mut W,
) -> Result<SavedMedia, ClientError> {
    let content_type = asset.content_type().to_string();
    let mut hashing = HashingWriter::new(sink);
    let bytes = asset.copy_to(&mut hashing).map_err(ClientError::Sink)?;
    hashing.flush().map_err(ClientError::Sink)?;
    let (_, sha256) = hashing.finish();
    tracing::debug!("stored {} bytes ({}), sha256 {}", bytes, content_type, sha256);
    Ok(SavedMedia {
        content_type,
        bytes,
        sha256,
    })
}
