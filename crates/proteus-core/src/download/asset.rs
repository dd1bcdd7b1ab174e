//! Successful download exposed as a lazily consumed byte stream.

use super::AssetRef;
use crate::transport::{BodyStream, TransportResponse};
use std::fmt;
use std::io::{self, Read, Write};

/// Read size when draining an asset.
pub const CHUNK_SIZE: usize = 8192;

/// Content type used when the service sends none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Headers to attach when relaying an asset onward.
pub const RELAY_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// A ready asset whose body is still on the wire.
///
/// The stream is single-use: read it through [`Read`], [`chunks`](Self::chunks)
/// or [`copy_to`](Self::copy_to). Dropping it closes the underlying transfer.
pub struct StreamedAsset {
    content_type: String,
    content_length: Option<u64>,
    suggested_filename: String,
    body: BodyStream,
}

impl StreamedAsset {
    pub(crate) fn from_response(asset: &AssetRef, response: TransportResponse) -> Self {
        let content_type = response
            .header("Content-Type")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let content_length = response
            .header("Content-Length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            content_type,
            content_length,
            suggested_filename: asset.suggested_filename(),
            body: response.body,
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// `None` when the service did not announce a length.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn suggested_filename(&self) -> &str {
        &self.suggested_filename
    }

    /// `Content-Disposition` value for relaying the asset as an attachment.
    pub fn content_disposition(&self) -> String {
        let escaped = self
            .suggested_filename
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        format!("attachment; filename=\"{}\"", escaped)
    }

    pub fn cache_control(&self) -> &'static str {
        RELAY_CACHE_CONTROL
    }

    /// Pull-based iteration in reads of at most [`CHUNK_SIZE`] bytes.
    pub fn chunks(self) -> Chunks {
        Chunks {
            body: self.body,
            done: false,
        }
    }

    /// Push-based drain into `sink`, one chunk at a time. Returns bytes copied.
    pub fn copy_to<W: Write + ?Sized>(mut self, sink: &mut W) -> io::Result<u64> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match self.body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            sink.write_all(&buf[..n])?;
            total += n as u64;
        }
        sink.flush()?;
        Ok(total)
    }

    pub fn into_reader(self) -> BodyStream {
        self.body
    }
}

impl Read for StreamedAsset {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}

impl fmt::Debug for StreamedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamedAsset")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("suggested_filename", &self.suggested_filename)
            .finish_non_exhaustive()
    }
}

/// Iterator over an asset's body. Ends after end-of-stream or the first error.
pub struct Chunks {
    body: BodyStream,
    done: bool,
}

impl Iterator for Chunks {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match self.body.read(&mut buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(buf));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
