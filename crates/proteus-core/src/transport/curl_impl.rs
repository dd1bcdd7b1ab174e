//! libcurl-backed [`Transport`].
//!
//! Buffered modes run on the calling thread and collect the body. Stream mode
//! runs the transfer on a worker thread and hands the body back through a
//! bounded channel (see [`ChannelReader`]).

use super::stream::{ChannelReader, StreamEvent};
use super::{
    message_from_body, Body, Method, Request, Response, TransferMode, Transport,
    TransportError, TransportResponse,
};
use crate::payload::{MultipartPart, PartContent};
use curl::easy::{Easy, Form, List};
use std::cell::RefCell;
use std::sync::mpsc::{self, SyncSender};
use std::thread;
use std::time::Duration;
use url::Url;

/// Chunks buffered between the transfer thread and the reader.
const STREAM_CHANNEL_DEPTH: usize = 16;

/// Connection tuning shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Hard cap for a whole transfer, streamed downloads included.
    pub timeout: Duration,
    /// Abort when throughput stays below this many bytes/sec for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(3600),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
        }
    }
}

/// Transport talking to the service over HTTP(S) via libcurl.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    base_url: Url,
    token: String,
    options: CurlOptions,
}

impl CurlTransport {
    /// `base_url` is the service root; request paths are resolved relative to it.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        options: CurlOptions,
    ) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            token: token.into(),
            options,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves the request path and query against the base URL.
    pub fn request_url(&self, request: &Request) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", request.path, e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    fn configure(
        &self,
        url: &Url,
        method: Method,
        body: Body,
        mode: TransferMode,
    ) -> Result<Easy, TransportError> {
        let mut easy = Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.low_speed_limit(self.options.low_speed_limit)?;
        easy.low_speed_time(self.options.low_speed_time)?;
        easy.timeout(self.options.timeout)?;

        let mut list = List::new();
        if !self.token.is_empty() {
            list.append(&format!("Authorization: Bearer {}", self.token))?;
        }
        match mode {
            TransferMode::Stream => list.append("Accept: */*")?,
            TransferMode::Json | TransferMode::Multipart => {
                list.append("Accept: application/json")?
            }
        }

        let has_body = !matches!(body, Body::Empty);
        match body {
            Body::Empty => {
                if matches!(method, Method::Post | Method::Put) {
                    easy.post(true)?;
                    easy.post_field_size(0)?;
                }
            }
            Body::Json(value) => {
                list.append("Content-Type: application/json")?;
                let bytes = serde_json::to_vec(&value)?;
                easy.post(true)?;
                easy.post_fields_copy(&bytes)?;
            }
            Body::Multipart(parts) => {
                easy.httppost(build_form(parts)?)?;
            }
        }

        match method {
            Method::Get if !has_body => easy.get(true)?,
            Method::Post => {}
            other => easy.custom_request(other.as_str())?,
        }
        easy.http_headers(list)?;
        Ok(easy)
    }

    fn send_buffered(&self, request: Request) -> Result<serde_json::Value, TransportError> {
        let url = self.request_url(&request)?;
        tracing::debug!("{} {}", request.method, url);
        let mut easy = self.configure(&url, request.method, request.body, request.mode)?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()? as u16;
        if !(200..300).contains(&status) {
            let message = message_from_body(&body);
            tracing::warn!("{} {} returned HTTP {}: {}", request.method, url, status, message);
            return Err(TransportError::Status { status, message });
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    fn send_streamed(&self, request: Request) -> Result<TransportResponse, TransportError> {
        let url = self.request_url(&request)?;
        tracing::debug!("{} {} (stream)", request.method, url);
        let easy = self.configure(&url, request.method, request.body, request.mode)?;

        let (tx, rx) = mpsc::sync_channel(STREAM_CHANNEL_DEPTH);
        thread::Builder::new()
            .name("proteus-stream".to_string())
            .spawn(move || run_stream(easy, tx))?;

        match rx.recv() {
            Ok(StreamEvent::Head { status, headers }) => Ok(TransportResponse::new(
                status,
                headers,
                Box::new(ChannelReader::new(rx)),
            )),
            Ok(StreamEvent::Failed(e)) => Err(e),
            Ok(StreamEvent::Chunk(_)) => Err(TransportError::UnexpectedResponse(
                "body chunk arrived before response headers".to_string(),
            )),
            Err(_) => Err(TransportError::Other(
                "stream worker exited without a response".to_string(),
            )),
        }
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        match request.mode {
            TransferMode::Stream => self.send_streamed(request).map(Response::Stream),
            TransferMode::Json | TransferMode::Multipart => {
                self.send_buffered(request).map(Response::Json)
            }
        }
    }
}

/// Builds the curl form. File parts are streamed from disk by curl while the
/// request is performed; their handles are closed here.
fn build_form(parts: Vec<MultipartPart>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        match part.content {
            PartContent::Text(text) => {
                form.part(&part.name).contents(text.as_bytes()).add()?;
            }
            PartContent::File {
                handle,
                path,
                filename,
            } => {
                drop(handle);
                form.part(&part.name)
                    .file(&path)
                    .filename(&filename)
                    .add()?;
            }
        }
    }
    Ok(form)
}

#[derive(Default)]
struct HeadState {
    status: u16,
    headers: Vec<(String, String)>,
    sent: bool,
}

/// Worker side of a streamed transfer.
fn run_stream(mut easy: Easy, tx: SyncSender<StreamEvent>) {
    let head = RefCell::new(HeadState::default());
    let result = (|| -> Result<(), curl::Error> {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            let line = String::from_utf8_lossy(line);
            let line = line.trim_end();
            let mut st = head.borrow_mut();
            if let Some(code) = parse_status_line(line) {
                // A new block (redirect, 100-continue) replaces the previous one.
                st.status = code;
                st.headers.clear();
            } else if let Some((name, value)) = line.split_once(':') {
                st.headers
                    .push((name.trim().to_string(), value.trim().to_string()));
            }
            true
        })?;
        transfer.write_function(|data| {
            let mut st = head.borrow_mut();
            if !st.sent {
                st.sent = true;
                let event = StreamEvent::Head {
                    status: st.status,
                    headers: std::mem::take(&mut st.headers),
                };
                if tx.send(event).is_err() {
                    return Ok(0);
                }
            }
            drop(st);
            match tx.send(StreamEvent::Chunk(data.to_vec())) {
                Ok(()) => Ok(data.len()),
                // Reader dropped: abort the transfer.
                Err(_) => Ok(0),
            }
        })?;
        transfer.perform()
    })();

    let mut st = head.into_inner();
    match result {
        Ok(()) => {
            if !st.sent {
                if let Ok(code) = easy.response_code() {
                    if code != 0 {
                        st.status = code as u16;
                    }
                }
                let _ = tx.send(StreamEvent::Head {
                    status: st.status,
                    headers: st.headers,
                });
            }
        }
        Err(e) if st.sent && e.is_write_error() => {
            tracing::debug!("streamed transfer aborted by reader");
        }
        Err(e) => {
            tracing::warn!("streamed transfer failed: {}", e);
            let _ = tx.send(StreamEvent::Failed(e.into()));
        }
    }
}

/// Parses `HTTP/1.1 200 OK` (or `HTTP/2 200`) into the status code.
fn parse_status_line(line: &str) -> Option<u16> {
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
