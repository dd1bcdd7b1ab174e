//! Minimal HTTP/1.1 server mimicking the media service for integration tests.
//!
//! `GET /media/{id}/download` answers 202 for the first `processing_polls`
//! requests, then 200 with the asset body. Id `missing` always gets a 404
//! JSON error. Other routes return small JSON documents. Every request is
//! recorded so tests can inspect what the client sent.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MediaServerOptions {
    pub processing_polls: usize,
    pub content_type: &'static str,
    pub asset: Vec<u8>,
}

struct State {
    opts: MediaServerOptions,
    download_hits: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MediaServer {
    pub base_url: String,
    state: Arc<State>,
}

impl MediaServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn download_hits(&self) -> usize {
        self.state.download_hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(opts: MediaServerOptions) -> MediaServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(State {
        opts,
        download_hits: AtomicUsize::new(0),
        requests: Mutex::new(Vec::new()),
    });
    let server_state = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&server_state);
            thread::spawn(move || handle(stream, &state));
        }
    });
    MediaServer {
        base_url: format!("http://127.0.0.1:{}/api/", port),
        state,
    }
}

fn handle(mut stream: TcpStream, state: &State) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    state.requests.lock().unwrap().push(request.clone());

    let path = request
        .target
        .split('?')
        .next()
        .unwrap_or("")
        .trim_start_matches("/api/");
    let segments: Vec<&str> = path.split('/').collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["media", "missing", "download"]) => {
            respond_json(&mut stream, "404 Not Found", r#"{"message":"not found"}"#)
        }
        ("GET", ["media", _, "download"]) => {
            let hit = state.download_hits.fetch_add(1, Ordering::SeqCst) + 1;
            if hit <= state.opts.processing_polls {
                respond_json(&mut stream, "202 Accepted", r#"{"status":"processing"}"#);
            } else {
                respond(
                    &mut stream,
                    "200 OK",
                    state.opts.content_type,
                    &state.opts.asset,
                );
            }
        }
        ("GET", ["media", _, "preset"]) => {
            respond_json(&mut stream, "500 Internal Server Error", "{}")
        }
        ("GET", ["media", id]) => {
            respond_json(&mut stream, "200 OK", &format!(r#"{{"id":"{}"}}"#, id))
        }
        ("DELETE", ["media", _]) => respond(&mut stream, "204 No Content", "application/json", b""),
        ("POST", _) => respond_json(
            &mut stream,
            "201 Created",
            &format!(r#"{{"received":{}}}"#, request.body.len()),
        ),
        _ => respond_json(&mut stream, "404 Not Found", r#"{"message":"no route"}"#),
    }
}

fn respond_json(stream: &mut TcpStream, status: &str, body: &str) {
    respond(stream, status, "application/json", body.as_bytes());
}

fn respond(stream: &mut TcpStream, status: &str, content_type: &str, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

/// Reads headers, answers `Expect: 100-continue`, then reads Content-Length bytes.
fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = std::str::from_utf8(&raw[..header_end]).ok()?.to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let find = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };
    let content_length: usize = find("Content-Length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if find("Expect").is_some_and(|v| v.eq_ignore_ascii_case("100-continue")) {
        let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
    }

    let mut body = raw[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}
