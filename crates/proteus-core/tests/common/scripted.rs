//! In-memory transport replaying scripted responses.

use proteus_core::transport::{
    Body, Method, Request, Response, TransferMode, Transport, TransportError, TransportResponse,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub mode: TransferMode,
    pub part_names: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<Response, TransportError>>>,
    /// Reply used once the queue is empty.
    fallback: Option<(u16, &'static str, &'static [u8])>,
    sent: RefCell<Vec<Sent>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request after the queue runs dry gets this stream reply.
    pub fn always(status: u16, content_type: &'static str, body: &'static [u8]) -> Self {
        Self {
            fallback: Some((status, content_type, body)),
            ..Self::default()
        }
    }

    pub fn then_stream(self, status: u16, content_type: &str, body: &[u8]) -> Self {
        self.replies
            .borrow_mut()
            .push_back(Ok(Response::Stream(stream(status, content_type, body))));
        self
    }

    pub fn then_response(self, response: TransportResponse) -> Self {
        self.replies.borrow_mut().push_back(Ok(Response::Stream(response)));
        self
    }

    pub fn then_json(self, value: serde_json::Value) -> Self {
        self.replies.borrow_mut().push_back(Ok(Response::Json(value)));
        self
    }

    pub fn then_error(self, err: TransportError) -> Self {
        self.replies.borrow_mut().push_back(Err(err));
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let part_names = match &request.body {
            Body::Multipart(parts) => parts.iter().map(|p| p.name.clone()).collect(),
            _ => Vec::new(),
        };
        self.sent.borrow_mut().push(Sent {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            mode: request.mode,
            part_names,
        });
        if let Some(reply) = self.replies.borrow_mut().pop_front() {
            return reply;
        }
        match self.fallback {
            Some((status, ct, body)) => Ok(Response::Stream(stream(status, ct, body))),
            None => Err(TransportError::Other("script exhausted".to_string())),
        }
    }
}

pub fn stream(status: u16, content_type: &str, body: &[u8]) -> TransportResponse {
    TransportResponse::new(
        status,
        vec![("Content-Type".to_string(), content_type.to_string())],
        Box::new(io::Cursor::new(body.to_vec())),
    )
}

/// Body that flags when it is dropped.
pub struct DropProbe {
    inner: io::Cursor<Vec<u8>>,
    dropped: Arc<AtomicBool>,
}

impl DropProbe {
    pub fn new(body: &[u8]) -> (Self, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner: io::Cursor::new(body.to_vec()),
                dropped: Arc::clone(&flag),
            },
            flag,
        )
    }

    pub fn was_dropped(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }
}

impl Read for DropProbe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct SleepLog(pub RefCell<Vec<Duration>>);

impl SleepLog {
    pub fn sleeper(&self) -> impl FnMut(Duration) + '_ {
        move |d| self.0.borrow_mut().push(d)
    }

    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }
}
