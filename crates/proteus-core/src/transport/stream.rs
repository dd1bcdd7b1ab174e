//! Channel-backed body reader for streamed transfers.
//!
//! The curl transfer runs on a worker thread and pushes body chunks into a
//! bounded channel; [`ChannelReader`] pulls them on the caller's side. When the
//! channel is full the worker blocks inside curl's write callback, so memory
//! stays bounded no matter how large the asset is.

use std::io::{self, Read};
use std::sync::mpsc::{Receiver, RecvError};

/// Events sent from the transfer thread.
#[derive(Debug)]
pub(crate) enum StreamEvent {
    /// Final status line and headers; always the first event on success.
    Head {
        status: u16,
        headers: Vec<(String, String)>,
    },
    Chunk(Vec<u8>),
    /// Transfer aborted. Before `Head` this is a request failure, after it a
    /// truncated body.
    Failed(super::TransportError),
}

/// Pull-side of a streamed response body. Dropping it disconnects the channel,
/// which makes the worker abort the transfer on its next write.
pub struct ChannelReader {
    rx: Receiver<StreamEvent>,
    buf: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl ChannelReader {
    pub(crate) fn new(rx: Receiver<StreamEvent>) -> Self {
        Self {
            rx,
            buf: Vec::new(),
            pos: 0,
            finished: false,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.buf.len() {
            if self.finished {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(StreamEvent::Chunk(chunk)) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                Ok(StreamEvent::Failed(e)) => {
                    self.finished = true;
                    return Err(io::Error::new(io::ErrorKind::Other, e));
                }
                Ok(StreamEvent::Head { .. }) => {}
                Err(RecvError) => {
                    self.finished = true;
                    return Ok(0);
                }
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
