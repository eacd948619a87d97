#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use tether_fetch::{Request, Response, Transport};

#[derive(Debug)]
pub struct MockError(pub String);

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MockError {}

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status:         u16,
    pub headers:        Vec<(String, String)>,
    pub content_length: Option<u64>,
    pub body:           Vec<u8>,
    /// End the body early after this many bytes, as a dropped connection would.
    pub cut_after:      Option<usize>,
}

impl Reply {
    pub fn ok(body: &[u8]) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            headers: Vec::new(),
            content_length: Some(body.len() as u64),
            body: body.to_vec(),
            cut_after: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn content_length(mut self, len: Option<u64>) -> Self {
        self.content_length = len;
        self
    }

    pub fn cut_after(mut self, n: usize) -> Self {
        self.cut_after = Some(n);
        self
    }
}

/// Body reader that counts how often it is released.
struct TrackedBody {
    inner:    Cursor<Vec<u8>>,
    released: Arc<AtomicUsize>,
}

impl Read for TrackedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transport that replays scripted replies and records every request.
#[derive(Default)]
pub struct MockTransport {
    replies:  Mutex<VecDeque<Result<Reply, String>>>,
    requests: Mutex<Vec<Request>>,
    released: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        let transport = Self::default();
        transport
            .replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(Ok));
        Arc::new(transport)
    }

    pub fn push_failure(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn sends(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// How many response bodies have been dropped so far.
    pub fn bodies_released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    type Error = MockError;

    fn send(&self, request: Request) -> Result<Response, MockError> {
        self.requests.lock().unwrap().push(request);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no reply scripted".to_string()))
            .map_err(MockError)?;

        let mut body = reply.body;
        if let Some(n) = reply.cut_after {
            body.truncate(n);
        }

        let mut response = Response::new(reply.status)
            .content_length(reply.content_length)
            .body(TrackedBody {
                inner:    Cursor::new(body),
                released: Arc::clone(&self.released),
            });
        for (name, value) in reply.headers {
            response = response.header(name, value);
        }
        Ok(response)
    }
}

pub fn url(path: &str) -> tether_fetch::Url {
    tether_fetch::url(&format!("http://mirror.test{path}")).unwrap()
}

/// Body that stops before reading past `gate_at` until the test releases it.
struct GatedBody {
    inner:   Cursor<Vec<u8>>,
    gate_at: u64,
    reached: Option<mpsc::Sender<()>>,
    release: mpsc::Receiver<()>,
}

impl Read for GatedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.inner.position() >= self.gate_at {
            if let Some(reached) = self.reached.take() {
                let _ = reached.send(());
                let _ = self.release.recv();
            }
        }
        self.inner.read(buf)
    }
}

/// Transport whose single response pauses mid-body.
pub struct GatedTransport {
    body: Mutex<Option<GatedBody>>,
    len:  u64,
}

/// Control side of a [`GatedTransport`].
pub struct Gate {
    reached: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
}

impl Gate {
    /// Blocks until the body reader is parked at the gate.
    pub fn wait(&self) {
        self.reached.recv().unwrap();
    }

    pub fn open(&self) {
        self.release.send(()).unwrap();
    }
}

impl GatedTransport {
    pub fn new(body: Vec<u8>, gate_at: u64) -> (Arc<Self>, Gate) {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let len = body.len() as u64;
        let transport = Self {
            body: Mutex::new(Some(GatedBody {
                inner: Cursor::new(body),
                gate_at,
                reached: Some(reached_tx),
                release: release_rx,
            })),
            len,
        };
        let gate = Gate {
            reached: reached_rx,
            release: release_tx,
        };
        (Arc::new(transport), gate)
    }
}

impl Transport for GatedTransport {
    type Error = MockError;

    fn send(&self, _request: Request) -> Result<Response, MockError> {
        let body = self
            .body
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| MockError("body already served".to_string()))?;
        Ok(Response::new(200).content_length(Some(self.len)).body(body))
    }
}
