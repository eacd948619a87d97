use std::fmt;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tether_fs::{SinkMode, open_sink};
use tracing::{debug, warn};
use url::Url;

use crate::core::{
    PARTIAL_CONTENT, accepts_byte_ranges, check_length, content_type_matches, status_accepted,
};
use crate::data::options::ProgressCallback;
use crate::data::{
    BufferedResponse, CancelToken, Form, Headers, Method, PartialDownloadInfo, Progress,
    ProgressHandle, Request,
};
use crate::effects::http::Transport;
use crate::error::{Error, Result};

/// Size of each read from the response body while streaming to a sink.
pub const READ_BUFFER_SIZE: usize = 8 * 1024;

/// `User-Agent` sent unless the caller sets one.
pub const USER_AGENT: &str = concat!("tether/", env!("CARGO_PKG_VERSION"));

/// Lifecycle of a [`Transfer`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Unexecuted,
    Executed,
    Closed,
}

#[derive(Debug)]
struct Payload {
    bytes:        Vec<u8>,
    content_type: &'static str,
}

#[derive(Debug)]
struct ResponseMeta {
    status:  u16,
    headers: Headers,
}

/// A single-use HTTP request/response.
///
/// Configure with the consuming builder methods, then drive it through
/// [`execute`](Self::execute), the `expect_*` checks and one of the
/// consuming reads. Those steps take `&mut self` so the transfer is still
/// around after a failure to answer [`can_retry_partial`](Self::can_retry_partial).
///
/// The response body is released by [`close`](Self::close), which every
/// terminal operation and failed check calls, and by `Drop`.
///
/// # Examples
///
/// ```no_run
/// use tether_fetch::{ReqwestTransport, Transfer};
///
/// # fn main() -> tether_fetch::Result<()> {
/// let transport = ReqwestTransport::shared()?;
/// let url = tether_fetch::url("https://example.com/pack/manifest.json")?;
///
/// let manifest = Transfer::get(transport, url)
///     .header("Accept", "application/json")
///     .execute()?
///     .expect_response_code(&[200])?
///     .expect_content_type(&["application/json"])?
///     .return_content()?;
/// # let _ = manifest;
/// # Ok(())
/// # }
/// ```
pub struct Transfer<T: Transport> {
    transport:   Arc<T>,
    method:      Method,
    url:         Url,
    headers:     Headers,
    body:        Option<Payload>,
    resume_info: Option<PartialDownloadInfo>,
    cancel:      Option<CancelToken>,
    on_progress: Option<ProgressCallback>,
    state:       TransferState,
    response:    Option<ResponseMeta>,
    stream:      Option<Box<dyn Read + Send>>,
    progress:    ProgressHandle,
}

impl<T: Transport> Transfer<T> {
    pub fn new(transport: Arc<T>, method: Method, url: Url) -> Self {
        Self {
            transport,
            method,
            url,
            headers: Headers::new(),
            body: None,
            resume_info: None,
            cancel: None,
            on_progress: None,
            state: TransferState::Unexecuted,
            response: None,
            stream: None,
            progress: ProgressHandle::new(),
        }
    }

    pub fn get(transport: Arc<T>, url: Url) -> Self {
        Self::new(transport, Method::Get, url)
    }

    pub fn post(transport: Arc<T>, url: Url) -> Self {
        Self::new(transport, Method::Post, url)
    }

    /// Sets a request header, replacing any earlier value for the same name.
    ///
    /// Ignored once the transfer has been executed.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if self.is_configured("header") {
            return self;
        }
        self.headers.set(key, value);
        self
    }

    /// Sends `value` serialized as JSON. Replaces any earlier body.
    ///
    /// Ignored once the transfer has been executed.
    pub fn body_json<S: Serialize + ?Sized>(mut self, value: &S) -> Result<Self> {
        if self.is_configured("body") {
            return Ok(self);
        }
        let bytes = serde_json::to_vec(value).map_err(|e| Error::Encoding {
            format: "json",
            source: Box::new(e),
        })?;
        self.body = Some(Payload {
            bytes,
            content_type: "application/json",
        });
        Ok(self)
    }

    /// Sends `form` URL-encoded. Replaces any earlier body.
    ///
    /// Ignored once the transfer has been executed.
    #[must_use]
    pub fn body_form(mut self, form: Form) -> Self {
        if self.is_configured("body") {
            return self;
        }
        self.body = Some(Payload {
            bytes:        form.to_string().into_bytes(),
            content_type: "application/x-www-form-urlencoded",
        });
        self
    }

    /// Requests only the bytes after `info.current_length` when executed.
    ///
    /// Ignored once the transfer has been executed: the request already went
    /// out without a `Range` header.
    #[must_use]
    pub fn resume_from(mut self, info: PartialDownloadInfo) -> Self {
        if self.is_configured("resume info") {
            return self;
        }
        self.resume_info = Some(info);
        self
    }

    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Called with a fresh [`Progress`] after every chunk written to a sink.
    #[must_use]
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Sends the request through the transport.
    ///
    /// The transfer counts as executed even when the transport fails, so a
    /// second call always fails with [`Error::InvalidState`] without I/O.
    pub fn execute(&mut self) -> Result<&mut Self> {
        if self.state != TransferState::Unexecuted {
            return Err(Error::InvalidState("transfer already executed"));
        }
        self.state = TransferState::Executed;

        let mut headers = self.headers.clone();
        let body = match self.body.take() {
            Some(payload) => {
                headers.set_default("Content-Type", payload.content_type);
                Some(payload.bytes)
            }
            None if self.method == Method::Post => Some(Vec::new()),
            None => None,
        };
        headers.set_default("User-Agent", USER_AGENT);
        if let Some(info) = &self.resume_info {
            headers.set("Range", info.range_header());
        }

        debug!(method = %self.method, url = %self.url, resumed = self.resume_info.is_some(), "sending request");

        let request = Request {
            method: self.method,
            url: self.url.clone(),
            headers,
            body,
        };
        let response = self.transport.send(request).map_err(|e| {
            warn!(url = %self.url, error = %e, "transport failed");
            Error::Network(Box::new(e))
        })?;

        debug!(
            url = %self.url,
            status = response.status,
            content_length = ?response.content_length,
            "received response"
        );

        self.progress.set_content_length(response.content_length);
        self.response = Some(ResponseMeta {
            status:  response.status,
            headers: response.headers,
        });
        self.stream = Some(response.body.unwrap_or_else(|| Box::new(io::empty())));

        Ok(self)
    }

    /// Fails unless the status is one of `codes`.
    ///
    /// A resumed transfer also accepts 206. On mismatch the transfer is
    /// closed.
    pub fn expect_response_code(&mut self, codes: &[u16]) -> Result<&mut Self> {
        let status = self.require_status()?;
        if status_accepted(status, codes, self.is_resumed()) {
            return Ok(self);
        }

        warn!(url = %self.url, status, expected = ?codes, "unexpected response code");
        self.close();
        Err(Error::UnexpectedStatus {
            status,
            url: self.url.to_string(),
        })
    }

    /// Fails with the caller's own error unless the status equals `code`.
    ///
    /// `on_mismatch` sees the transfer before it is closed, so it may read
    /// the error body.
    pub fn expect_response_code_or<E, F>(
        &mut self,
        code: u16,
        on_mismatch: F,
    ) -> std::result::Result<&mut Self, E>
    where
        E: From<Error>,
        F: FnOnce(&mut Self) -> E,
    {
        let status = self.require_status()?;
        if status == code {
            return Ok(self);
        }

        let err = on_mismatch(self);
        self.close();
        Err(err)
    }

    /// Fails unless `Content-Type` starts with one of `types`.
    ///
    /// A missing header is treated as the empty string. On mismatch the
    /// transfer is closed.
    pub fn expect_content_type(&mut self, types: &[&str]) -> Result<&mut Self> {
        let actual = match &self.response {
            Some(meta) => meta.headers.get("Content-Type").unwrap_or_default().to_string(),
            None => return Err(Error::InvalidState("no connection has been made")),
        };
        if content_type_matches(&actual, types) {
            return Ok(self);
        }

        warn!(url = %self.url, actual = %actual, "unexpected content type");
        self.close();
        Err(Error::UnexpectedContentType {
            expected: types.join(" | "),
            actual,
        })
    }

    /// Reads the whole body into memory and closes the transfer.
    ///
    /// Not interruptible; meant for small payloads.
    pub fn return_content(&mut self) -> Result<BufferedResponse> {
        let mut stream = self
            .stream
            .take()
            .ok_or(Error::InvalidState("no input stream available"))?;

        let mut data = Vec::new();
        let read = stream.read_to_end(&mut data);
        drop(stream);
        self.close();

        read?;
        self.progress.add(data.len() as u64);
        self.verify_length()?;

        Ok(BufferedResponse::new(data))
    }

    /// Streams the body into `out` in [`READ_BUFFER_SIZE`] chunks.
    ///
    /// Checks cancellation after every chunk. A non-resumed transfer with a
    /// declared length fails with [`Error::TruncatedTransfer`] when the byte
    /// count differs. The transfer is closed on every path.
    pub fn save_content<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<&mut Self> {
        let stream = self
            .stream
            .take()
            .ok_or(Error::InvalidState("no input stream available"))?;

        let copied = copy_stream(
            stream,
            out,
            &self.progress,
            self.cancel.as_ref(),
            self.on_progress.as_ref(),
        );
        self.close();

        if let Err(err) = &copied {
            warn!(url = %self.url, error = %err, transferred = self.bytes_transferred(), "streaming failed");
        }
        copied?;
        self.verify_length()?;

        Ok(self)
    }

    /// Streams the body into the file at `path`.
    ///
    /// Parent directories are created. A resumed transfer answered with 206
    /// appends to the existing file; anything else truncates it.
    pub fn save_content_to(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        if self.stream.is_none() {
            return Err(Error::InvalidState("no input stream available"));
        }

        let mode = if self.is_resumed() && self.status() == Some(PARTIAL_CONTENT) {
            SinkMode::Append
        } else {
            SinkMode::Truncate
        };
        debug!(path = %path.display(), ?mode, "opening sink");

        let file = match open_sink(path, mode) {
            Ok(file) => file,
            Err(err) => {
                self.close();
                return Err(err.into());
            }
        };

        let mut writer = BufWriter::new(file);
        self.save_content(&mut writer)?;
        Ok(self)
    }

    /// Whether a later ranged request could pick up where this one stopped.
    ///
    /// Requires a received response that advertised `Accept-Ranges: bytes`.
    pub fn can_retry_partial(&self) -> Option<PartialDownloadInfo> {
        let meta = self.response.as_ref()?;
        if !accepts_byte_ranges(meta.headers.get("Accept-Ranges")) {
            return None;
        }
        Some(PartialDownloadInfo::new(
            self.content_length(),
            self.bytes_transferred(),
        ))
    }

    /// Releases the response body. Safe to call any number of times.
    ///
    /// Status and headers stay readable after closing.
    pub fn close(&mut self) {
        if self.state == TransferState::Closed {
            return;
        }
        if self.stream.take().is_some() {
            debug!(url = %self.url, "released response body");
        }
        self.state = TransferState::Closed;
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Request headers set by the caller.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn resume_info(&self) -> Option<PartialDownloadInfo> {
        self.resume_info
    }

    pub fn is_resumed(&self) -> bool {
        self.resume_info.is_some()
    }

    /// Whether a response was received.
    pub fn is_connected(&self) -> bool {
        self.response.is_some()
    }

    /// Status of the received response.
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|meta| meta.status)
    }

    /// Whether the received response has a 2xx status.
    pub fn is_success(&self) -> bool {
        self.status().is_some_and(|s| (200..300).contains(&s))
    }

    pub fn response_headers(&self) -> Option<&Headers> {
        self.response.as_ref().map(|meta| &meta.headers)
    }

    /// Length declared by the current response; the remainder for a ranged one.
    pub fn content_length(&self) -> Option<u64> {
        self.progress.content_length()
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.progress.bytes_transferred()
    }

    /// Completed fraction in `[0, 1]`, `None` while the length is unknown.
    pub fn progress(&self) -> Option<f64> {
        self.progress.progress()
    }

    /// A handle for reading progress from another thread while streaming.
    pub fn progress_handle(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Whether request settings are frozen; logs the ignored `setting` if so.
    fn is_configured(&self, setting: &'static str) -> bool {
        if self.state == TransferState::Unexecuted {
            return false;
        }
        debug!(url = %self.url, setting, "ignoring setting changed after execution");
        true
    }

    fn require_status(&self) -> Result<u16> {
        self.status()
            .ok_or(Error::InvalidState("no connection has been made"))
    }

    fn verify_length(&self) -> Result<()> {
        match check_length(self.bytes_transferred(), self.content_length(), self.is_resumed()) {
            Some((transferred, expected)) => {
                warn!(url = %self.url, transferred, expected, "transfer truncated");
                Err(Error::TruncatedTransfer {
                    transferred,
                    expected,
                })
            }
            None => Ok(()),
        }
    }
}

fn copy_stream<W: Write + ?Sized>(
    mut stream: Box<dyn Read + Send>,
    out: &mut W,
    progress: &ProgressHandle,
    cancel: Option<&CancelToken>,
    on_progress: Option<&ProgressCallback>,
) -> Result<()> {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let len = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        out.write_all(&buf[..len])?;
        progress.add(len as u64);

        if let Some(callback) = on_progress {
            let snapshot: Progress = progress.snapshot();
            callback(&snapshot);
        }
        if cancel.is_some_and(CancelToken::is_cancelled) {
            out.flush()?;
            return Err(Error::Cancelled);
        }
    }
    out.flush()?;
    Ok(())
}

impl<T: Transport> Drop for Transfer<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> fmt::Debug for Transfer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("state", &self.state)
            .field("status", &self.status())
            .field("resume_info", &self.resume_info)
            .field("bytes_transferred", &self.bytes_transferred())
            .field("content_length", &self.content_length())
            .finish()
    }
}
