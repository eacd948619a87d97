//! Caller-side resumption built on [`Transfer::can_retry_partial`].
//!
//! A [`Transfer`] never retries on its own. [`ResumableDownload`] runs the
//! loop a launcher needs for large files: attempt, ask the failed transfer
//! whether the peer supports byte ranges, and continue with a ranged request
//! from the offset accumulated across all attempts so far.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};
use url::Url;

use crate::core::{PARTIAL_CONTENT, retry_delay};
use crate::data::{DownloadOptions, PartialDownloadInfo};
use crate::effects::http::Transport;
use crate::effects::transfer::Transfer;
use crate::error::{Error, Result};

/// Outcome of a completed [`ResumableDownload::download`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    /// Bytes in the destination file that came from this download.
    pub bytes_written:   u64,
    /// Full length advertised by the last full (non-ranged) response.
    pub expected_length: Option<u64>,
    /// Number of requests made, including the first.
    pub attempts:        u32,
}

/// Downloads a URL to a file, resuming with ranged requests after failures.
pub struct ResumableDownload<T: Transport> {
    transport: Arc<T>,
    options:   DownloadOptions,
}

impl<T: Transport> ResumableDownload<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            options: DownloadOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Downloads `url` into `destination`.
    ///
    /// Retries only when the failure is retryable and the failed response
    /// advertised `Accept-Ranges: bytes`. A transport failure with no
    /// response at all is retried with the previous request, ranged or not.
    /// The final byte count is checked against the full length, which covers
    /// the last ranged segment that a single resumed [`Transfer`] does not
    /// check.
    pub fn download(&self, url: &Url, destination: &Path) -> Result<DownloadReport> {
        let mut resume: Option<PartialDownloadInfo> = None;
        let mut expected_length: Option<u64> = None;
        let mut retries = 0u32;

        loop {
            if self.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let mut transfer = self.build(url, resume);
            let outcome = self.attempt(&mut transfer, destination);

            // A 206 continued the file; any other response rewrote it from
            // the start and carries the full length.
            let continued = transfer.status() == Some(PARTIAL_CONTENT) && transfer.is_resumed();
            let offset = if continued {
                resume.map_or(0, |r| r.current_length)
            } else {
                if transfer.is_connected() {
                    expected_length = transfer.content_length();
                }
                0
            };
            let written = offset + transfer.bytes_transferred();

            let err = match outcome {
                Ok(()) => return self.finish(url, written, expected_length, retries + 1),
                Err(err) => err,
            };

            if !err.is_retryable() || retries >= self.options.max_retries {
                warn!(url = %url, error = %err, attempts = retries + 1, "download failed");
                return Err(err);
            }
            // Without a response nothing new reached the file, so the same
            // request is repeated from the offset already held.
            if transfer.is_connected() {
                if transfer.can_retry_partial().is_none() {
                    debug!(url = %url, "peer does not accept byte ranges, giving up");
                    return Err(err);
                }
                resume = Some(PartialDownloadInfo::new(expected_length, written));
            }
            let delay = retry_delay(retries, self.options.retry_backoff);
            retries += 1;
            info!(
                url = %url,
                error = %err,
                offset = resume.map_or(0, |r| r.current_length),
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                "resuming download"
            );
            thread::sleep(delay);
        }
    }

    fn build(&self, url: &Url, resume: Option<PartialDownloadInfo>) -> Transfer<T> {
        let mut transfer = Transfer::get(Arc::clone(&self.transport), url.clone());
        for (key, value) in self.options.headers.iter() {
            transfer = transfer.header(key.as_str(), value.as_str());
        }
        if let Some(token) = &self.options.cancel {
            transfer = transfer.cancel_token(token.clone());
        }
        if let Some(callback) = &self.options.on_progress {
            transfer = transfer.on_progress(Arc::clone(callback));
        }
        if let Some(info) = resume {
            transfer = transfer.resume_from(info);
        }
        transfer
    }

    fn attempt(&self, transfer: &mut Transfer<T>, destination: &Path) -> Result<()> {
        transfer
            .execute()?
            .expect_response_code(&self.options.expected_codes)?
            .save_content_to(destination)?;
        Ok(())
    }

    fn finish(
        &self,
        url: &Url,
        written: u64,
        expected_length: Option<u64>,
        attempts: u32,
    ) -> Result<DownloadReport> {
        match expected_length {
            Some(expected) if expected != written => {
                warn!(url = %url, written, expected, "resumed download has wrong length");
                Err(Error::TruncatedTransfer {
                    transferred: written,
                    expected,
                })
            }
            _ => {
                debug!(url = %url, written, attempts, "download complete");
                Ok(DownloadReport {
                    bytes_written: written,
                    expected_length,
                    attempts,
                })
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.options.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};
    use std::sync::Mutex;
    use std::time::Duration;

    use tempfile::tempdir;

    use crate::data::{CancelToken, Request};
    use crate::effects::http::Response;

    /// Serves `content`, cutting each response short after `cut` bytes until
    /// the scripted cuts run out.
    struct FlakyServer {
        content:       &'static [u8],
        cuts:          Mutex<Vec<usize>>,
        accept_ranges: bool,
        honor_ranges:  bool,
        /// Request indices that fail before any response.
        refuse:        Vec<usize>,
        ranges:        Mutex<Vec<Option<String>>>,
    }

    impl FlakyServer {
        fn new(content: &'static [u8], cuts: Vec<usize>) -> Self {
            Self {
                content,
                cuts: Mutex::new(cuts),
                accept_ranges: true,
                honor_ranges: true,
                refuse: Vec::new(),
                ranges: Mutex::new(Vec::new()),
            }
        }

        fn ranges(&self) -> Vec<Option<String>> {
            self.ranges.lock().unwrap().clone()
        }
    }

    /// Returns at most `limit` bytes, then reports a reset connection.
    struct CutBody {
        inner: Cursor<&'static [u8]>,
        left:  Option<usize>,
    }

    impl Read for CutBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.left {
                Some(0) => Err(io::Error::from(io::ErrorKind::ConnectionReset)),
                Some(left) => {
                    let max = left.min(buf.len());
                    let n = self.inner.read(&mut buf[..max])?;
                    self.left = Some(left - n);
                    Ok(n)
                }
                None => self.inner.read(buf),
            }
        }
    }

    impl Transport for FlakyServer {
        type Error = io::Error;

        fn send(&self, request: Request) -> std::result::Result<Response, io::Error> {
            let range = request.headers.get("Range").map(str::to_string);
            let index = {
                let mut ranges = self.ranges.lock().unwrap();
                ranges.push(range.clone());
                ranges.len() - 1
            };
            if self.refuse.contains(&index) {
                return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
            }

            let offset = match (&range, self.honor_ranges) {
                (Some(r), true) => r
                    .trim_start_matches("bytes=")
                    .trim_end_matches('-')
                    .parse::<usize>()
                    .unwrap(),
                _ => 0,
            };
            let status = if offset > 0 { 206 } else { 200 };
            let remaining = &self.content[offset..];

            let mut cuts = self.cuts.lock().unwrap();
            let left = if cuts.is_empty() { None } else { Some(cuts.remove(0)) };

            let mut response = Response::new(status)
                .content_length(Some(remaining.len() as u64))
                .body(CutBody {
                    inner: Cursor::new(remaining),
                    left,
                });
            if self.accept_ranges {
                response = response.header("Accept-Ranges", "bytes");
            }
            Ok(response)
        }
    }

    fn options() -> DownloadOptions {
        DownloadOptions::default().retry_backoff(Duration::ZERO)
    }

    fn url() -> Url {
        Url::parse("http://example.com/assets/pack.zip").unwrap()
    }

    #[test]
    fn test_download_without_failures() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pack.zip");
        let server = Arc::new(FlakyServer::new(b"hello world", vec![]));

        let report = ResumableDownload::new(Arc::clone(&server))
            .with_options(options())
            .download(&url(), &dest)
            .unwrap();

        assert_eq!(report.bytes_written, 11);
        assert_eq!(report.expected_length, Some(11));
        assert_eq!(report.attempts, 1);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert_eq!(server.ranges(), vec![None]);
    }

    #[test]
    fn test_resume_accumulates_offset_across_attempts() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pack.zip");
        let server = Arc::new(FlakyServer::new(b"hello world", vec![3, 4]));

        let report = ResumableDownload::new(Arc::clone(&server))
            .with_options(options())
            .download(&url(), &dest)
            .unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.bytes_written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert_eq!(
            server.ranges(),
            vec![None, Some("bytes=3-".to_string()), Some("bytes=7-".to_string())]
        );
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pack.zip");
        let server = Arc::new(FlakyServer::new(b"hello world", vec![1, 1, 1]));

        let err = ResumableDownload::new(Arc::clone(&server))
            .with_options(options().max_retries(2))
            .download(&url(), &dest)
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(server.ranges().len(), 3);
    }

    #[test]
    fn test_refused_ranged_retry_keeps_offset() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pack.zip");
        let mut server = FlakyServer::new(b"hello world", vec![3]);
        server.refuse = vec![1];
        let server = Arc::new(server);

        let report = ResumableDownload::new(Arc::clone(&server))
            .with_options(options())
            .download(&url(), &dest)
            .unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.bytes_written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert_eq!(
            server.ranges(),
            vec![None, Some("bytes=3-".to_string()), Some("bytes=3-".to_string())]
        );
    }

    #[test]
    fn test_refused_first_request_is_retried() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pack.zip");
        let mut server = FlakyServer::new(b"hello", vec![]);
        server.refuse = vec![0];
        let server = Arc::new(server);

        let report = ResumableDownload::new(Arc::clone(&server))
            .with_options(options())
            .download(&url(), &dest)
            .unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(server.ranges(), vec![None, None]);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }

    #[test]
    fn test_no_retry_without_accept_ranges() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pack.zip");
        let mut server = FlakyServer::new(b"hello world", vec![3]);
        server.accept_ranges = false;
        let server = Arc::new(server);

        let err = ResumableDownload::new(Arc::clone(&server))
            .with_options(options())
            .download(&url(), &dest)
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(server.ranges().len(), 1);
    }

    #[test]
    fn test_full_response_to_ranged_request_restarts_accounting() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pack.zip");
        let mut server = FlakyServer::new(b"hello world", vec![3]);
        server.honor_ranges = false;
        let server = Arc::new(server);

        let report = ResumableDownload::new(Arc::clone(&server))
            .with_options(options())
            .download(&url(), &dest)
            .unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.bytes_written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempdir().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let server = Arc::new(FlakyServer::new(b"hello", vec![]));

        let err = ResumableDownload::new(Arc::clone(&server))
            .with_options(options().cancel_token(token))
            .download(&url(), &dir.path().join("x"))
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(server.ranges().is_empty());
    }
}
