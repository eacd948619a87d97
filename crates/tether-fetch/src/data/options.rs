use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::cancel::CancelToken;
use super::progress::Progress;

/// Client-wide settings for the production transport.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tether_fetch::TransportOptions;
///
/// let options = TransportOptions::default()
///     .connect_timeout(Duration::from_secs(5))
///     .follow_redirects(false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Time allowed for connecting, including the TLS handshake.
    ///
    /// Default: 15s
    pub connect_timeout: Duration,

    /// Time allowed for each read or write on an open connection.
    ///
    /// Default: 30s
    pub read_timeout: Duration,

    /// Whether redirects (HTTP and HTTP to HTTPS) are followed.
    ///
    /// Default: true
    pub follow_redirects: bool,

    /// Maximum redirects followed for one request.
    ///
    /// Default: 10
    pub max_redirects: usize,

    /// How long idle pooled connections are kept. `None` keeps the client default.
    pub pool_idle_timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout:   Duration::from_secs(15),
            read_timeout:      Duration::from_secs(30),
            follow_redirects:  true,
            max_redirects:     10,
            pool_idle_timeout: None,
        }
    }
}

impl TransportOptions {
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }
}

/// Progress callback invoked after every chunk written to a sink.
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Retry policy and request settings for
/// [`ResumableDownload`](crate::ResumableDownload).
#[derive(Clone)]
pub struct DownloadOptions {
    /// Maximum number of ranged attempts after the initial one.
    ///
    /// Default: 3
    pub max_retries: u32,

    /// Base delay for exponential backoff between attempts.
    ///
    /// The delay before retry N (0-indexed) is `retry_backoff * 2^N`.
    ///
    /// Default: 100ms
    pub retry_backoff: Duration,

    /// Headers sent with every attempt.
    pub headers: Arc<[(String, String)]>,

    /// Status codes accepted for a full response. 206 is added implicitly
    /// on ranged attempts.
    ///
    /// Default: `[200]`
    pub expected_codes: Arc<[u16]>,

    pub cancel: Option<CancelToken>,

    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("headers", &self.headers)
            .field("expected_codes", &self.expected_codes)
            .field("cancel", &self.cancel)
            .field("on_progress", &"{ ... }")
            .finish()
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            max_retries:    3,
            retry_backoff:  Duration::from_millis(100),
            headers:        Arc::new([]),
            expected_codes: Arc::new([200u16]),
            cancel:         None,
            on_progress:    None,
        }
    }
}

impl DownloadOptions {
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// Add a single header to every attempt.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers: Vec<_> = self.headers.iter().cloned().collect();
        headers.push((key.into(), value.into()));
        self.headers = Arc::from(headers);
        self
    }

    #[must_use]
    pub fn expected_codes(mut self, codes: &[u16]) -> Self {
        self.expected_codes = Arc::from(codes);
        self
    }

    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}
