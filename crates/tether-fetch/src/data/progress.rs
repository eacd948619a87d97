use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Point-in-time view of a transfer's byte counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Bytes written to the sink by this transfer.
    pub bytes_transferred: u64,

    /// Length the peer advertised for the current response.
    ///
    /// For a ranged request this is the remaining length, not the length of
    /// the whole resource. `None` when the peer sent no `Content-Length`.
    pub content_length: Option<u64>,
}

impl Progress {
    /// Completed fraction in `[0, 1]`, or `None` when the length is unknown.
    ///
    /// An empty body reports `1.0`.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        self.content_length.map(|total| {
            if total == 0 {
                1.0
            } else {
                (self.bytes_transferred as f64 / total as f64).min(1.0)
            }
        })
    }

    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.fraction().map(|f| f * 100.0)
    }
}

const UNKNOWN_LENGTH: i64 = -1;

#[derive(Debug)]
struct Counters {
    transferred:    AtomicU64,
    content_length: AtomicI64,
}

/// Cloneable, lock-free reader of a running transfer's progress.
///
/// The transfer is the single writer. Readers on other threads may see a
/// slightly stale count but never a torn one.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    counters: Arc<Counters>,
}

impl Default for ProgressHandle {
    fn default() -> Self {
        Self {
            counters: Arc::new(Counters {
                transferred:    AtomicU64::new(0),
                content_length: AtomicI64::new(UNKNOWN_LENGTH),
            }),
        }
    }
}

impl ProgressHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, n: u64) -> u64 {
        self.counters.transferred.fetch_add(n, Ordering::Release) + n
    }

    pub(crate) fn set_content_length(&self, len: Option<u64>) {
        let raw = len
            .and_then(|l| i64::try_from(l).ok())
            .unwrap_or(UNKNOWN_LENGTH);
        self.counters.content_length.store(raw, Ordering::Release);
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.counters.transferred.load(Ordering::Acquire)
    }

    pub fn content_length(&self) -> Option<u64> {
        u64::try_from(self.counters.content_length.load(Ordering::Acquire)).ok()
    }

    pub fn snapshot(&self) -> Progress {
        Progress {
            bytes_transferred: self.bytes_transferred(),
            content_length:    self.content_length(),
        }
    }

    /// See [`Progress::fraction`].
    pub fn progress(&self) -> Option<f64> {
        self.snapshot().fraction()
    }
}
