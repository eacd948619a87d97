use serde::{Deserialize, Serialize};

/// What a truncated transfer left behind, used to request the remainder.
///
/// Produced by [`Transfer::can_retry_partial`](crate::Transfer::can_retry_partial)
/// and handed to the next transfer through
/// [`Transfer::resume_from`](crate::Transfer::resume_from).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDownloadInfo {
    /// Length the peer advertised for the truncated response, if any.
    pub expected_length: Option<u64>,
    /// Bytes already written to the local sink.
    pub current_length:  u64,
}

impl PartialDownloadInfo {
    pub fn new(expected_length: Option<u64>, current_length: u64) -> Self {
        Self {
            expected_length,
            current_length,
        }
    }

    /// `Range` header value asking for everything after `current_length`.
    pub fn range_header(&self) -> String {
        crate::core::range_from(self.current_length)
    }
}
