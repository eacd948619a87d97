//! Error types for tether-fetch.

use std::io;
use thiserror::Error;

/// Boxed error from a transport or codec.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// An operation was invoked out of sequence.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("did not get expected response code, got {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("did not get expected content type '{expected}', instead got '{actual}'")]
    UnexpectedContentType { expected: String, actual: String },

    #[error("connection closed with {transferred} bytes transferred, expected {expected}")]
    TruncatedTransfer { transferred: u64, expected: u64 },

    #[error("transfer cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(#[source] BoxError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode {format} payload: {source}")]
    Encoding {
        format: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("failed to decode {format} payload: {source}")]
    Decoding {
        format: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Fs(#[from] tether_fs::Error),
}

impl Error {
    /// Returns `true` for failures a later ranged attempt may get past.
    ///
    /// Status, content type and state errors describe the peer or the caller
    /// and will repeat, so they are not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Io(_) | Error::TruncatedTransfer { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(Error::Io(io::Error::other("reset")).is_retryable());
        assert!(Error::TruncatedTransfer { transferred: 3, expected: 5 }.is_retryable());
        assert!(Error::Network("refused".into()).is_retryable());
    }

    #[test]
    fn test_error_not_retryable() {
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::InvalidState("already executed").is_retryable());
        assert!(
            !Error::UnexpectedStatus { status: 404, url: "http://x/".into() }.is_retryable()
        );
    }

    #[test]
    fn test_messages_name_the_details() {
        let err = Error::UnexpectedStatus { status: 404, url: "http://example.com/a".into() };
        assert_eq!(
            err.to_string(),
            "did not get expected response code, got 404 for http://example.com/a"
        );

        let err = Error::TruncatedTransfer { transferred: 3, expected: 5 };
        assert_eq!(
            err.to_string(),
            "connection closed with 3 bytes transferred, expected 5"
        );
    }
}
