//! Single-use HTTP transfers with response validation, progress tracking and
//! byte-range resumption.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and value types
//! - [`core`] - Pure decisions (status and content-type checks, ranges, backoff)
//! - [`effects`] - I/O behind the [`Transport`] trait
//!
//! # Key Features
//!
//! - **One-shot**: a [`Transfer`] executes once and moves
//!   Unexecuted -> Executed -> Closed
//! - **Truncation detection**: byte counts are checked against `Content-Length`
//! - **Resumption**: [`Transfer::can_retry_partial`] tells the caller when a
//!   ranged retry is possible; [`ResumableDownload`] packages that loop
//! - **Mechanism-only**: the transfer itself never retries

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use data::{
    BufferedResponse, CancelToken, DownloadOptions, Form, Headers, Method, PartialDownloadInfo,
    Progress, ProgressHandle, Request, TransportOptions,
};
pub use effects::{
    DownloadReport, READ_BUFFER_SIZE, ResumableDownload, Response, Transfer, TransferState,
    Transport, USER_AGENT,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;

pub use error::{BoxError, Error, Result};

pub use url::Url;

/// Parses an absolute URL.
///
/// # Examples
///
/// ```
/// assert!(tether_fetch::url("https://example.com/a.jar").is_ok());
/// assert!(tether_fetch::url("not a url").is_err());
/// ```
pub fn url(input: &str) -> Result<Url> {
    Url::parse(input).map_err(|source| Error::InvalidUrl {
        url: input.to_string(),
        source,
    })
}
