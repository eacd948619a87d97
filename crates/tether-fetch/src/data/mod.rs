//! Immutable configuration and value types.

pub mod cancel;
pub mod form;
pub mod headers;
pub mod options;
pub mod partial;
pub mod progress;
pub mod request;
pub mod response;

pub use cancel::CancelToken;
pub use form::Form;
pub use headers::Headers;
pub use options::{DownloadOptions, TransportOptions};
pub use partial::PartialDownloadInfo;
pub use progress::{Progress, ProgressHandle};
pub use request::{Method, Request};
pub use response::BufferedResponse;
