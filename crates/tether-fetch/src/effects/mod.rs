//! I/O: the transport seam, the transfer state machine and resumption.

pub mod http;
pub mod resume;
pub mod transfer;

pub use http::{Response, Transport};
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
pub use resume::{DownloadReport, ResumableDownload};
pub use transfer::{READ_BUFFER_SIZE, Transfer, TransferState, USER_AGENT};
