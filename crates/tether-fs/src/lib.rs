//! Filesystem sink primitives used by tether transfers.
//!
//! - [`open_sink`] opens a download destination, either truncating it or
//!   appending to what an earlier attempt left behind.
//! - [`atomic_write`] places a fully buffered payload through a temporary
//!   sibling file and a rename.
//!
//! Parent directories are created on demand by both.

mod atomic;
mod error;
mod sink;

pub use atomic::{AtomicWriteOptions, atomic_write};
pub use error::{Error, Result};
pub use sink::{SinkMode, ensure_parent, open_sink};
