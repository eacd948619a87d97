//! Pure decisions about requests and responses, free of I/O.

mod range;
mod retry;
mod validation;

pub use range::{accepts_byte_ranges, range_from};
pub use retry::retry_delay;
pub use validation::{PARTIAL_CONTENT, check_length, content_type_matches, status_accepted};
