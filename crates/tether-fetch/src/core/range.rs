/// `Range` header value requesting everything from `offset` to the end.
///
/// # Examples
///
/// ```
/// use tether_fetch::core::range_from;
///
/// assert_eq!(range_from(0), "bytes=0-");
/// assert_eq!(range_from(4096), "bytes=4096-");
/// ```
pub fn range_from(offset: u64) -> String {
    format!("bytes={offset}-")
}

/// Returns `true` if an `Accept-Ranges` value advertises byte ranges.
///
/// Only the exact token `bytes` counts; `none` or a missing header do not.
pub fn accepts_byte_ranges(accept_ranges: Option<&str>) -> bool {
    accept_ranges == Some("bytes")
}
