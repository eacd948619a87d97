/// HTTP status for a server honoring a `Range` request.
pub const PARTIAL_CONTENT: u16 = 206;

/// Returns `true` if `status` satisfies the caller's expectation.
///
/// A ranged request also accepts 206 even when the caller did not list it.
///
/// # Examples
///
/// ```
/// use tether_fetch::core::status_accepted;
///
/// assert!(status_accepted(200, &[200], false));
/// assert!(status_accepted(206, &[200], true));
/// assert!(!status_accepted(206, &[200], false));
/// ```
pub fn status_accepted(status: u16, expected: &[u16], resumed: bool) -> bool {
    expected.contains(&status) || (resumed && status == PARTIAL_CONTENT)
}

/// Returns `true` if `actual` starts with any of `expected`.
///
/// Prefix matching lets `application/json` accept
/// `application/json; charset=utf-8`.
pub fn content_type_matches(actual: &str, expected: &[&str]) -> bool {
    expected.iter().any(|e| actual.starts_with(e))
}

/// Compares bytes written against the advertised length.
///
/// Returns `Some((transferred, expected))` on a mismatch. Resumed transfers
/// and responses without a length are never checked: a ranged response only
/// advertises the remainder, so the caller owns the aggregate check.
pub fn check_length(
    transferred: u64,
    content_length: Option<u64>,
    resumed: bool,
) -> Option<(u64, u64)> {
    match content_length {
        Some(expected) if !resumed && expected != transferred => Some((transferred, expected)),
        _ => None,
    }
}
