use std::fmt;

use url::Url;

use super::headers::Headers;

/// Request methods a transfer can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully assembled request as handed to a [`Transport`](crate::Transport).
///
/// All defaulting (user agent, content type, range) has already been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method:  Method,
    pub url:     Url,
    pub headers: Headers,
    pub body:    Option<Vec<u8>>,
}
