use std::fmt;
use std::io::Read;

use crate::data::{Headers, Request};

/// A response as produced by a [`Transport`].
pub struct Response {
    pub status:         u16,
    pub headers:        Headers,
    /// Declared body length, `None` when absent (e.g. chunked encoding).
    pub content_length: Option<u64>,
    /// Body reader. `None` means the response carries no body.
    pub body:           Option<Box<dyn Read + Send>>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            content_length: None,
            body: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    #[must_use]
    pub fn content_length(mut self, len: Option<u64>) -> Self {
        self.content_length = len;
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Read + Send + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .field("body", &self.body.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

/// Blocking HTTP transport shared by many transfers.
///
/// Implementations own connection pooling, TLS and redirect following, and
/// must be safe to use from several threads at once.
///
/// # Implementations
///
/// - [`ReqwestTransport`]: production implementation using `reqwest`
/// - Mock implementations for testing
pub trait Transport: Send + Sync {
    /// Error type for connect, send and header read failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends `request` and returns once the response headers are read.
    ///
    /// The body is left unread for the caller to stream.
    fn send(&self, request: Request) -> Result<Response, Self::Error>;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::sync::Arc;

    use once_cell::sync::OnceCell;
    use reqwest::blocking::Client;
    use reqwest::redirect::Policy;

    use super::*;
    use crate::data::{Method, TransportOptions};
    use crate::error::{Error, Result};

    /// Production transport backed by a pooled blocking `reqwest` client.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        /// Create a transport with default [`TransportOptions`].
        pub fn new() -> Result<Self> {
            Self::with_options(&TransportOptions::default())
        }

        pub fn with_options(options: &TransportOptions) -> Result<Self> {
            let redirect = if options.follow_redirects {
                Policy::limited(options.max_redirects)
            } else {
                Policy::none()
            };

            let mut builder = Client::builder()
                .connect_timeout(options.connect_timeout)
                .timeout(options.read_timeout)
                .redirect(redirect);
            if let Some(idle) = options.pool_idle_timeout {
                builder = builder.pool_idle_timeout(idle);
            }

            let client = builder.build().map_err(|e| Error::Network(Box::new(e)))?;
            Ok(Self { client })
        }

        /// The process-wide transport, built with defaults on first use.
        ///
        /// It lives until process exit so every transfer shares one
        /// connection pool.
        pub fn shared() -> Result<Arc<Self>> {
            static SHARED: OnceCell<Arc<ReqwestTransport>> = OnceCell::new();
            SHARED
                .get_or_try_init(|| Self::new().map(Arc::new))
                .map(Arc::clone)
        }
    }

    impl Transport for ReqwestTransport {
        type Error = reqwest::Error;

        fn send(&self, request: Request) -> std::result::Result<Response, Self::Error> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
            };

            let mut builder = self.client.request(method, request.url);
            for (name, value) in request.headers.iter() {
                builder = builder.header(name, value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send()?;

            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();

            Ok(Response {
                status: response.status().as_u16(),
                headers,
                content_length: response.content_length(),
                body: Some(Box::new(response)),
            })
        }
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;
