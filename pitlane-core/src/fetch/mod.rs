//! Module fetching.
//!
//! The loader never talks to the network or filesystem directly; it asks a
//! [`ModuleFetcher`] for the bytes behind a URL. Production code uses
//! [`DefaultFetcher`], which routes by scheme, while tests inject a
//! [`MockFetcher`] with canned responses.

mod file;
mod http;
mod mock;

use std::future::Future;
use std::pin::Pin;

pub use file::FileFetcher;
pub use http::HttpFetcher;
pub use mock::{FetchRecord, MockFetcher, MockFetcherBuilder, MockFetchRule};

/// Boxed future returned by [`ModuleFetcher::fetch`].
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<FetchResponse, FetchError>> + Send + 'a>>;

/// Raw response from a fetcher.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Status code. File fetches report 200.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Create a new response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A 200 response carrying `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Error type for fetch operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// The URL scheme is not handled by this fetcher.
    #[error("Unsupported URL scheme in '{0}'")]
    UnsupportedScheme(String),
    /// Reading a local module file failed.
    #[error("Failed to read '{path}': {cause}")]
    Io {
        /// The local path.
        path: String,
        /// Underlying I/O error.
        cause: String,
    },
    /// No mock rule matched.
    #[error("No mock rule matched for {url}")]
    NoMockMatch {
        /// The requested URL.
        url: String,
    },
    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Provider trait for retrieving module bytes.
pub trait ModuleFetcher: Send + Sync {
    /// Fetch the resource behind `url`.
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;

    /// Check if this is a mock provider.
    fn is_mock(&self) -> bool;
}

/// Fetcher that dispatches on the URL scheme.
///
/// `http://` and `https://` go to [`HttpFetcher`]. `file://` URLs and bare
/// paths go to [`FileFetcher`] when local files are allowed.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    http: HttpFetcher,
    file: Option<FileFetcher>,
}

impl DefaultFetcher {
    /// Create a fetcher for HTTP(S) and, if `allow_files`, local files.
    pub fn new(http: HttpFetcher, allow_files: bool) -> Self {
        Self {
            http,
            file: allow_files.then(FileFetcher::new),
        }
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new(HttpFetcher::default(), true)
    }
}

impl ModuleFetcher for DefaultFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        if is_http_url(url) {
            return self.http.fetch(url);
        }
        match &self.file {
            Some(file) if !url.contains("://") || url.starts_with("file://") => file.fetch(url),
            _ => Box::pin(async move { Err(FetchError::UnsupportedScheme(url.to_string())) }),
        }
    }

    fn is_mock(&self) -> bool {
        false
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
