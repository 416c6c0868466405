//! Local file fetcher for `file://` URLs and bare paths.

use super::{FetchError, FetchFuture, FetchResponse, ModuleFetcher};
use std::path::PathBuf;

/// Fetcher that reads modules from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher;

impl FileFetcher {
    /// Create a new file fetcher.
    pub fn new() -> Self {
        Self
    }

    /// Map a `file://` URL or bare path to a filesystem path.
    pub fn resolve(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

impl ModuleFetcher for FileFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let path = Self::resolve(url);
            let body = tokio::fs::read(&path).await.map_err(|e| FetchError::Io {
                path: path.display().to_string(),
                cause: e.to_string(),
            })?;
            Ok(FetchResponse::ok(body))
        })
    }

    fn is_mock(&self) -> bool {
        false
    }
}
