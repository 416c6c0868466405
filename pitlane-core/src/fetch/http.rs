//! HTTP(S) fetcher built on hyper.

use super::{FetchError, FetchFuture, FetchResponse, ModuleFetcher};
use std::time::Duration;

/// Fetcher that issues a `GET` for each module URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Request timeout duration.
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a new fetcher with a default 30 second timeout.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }

    /// Create with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        let timeout = self.timeout;

        Box::pin(async move {
            use bytes::Bytes;
            use http_body_util::{BodyExt, Empty};
            use hyper::{Method, Request};
            use hyper_rustls::HttpsConnectorBuilder;
            use hyper_util::client::legacy::Client;
            use hyper_util::rt::TokioExecutor;

            let uri = url
                .parse::<hyper::Uri>()
                .map_err(|e| FetchError::Other(format!("Invalid URL: {}", e)))?;

            let request = Request::builder()
                .method(Method::GET)
                .uri(uri)
                .header(http::header::ACCEPT, "application/wasm")
                .body(Empty::<Bytes>::new())
                .map_err(|e| FetchError::Other(format!("Failed to build request: {}", e)))?;

            let https = HttpsConnectorBuilder::new()
                .with_webpki_roots()
                .https_or_http()
                .enable_http1()
                .enable_http2()
                .build();
            let client = Client::builder(TokioExecutor::new()).build(https);

            let response = tokio::time::timeout(timeout, client.request(request))
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(|e| FetchError::ConnectionFailed(e.to_string()))?;

            let status = response.status().as_u16();

            let body = tokio::time::timeout(timeout, response.into_body().collect())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(|e| FetchError::Other(format!("Failed to read response body: {}", e)))?
                .to_bytes()
                .to_vec();

            tracing::debug!(url = %url, status, bytes = body.len(), "Fetched module");

            Ok(FetchResponse { status, body })
        })
    }

    fn is_mock(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_configuration() {
        assert_eq!(HttpFetcher::new().timeout(), Duration::from_secs(30));
        assert_eq!(
            HttpFetcher::with_timeout(Duration::from_millis(250)).timeout(),
            Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let fetcher = HttpFetcher::new();
        let result = fetcher.fetch("http://exa mple.com/ai.wasm").await;
        assert!(matches!(result, Err(FetchError::Other(_))));
    }
}
