//! Integration tests for the HTTP module fetcher.
//!
//! These tests run the hyper-based fetcher against a local wiremock server.

use pitlane_core::fetch::{DefaultFetcher, FetchError, HttpFetcher, ModuleFetcher};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WASM_HEADER: &[u8] = b"\0asm\x01\0\0\0";

#[tokio::test]
async fn fetch_returns_body_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/rival.wasm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(WASM_HEADER))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new();
    let url = format!("{}/ai/rival.wasm", server.uri());
    let response = fetcher.fetch(&url).await.expect("fetch failed");

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(response.body, WASM_HEADER);
}

#[tokio::test]
async fn fetch_reports_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new();
    let url = format!("{}/missing.wasm", server.uri());
    let response = fetcher.fetch(&url).await.expect("transport failed");

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(WASM_HEADER)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_timeout(Duration::from_millis(50));
    let url = format!("{}/slow.wasm", server.uri());
    let result = fetcher.fetch(&url).await;

    assert!(matches!(result, Err(FetchError::Timeout)));
}

#[tokio::test]
async fn default_fetcher_routes_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.wasm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(WASM_HEADER))
        .mount(&server)
        .await;

    let fetcher = DefaultFetcher::default();
    let response = fetcher
        .fetch(&format!("{}/a.wasm", server.uri()))
        .await
        .expect("fetch failed");

    assert_eq!(response.body, WASM_HEADER);
    assert!(!fetcher.is_mock());
}

#[tokio::test]
async fn https_urls_open_a_tls_connection() {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("https://{}/ai.wasm", listener.local_addr().unwrap());

    let fetch = tokio::spawn(async move {
        HttpFetcher::with_timeout(Duration::from_secs(2))
            .fetch(&url)
            .await
            .map(|r| r.status)
    });

    let (mut stream, _) = tokio::time::timeout(Duration::from_secs(2), listener.accept())
        .await
        .expect("no connection attempted")
        .unwrap();

    // TLS handshake record.
    let mut first = [0u8; 1];
    stream.read_exact(&mut first).await.unwrap();
    assert_eq!(first[0], 0x16);

    drop(stream);
    assert!(fetch.await.unwrap().is_err());
}
