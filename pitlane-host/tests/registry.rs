//! Registry behaviour: caching, concurrency, failure handling.

mod common;

use common::{fixtures, fixtures_with_latency, reference_request, registry, url};
use pitlane_core::fetch::MockFetcher;
use pitlane_host::prelude::*;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn get_is_idempotent() {
    let (registry, fetcher) = registry(fixtures());

    let first = registry.get(&url("buffer")).await.unwrap();
    let second = registry.get(&url("buffer")).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fetcher.request_count(), 1);
    assert_eq!(registry.len(), 1);
    assert!(first.is_initialized());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_gets_share_one_load() {
    let (registry, fetcher) = registry(fixtures_with_latency(Duration::from_millis(50)));
    let registry = Arc::new(registry);
    let target = url("pointer-f32");

    let gets = (0..8).map(|_| {
        let registry = Arc::clone(&registry);
        let target = target.clone();
        tokio::spawn(async move { registry.get(&target).await })
    });
    let adapters: Vec<_> = futures::future::join_all(gets)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(fetcher.request_count_for(&target), 1);
    for adapter in &adapters[1..] {
        assert!(Arc::ptr_eq(&adapters[0], adapter));
    }
}

#[tokio::test]
async fn failed_load_is_retried_by_waiting_caller() {
    let fetcher = MockFetcher::new()
        .on_url("/flaky\\.wasm$")
        .with_latency(Duration::from_millis(50))
        .times(1)
        .respond_status(503)
        .on_url("/flaky\\.wasm$")
        .respond_bytes(common::wasm(common::PACKED));
    let (registry, fetcher) = registry(fetcher);
    let target = url("flaky");

    let (first, second) = tokio::join!(registry.get(&target), registry.get(&target));
    let (failed, loaded) = match (first, second) {
        (Err(e), Ok(adapter)) | (Ok(adapter), Err(e)) => (e, adapter),
        other => panic!("expected one failure and one success, got {:?}", other),
    };
    assert_eq!(failed.code(), "E101");

    let cached = registry.cached(&target).expect("adapter cached after retry");
    assert!(Arc::ptr_eq(&cached, &loaded));

    let again = registry.get(&target).await.unwrap();
    assert!(Arc::ptr_eq(&again, &loaded));
    assert_eq!(fetcher.request_count_for(&target), 2);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn distinct_urls_are_independent() {
    let (registry, _) = registry(fixtures());

    let buffer = registry.get(&url("buffer")).await.unwrap();
    let packed = registry.get(&url("packed")).await.unwrap();

    assert!(!Arc::ptr_eq(&buffer, &packed));
    assert_eq!(buffer.variant(), Some(AdapterKind::BufferShared));
    assert_eq!(packed.variant(), Some(AdapterKind::ScalarPacked));
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn initialization_failure_is_not_cached() {
    let (registry, fetcher) = registry(fixtures());
    let target = url("no-abi");

    assert_eq!(registry.get(&target).await.unwrap_err().code(), "E301");
    assert!(registry.cached(&target).is_none());
    assert!(!registry.loader().is_cached(&target));

    assert_eq!(registry.get(&target).await.unwrap_err().code(), "E301");
    assert_eq!(fetcher.request_count_for(&target), 2);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn trap_does_not_poison_the_registry() {
    let (registry, fetcher) = registry(fixtures());

    let trapping = registry.get(&url("trapping")).await.unwrap();
    let err = trapping.decide(&reference_request()).unwrap_err();
    assert_eq!(err.code(), "E401");

    let again = registry.get(&url("trapping")).await.unwrap();
    assert!(Arc::ptr_eq(&trapping, &again));
    assert_eq!(fetcher.request_count_for(&url("trapping")), 1);

    let healthy = registry.get(&url("packed")).await.unwrap();
    assert!(healthy.decide(&reference_request()).unwrap().accelerate);
}

#[tokio::test]
async fn fuel_budget_stops_runaway_module() {
    let (registry, _) = registry(fixtures());

    let adapter = registry.get(&url("spinning")).await.unwrap();
    let err = adapter.decide(&reference_request()).unwrap_err();
    assert_eq!(err.code(), "E401");
    assert!(err.to_string().contains("fuel"));
}

#[tokio::test]
async fn load_failures_carry_their_code() {
    let (registry, _) = registry(fixtures());

    let missing = registry.get(&url("missing")).await.unwrap_err();
    assert_eq!(missing.code(), "E101");
    assert!(missing.is_retriable());

    let garbage = registry.get(&url("garbage")).await.unwrap_err();
    assert_eq!(garbage.code(), "E201");

    let unlinkable = registry.get(&url("unknown-import")).await.unwrap_err();
    assert_eq!(unlinkable.code(), "E202");
    assert!(unlinkable.to_string().contains("fopen"));

    assert!(registry.is_empty());
}

#[tokio::test]
async fn named_modules() {
    let (registry, _) = registry(fixtures());
    registry.register("rival", url("packed"));

    let by_name = registry.get_named("rival").await.unwrap();
    let by_url = registry.get(&url("packed")).await.unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_url));

    assert_eq!(registry.get_named("ghost").await.unwrap_err().code(), "E501");
}

#[tokio::test]
async fn configured_fixed_offset_applies_to_registry_adapters() {
    let config = HostConfig::testing()
        .with_adapter(AdapterConfig::default().with_fixed_output_offset(None));
    let (registry, _) = common::registry_with(config, fixtures());

    let err = registry.get(&url("pointer-fixed")).await.unwrap_err();
    assert_eq!(err.code(), "E301");

    // Modules with their own allocator are unaffected.
    registry.get(&url("pointer-f32")).await.unwrap();
}

#[tokio::test]
async fn loads_from_local_file() {
    let mut file = tempfile::Builder::new().suffix(".wasm").tempfile().unwrap();
    file.write_all(&common::wasm(common::PACKED)).unwrap();
    let path = file.path().to_string_lossy().into_owned();

    let registry = DecisionRegistry::from_config(&HostConfig::testing()).unwrap();
    let adapter = registry.get(&format!("file://{}", path)).await.unwrap();
    assert_eq!(adapter.variant(), Some(AdapterKind::ScalarPacked));
}

#[tokio::test]
async fn local_files_can_be_forbidden() {
    let mut file = tempfile::Builder::new().suffix(".wasm").tempfile().unwrap();
    file.write_all(&common::wasm(common::PACKED)).unwrap();
    let path = file.path().to_string_lossy().into_owned();

    let config =
        HostConfig::testing().with_loader(LoaderConfig::default().with_file_urls(false));
    let registry = DecisionRegistry::from_config(&config).unwrap();

    let err = registry.get(&format!("file://{}", path)).await.unwrap_err();
    assert_eq!(err.code(), "E101");
}
