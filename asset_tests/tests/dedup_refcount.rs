//! Cross-package deduplication and ref-counted teardown scenarios.

use std::sync::Arc;

use asset_core::asset::AssetDesc;
use asset_runtime::registry::PackageRegistry;
use asset_tests::{manifest_doc, CountingFetcher, RecordingListener, StubProvider};

fn registry_with(fetcher: Arc<CountingFetcher>) -> (PackageRegistry, Arc<StubProvider>) {
    let registry = PackageRegistry::new(fetcher);
    let provider = Arc::new(StubProvider::new());
    registry
        .register_provider("texture", provider.clone())
        .expect("register provider");
    (registry, provider)
}

#[tokio::test]
async fn shared_asset_survives_first_unload() -> anyhow::Result<()> {
    let fetcher = Arc::new(CountingFetcher::new());
    fetcher.insert(
        "a.json",
        manifest_doc(&[("shared", "texture", None), ("a_only", "texture", None)]),
    );
    fetcher.insert(
        "b.json",
        manifest_doc(&[("shared", "texture", None), ("b_only", "texture", None)]),
    );
    let (registry, provider) = registry_with(fetcher);

    registry.load_package("a.json", RecordingListener::new()).await;
    registry.load_package("b.json", RecordingListener::new()).await;

    // "shared" was constructed once and is held by both packages.
    assert_eq!(provider.calls(), 3);
    let shared = registry.factory().get_asset("shared").expect("shared cached");
    assert_eq!(shared.package_ref_count(), 2);

    assert!(registry.unload_package("a.json"));
    assert!(registry.factory().get_asset("a_only").is_none());
    assert!(registry.factory().get_asset("shared").is_some());
    assert_eq!(shared.package_ref_count(), 1);

    assert!(registry.unload_package("b.json"));
    assert!(registry.factory().get_asset("shared").is_none());
    assert!(registry.factory().get_asset("b_only").is_none());
    assert_eq!(registry.factory().asset_count(), 0);
    assert_eq!(registry.package_count(), 0);

    Ok(())
}

#[tokio::test]
async fn unload_unknown_uri_has_no_side_effects() {
    let fetcher = Arc::new(CountingFetcher::new());
    fetcher.insert("pkg.json", manifest_doc(&[("a1", "texture", None)]));
    let (registry, _provider) = registry_with(fetcher);

    registry.load_package("pkg.json", RecordingListener::new()).await;

    assert!(!registry.unload_package("other.json"));
    assert_eq!(registry.package_count(), 1);
    assert_eq!(registry.factory().asset_count(), 1);
}

#[tokio::test]
async fn reload_after_unload_refetches() {
    let fetcher = Arc::new(CountingFetcher::new());
    fetcher.insert("pkg.json", manifest_doc(&[("a1", "texture", None)]));
    let (registry, provider) = registry_with(fetcher.clone());

    registry.load_package("pkg.json", RecordingListener::new()).await;
    assert!(registry.unload_package("pkg.json"));
    assert!(registry.factory().get_asset("a1").is_none());

    let listener = RecordingListener::new();
    let package = registry.load_package("pkg.json", listener.clone()).await;

    assert_eq!(listener.completions(), 1);
    assert_eq!(fetcher.fetches(), 2);
    assert_eq!(provider.calls(), 2);
    assert_eq!(package.asset_count(), 1);
    assert_eq!(
        registry.factory().get_asset("a1").unwrap().package_ref_count(),
        1
    );
}

#[tokio::test]
async fn duplicate_manifest_entries_are_counted_twice() {
    let fetcher = Arc::new(CountingFetcher::new());
    fetcher.insert(
        "pkg.json",
        manifest_doc(&[("dup", "texture", None), ("dup", "texture", None)]),
    );
    let (registry, provider) = registry_with(fetcher);

    registry.load_package("pkg.json", RecordingListener::new()).await;

    // The second entry is a cache hit, but the package holds two references.
    assert_eq!(provider.calls(), 1);
    let dup = registry.factory().get_asset("dup").expect("dup cached");
    assert_eq!(dup.package_ref_count(), 2);

    assert!(registry.unload_package("pkg.json"));
    assert!(registry.factory().get_asset("dup").is_none());
}

#[tokio::test]
async fn concurrent_create_asset_calls_coalesce() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (registry, provider) = registry_with(fetcher);
    let factory = registry.factory();

    let desc = AssetDesc {
        id: "shared".to_string(),
        name: "Shared asset".to_string(),
        uri: None,
        asset_type: "texture".to_string(),
    };

    let (first, second) = tokio::join!(factory.create_asset(&desc), factory.create_asset(&desc));
    let first = first.expect("first create");
    let second = second.expect("second create");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.calls(), 1);
    assert_eq!(factory.asset_count(), 1);
}

#[tokio::test]
async fn concurrent_create_asset_failures_reach_every_caller() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (registry, provider) = registry_with(fetcher);
    let factory = registry.factory();

    let desc = AssetDesc {
        id: "broken".to_string(),
        name: "Broken asset".to_string(),
        uri: Some("fail".to_string()),
        asset_type: "texture".to_string(),
    };

    let (first, second) = tokio::join!(factory.create_asset(&desc), factory.create_asset(&desc));

    assert!(first.is_err());
    assert!(second.is_err());
    assert_eq!(first.err(), second.err());
    assert_eq!(provider.calls(), 1);
    assert!(factory.get_asset("broken").is_none());
}
