//! Shared test support: stub providers, counting fetchers, and a recording
//! listener used by the scenario tests in `tests/`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use asset_core::asset::{Asset, AssetDesc};
use asset_core::fetch::{ManifestFetcher, MemoryManifestFetcher};
use asset_core::manifest::ManifestError;
use asset_core::provider::{AssetProvider, ProviderError};
use asset_runtime::package::{AssetListener, AssetPackage};
use async_trait::async_trait;
use bytes::Bytes;

/// Provider that succeeds unless the descriptor's uri is `"fail"`.
///
/// The payload is the descriptor name. Creation sleeps briefly so concurrent
/// loads genuinely interleave at the suspension point.
#[derive(Default)]
pub struct StubProvider {
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of construction attempts observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetProvider for StubProvider {
    async fn create_asset(&self, desc: &AssetDesc) -> Result<Asset, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        if desc.uri.as_deref() == Some("fail") {
            return Err(ProviderError::Failed {
                message: format!("stubbed failure for '{}'", desc.id),
            });
        }
        Ok(Asset::new(desc, Arc::new(desc.name.clone())))
    }
}

/// Fetcher that counts how many fetches reach the underlying documents.
pub struct CountingFetcher {
    inner: MemoryManifestFetcher,
    fetches: AtomicUsize,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self {
            inner: MemoryManifestFetcher::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Registers a manifest document under `uri`.
    pub fn insert(&self, uri: &str, document: impl Into<Bytes>) {
        self.inner.insert(uri, document);
    }

    /// Number of fetches issued so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for CountingFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestFetcher for CountingFetcher {
    async fn fetch(&self, uri: &str) -> anyhow::Result<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.inner.fetch(uri).await
    }
}

/// Listener that records every notification it receives.
#[derive(Default)]
pub struct RecordingListener {
    progress: Mutex<Vec<f32>>,
    completions: AtomicUsize,
    failures: Mutex<Vec<ManifestError>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Progress values in the order they were reported.
    pub fn progress(&self) -> Vec<f32> {
        self.progress.lock().expect("progress lock poisoned").clone()
    }

    /// Number of completion notifications received.
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Manifest failures in the order they were reported.
    pub fn failures(&self) -> Vec<ManifestError> {
        self.failures.lock().expect("failures lock poisoned").clone()
    }
}

impl AssetListener for RecordingListener {
    fn on_asset_progress(&self, progress: f32) {
        self.progress
            .lock()
            .expect("progress lock poisoned")
            .push(progress);
    }

    fn on_asset_load_complete(&self, _package: &AssetPackage) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_asset_load_failed(&self, error: &ManifestError) {
        self.failures
            .lock()
            .expect("failures lock poisoned")
            .push(error.clone());
    }
}

/// Builds a manifest document from `(id, type, uri)` entries.
pub fn manifest_doc(entries: &[(&str, &str, Option<&str>)]) -> String {
    let assets: Vec<serde_json::Value> = entries
        .iter()
        .map(|(id, asset_type, uri)| {
            serde_json::json!({
                "id": id,
                "name": format!("{} asset", id),
                "uri": uri,
                "type": asset_type,
            })
        })
        .collect();
    serde_json::json!({
        "metaData": { "content": "asset_package" },
        "assets": assets,
    })
    .to_string()
}
