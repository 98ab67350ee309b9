//! Package load state machine.
//!
//! A package owns one manifest's load cycle: fetch, validate, sequential
//! per-asset creation, completion. Per-asset failures are aggregated and
//! never abort the remaining manifest; manifest-level failures abort the load
//! and are delivered to every pending listener. Unloading releases the
//! package's reference on each owned asset and evicts assets whose count
//! reaches zero.

use std::sync::{Arc, Mutex, MutexGuard};

use asset_core::asset::{Asset, AssetDesc};
use asset_core::fetch::ManifestFetcher;
use asset_core::manifest::{ManifestError, PackageManifest};
use tracing::{debug, info, warn};

use crate::factory::AssetFactory;

/// Observer of one package load.
pub trait AssetListener: Send + Sync {
    /// Invoked once per manifest position with progress in `0..=1`.
    fn on_asset_progress(&self, progress: f32);

    /// Invoked once every entry of the manifest has been processed.
    fn on_asset_load_complete(&self, package: &AssetPackage);

    /// Invoked when the manifest itself cannot be fetched or validated.
    fn on_asset_load_failed(&self, _error: &ManifestError) {}
}

/// Load state of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// No load has run, or the package was unloaded.
    Unloaded,
    /// A load is in flight; new listeners attach to it.
    Loading,
    /// Every manifest entry has been processed.
    Loaded,
}

struct PackageInner {
    state: PackageState,
    entries: Vec<AssetDesc>,
    cursor: usize,
    error_count: u32,
    owned: Vec<Arc<Asset>>,
    listeners: Vec<Arc<dyn AssetListener>>,
}

/// One manifest's worth of assets and their load state.
///
/// Packages are created and deduplicated by the
/// [`PackageRegistry`](crate::registry::PackageRegistry); an asset may belong
/// to any number of packages at once.
pub struct AssetPackage {
    uri: String,
    factory: Arc<AssetFactory>,
    fetcher: Arc<dyn ManifestFetcher>,
    inner: Mutex<PackageInner>,
}

/// How a `load` call participates in the state machine.
enum LoadEntry {
    Drive,
    Attached,
    AlreadyLoaded,
}

impl AssetPackage {
    pub fn new(
        uri: impl Into<String>,
        factory: Arc<AssetFactory>,
        fetcher: Arc<dyn ManifestFetcher>,
    ) -> Self {
        Self {
            uri: uri.into(),
            factory,
            fetcher,
            inner: Mutex::new(PackageInner {
                state: PackageState::Unloaded,
                entries: Vec::new(),
                cursor: 0,
                error_count: 0,
                owned: Vec::new(),
                listeners: Vec::new(),
            }),
        }
    }

    /// Manifest URI this package was created for.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Current load state.
    pub fn state(&self) -> PackageState {
        self.lock_inner().state
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == PackageState::Loaded
    }

    /// Number of manifest entries that failed creation during the last load.
    pub fn error_count(&self) -> u32 {
        self.lock_inner().error_count
    }

    /// Number of asset references this package holds.
    ///
    /// A manifest that lists one identifier twice is counted twice.
    pub fn asset_count(&self) -> usize {
        self.lock_inner().owned.len()
    }

    /// The assets this package holds references on.
    pub fn assets(&self) -> Vec<Arc<Asset>> {
        self.lock_inner().owned.clone()
    }

    /// Attaches a listener and loads the package if no load has run yet.
    ///
    /// The call that finds the package `Unloaded` drives the whole load. A
    /// call landing mid-load attaches its listener to the in-flight sequence
    /// without issuing a second fetch, and a call on a loaded package is
    /// notified of completion right away.
    pub async fn load(&self, listener: Arc<dyn AssetListener>) {
        let entry = {
            let mut inner = self.lock_inner();
            match inner.state {
                PackageState::Loaded => LoadEntry::AlreadyLoaded,
                PackageState::Loading => {
                    inner.listeners.push(listener.clone());
                    LoadEntry::Attached
                }
                PackageState::Unloaded => {
                    inner.listeners.push(listener.clone());
                    inner.state = PackageState::Loading;
                    LoadEntry::Drive
                }
            }
        };

        match entry {
            LoadEntry::AlreadyLoaded => listener.on_asset_load_complete(self),
            LoadEntry::Attached => {}
            LoadEntry::Drive => self.run_load().await,
        }
    }

    /// Fetches and validates the manifest, then sequences asset creation.
    async fn run_load(&self) {
        info!(uri = %self.uri, "Loading asset package");

        let bytes = match self.fetcher.fetch(&self.uri).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.fail_load(ManifestError::Fetch(e.to_string()));
                return;
            }
        };

        let manifest = match PackageManifest::from_slice(&bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                self.fail_load(e);
                return;
            }
        };

        {
            let mut inner = self.lock_inner();
            inner.entries = manifest.assets;
            inner.cursor = 0;
            inner.error_count = 0;
        }

        // One entry fully settles before the next starts; progress values and
        // error aggregation are defined in terms of sequential position.
        loop {
            let (progress, next, listeners) = {
                let inner = self.lock_inner();
                let total = inner.entries.len();
                let progress = if total > 0 {
                    inner.cursor as f32 / total as f32
                } else {
                    1.0
                };
                let next = inner.entries.get(inner.cursor).cloned();
                (progress, next, inner.listeners.clone())
            };

            for listener in &listeners {
                listener.on_asset_progress(progress);
            }

            let Some(desc) = next else {
                break;
            };

            match self.factory.create_asset(&desc).await {
                Ok(asset) => {
                    asset.retain();
                    self.lock_inner().owned.push(asset);
                }
                Err(e) => {
                    warn!(id = %desc.id, name = %desc.name, error = %e, "Failed to load asset");
                    self.lock_inner().error_count += 1;
                }
            }
            self.lock_inner().cursor += 1;
        }

        let listeners = {
            let mut inner = self.lock_inner();
            inner.state = PackageState::Loaded;
            std::mem::take(&mut inner.listeners)
        };

        info!(
            uri = %self.uri,
            assets = self.asset_count(),
            errors = self.error_count(),
            "Asset package loaded"
        );

        for listener in listeners {
            listener.on_asset_load_complete(self);
        }
    }

    /// Aborts the load and notifies every pending listener.
    ///
    /// The package returns to `Unloaded` so a later `load` may retry.
    fn fail_load(&self, error: ManifestError) {
        warn!(uri = %self.uri, error = %error, "Asset package load failed");

        let listeners = {
            let mut inner = self.lock_inner();
            inner.state = PackageState::Unloaded;
            inner.entries.clear();
            inner.cursor = 0;
            std::mem::take(&mut inner.listeners)
        };

        for listener in listeners {
            listener.on_asset_load_failed(&error);
        }
    }

    /// Releases every owned asset and resets the package for re-loading.
    ///
    /// An asset shared with other packages stays cached until the last
    /// referencing package unloads; an asset whose count reaches zero is
    /// evicted from the factory and its payload dropped.
    pub fn unload(&self) {
        let owned = {
            let mut inner = self.lock_inner();
            inner.state = PackageState::Unloaded;
            inner.entries.clear();
            inner.cursor = 0;
            inner.listeners.clear();
            std::mem::take(&mut inner.owned)
        };

        for asset in owned {
            if asset.release() == 0 {
                debug!(id = %asset.id, "Evicting unreferenced asset");
                self.factory.remove_asset(&asset.id);
            }
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, PackageInner> {
        self.inner.lock().expect("package state lock poisoned")
    }
}
