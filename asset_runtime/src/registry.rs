//! Package registry: the top-level entry point.
//!
//! The registry deduplicates packages by manifest URI so concurrent load
//! requests for one package share a single fetch and processing sequence,
//! and it fronts the factory those packages create their assets through.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use asset_core::fetch::ManifestFetcher;
use asset_core::provider::AssetProvider;

use crate::factory::{AssetFactory, ConfigurationError};
use crate::package::{AssetListener, AssetPackage};

/// Deduplicating store of packages keyed by manifest URI.
pub struct PackageRegistry {
    factory: Arc<AssetFactory>,
    fetcher: Arc<dyn ManifestFetcher>,
    packages: Mutex<HashMap<String, Arc<AssetPackage>>>,
}

impl PackageRegistry {
    /// Creates a registry with a fresh factory.
    pub fn new(fetcher: Arc<dyn ManifestFetcher>) -> Self {
        Self::with_factory(Arc::new(AssetFactory::new()), fetcher)
    }

    /// Creates a registry around an existing factory.
    pub fn with_factory(factory: Arc<AssetFactory>, fetcher: Arc<dyn ManifestFetcher>) -> Self {
        Self {
            factory,
            fetcher,
            packages: Mutex::new(HashMap::new()),
        }
    }

    /// The factory backing every package of this registry.
    pub fn factory(&self) -> &Arc<AssetFactory> {
        &self.factory
    }

    /// The transport packages fetch their manifests through.
    pub fn fetcher(&self) -> &Arc<dyn ManifestFetcher> {
        &self.fetcher
    }

    /// Registers a provider on the backing factory.
    pub fn register_provider(
        &self,
        asset_type: &str,
        provider: Arc<dyn AssetProvider>,
    ) -> Result<(), ConfigurationError> {
        self.factory.register_provider(asset_type, provider)
    }

    /// Loads the package at `uri`, creating it on first request.
    ///
    /// Repeated calls for one URI share the same package: a call made while
    /// a load is in flight attaches its listener to that load, and a call
    /// after completion is notified right away. Returns the package handle.
    pub async fn load_package(
        &self,
        uri: &str,
        listener: Arc<dyn AssetListener>,
    ) -> Arc<AssetPackage> {
        let package = {
            let mut packages = self.lock_packages();
            packages
                .entry(uri.to_string())
                .or_insert_with(|| {
                    Arc::new(AssetPackage::new(
                        uri,
                        self.factory.clone(),
                        self.fetcher.clone(),
                    ))
                })
                .clone()
        };
        package.load(listener).await;
        package
    }

    /// Unregisters and unloads the package at `uri`.
    ///
    /// Returns `false`, with no side effects, when no such package exists.
    pub fn unload_package(&self, uri: &str) -> bool {
        let package = self.lock_packages().remove(uri);
        match package {
            Some(package) => {
                package.unload();
                true
            }
            None => false,
        }
    }

    /// Looks up a registered package.
    pub fn get_package(&self, uri: &str) -> Option<Arc<AssetPackage>> {
        self.lock_packages().get(uri).cloned()
    }

    /// Number of registered packages.
    pub fn package_count(&self) -> usize {
        self.lock_packages().len()
    }

    fn lock_packages(&self) -> MutexGuard<'_, HashMap<String, Arc<AssetPackage>>> {
        self.packages.lock().expect("package registry lock poisoned")
    }
}
