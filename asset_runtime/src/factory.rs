//! Deduplicating asset factory.
//!
//! The factory owns two registries: providers by type tag and assets by
//! identifier. Creation is coalesced so a provider runs at most once per
//! identifier no matter how many packages request it concurrently; every
//! concurrent caller receives the same asset or the same error.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use asset_core::asset::{Asset, AssetDesc, AssetInstance};
use asset_core::provider::{AssetProvider, ProviderError};
use tokio::sync::oneshot;
use tracing::debug;

/// Programmer-contract violations, reported at the call boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Provider registration with an empty type tag.
    EmptyAssetType,
    /// A provider is already registered for the type tag.
    AlreadyRegistered(String),
    /// The descriptor carried no asset identifier.
    MissingAssetId,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::EmptyAssetType => write!(f, "no asset type was specified"),
            ConfigurationError::AlreadyRegistered(asset_type) => {
                write!(f, "asset type '{}' has already been registered", asset_type)
            }
            ConfigurationError::MissingAssetId => {
                write!(f, "no asset identifier found in asset description")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Asset creation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The call itself was malformed.
    Configuration(ConfigurationError),
    /// No provider, or the provider could not produce the asset.
    Provider(ProviderError),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Configuration(e) => write!(f, "{}", e),
            AssetError::Provider(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<ConfigurationError> for AssetError {
    fn from(e: ConfigurationError) -> Self {
        AssetError::Configuration(e)
    }
}

impl From<ProviderError> for AssetError {
    fn from(e: ProviderError) -> Self {
        AssetError::Provider(e)
    }
}

type Waiter = oneshot::Sender<Result<Arc<Asset>, AssetError>>;

/// Cache slot: a finished asset, or an in-flight construction with the
/// callers queued behind it.
enum CacheEntry {
    Ready(Arc<Asset>),
    Pending(Vec<Waiter>),
}

#[derive(Default)]
struct FactoryInner {
    providers: HashMap<String, Arc<dyn AssetProvider>>,
    entries: HashMap<String, CacheEntry>,
}

/// Deduplicating asset cache plus provider registry.
#[derive(Default)]
pub struct AssetFactory {
    inner: Mutex<FactoryInner>,
}

/// What `create_asset` decided to do while the lock was held.
enum Step {
    Hit(Arc<Asset>),
    Wait(oneshot::Receiver<Result<Arc<Asset>, AssetError>>),
    Build(Arc<dyn AssetProvider>),
    Fail(AssetError),
}

impl AssetFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the provider responsible for one asset type tag.
    ///
    /// Re-registering a tag is rejected.
    pub fn register_provider(
        &self,
        asset_type: &str,
        provider: Arc<dyn AssetProvider>,
    ) -> Result<(), ConfigurationError> {
        if asset_type.is_empty() {
            return Err(ConfigurationError::EmptyAssetType);
        }
        let mut inner = self.lock_inner();
        if inner.providers.contains_key(asset_type) {
            return Err(ConfigurationError::AlreadyRegistered(asset_type.to_string()));
        }
        inner.providers.insert(asset_type.to_string(), provider);
        Ok(())
    }

    /// Looks up the provider for a type tag.
    pub fn get_provider(&self, asset_type: &str) -> Option<Arc<dyn AssetProvider>> {
        self.lock_inner().providers.get(asset_type).cloned()
    }

    /// Looks up a cached asset by identifier.
    ///
    /// In-flight constructions are not visible.
    pub fn get_asset(&self, id: &str) -> Option<Arc<Asset>> {
        match self.lock_inner().entries.get(id) {
            Some(CacheEntry::Ready(asset)) => Some(asset.clone()),
            _ => None,
        }
    }

    /// Looks up the payload of a cached asset.
    pub fn get_asset_instance(&self, id: &str) -> Option<AssetInstance> {
        self.get_asset(id).map(|asset| asset.instance().clone())
    }

    /// Number of fully constructed assets currently cached.
    pub fn asset_count(&self) -> usize {
        self.lock_inner()
            .entries
            .values()
            .filter(|entry| matches!(entry, CacheEntry::Ready(_)))
            .count()
    }

    /// Returns the cached asset for `desc.id` or constructs it through the
    /// registered provider.
    ///
    /// Concurrent calls for one uncached identifier share a single provider
    /// invocation. Nothing is cached on failure.
    pub async fn create_asset(&self, desc: &AssetDesc) -> Result<Arc<Asset>, AssetError> {
        if desc.id.is_empty() {
            return Err(ConfigurationError::MissingAssetId.into());
        }

        let step = {
            let mut inner = self.lock_inner();
            let provider = inner.providers.get(&desc.asset_type).cloned();
            match inner.entries.entry(desc.id.clone()) {
                Entry::Occupied(mut occupied) => match occupied.get_mut() {
                    CacheEntry::Ready(asset) => Step::Hit(asset.clone()),
                    CacheEntry::Pending(waiters) => {
                        let (tx, rx) = oneshot::channel();
                        waiters.push(tx);
                        Step::Wait(rx)
                    }
                },
                Entry::Vacant(vacant) => match provider {
                    Some(provider) => {
                        vacant.insert(CacheEntry::Pending(Vec::new()));
                        Step::Build(provider)
                    }
                    None => Step::Fail(
                        ProviderError::NoProvider {
                            asset_type: desc.asset_type.clone(),
                        }
                        .into(),
                    ),
                },
            }
        };

        let provider = match step {
            Step::Hit(asset) => {
                debug!(id = %desc.id, "Asset cache hit");
                return Ok(asset);
            }
            Step::Wait(rx) => {
                // The in-flight construction settles every queued waiter. A
                // dropped sender means that construction was abandoned.
                return rx.await.unwrap_or_else(|_| {
                    Err(ProviderError::Failed {
                        message: format!("construction of '{}' was abandoned", desc.id),
                    }
                    .into())
                });
            }
            Step::Fail(err) => return Err(err),
            Step::Build(provider) => provider,
        };

        let result = provider.create_asset(desc).await;

        let (settled, waiters) = {
            let mut inner = self.lock_inner();
            let waiters = match inner.entries.remove(&desc.id) {
                Some(CacheEntry::Pending(waiters)) => waiters,
                _ => Vec::new(),
            };
            match result {
                Ok(asset) => {
                    let asset = Arc::new(asset);
                    debug!(id = %asset.id, asset_type = %asset.asset_type, "Asset constructed");
                    inner
                        .entries
                        .insert(asset.id.clone(), CacheEntry::Ready(asset.clone()));
                    (Ok(asset), waiters)
                }
                Err(e) => (Err(AssetError::Provider(e)), waiters),
            }
        };

        for waiter in waiters {
            let _ = waiter.send(settled.clone());
        }
        settled
    }

    /// Evicts an asset from the cache, returning it if it was present.
    pub fn remove_asset(&self, id: &str) -> Option<Arc<Asset>> {
        let mut inner = self.lock_inner();
        match inner.entries.get(id) {
            Some(CacheEntry::Ready(_)) => {}
            _ => return None,
        }
        match inner.entries.remove(id) {
            Some(CacheEntry::Ready(asset)) => Some(asset),
            _ => None,
        }
    }

    /// Drops every cached asset and provider registration.
    ///
    /// In-flight constructions still settle their waiters.
    pub fn clear(&self) {
        let mut inner = self.lock_inner();
        inner
            .entries
            .retain(|_, entry| matches!(entry, CacheEntry::Pending(_)));
        inner.providers.clear();
    }

    fn lock_inner(&self) -> MutexGuard<'_, FactoryInner> {
        self.inner.lock().expect("asset factory lock poisoned")
    }
}
