//! Asset providers.
//!
//! A provider is the pluggable capability that constructs assets for one
//! type tag. Concrete providers live in the application; the framework only
//! sequences their invocation and caches what they produce.

use std::fmt;

use async_trait::async_trait;

use crate::asset::{Asset, AssetDesc};

/// Constructs assets for a single type tag.
#[async_trait]
pub trait AssetProvider: Send + Sync {
    /// Builds an asset from its descriptor.
    async fn create_asset(&self, desc: &AssetDesc) -> Result<Asset, ProviderError>;
}

/// Per-asset creation failures; non-fatal to the enclosing package load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No provider registered for the requested type tag.
    NoProvider { asset_type: String },
    /// The provider's construction attempt failed.
    Failed { message: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NoProvider { asset_type } => {
                write!(f, "no asset provider for asset type '{}'", asset_type)
            }
            ProviderError::Failed { message } => {
                write!(f, "asset creation failed: {}", message)
            }
        }
    }
}

impl std::error::Error for ProviderError {}
