//! Asset records and descriptors.
//!
//! An asset is one loaded resource behind a globally unique identifier. The
//! payload is opaque to the framework; what the framework tracks is the
//! cross-package reference count that governs cache eviction.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque payload constructed by a provider.
pub type AssetInstance = Arc<dyn Any + Send + Sync>;

/// JSON descriptor for one asset inside a package manifest.
///
/// Unknown fields are ignored so application-specific descriptor extensions
/// pass through untouched. A missing `type` parses as an empty tag and fails
/// per-asset at creation time rather than failing the whole manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDesc {
    /// Globally unique asset identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Optional source location for the payload.
    #[serde(default)]
    pub uri: Option<String>,
    /// Type tag that selects the provider.
    #[serde(default, rename = "type")]
    pub asset_type: String,
}

/// One loaded resource plus its cross-package reference count.
pub struct Asset {
    /// Globally unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Source location, if any.
    pub uri: Option<String>,
    /// Type tag of the provider that built this asset.
    pub asset_type: String,
    instance: AssetInstance,
    ref_count: AtomicU32,
}

impl Asset {
    /// Creates an asset from its descriptor and constructed payload.
    ///
    /// The reference count starts at zero; the requesting package retains it.
    pub fn new(desc: &AssetDesc, instance: AssetInstance) -> Self {
        Self {
            id: desc.id.clone(),
            name: desc.name.clone(),
            uri: desc.uri.clone(),
            asset_type: desc.asset_type.clone(),
            instance,
            ref_count: AtomicU32::new(0),
        }
    }

    /// The opaque payload.
    pub fn instance(&self) -> &AssetInstance {
        &self.instance
    }

    /// Downcasts the payload to a concrete type.
    pub fn instance_as<T: 'static + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }

    /// Number of packages currently holding this asset.
    pub fn package_ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Adds one package reference and returns the new count.
    pub fn retain(&self) -> u32 {
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drops one package reference and returns the new count.
    ///
    /// The count never goes below zero.
    pub fn release(&self) -> u32 {
        match self
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => 0,
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("asset_type", &self.asset_type)
            .field("package_ref_count", &self.package_ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_desc() -> AssetDesc {
        AssetDesc {
            id: "tex_crate".to_string(),
            name: "Crate texture".to_string(),
            uri: Some("textures/crate.png".to_string()),
            asset_type: "texture".to_string(),
        }
    }

    #[test]
    fn new_asset_starts_unreferenced() {
        let asset = Asset::new(&sample_desc(), Arc::new(42u32));
        assert_eq!(asset.package_ref_count(), 0);
        assert_eq!(asset.id, "tex_crate");
        assert_eq!(asset.asset_type, "texture");
    }

    #[test]
    fn retain_and_release_adjust_count() {
        let asset = Asset::new(&sample_desc(), Arc::new(42u32));
        assert_eq!(asset.retain(), 1);
        assert_eq!(asset.retain(), 2);
        assert_eq!(asset.release(), 1);
        assert_eq!(asset.release(), 0);
    }

    #[test]
    fn release_floors_at_zero() {
        let asset = Asset::new(&sample_desc(), Arc::new(42u32));
        assert_eq!(asset.release(), 0);
        assert_eq!(asset.package_ref_count(), 0);
    }

    #[test]
    fn instance_downcast() {
        let asset = Asset::new(&sample_desc(), Arc::new("payload".to_string()));
        let text = asset.instance_as::<String>().unwrap();
        assert_eq!(*text, "payload");
        assert!(asset.instance_as::<u32>().is_none());
    }

    #[test]
    fn desc_defaults_for_optional_fields() {
        let desc: AssetDesc = serde_json::from_str(r#"{"id": "a1", "type": "texture"}"#).unwrap();
        assert_eq!(desc.id, "a1");
        assert_eq!(desc.name, "");
        assert_eq!(desc.uri, None);
        assert_eq!(desc.asset_type, "texture");
    }

    #[test]
    fn desc_ignores_unknown_fields() {
        let desc: AssetDesc = serde_json::from_str(
            r#"{"id": "a1", "type": "sound", "volume": 0.5, "loop": true}"#,
        )
        .unwrap();
        assert_eq!(desc.asset_type, "sound");
    }
}
