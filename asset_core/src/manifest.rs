//! Package manifest documents.
//!
//! A package is described by a JSON manifest carrying a metadata marker and
//! an ordered asset list:
//!
//! ```json
//! {
//!   "metaData": { "content": "asset_package" },
//!   "assets": [
//!     { "id": "a1", "name": "Crate texture", "uri": "textures/crate.png", "type": "texture" }
//!   ]
//! }
//! ```
//!
//! A document without the marker, or with the wrong content tag, is rejected
//! as a whole; a malformed individual entry is not special-cased here because
//! descriptors carry serde defaults for everything but `id`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::AssetDesc;

/// Content marker a manifest must carry to be accepted.
pub const PACKAGE_CONTENT_TYPE: &str = "asset_package";

/// Metadata block of a package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMeta {
    /// Content-type tag; must equal [`PACKAGE_CONTENT_TYPE`].
    #[serde(default)]
    pub content: String,
}

/// Parsed package manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Metadata marker block.
    #[serde(rename = "metaData")]
    pub meta_data: Option<ManifestMeta>,
    /// Ordered asset descriptors.
    #[serde(default)]
    pub assets: Vec<AssetDesc>,
}

impl PackageManifest {
    /// Parses and validates a manifest document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: PackageManifest =
            serde_json::from_slice(bytes).map_err(|e| ManifestError::Parse(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks the metadata marker.
    pub fn validate(&self) -> Result<(), ManifestError> {
        match &self.meta_data {
            None => Err(ManifestError::MissingMetaData),
            Some(meta) if meta.content != PACKAGE_CONTENT_TYPE => {
                Err(ManifestError::UnexpectedContent(meta.content.clone()))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Manifest-level load failures; these abort the whole package load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The transport failed to produce the document.
    Fetch(String),
    /// The document is not valid manifest JSON.
    Parse(String),
    /// No `metaData` block present.
    MissingMetaData,
    /// `metaData.content` did not match the package marker.
    UnexpectedContent(String),
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Fetch(e) => write!(f, "failed to fetch manifest: {}", e),
            ManifestError::Parse(e) => write!(f, "failed to parse manifest: {}", e),
            ManifestError::MissingMetaData => {
                write!(f, "no metaData found in asset package json")
            }
            ManifestError::UnexpectedContent(content) => {
                write!(
                    f,
                    "file did not contain asset package data (content '{}')",
                    content
                )
            }
        }
    }
}

impl std::error::Error for ManifestError {}
