//! Configuration system.
//!
//! Loads asset loader configuration from JSON strings (file IO left to app).

use serde::{Deserialize, Serialize};

/// Root configuration for the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Directory containing package manifests.
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: String,
    /// Package manifests to load at startup, in order.
    #[serde(default)]
    pub preload_packages: Vec<String>,
}

fn default_manifest_dir() -> String {
    "assets".to_string()
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            manifest_dir: default_manifest_dir(),
            preload_packages: Vec::new(),
        }
    }
}

impl AssetConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_missing_fields() {
        let cfg = AssetConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg.manifest_dir, "assets");
        assert!(cfg.preload_packages.is_empty());
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let cfg = AssetConfig::from_json_str(
            r#"{ "manifest_dir": "content", "preload_packages": ["core.json", "ui.json"] }"#,
        )
        .unwrap();
        assert_eq!(cfg.manifest_dir, "content");
        assert_eq!(cfg.preload_packages, vec!["core.json", "ui.json"]);
    }
}
