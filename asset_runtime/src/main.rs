//! Standalone package loader binary.
//!
//! Usage:
//!   cargo run -p asset_runtime --bin loader -- [--manifest-dir assets] [--package core.json] [--config loader.json]
//!
//! Loads each requested package manifest from the manifest directory,
//! reporting per-asset progress and a completion summary. Ships two demo
//! providers: "text" (UTF-8 file payloads) and "binary" (raw byte payloads).

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use asset_core::asset::{Asset, AssetDesc};
use asset_core::config::AssetConfig;
use asset_core::fetch::FileManifestFetcher;
use asset_core::manifest::ManifestError;
use asset_core::provider::{AssetProvider, ProviderError};
use asset_runtime::package::{AssetListener, AssetPackage};
use asset_runtime::registry::PackageRegistry;
use async_trait::async_trait;
use tracing::info;

fn parse_args() -> AssetConfig {
    let mut cfg = AssetConfig::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--manifest-dir" if i + 1 < args.len() => {
                cfg.manifest_dir = args[i + 1].clone();
                i += 2;
            }
            "--package" if i + 1 < args.len() => {
                cfg.preload_packages.push(args[i + 1].clone());
                i += 2;
            }
            "--config" if i + 1 < args.len() => {
                match std::fs::read_to_string(&args[i + 1]) {
                    Ok(text) => match AssetConfig::from_json_str(&text) {
                        Ok(parsed) => cfg = parsed,
                        Err(e) => eprintln!("Bad config {}: {}", args[i + 1], e),
                    },
                    Err(e) => eprintln!("Cannot read config {}: {}", args[i + 1], e),
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg
}

/// Provider that loads UTF-8 text payloads from disk.
struct TextProvider {
    root: PathBuf,
}

#[async_trait]
impl AssetProvider for TextProvider {
    async fn create_asset(&self, desc: &AssetDesc) -> Result<Asset, ProviderError> {
        let Some(uri) = desc.uri.as_deref() else {
            return Err(ProviderError::Failed {
                message: format!("text asset '{}' has no uri", desc.id),
            });
        };
        let path = self.root.join(uri);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ProviderError::Failed {
                message: format!("read {}: {}", path.display(), e),
            })?;
        Ok(Asset::new(desc, Arc::new(text)))
    }
}

/// Provider that loads raw byte payloads from disk.
struct BinaryProvider {
    root: PathBuf,
}

#[async_trait]
impl AssetProvider for BinaryProvider {
    async fn create_asset(&self, desc: &AssetDesc) -> Result<Asset, ProviderError> {
        let Some(uri) = desc.uri.as_deref() else {
            return Err(ProviderError::Failed {
                message: format!("binary asset '{}' has no uri", desc.id),
            });
        };
        let path = self.root.join(uri);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| ProviderError::Failed {
                message: format!("read {}: {}", path.display(), e),
            })?;
        Ok(Asset::new(desc, Arc::new(data)))
    }
}

/// Listener that reports load progress on the console.
struct ConsoleListener;

impl AssetListener for ConsoleListener {
    fn on_asset_progress(&self, progress: f32) {
        info!(percent = (progress * 100.0) as u32, "Loading assets");
    }

    fn on_asset_load_complete(&self, package: &AssetPackage) {
        println!(
            "Loaded '{}': {} assets, {} errors",
            package.uri(),
            package.asset_count(),
            package.error_count()
        );
    }

    fn on_asset_load_failed(&self, error: &ManifestError) {
        println!("Load failed: {}", error);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args();
    if cfg.preload_packages.is_empty() {
        anyhow::bail!("no packages requested; pass --package <manifest.json>");
    }

    info!(
        manifest_dir = %cfg.manifest_dir,
        packages = cfg.preload_packages.len(),
        "Starting loader"
    );

    let root = PathBuf::from(&cfg.manifest_dir);
    let fetcher = Arc::new(FileManifestFetcher::new(root.clone()));
    let registry = PackageRegistry::new(fetcher);
    registry
        .register_provider("text", Arc::new(TextProvider { root: root.clone() }))
        .context("register text provider")?;
    registry
        .register_provider("binary", Arc::new(BinaryProvider { root }))
        .context("register binary provider")?;

    let listener = Arc::new(ConsoleListener);
    for uri in &cfg.preload_packages {
        registry.load_package(uri, listener.clone()).await;
    }

    Ok(())
}
