//! Manifest transport.
//!
//! Fetching is behind a trait so applications plug in whatever transport they
//! use (HTTP, pack files, embedded documents). The framework ships a rooted
//! file fetcher and an in-memory fetcher.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Produces raw manifest documents by URI.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Fetches the manifest document at `uri`.
    async fn fetch(&self, uri: &str) -> anyhow::Result<Bytes>;
}

/// Reads manifests from a root directory on disk.
pub struct FileManifestFetcher {
    root: PathBuf,
}

impl FileManifestFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ManifestFetcher for FileManifestFetcher {
    async fn fetch(&self, uri: &str) -> anyhow::Result<Bytes> {
        let path = self.root.join(uri);
        debug!(path = %path.display(), "Reading manifest from disk");
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read manifest {}", path.display()))?;
        Ok(Bytes::from(data))
    }
}

/// Serves manifests preloaded into memory.
///
/// Used by tests and by applications that embed their package documents.
#[derive(Default)]
pub struct MemoryManifestFetcher {
    documents: Mutex<HashMap<String, Bytes>>,
}

impl MemoryManifestFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a manifest document under `uri`.
    pub fn insert(&self, uri: &str, document: impl Into<Bytes>) {
        self.documents
            .lock()
            .expect("manifest map lock poisoned")
            .insert(uri.to_string(), document.into());
    }
}

#[async_trait]
impl ManifestFetcher for MemoryManifestFetcher {
    async fn fetch(&self, uri: &str) -> anyhow::Result<Bytes> {
        let documents = self.documents.lock().expect("manifest map lock poisoned");
        documents
            .get(uri)
            .cloned()
            .with_context(|| format!("no manifest registered for '{}'", uri))
    }
}
