//! `asset_runtime`
//!
//! Stateful asset machinery:
//! - Deduplicating asset factory with coalesced construction
//! - Package load state machine (fetch, validate, sequential creation)
//! - Package registry fronting both

pub mod factory;
pub mod package;
pub mod registry;

pub use factory::AssetFactory;
pub use registry::PackageRegistry;
