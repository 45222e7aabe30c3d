//! Artifact store for rendered diagrams.
//!
//! This crate decouples diagram resolution from the storage of rendered
//! artifacts. A single trait forms the core API:
//!
//! - [`ArtifactStore`]: flat, name-addressed store of immutable byte blobs
//!
//! # Implementations
//!
//! - [`FileStore`]: one file per artifact inside a cache root, written atomically
//! - [`NullStore`]: no-op implementation (always misses, discards writes)
//!
//! Artifact names are computed by the caller and are expected to be
//! content-addressed: a name is never rewritten with different bytes, so the
//! store needs no invalidation or locking.
//!
//! # Example
//!
//! ```
//! use puml_cache::{ArtifactStore, NullStore};
//!
//! let store = NullStore;
//! store.write("guide-abc.svg", b"<svg/>").unwrap();
//! assert!(!store.has("guide-abc.svg")); // NullStore always misses
//! ```

mod file;
pub use file::FileStore;

use std::path::PathBuf;

/// Artifact store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No artifact is stored under the name.
    #[error("artifact not found: {0}")]
    NotFound(String),
    /// The artifact exists but could not be read.
    #[error("failed to read artifact {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// The artifact could not be persisted.
    #[error("failed to write artifact {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Name-addressed store of rendered artifacts.
///
/// Implementations must be thread-safe: any number of resolvers may read
/// concurrently, and concurrent writes of the same name must converge on one
/// complete file.
pub trait ArtifactStore: Send + Sync {
    /// Check whether an artifact exists.
    ///
    /// Never creates the cache root.
    fn has(&self, name: &str) -> bool;

    /// Read the full content of an artifact.
    ///
    /// Returns [`StoreError::NotFound`] when absent and [`StoreError::Read`]
    /// on any other I/O failure.
    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Persist an artifact.
    ///
    /// On success a later [`read`](Self::read) of the same name, from any
    /// process, observes the complete content.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Location of the artifact on disk, if the store is file-backed.
    fn path(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// No-op [`ArtifactStore`] that never stores or retrieves data.
///
/// Every `has` returns `false`, every `read` fails with `NotFound`, and every
/// `write` is silently discarded. Use when caching is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl ArtifactStore for NullStore {
    fn has(&self, _name: &str) -> bool {
        false
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::NotFound(name.to_owned()))
    }

    fn write(&self, _name: &str, _bytes: &[u8]) -> Result<(), StoreError> {
        Ok(())
    }
}
