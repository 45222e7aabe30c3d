//! File-based artifact store.
//!
//! [`FileStore`] keeps each artifact as a single flat file inside the cache
//! root. The directory listing is the index; there is no metadata file.
//!
//! Writes go to a uniquely named temporary file in the same directory and are
//! renamed onto the final name, so readers never observe a partial artifact and
//! two writers racing on the same name both succeed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::{ArtifactStore, StoreError};

/// Prefix of in-flight temporary files. Hidden so directory listings of the
/// cache only show finished artifacts.
const TEMP_PREFIX: &str = ".puml-";

/// Directory-backed [`ArtifactStore`].
///
/// Layout:
/// ```text
/// {root}/
/// +-- guide-intro-5d41402abc4b2a76b9719d911017c592.svg
/// +-- api-7d793037a0760186574b0282f2f435e7.png
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`.
    ///
    /// The directory is not touched until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the cache root exists (`mkdir -p` semantics).
    fn ensure_root(&self) -> io::Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.root)?;
        tracing::info!(root = %self.root.display(), "created diagram cache directory");
        Ok(())
    }

    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> io::Result<()> {
        self.ensure_root()?;

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.root)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        // On failure the temporary file is removed when the error is dropped
        temp.persist(target).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Reject names that would escape the flat cache layout.
fn check_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid artifact name '{name}'"),
        ));
    }
    Ok(())
}

impl ArtifactStore for FileStore {
    fn has(&self, name: &str) -> bool {
        check_name(name).is_ok() && self.root.join(name).is_file()
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        check_name(name).map_err(|source| StoreError::Read {
            name: name.to_owned(),
            source,
        })?;

        fs::read(self.root.join(name)).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_owned())
            } else {
                StoreError::Read {
                    name: name.to_owned(),
                    source,
                }
            }
        })
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        check_name(name)
            .and_then(|()| self.write_atomic(&self.root.join(name), bytes))
            .map_err(|source| StoreError::Write {
                name: name.to_owned(),
                source,
            })?;

        tracing::debug!(name, size = bytes.len(), "stored artifact");
        Ok(())
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        Some(self.root.join(name))
    }
}
