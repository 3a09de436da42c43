//! Local cache store — best-effort disk accelerator for rendered artifacts.
//!
//! One file per identifier under a dedicated directory. The cache is never
//! authoritative: a miss means "fetch from the durable store", and write
//! failures are absorbed by callers. Identifiers are typed (`ArtifactId`),
//! so traversal outside the cache directory is impossible by construction —
//! raw strings must pass `ArtifactId::from_str` before they reach here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::id::ArtifactId;

/// File extension for cached artifacts, matching the durable key suffix.
const CACHE_EXT: &str = "html";

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The cache root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, id: &ArtifactId) -> PathBuf {
        self.dir.join(format!("{id}.{CACHE_EXT}"))
    }

    /// Store an artifact, overwriting any existing entry for the same id.
    ///
    /// Writes to a temp file then renames, so readers never observe a
    /// partially-written artifact.
    pub fn put(&self, id: &ArtifactId, bytes: &[u8]) -> io::Result<()> {
        let target = self.entry_path(id);
        let temp = target.with_extension("tmp");
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &target)?;
        tracing::debug!(artifact_id = %id, size = bytes.len(), "Cache entry written");
        Ok(())
    }

    /// Read a cached artifact. Absence is not an error.
    pub fn get(&self, id: &ArtifactId) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.entry_path(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove a cached artifact. Deleting an absent entry succeeds.
    pub fn delete(&self, id: &ArtifactId) -> io::Result<()> {
        match fs::remove_file(self.entry_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Number of cached entries (test and diagnostics helper).
    pub fn len(&self) -> io::Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some(CACHE_EXT) {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}
