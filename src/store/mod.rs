//! The three storage tiers: local disk cache, durable object store,
//! and the SQLite metadata index.

pub mod cache;
pub mod index;
pub mod object;

pub use cache::ArtifactCache;
pub use index::{ArtifactRecord, OwnerRecord};
pub use object::{HttpObjectStore, MemoryObjectStore, ObjectStore};

use thiserror::Error;

/// Failures from the authoritative storage tiers.
///
/// Cache-tier failures never appear here: the cache is a best-effort
/// accelerator and its errors are absorbed and logged at the call site.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient failure (network, timeout, permission, SQLite I/O).
    /// Safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Terminal: no artifact exists for this identifier.
    #[error("Artifact not found")]
    NotFound,

    /// An identifier collided in the metadata index. Identifiers are
    /// 128-bit random, so this is fatal and should never happen.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref inner, _) = e {
            if inner.code == rusqlite::ErrorCode::ConstraintViolation {
                return StoreError::DuplicateKey(e.to_string());
            }
        }
        StoreError::Unavailable(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}
