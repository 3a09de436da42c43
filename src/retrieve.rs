//! Retrieval path — cache hit or durable-store fallback.

use crate::id::ArtifactId;
use crate::store::{ArtifactCache, ObjectStore, StoreError};

/// Resolve a raw identifier to artifact bytes.
///
/// A malformed identifier yields `NotFound`, identical to a well-formed id
/// that was never issued — the response must not reveal which case it was.
/// `Unavailable` is kept distinct so callers know a retry can succeed.
pub fn fetch_artifact(
    cache: &ArtifactCache,
    store: &dyn ObjectStore,
    raw_id: &str,
) -> Result<Vec<u8>, StoreError> {
    let id: ArtifactId = raw_id.parse().map_err(|_| StoreError::NotFound)?;

    // Cache failures are absorbed: a broken cache degrades to a miss.
    match cache.get(&id) {
        Ok(Some(bytes)) => {
            tracing::debug!(artifact_id = %id, "Cache hit");
            return Ok(bytes);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(artifact_id = %id, error = %e, "Cache read failed — falling back to durable store");
        }
    }

    let bytes = store.download(&id)?;

    if let Err(e) = cache.put(&id, &bytes) {
        tracing::warn!(artifact_id = %id, error = %e, "Cache repopulation failed");
    }
    tracing::debug!(artifact_id = %id, size = bytes.len(), "Served from durable store");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object::MemoryObjectStore;

    fn fixture() -> (tempfile::TempDir, ArtifactCache, MemoryObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache")).unwrap();
        (dir, cache, MemoryObjectStore::new())
    }

    #[test]
    fn cache_hit_returns_without_touching_durable_store() {
        let (_dir, cache, store) = fixture();
        let id = ArtifactId::generate();
        cache.put(&id, b"cached bytes").unwrap();
        // Durable store is down; a cache hit must still succeed.
        store.set_unavailable(true);

        let bytes = fetch_artifact(&cache, &store, &id.to_string()).unwrap();
        assert_eq!(bytes, b"cached bytes");
    }

    #[test]
    fn cache_miss_falls_back_and_repopulates() {
        let (_dir, cache, store) = fixture();
        let id = ArtifactId::generate();
        store.upload(&id, b"durable bytes").unwrap();

        let bytes = fetch_artifact(&cache, &store, &id.to_string()).unwrap();
        assert_eq!(bytes, b"durable bytes");

        // Repopulation verified by a cache-only read.
        assert_eq!(cache.get(&id).unwrap().unwrap(), b"durable bytes");
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        let (_dir, cache, store) = fixture();
        let never_issued = ArtifactId::generate();

        match fetch_artifact(&cache, &store, &never_issued.to_string()) {
            Err(StoreError::NotFound) => {}
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn malformed_identifier_is_not_found_not_invalid() {
        let (_dir, cache, store) = fixture();

        for raw in ["../../etc/passwd", "not-a-uuid", "", "DEADBEEF"] {
            match fetch_artifact(&cache, &store, raw) {
                Err(StoreError::NotFound) => {}
                other => panic!("Expected NotFound for {raw:?}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn outage_is_unavailable_not_not_found() {
        let (_dir, cache, store) = fixture();
        let id = ArtifactId::generate();
        store.upload(&id, b"bytes").unwrap();
        store.set_unavailable(true);

        match fetch_artifact(&cache, &store, &id.to_string()) {
            Err(StoreError::Unavailable(_)) => {}
            other => panic!("Expected Unavailable, got: {other:?}"),
        }
    }
}
