//! Durable object store — the canonical copy of every artifact.
//!
//! `upload` is the durability commit point: once it returns success the
//! artifact is considered permanently recoverable. The trait seam keeps the
//! pipeline testable with an in-process implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::StoreError;
use crate::id::ArtifactId;

/// Fixed key layout: `{prefix}/{identifier}{suffix}`.
const KEY_PREFIX: &str = "artifacts";
const KEY_SUFFIX: &str = ".html";

/// Object key for an artifact.
pub fn object_key(id: &ArtifactId) -> String {
    format!("{KEY_PREFIX}/{id}{KEY_SUFFIX}")
}

/// Seam over the remote blob store.
pub trait ObjectStore: Send + Sync {
    /// Durably persist an artifact. Overwrites any existing object.
    fn upload(&self, id: &ArtifactId, bytes: &[u8]) -> Result<(), StoreError>;

    /// Fetch an artifact. `NotFound` when no object exists for the id;
    /// every other failure is `Unavailable` and retryable.
    fn download(&self, id: &ArtifactId) -> Result<Vec<u8>, StoreError>;

    /// Remove an artifact. Deleting a nonexistent object succeeds, keeping
    /// the sweeper's retry loop simple.
    fn delete(&self, id: &ArtifactId) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Blob store client speaking plain HTTP PUT/GET/DELETE against a bucket
/// base URL, with a bounded timeout on every call.
pub struct HttpObjectStore {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, auth_token: Option<String>, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            client,
            timeout_secs,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            &config.object_store_url,
            config.object_store_token.clone(),
            config.http_timeout_secs,
        )
    }

    fn object_url(&self, id: &ArtifactId) -> String {
        format!("{}/{}", self.base_url, object_key(id))
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn classify_transport(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Unavailable(format!(
                "request timed out after {}s",
                self.timeout_secs
            ))
        } else if e.is_connect() {
            StoreError::Unavailable(format!("cannot reach {}", self.base_url))
        } else {
            StoreError::Unavailable(e.to_string())
        }
    }
}

impl ObjectStore for HttpObjectStore {
    fn upload(&self, id: &ArtifactId, bytes: &[u8]) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.put(self.object_url(id)))
            .header(reqwest::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(bytes.to_vec())
            .send()
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!(
                "upload returned HTTP {status}"
            )));
        }
        tracing::debug!(artifact_id = %id, size = bytes.len(), "Artifact uploaded");
        Ok(())
    }

    fn download(&self, id: &ArtifactId) -> Result<Vec<u8>, StoreError> {
        let response = self
            .authorize(self.client.get(self.object_url(id)))
            .send()
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!(
                "download returned HTTP {status}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| self.classify_transport(e))?;
        Ok(bytes.to_vec())
    }

    fn delete(&self, id: &ArtifactId) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.delete(self.object_url(id)))
            .send()
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        // 404 counts as success: the object is gone either way.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(StoreError::Unavailable(format!(
            "delete returned HTTP {status}"
        )))
    }
}

// ---------------------------------------------------------------------------
// In-process implementation
// ---------------------------------------------------------------------------

/// In-process object store for development mode and tests.
///
/// `set_unavailable(true)` makes every operation fail with
/// `StoreError::Unavailable`, which is how partial-failure paths are
/// exercised in tests.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the injected outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.objects
            .lock()
            .map(|m| m.contains_key(&object_key(id)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StoreError> {
        self.objects
            .lock()
            .map_err(|_| StoreError::Unavailable("object store lock poisoned".into()))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn upload(&self, id: &ArtifactId, bytes: &[u8]) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock()?.insert(object_key(id), bytes.to_vec());
        Ok(())
    }

    fn download(&self, id: &ArtifactId) -> Result<Vec<u8>, StoreError> {
        self.check_available()?;
        self.lock()?
            .get(&object_key(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn delete(&self, id: &ArtifactId) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock()?.remove(&object_key(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_has_fixed_prefix_and_suffix() {
        let id = ArtifactId::generate();
        let key = object_key(&id);
        assert_eq!(key, format!("artifacts/{id}.html"));
    }

    #[test]
    fn memory_store_upload_download_round_trip() {
        let store = MemoryObjectStore::new();
        let id = ArtifactId::generate();

        store.upload(&id, b"<html>artifact</html>").unwrap();
        assert_eq!(store.download(&id).unwrap(), b"<html>artifact</html>");
    }

    #[test]
    fn download_missing_object_is_not_found() {
        let store = MemoryObjectStore::new();
        let id = ArtifactId::generate();

        match store.download(&id) {
            Err(StoreError::NotFound) => {}
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn delete_is_idempotent() {
        let store = MemoryObjectStore::new();
        let id = ArtifactId::generate();

        store.upload(&id, b"bytes").unwrap();
        store.delete(&id).unwrap();
        assert!(!store.contains(&id));

        // Deleting an already-deleted object still succeeds.
        store.delete(&id).unwrap();
    }

    #[test]
    fn injected_outage_fails_every_operation_as_unavailable() {
        let store = MemoryObjectStore::new();
        let id = ArtifactId::generate();
        store.upload(&id, b"bytes").unwrap();

        store.set_unavailable(true);
        assert!(matches!(
            store.upload(&id, b"x"),
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.download(&id),
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.delete(&id), Err(StoreError::Unavailable(_))));

        // Recovery: the original object survived the outage.
        store.set_unavailable(false);
        assert_eq!(store.download(&id).unwrap(), b"bytes");
    }

    #[test]
    fn upload_overwrites_existing_object() {
        let store = MemoryObjectStore::new();
        let id = ArtifactId::generate();

        store.upload(&id, b"v1").unwrap();
        store.upload(&id, b"v2").unwrap();
        assert_eq!(store.download(&id).unwrap(), b"v2");
        assert_eq!(store.len(), 1);
    }
}
