//! Ingestion pipeline — receive document → extract → render → commit.
//!
//! Steps run in a fixed order; a step's failure aborts all later steps but
//! never rolls back earlier successful external side effects. The durable
//! upload is the commit point: a metadata insert never happens before it,
//! and an insert failure after it leaves an orphan blob that only an
//! out-of-band audit can reclaim (logged at `error` for that purpose).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;

use crate::extract::{CvExtractor, ExtractionError, RenderPrefs};
use crate::id::ArtifactId;
use crate::render::{self, ContactInfo, RenderError};
use crate::store::index::{self, ArtifactRecord};
use crate::store::{ArtifactCache, ObjectStore, StoreError};

/// Accepted document format, by magic bytes.
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Unsupported document format — only PDF is accepted")]
    UnsupportedFormat,

    #[error("Document too large: {size} bytes exceeds {max} byte limit")]
    DocumentTooLarge { size: u64, max: u64 },

    #[error("Intake storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One ingestion request.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub document: Vec<u8>,
    /// Client-supplied filename, sanitized before it touches the intake dir.
    pub original_filename: String,
    pub owner_key: String,
    pub contact: ContactInfo,
    pub prefs: RenderPrefs,
}

/// Returned on success.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub id: ArtifactId,
    /// Retrieval reference for the caller (`/view/{id}`).
    pub view_url: String,
    pub artifact_bytes: usize,
}

/// Orchestrates the ingestion steps with injected store and collaborator
/// dependencies, so tests can substitute fakes at every seam.
pub struct IngestPipeline {
    extractor: Box<dyn CvExtractor>,
    cache: ArtifactCache,
    object_store: Arc<dyn ObjectStore>,
    intake_dir: PathBuf,
    max_document_bytes: u64,
}

impl IngestPipeline {
    pub fn new(
        extractor: Box<dyn CvExtractor>,
        cache: ArtifactCache,
        object_store: Arc<dyn ObjectStore>,
        intake_dir: PathBuf,
        max_document_bytes: u64,
    ) -> Self {
        Self {
            extractor,
            cache,
            object_store,
            intake_dir,
            max_document_bytes,
        }
    }

    /// Run the full pipeline for one request.
    pub fn ingest(
        &self,
        conn: &Connection,
        request: &IngestRequest,
    ) -> Result<IngestOutcome, IngestError> {
        // Step 1: validate document type and size
        validate_document(&request.document, self.max_document_bytes)?;

        // Step 2: persist the raw document for traceability
        let staged = self.stage_intake(request)?;
        tracing::debug!(path = %staged.display(), "Raw document staged");

        // Step 3: extraction
        let mut record = self
            .extractor
            .extract(&request.document, &request.prefs)?;

        // Step 4: render
        if request.prefs.shorten_name {
            record.name = render::shorten_name(&record.name);
        }
        let html = render::render_cv(
            &record,
            &request.contact,
            request.prefs.extra_profile_text.as_deref(),
        )?;
        let bytes = html.into_bytes();

        // Step 5: identifier
        let id = ArtifactId::generate();

        // Step 6: local cache, best-effort
        if let Err(e) = self.cache.put(&id, &bytes) {
            tracing::warn!(artifact_id = %id, error = %e, "Cache write failed — continuing");
        }

        // Step 7: durable upload — the commit point
        self.object_store.upload(&id, &bytes)?;

        // Step 8: metadata insert
        let row = ArtifactRecord {
            id,
            owner_key: request.owner_key.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = index::insert_artifact(conn, &row) {
            // The blob is already durable with no row pointing at it.
            tracing::error!(
                artifact_id = %id,
                error = %e,
                "Metadata insert failed after durable upload — orphan blob needs audit"
            );
            return Err(e.into());
        }

        tracing::info!(
            artifact_id = %id,
            owner = %request.owner_key,
            size = bytes.len(),
            "Artifact committed"
        );

        Ok(IngestOutcome {
            id,
            view_url: id.view_path(),
            artifact_bytes: bytes.len(),
        })
    }

    fn stage_intake(&self, request: &IngestRequest) -> Result<PathBuf, IngestError> {
        std::fs::create_dir_all(&self.intake_dir)
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;

        let filename = sanitize_filename(&request.original_filename);
        let target = self.intake_dir.join(filename);
        std::fs::write(&target, &request.document)
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        Ok(target)
    }
}

fn validate_document(bytes: &[u8], max: u64) -> Result<(), IngestError> {
    if bytes.len() as u64 > max {
        return Err(IngestError::DocumentTooLarge {
            size: bytes.len() as u64,
            max,
        });
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(IngestError::UnsupportedFormat);
    }
    Ok(())
}

/// Reduce a client-supplied filename to a safe path component.
/// Keeps alphanumerics, dots, dashes, and underscores; anything else
/// (separators, traversal sequences) is dropped.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}
