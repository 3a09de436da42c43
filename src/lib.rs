//! cvpress — CV artifact lifecycle pipeline.
//!
//! Accepts an uploaded CV document, sends it to a generative model for
//! structured extraction, renders the result into a styled HTML artifact,
//! and keeps that artifact coherent across three tiers: a local disk cache,
//! a durable object store, and a SQLite metadata index. A background
//! sweeper reclaims artifacts past the retention window from all three.
//!
//! The HTTP request layer, session handling, and credential storage are
//! external collaborators and live outside this crate.

pub mod config;
pub mod extract;
pub mod id;
pub mod ingest;
pub mod render;
pub mod retrieve;
pub mod store;
pub mod sweeper;

pub use config::Config;
pub use id::ArtifactId;
pub use ingest::{IngestError, IngestOutcome, IngestPipeline, IngestRequest};
pub use store::StoreError;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for an embedding binary.
///
/// Respects `RUST_LOG` when set, otherwise falls back to the crate default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
