//! Generative extraction — turns an uploaded CV document into a
//! structured `CvRecord` via an external model endpoint.
//!
//! The model's output is untrusted text and is parsed defensively; a
//! response without a well-formed JSON record fails the whole extraction
//! rather than guessing at partial data.

pub mod client;
pub mod parser;
pub mod types;

pub use client::HttpCvExtractor;
pub use types::{CvExtractor, CvRecord, EducationEntry, RenderPrefs, WorkEntry};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Cannot reach extraction endpoint at {0}")]
    Connection(String),

    #[error("Extraction request failed: {0}")]
    Http(String),

    #[error("Extraction endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),
}
