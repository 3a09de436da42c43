//! HTTP client for the generative extraction endpoint.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::parser::parse_cv_response;
use super::types::{CvExtractor, CvRecord, RenderPrefs};
use super::ExtractionError;

const SYSTEM_PROMPT: &str = "You are a CV extraction engine. Read the attached \
document and return a single JSON object with these fields: name (string), \
title (string), profileText (string), highlightSkills (array of strings), \
skills (array of strings), workExperience (array of {title, company, \
timePeriod, description}), education (array of {degree, school, timePeriod, \
description}). Preserve the document's ordering of entries. Return JSON only, \
no commentary.";

/// Blocking client for a generative model endpoint, mirroring the wire
/// shape of a local inference server (`/api/generate`).
pub struct HttpCvExtractor {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpCvExtractor {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
            timeout_secs,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            &config.extraction_url,
            &config.extraction_model,
            config.extraction_api_key.clone(),
            config.http_timeout_secs,
        )
    }

    fn build_prompt(prefs: &RenderPrefs) -> String {
        let mut prompt = String::from("Extract the CV data from the attached document.");
        if let Some(hints) = prefs.keyword_hints.as_deref() {
            let hints = hints.trim();
            if !hints.is_empty() {
                prompt.push_str(
                    "\nWhen choosing highlightSkills, prioritize skills related to: ",
                );
                prompt.push_str(hints);
            }
        }
        prompt
    }
}

/// Request body for the extraction endpoint.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    /// Base64-encoded document bytes.
    document: String,
    stream: bool,
}

/// Response body from the extraction endpoint.
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl CvExtractor for HttpCvExtractor {
    fn extract(&self, document: &[u8], prefs: &RenderPrefs) -> Result<CvRecord, ExtractionError> {
        let url = format!("{}/api/generate", self.base_url);
        let prompt = Self::build_prompt(prefs);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            system: SYSTEM_PROMPT,
            document: BASE64.encode(document),
            stream: false,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                ExtractionError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                ExtractionError::Http(format!(
                    "request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ExtractionError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

        parse_cv_response(&generated.response)
    }
}

/// Extractor returning canned model output, run through the real parser.
/// Lets pipeline tests exercise both well-formed and malformed responses.
#[cfg(test)]
pub struct CannedExtractor {
    pub response: String,
}

#[cfg(test)]
impl CannedExtractor {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

#[cfg(test)]
impl CvExtractor for CannedExtractor {
    fn extract(&self, _document: &[u8], _prefs: &RenderPrefs) -> Result<CvRecord, ExtractionError> {
        parse_cv_response(&self.response)
    }
}
