//! Defensive parsing of model output into a `CvRecord`.

use super::types::CvRecord;
use super::ExtractionError;

/// Parse the model's response text into a `CvRecord`.
///
/// The response is untrusted: it may be bare JSON, a fenced ```json block
/// with surrounding prose, or garbage. Missing fields default; a response
/// with no parseable JSON record fails outright.
pub fn parse_cv_response(response: &str) -> Result<CvRecord, ExtractionError> {
    let json = extract_json_block(response)?;
    serde_json::from_str(&json).map_err(|e| ExtractionError::MalformedResponse(e.to_string()))
}

/// Pull the JSON object out of the response text.
fn extract_json_block(response: &str) -> Result<String, ExtractionError> {
    // Fenced block takes priority: models often wrap JSON in ```json ... ```
    if let Some(fence_start) = response.find("```json") {
        let content_start = fence_start + "```json".len();
        let content_end = response[content_start..].find("```").ok_or_else(|| {
            ExtractionError::MalformedResponse("unclosed JSON fence".into())
        })?;
        return Ok(response[content_start..content_start + content_end]
            .trim()
            .to_string());
    }

    // Otherwise take the outermost braces.
    let start = response
        .find('{')
        .ok_or_else(|| ExtractionError::MalformedResponse("no JSON object in response".into()))?;
    let end = response
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| ExtractionError::MalformedResponse("no JSON object in response".into()))?;

    Ok(response[start..=end].to_string())
}
