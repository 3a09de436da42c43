//! Extraction record types and the extractor trait seam.

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Caller preferences that shape extraction and rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderPrefs {
    /// Shorten the candidate's name to "First L." in the rendered artifact.
    pub shorten_name: bool,
    /// Free-text hints forwarded to the extraction prompt
    /// (e.g. skills to emphasize for a specific role).
    pub keyword_hints: Option<String>,
    /// Extra paragraph appended to the profile section.
    pub extra_profile_text: Option<String>,
}

/// Structured CV data returned by the extraction collaborator.
///
/// Transient: never persisted independently — only the artifact rendered
/// from it is. Every field defaults when the model omits it; rendering
/// decides whether the record is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CvRecord {
    pub name: String,
    pub title: String,
    pub profile_text: String,
    /// Skills the model flagged as most relevant; rendered first.
    pub highlight_skills: Vec<String>,
    pub skills: Vec<String>,
    pub work_experience: Vec<WorkEntry>,
    pub education: Vec<EducationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkEntry {
    pub title: String,
    pub company: String,
    pub time_period: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationEntry {
    pub degree: String,
    pub school: String,
    pub time_period: String,
    pub description: String,
}

/// Seam over the external generative-extraction collaborator.
pub trait CvExtractor: Send + Sync {
    fn extract(&self, document: &[u8], prefs: &RenderPrefs) -> Result<CvRecord, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_deserializes_with_all_fields_missing() {
        let record: CvRecord = serde_json::from_str("{}").unwrap();
        assert!(record.name.is_empty());
        assert!(record.skills.is_empty());
        assert!(record.work_experience.is_empty());
    }

    #[test]
    fn record_deserializes_camel_case_fields() {
        let json = r#"{
            "name": "John Doe",
            "profileText": "Experienced performer.",
            "highlightSkills": ["Acrobatics"],
            "workExperience": [{"title": "Lead Actor", "company": "City Theater", "timePeriod": "2024", "description": "Lead roles."}]
        }"#;
        let record: CvRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "John Doe");
        assert_eq!(record.profile_text, "Experienced performer.");
        assert_eq!(record.highlight_skills, vec!["Acrobatics"]);
        assert_eq!(record.work_experience[0].company, "City Theater");
        assert_eq!(record.work_experience[0].time_period, "2024");
    }

    #[test]
    fn entry_fields_default_individually() {
        let json = r#"{"workExperience": [{"title": "Actor"}]}"#;
        let record: CvRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.work_experience[0].title, "Actor");
        assert!(record.work_experience[0].description.is_empty());
    }
}
