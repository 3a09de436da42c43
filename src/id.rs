//! Artifact identifiers — 128-bit random, opaque, path-safe.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier referencing one artifact across all three stores.
///
/// Generated once per ingestion, never reused. Only the canonical
/// hyphenated lowercase form parses, so a parsed id is safe to embed in
/// file paths and URL segments without further sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(Uuid);

/// A string that is not a canonically-formatted artifact identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid artifact identifier")]
pub struct InvalidIdentifier;

impl ArtifactId {
    /// Generate a fresh random identifier. No error conditions; collision
    /// probability is negligible at any realistic volume.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The retrieval reference for this artifact.
    pub fn view_path(&self) -> String {
        format!("/view/{self}")
    }
}

impl FromStr for ArtifactId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = Uuid::parse_str(s).map_err(|_| InvalidIdentifier)?;
        // Uuid::parse_str also accepts simple, braced, and urn forms.
        // Require the exact canonical rendering so every accepted string
        // is byte-identical to what we emit.
        if parsed.as_hyphenated().to_string() != s {
            return Err(InvalidIdentifier);
        }
        Ok(Self(parsed))
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.as_hyphenated().fmt(f)
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = InvalidIdentifier;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_distinct() {
        let a = ArtifactId::generate();
        let b = ArtifactId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn concurrent_generation_yields_no_collisions() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..100).map(|_| ArtifactId::generate()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate identifier generated");
            }
        }
        assert_eq!(seen.len(), 800);
    }

    #[test]
    fn display_parse_round_trip() {
        let id = ArtifactId::generate();
        let parsed: ArtifactId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_non_canonical_forms() {
        let id = ArtifactId::generate();
        let simple = id.to_string().replace('-', "");
        assert!(simple.parse::<ArtifactId>().is_err());

        let upper = id.to_string().to_uppercase();
        assert!(upper.parse::<ArtifactId>().is_err());

        let urn = format!("urn:uuid:{id}");
        assert!(urn.parse::<ArtifactId>().is_err());
    }

    #[test]
    fn rejects_path_traversal_input() {
        assert!("../../etc/passwd".parse::<ArtifactId>().is_err());
        assert!("..".parse::<ArtifactId>().is_err());
        assert!("".parse::<ArtifactId>().is_err());
        assert!("not-a-uuid".parse::<ArtifactId>().is_err());
    }

    #[test]
    fn view_path_embeds_canonical_form() {
        let id = ArtifactId::generate();
        assert_eq!(id.view_path(), format!("/view/{id}"));
    }
}
