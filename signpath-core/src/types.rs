//! Core identifier and enum types shared by every record family.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, opaque identifier of a learner.
///
/// Serialized as a bare string so stored documents keep the `learnerId`
/// field flat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(String);

impl LearnerId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LearnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LearnerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier of one lesson-completion event.
///
/// Every downstream write of a completion is keyed on this ID, which is
/// what makes re-running a half-applied completion safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionId(pub Uuid);

impl CompletionId {
    /// Create a new completion ID with a UUIDv7 (time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CompletionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompletionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of a single attempt at a level.
///
/// Stored as the lowercase strings `"success"` / `"failure"`. Documents
/// written by the older Spanish-language clients used `"exito"` /
/// `"fallo"`; both spellings are accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    #[serde(alias = "exito")]
    Success,
    #[serde(alias = "fallo")]
    Failure,
}

impl AttemptOutcome {
    /// Convert to the stored string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Convert to the legacy stored string representation.
    #[must_use]
    pub fn as_legacy_str(&self) -> &'static str {
        match self {
            Self::Success => "exito",
            Self::Failure => "fallo",
        }
    }

    /// Parse a caller-supplied outcome, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "exito" => Some(Self::Success),
            "failure" | "fallo" => Some(Self::Failure),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_parse_accepts_both_vocabularies() {
        assert_eq!(AttemptOutcome::parse("success"), Some(AttemptOutcome::Success));
        assert_eq!(AttemptOutcome::parse(" Exito "), Some(AttemptOutcome::Success));
        assert_eq!(AttemptOutcome::parse("FALLO"), Some(AttemptOutcome::Failure));
        assert_eq!(AttemptOutcome::parse("failure"), Some(AttemptOutcome::Failure));
        assert_eq!(AttemptOutcome::parse("maybe"), None);
        assert_eq!(AttemptOutcome::parse(""), None);
    }

    #[test]
    fn outcome_serializes_lowercase() {
        let json = serde_json::to_string(&AttemptOutcome::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }

    #[test]
    fn outcome_deserializes_legacy_spelling() {
        let outcome: AttemptOutcome = serde_json::from_str("\"fallo\"").unwrap();
        assert_eq!(outcome, AttemptOutcome::Failure);
    }

    #[test]
    fn learner_id_serializes_as_plain_string() {
        let id = LearnerId::new("u1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u1\"");
        assert_eq!(id.to_string(), "u1");
    }

    #[test]
    fn completion_ids_are_unique() {
        assert_ne!(CompletionId::new(), CompletionId::new());
    }
}
