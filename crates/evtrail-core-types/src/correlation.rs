//! Correlation identifier for request tracking
//!
//! A `CorrelationId` names one logical unit of work as it moves across
//! threads, async tasks and subprocesses.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token identifying one logical task or request
///
/// Externally supplied values are only required to be non-blank; locally
/// generated ones are 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh random id (UUIDv4, simple hex form)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse an externally supplied value
    ///
    /// Surrounding whitespace is trimmed. Returns `None` when nothing is left.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id and return the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_is_32_lowercase_hex() {
        let id = CorrelationId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = CorrelationId::parse("  req-42\n").unwrap();
        assert_eq!(id.as_str(), "req-42");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(CorrelationId::parse("").is_none());
        assert!(CorrelationId::parse(" \t ").is_none());
    }

    #[test]
    fn test_serialization_is_transparent() {
        let id = CorrelationId::parse("abc").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: CorrelationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
