//! Competitor and snapshot identity types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a competitor in a training corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CompetitorId(pub String);

impl CompetitorId {
    pub fn new(id: impl Into<String>) -> Self {
        CompetitorId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An id must be non-empty and free of surrounding whitespace.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.trim() == self.0
    }
}

impl fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CompetitorId {
    fn from(s: &str) -> Self {
        CompetitorId(s.to_string())
    }
}

/// Version tag of a published corpus/model pair.
///
/// Outputs carry this tag so callers can detect stale results after a new
/// snapshot is published.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SnapshotVersion(pub String);

impl SnapshotVersion {
    pub fn new(version: impl Into<String>) -> Self {
        SnapshotVersion(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A version tag must be non-empty and free of surrounding whitespace.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.trim() == self.0
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SnapshotVersion {
    fn from(s: &str) -> Self {
        SnapshotVersion(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_validity() {
        assert!(SnapshotVersion::new("2024.03").is_valid());
        assert!(!SnapshotVersion::new("").is_valid());
        assert!(!SnapshotVersion::new(" v1").is_valid());
    }

    #[test]
    fn competitor_id_validity() {
        assert!(CompetitorId::new("HAM").is_valid());
        assert!(!CompetitorId::new("").is_valid());
        assert!(!CompetitorId::new("VER ").is_valid());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = CompetitorId::new("HAM");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"HAM\"");
        let v: SnapshotVersion = serde_json::from_str("\"v7\"").unwrap();
        assert_eq!(v.as_str(), "v7");
    }
}
