//! Raw records as delivered by the case store
//!
//! Records arrive loosely typed: kinds and relations are free strings. They are
//! mapped onto the closed [`NodeKind`](crate::NodeKind) and
//! [`RelationType`](crate::RelationType) enums at ingestion time; nothing
//! downstream of the graph builder sees these strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entity (person, organization, or case) as stored externally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// External record id (the source of the stable node id)
    pub external_id: String,

    /// Entity kind, e.g. "person", "organization", "case"
    pub kind: String,

    /// Human-readable name
    #[serde(default)]
    pub display_name: String,

    /// External ids of the cases this entity appears in
    #[serde(default)]
    pub case_refs: Vec<String>,

    /// Free-form metadata (role, affiliation, status, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Last modification timestamp; never influences the built graph
    #[serde(default)]
    pub updated_at: Option<u64>,
}

impl EntityRecord {
    /// Create a new entity record
    pub fn new(
        external_id: impl Into<String>,
        kind: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            kind: kind.into(),
            display_name: display_name.into(),
            case_refs: Vec::new(),
            attributes: BTreeMap::new(),
            updated_at: None,
        }
    }

    /// Add a case reference
    pub fn with_case_ref(mut self, case_id: impl Into<String>) -> Self {
        self.case_refs.push(case_id.into());
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set the modification timestamp
    pub fn with_updated_at(mut self, updated_at: u64) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}

/// A relationship between two entities as stored externally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// External id of the source entity
    pub source_id: String,

    /// External id of the target entity
    pub target_id: String,

    /// Relation name, e.g. "represents", "opposing_party"
    pub relation: String,

    /// Confidence in [0, 1]; absent for explicit source data
    #[serde(default)]
    pub confidence: Option<f64>,

    /// Last modification timestamp; never influences the built graph
    #[serde(default)]
    pub updated_at: Option<u64>,
}

impl RelationshipRecord {
    /// Create a new relationship record
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation: relation.into(),
            confidence: None,
            updated_at: None,
        }
    }

    /// Set an explicit confidence (for inferred ties)
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set the modification timestamp
    pub fn with_updated_at(mut self, updated_at: u64) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}

/// Normalize a free-form token: trimmed, lowercase, `-` and spaces as `_`
pub(crate) fn normalize_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token(" Opposing-Party "), "opposing_party");
        assert_eq!(normalize_token("FAMILY TIE"), "family_tie");
        assert_eq!(normalize_token("person"), "person");
    }

    #[test]
    fn test_entity_record_defaults_from_json() {
        let json = r#"{"external_id": "p1", "kind": "person"}"#;
        let record: EntityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.external_id, "p1");
        assert!(record.display_name.is_empty());
        assert!(record.case_refs.is_empty());
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_relationship_builder() {
        let record = RelationshipRecord::new("a", "b", "family_tie")
            .with_confidence(0.4)
            .with_updated_at(17);
        assert_eq!(record.confidence, Some(0.4));
        assert_eq!(record.updated_at, Some(17));
    }
}
