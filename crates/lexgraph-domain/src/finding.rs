//! Conflict findings produced by the rule evaluator

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Identifier of a conflict rule
///
/// Variants are declared in lexical order of their names, so the derived
/// ordering is the evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleId {
    /// A party represented in one case is adverse in another
    AdverseRepresentation,

    /// A represented party has a family tie to an opposing party of the same case
    FamilyTieOpposing,

    /// Firm-controlled party holds a financial interest tied to an opposing party
    FinancialInterest,

    /// One party opposes two or more cases the firm represents
    SharedOpposingParty,
}

impl RuleId {
    /// All rules, in evaluation order
    pub const ALL: [RuleId; 4] = [
        RuleId::AdverseRepresentation,
        RuleId::FamilyTieOpposing,
        RuleId::FinancialInterest,
        RuleId::SharedOpposingParty,
    ];

    /// Stable rule name
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::AdverseRepresentation => "ADVERSE_REPRESENTATION",
            RuleId::FamilyTieOpposing => "FAMILY_TIE_OPPOSING",
            RuleId::FinancialInterest => "FINANCIAL_INTEREST",
            RuleId::SharedOpposingParty => "SHARED_OPPOSING_PARTY",
        }
    }
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Worth noting
    Low,
    /// Needs review
    Medium,
    /// Likely conflict
    High,
    /// Conflict between concurrently open matters
    Critical,
}

impl Severity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// One detected conflict of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictFinding {
    /// Node at the center of the conflict
    pub entity_id: NodeId,

    /// Rule that fired
    pub rule_id: RuleId,

    /// Severity
    pub severity: Severity,

    /// Nodes implicated alongside `entity_id`; sorted, non-empty, never
    /// containing `entity_id`
    pub related_entities: Vec<NodeId>,

    /// Minimum confidence of the edges the rule relied on
    pub confidence: f64,
}

impl ConflictFinding {
    /// Whether `id` is the center of this finding or one of its related entities
    pub fn involves(&self, id: NodeId) -> bool {
        self.entity_id == id || self.related_entities.contains(&id)
    }

    /// Canonical ordering: rule, entity, related entities, then severity and
    /// confidence (highest first) as tie-breakers
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.rule_id
            .cmp(&other.rule_id)
            .then_with(|| self.entity_id.cmp(&other.entity_id))
            .then_with(|| self.related_entities.cmp(&other.related_entities))
            .then_with(|| other.severity.cmp(&self.severity))
            .then_with(|| other.confidence.total_cmp(&self.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order_is_lexical() {
        let mut names: Vec<&str> = RuleId::ALL.iter().map(|r| r.as_str()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);
        assert!(RuleId::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_rule_serializes_by_name() {
        let json = serde_json::to_string(&RuleId::SharedOpposingParty).unwrap();
        assert_eq!(json, "\"SHARED_OPPOSING_PARTY\"");
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"CRITICAL\"");
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_involves() {
        let finding = ConflictFinding {
            entity_id: NodeId::from_value(1),
            rule_id: RuleId::FamilyTieOpposing,
            severity: Severity::Medium,
            related_entities: vec![NodeId::from_value(2)],
            confidence: 1.0,
        };
        assert!(finding.involves(NodeId::from_value(1)));
        assert!(finding.involves(NodeId::from_value(2)));
        assert!(!finding.involves(NodeId::from_value(3)));
    }
}
