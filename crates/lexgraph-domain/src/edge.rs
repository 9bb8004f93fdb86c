//! Typed relationships between graph nodes

use crate::records::normalize_token;
use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Type of relationship between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// Party (or its counsel) represented by the firm in a case, or counsel of a party
    Represents,

    /// Party adverse to a case or to another party
    OpposingParty,

    /// Family relationship
    FamilyTie,

    /// Ownership, investment or other financial stake
    FinancialInterest,

    /// Employee to employer
    Employment,

    /// Parties on the same side of a case
    CoParty,

    /// Anything else the source recorded
    Other,
}

impl RelationType {
    /// All relation types
    pub const ALL: [RelationType; 7] = [
        RelationType::Represents,
        RelationType::OpposingParty,
        RelationType::FamilyTie,
        RelationType::FinancialInterest,
        RelationType::Employment,
        RelationType::CoParty,
        RelationType::Other,
    ];

    /// Parse a raw relation string (case-insensitive, `-`/space tolerant)
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "represents" | "representation" => Some(RelationType::Represents),
            "opposing_party" | "opposes" | "adverse" => Some(RelationType::OpposingParty),
            "family_tie" | "family" => Some(RelationType::FamilyTie),
            "financial_interest" | "financial" => Some(RelationType::FinancialInterest),
            "employment" | "employed_by" => Some(RelationType::Employment),
            "co_party" | "coparty" => Some(RelationType::CoParty),
            "other" => Some(RelationType::Other),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Represents => "REPRESENTS",
            RelationType::OpposingParty => "OPPOSING_PARTY",
            RelationType::FamilyTie => "FAMILY_TIE",
            RelationType::FinancialInterest => "FINANCIAL_INTEREST",
            RelationType::Employment => "EMPLOYMENT",
            RelationType::CoParty => "CO_PARTY",
            RelationType::Other => "OTHER",
        }
    }

    /// Whether edges of this type carry a direction
    pub fn is_directed(&self) -> bool {
        matches!(
            self,
            RelationType::Represents
                | RelationType::OpposingParty
                | RelationType::FinancialInterest
                | RelationType::Employment
        )
    }
}

/// A typed edge between two nodes of a snapshot
///
/// Undirected edges are normalized so that `source < target`, which makes
/// `(a, b, FAMILY_TIE)` and `(b, a, FAMILY_TIE)` the same edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node
    pub source: NodeId,

    /// Target node
    pub target: NodeId,

    /// Relation type
    pub relation: RelationType,

    /// Whether the edge is directed (derived from the relation)
    pub directed: bool,

    /// Confidence in [0.0, 1.0]
    pub confidence: f64,
}

impl Edge {
    /// Create a new edge
    ///
    /// # Panics
    /// Panics if confidence is outside [0, 1]
    pub fn new(source: NodeId, target: NodeId, relation: RelationType, confidence: f64) -> Self {
        assert!((0.0..=1.0).contains(&confidence), "Confidence must be in [0, 1]");

        let directed = relation.is_directed();
        let (source, target) = if !directed && target < source {
            (target, source)
        } else {
            (source, target)
        };

        Self {
            source,
            target,
            relation,
            directed,
            confidence,
        }
    }

    /// Identity of the edge within a snapshot
    pub fn key(&self) -> (NodeId, NodeId, RelationType) {
        (self.source, self.target, self.relation)
    }

    /// Whether the edge has `id` at either end
    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint
    pub fn other_end(&self, id: NodeId) -> Option<NodeId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}
