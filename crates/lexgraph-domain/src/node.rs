//! Graph nodes: people, organizations and cases

use crate::records::normalize_token;
use crate::{CaseId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Attribute key holding a party's role (plaintiff, defendant, counsel, ...)
pub const ROLE_ATTRIBUTE: &str = "role";

/// Attribute key marking firm affiliation (`affiliation = "firm"`)
pub const AFFILIATION_ATTRIBUTE: &str = "affiliation";

/// Attribute key holding a case's status
pub const STATUS_ATTRIBUTE: &str = "status";

/// Case statuses that count as closed; anything else is open
const CLOSED_STATUSES: &[&str] = &["closed", "archived", "dismissed", "settled"];

/// Roles that make a party firm-controlled
const FIRM_ROLES: &[&str] = &["staff", "counsel", "attorney", "partner", "associate", "paralegal"];

/// Kind of node in the conflict graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// A natural person
    Person,

    /// A company, agency or other organization
    Organization,

    /// A legal case or matter
    Case,
}

impl NodeKind {
    /// Parse a raw kind string (case-insensitive)
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "person" | "individual" => Some(NodeKind::Person),
            "organization" | "organisation" | "company" | "org" => Some(NodeKind::Organization),
            "case" | "matter" => Some(NodeKind::Case),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Person => "PERSON",
            NodeKind::Organization => "ORGANIZATION",
            NodeKind::Case => "CASE",
        }
    }

    /// People and organizations are parties; cases are not
    pub fn is_party(&self) -> bool {
        matches!(self, NodeKind::Person | NodeKind::Organization)
    }
}

/// A node in a graph snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier
    pub id: NodeId,

    /// Node kind
    pub kind: NodeKind,

    /// Human-readable name
    pub display_name: String,

    /// Cases this entity appears in (empty for case nodes)
    #[serde(default)]
    pub case_refs: BTreeSet<CaseId>,

    /// Rule metadata
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Node {
    /// Create a new node without case references or attributes
    pub fn new(id: NodeId, kind: NodeKind, display_name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            display_name: display_name.into(),
            case_refs: BTreeSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add a case reference
    pub fn with_case_ref(mut self, case_id: impl Into<CaseId>) -> Self {
        self.case_refs.insert(case_id.into());
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Whether this node is a party (person or organization)
    pub fn is_party(&self) -> bool {
        self.kind.is_party()
    }

    /// Whether this party is controlled by the firm (staff or the firm itself)
    pub fn is_firm_controlled(&self) -> bool {
        if !self.is_party() {
            return false;
        }
        let affiliated = self
            .attribute(AFFILIATION_ATTRIBUTE)
            .is_some_and(|a| normalize_token(a) == "firm");
        let staff_role = self
            .attribute(ROLE_ATTRIBUTE)
            .is_some_and(|r| FIRM_ROLES.contains(&normalize_token(r).as_str()));
        affiliated || staff_role
    }

    /// Whether this is a case that has not been closed
    pub fn is_open_case(&self) -> bool {
        if self.kind != NodeKind::Case {
            return false;
        }
        match self.attribute(STATUS_ATTRIBUTE) {
            Some(status) => !CLOSED_STATUSES.contains(&normalize_token(status).as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str) -> Node {
        Node::new(NodeId::from_external(name), NodeKind::Person, name)
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(NodeKind::parse("Person"), Some(NodeKind::Person));
        assert_eq!(NodeKind::parse(" organisation "), Some(NodeKind::Organization));
        assert_eq!(NodeKind::parse("MATTER"), Some(NodeKind::Case));
        assert_eq!(NodeKind::parse("vehicle"), None);
    }

    #[test]
    fn test_firm_controlled() {
        assert!(person("a").with_attribute("role", "Counsel").is_firm_controlled());
        assert!(person("b").with_attribute("affiliation", "FIRM").is_firm_controlled());
        assert!(!person("c").with_attribute("role", "plaintiff").is_firm_controlled());

        let case = Node::new(NodeId::from_external("k"), NodeKind::Case, "k")
            .with_attribute("affiliation", "firm");
        assert!(!case.is_firm_controlled());
    }

    #[test]
    fn test_open_case() {
        let case = |status: Option<&str>| {
            let node = Node::new(NodeId::from_external("case"), NodeKind::Case, "case");
            match status {
                Some(s) => node.with_attribute("status", s),
                None => node,
            }
        };
        assert!(case(None).is_open_case());
        assert!(case(Some("open")).is_open_case());
        assert!(case(Some("pending")).is_open_case());
        assert!(!case(Some("Closed")).is_open_case());
        assert!(!case(Some("settled")).is_open_case());
        assert!(!person("p").is_open_case());
    }
}
