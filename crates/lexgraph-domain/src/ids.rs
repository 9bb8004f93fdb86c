//! Identifier types for graph nodes and cases

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Namespace for deriving node ids from external record ids (UUIDv5)
const NODE_NAMESPACE: uuid::Uuid = uuid::Uuid::from_u128(0x6c65_7867_7261_5068_8a1d_4e0f_9b3c_2d51);

/// Stable identifier for a node in a graph snapshot
///
/// Node ids are UUIDv5 values derived from the external record id, so the same
/// external entity maps to the same node id in every snapshot:
/// - No coordination or lookup table required
/// - Ordering of the raw value matches ordering of the rendered UUID string,
///   which makes "lexicographically smallest" well defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u128);

impl NodeId {
    /// Derive the node id for an external record id
    ///
    /// # Examples
    ///
    /// ```
    /// use lexgraph_domain::NodeId;
    ///
    /// let a = NodeId::from_external("client-42");
    /// let b = NodeId::from_external("client-42");
    /// assert_eq!(a, b);
    /// assert_ne!(a, NodeId::from_external("client-43"));
    /// ```
    pub fn from_external(external_id: &str) -> Self {
        Self(uuid::Uuid::new_v5(&NODE_NAMESPACE, external_id.as_bytes()).as_u128())
    }

    /// Create a NodeId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a NodeId from its UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid node id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NodeId::from_string(&s).map_err(serde::de::Error::custom)
    }
}

/// External case identifier, as known to the case store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    /// Create a case id
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the case id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaseId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CaseId {
    fn from(value: String) -> Self {
        Self(value)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Ordering of ids matches ordering of their rendered strings
        #[test]
        fn test_order_matches_string_order(a: u128, b: u128) {
            let id_a = NodeId::from_value(a);
            let id_b = NodeId::from_value(b);
            prop_assert_eq!(id_a.cmp(&id_b), id_a.to_string().cmp(&id_b.to_string()));
        }

        #[test]
        fn test_string_roundtrip(value: u128) {
            let id = NodeId::from_value(value);
            match NodeId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}
