//! Immutable, versioned graph snapshots
//!
//! A snapshot is the materialization of one case's relationship graph at one
//! source version. Snapshots are validated on construction and never mutated;
//! when source data changes a new snapshot supersedes the old one.

use crate::{CaseId, Edge, Node, NodeId, RelationType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Reasons a set of nodes and edges cannot form a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// Two nodes share an id
    DuplicateNode(NodeId),

    /// An edge references a node that is not in the snapshot
    DanglingEdge {
        /// Source node
        source: NodeId,
        /// Target node
        target: NodeId,
    },

    /// An edge connects a node to itself
    SelfLoop(NodeId),

    /// Two edges share `(source, target, relation)`
    DuplicateEdge {
        /// Source node
        source: NodeId,
        /// Target node
        target: NodeId,
        /// Relation type
        relation: RelationType,
    },

    /// An edge confidence lies outside [0, 1]
    InvalidConfidence {
        /// Source node
        source: NodeId,
        /// Target node
        target: NodeId,
        /// Offending value
        confidence: f64,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::DuplicateNode(id) => write!(f, "duplicate node id {}", id),
            SnapshotError::DanglingEdge { source, target } => {
                write!(f, "edge {} -> {} references an unknown node", source, target)
            }
            SnapshotError::SelfLoop(id) => write!(f, "edge from {} to itself", id),
            SnapshotError::DuplicateEdge { source, target, relation } => write!(
                f,
                "duplicate edge {} -[{}]-> {}",
                source,
                relation.as_str(),
                target
            ),
            SnapshotError::InvalidConfidence { source, target, confidence } => write!(
                f,
                "edge {} -> {} has confidence {} outside [0, 1]",
                source, target, confidence
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Serialized form of a snapshot, validated on the way in
#[derive(Deserialize)]
struct SnapshotParts {
    case_id: CaseId,
    version: u64,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl TryFrom<SnapshotParts> for GraphSnapshot {
    type Error = SnapshotError;

    fn try_from(parts: SnapshotParts) -> Result<Self, Self::Error> {
        GraphSnapshot::new(parts.case_id, parts.version, parts.nodes, parts.edges)
    }
}

/// An immutable, versioned conflict graph for one case
///
/// Nodes are ordered by id and edges by `(source, target, relation)`, so two
/// snapshots built from the same data are equal field by field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SnapshotParts")]
pub struct GraphSnapshot {
    case_id: CaseId,
    version: u64,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    positions: HashMap<NodeId, usize>,
    #[serde(skip)]
    incidence: HashMap<NodeId, Vec<usize>>,
}

impl GraphSnapshot {
    /// Validate and assemble a snapshot
    ///
    /// # Errors
    /// Returns an error on duplicate nodes, dangling or self-referencing edges,
    /// duplicate edge triples, or confidences outside [0, 1].
    pub fn new(
        case_id: CaseId,
        version: u64,
        mut nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<Self, SnapshotError> {
        nodes.sort_by_key(|n| n.id);
        for pair in nodes.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(SnapshotError::DuplicateNode(pair[0].id));
            }
        }

        let positions: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        let mut normalized = Vec::with_capacity(edges.len());
        for edge in edges {
            if !(0.0..=1.0).contains(&edge.confidence) {
                return Err(SnapshotError::InvalidConfidence {
                    source: edge.source,
                    target: edge.target,
                    confidence: edge.confidence,
                });
            }
            if edge.source == edge.target {
                return Err(SnapshotError::SelfLoop(edge.source));
            }
            if !positions.contains_key(&edge.source) || !positions.contains_key(&edge.target) {
                return Err(SnapshotError::DanglingEdge {
                    source: edge.source,
                    target: edge.target,
                });
            }
            // Re-derive direction and endpoint order from the relation
            normalized.push(Edge::new(edge.source, edge.target, edge.relation, edge.confidence));
        }

        normalized.sort_by(|a, b| a.key().cmp(&b.key()));
        for pair in normalized.windows(2) {
            if pair[0].key() == pair[1].key() {
                let (source, target, relation) = pair[0].key();
                return Err(SnapshotError::DuplicateEdge { source, target, relation });
            }
        }

        let mut incidence: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (i, edge) in normalized.iter().enumerate() {
            incidence.entry(edge.source).or_default().push(i);
            incidence.entry(edge.target).or_default().push(i);
        }

        Ok(Self {
            case_id,
            version,
            nodes,
            edges: normalized,
            positions,
            incidence,
        })
    }

    /// Case this snapshot was built for
    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    /// Source version this snapshot materializes
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All nodes, ordered by id
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges, ordered by `(source, target, relation)`
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.positions.get(&id).map(|&i| &self.nodes[i])
    }

    /// Whether the snapshot contains a node
    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Edges with `id` at either end, in edge order
    pub fn incident_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.incidence
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// Neighbours of `id` over any edge, ignoring direction
    pub fn neighbors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.incident_edges(id).filter_map(|e| e.other_end(id)).collect()
    }

    /// Whether any edge connects `a` and `b`, in either direction
    pub fn connected(&self, a: NodeId, b: NodeId) -> bool {
        self.incident_edges(a).any(|e| e.other_end(a) == Some(b))
    }

    /// Edges of one relation type
    pub fn edges_of(&self, relation: RelationType) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.relation == relation)
    }

    /// Structural equality: same case, nodes and edges, ignoring the version
    pub fn same_structure(&self, other: &GraphSnapshot) -> bool {
        self.case_id == other.case_id && self.nodes == other.nodes && self.edges == other.edges
    }
}

impl PartialEq for GraphSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.same_structure(other)
    }
}
