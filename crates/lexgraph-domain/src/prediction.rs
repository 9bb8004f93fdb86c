//! Advisory predictions from the external conflict-prediction service
//!
//! The engine treats predictions as opaque: it derives a feature payload from a
//! snapshot, hands it to the predictor and passes the answer through. Predictions
//! never alter rule-based findings.

use crate::{node::ROLE_ATTRIBUTE, CaseId, GraphSnapshot, NodeId, NodeKind, RelationType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One prediction returned by the predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Entity the prediction is about
    pub entity_id: NodeId,

    /// Cases the predictor considers related
    #[serde(default)]
    pub related_case_refs: Vec<CaseId>,

    /// Predictor's own relevance score
    pub relevance: f64,
}

/// Per-node features sent to the predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFeatures {
    /// Node id
    pub id: NodeId,
    /// Node kind
    pub kind: NodeKind,
    /// Cases the entity appears in
    pub case_refs: BTreeSet<CaseId>,
    /// Number of incident edges
    pub degree: usize,
    /// Role attribute, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Per-edge features sent to the predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFeatures {
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Relation type
    pub relation: RelationType,
    /// Edge confidence
    pub confidence: f64,
}

/// Snapshot-derived payload for the predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFeatures {
    /// Case the snapshot belongs to
    pub case_id: CaseId,
    /// Snapshot version
    pub version: u64,
    /// Node features, ordered by id
    pub nodes: Vec<NodeFeatures>,
    /// Edge features, in snapshot order
    pub edges: Vec<EdgeFeatures>,
}

impl PredictionFeatures {
    /// Derive the feature payload from a snapshot
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let nodes = snapshot
            .nodes()
            .iter()
            .map(|node| NodeFeatures {
                id: node.id,
                kind: node.kind,
                case_refs: node.case_refs.clone(),
                degree: snapshot.incident_edges(node.id).count(),
                role: node.attribute(ROLE_ATTRIBUTE).map(str::to_string),
            })
            .collect();

        let edges = snapshot
            .edges()
            .iter()
            .map(|edge| EdgeFeatures {
                source: edge.source,
                target: edge.target,
                relation: edge.relation,
                confidence: edge.confidence,
            })
            .collect();

        Self {
            case_id: snapshot.case_id().clone(),
            version: snapshot.version(),
            nodes,
            edges,
        }
    }
}
