//! Lexgraph Domain Layer
//!
//! This crate contains the core model and algorithms of the conflict-of-interest
//! graph engine. It depends only on `uuid` (stable node ids) and `serde`
//! (snapshots and findings are handed to the dashboard as JSON), and defines the
//! trait interfaces for every external collaborator.
//!
//! ## Key Concepts
//!
//! - **Snapshot**: immutable, versioned graph of one case's parties and relationships
//! - **Finding**: one conflict detected by a rule, centered on an entity
//! - **Risk score**: bounded aggregate of all findings for a case
//! - **Explanation**: shortest relationship path between two entities
//!
//! ## Architecture
//!
//! - Pure functions only: [`rules::detect`], [`risk::score`] and [`path::explain`]
//!   depend on nothing but their inputs
//! - Raw records are mapped to closed enums before anything else sees them
//! - Infrastructure (case store, predictor, caching) lives in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod edge;
pub mod finding;
pub mod ids;
pub mod node;
pub mod path;
pub mod prediction;
pub mod records;
pub mod risk;
pub mod rules;
pub mod snapshot;
pub mod traits;

// Re-exports for convenience
pub use edge::{Edge, RelationType};
pub use finding::{ConflictFinding, RuleId, Severity};
pub use ids::{CaseId, NodeId};
pub use node::{Node, NodeKind};
pub use path::{PathError, DEFAULT_MAX_HOPS};
pub use prediction::{Prediction, PredictionFeatures};
pub use records::{EntityRecord, RelationshipRecord};
pub use risk::{RiskContribution, RiskScore, RiskWeights};
pub use snapshot::{GraphSnapshot, SnapshotError};
pub use traits::{CaseStore, ConflictPredictor, UpstreamError};
