//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the conflict engine and the
//! systems it consumes. Implementations live in other crates. Calls may block;
//! callers are expected to run them off the async executor.

use crate::{CaseId, EntityRecord, Prediction, PredictionFeatures, RelationshipRecord};
use std::fmt;

/// Failure of an upstream collaborator, as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The collaborator does not know the requested case or entity
    NotFound(String),

    /// The collaborator could not be reached or failed
    Unavailable(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::NotFound(what) => write!(f, "not found: {}", what),
            UpstreamError::Unavailable(why) => write!(f, "upstream unavailable: {}", why),
        }
    }
}

impl std::error::Error for UpstreamError {}

/// Source of raw case records
///
/// Implemented by the infrastructure layer (lexgraph-store)
pub trait CaseStore {
    /// Error type for store operations
    type Error: Into<UpstreamError> + fmt::Display;

    /// Current source version of a case; bumped whenever its data changes
    fn current_version(&self, case_id: &CaseId) -> Result<u64, Self::Error>;

    /// Entities (parties and cases) belonging to a case
    fn fetch_entities(&self, case_id: &CaseId) -> Result<Vec<EntityRecord>, Self::Error>;

    /// Relationships between the entities of a case
    fn fetch_relationships(&self, case_id: &CaseId) -> Result<Vec<RelationshipRecord>, Self::Error>;
}

/// External conflict-prediction service
///
/// Implemented by the infrastructure layer (lexgraph-predict)
pub trait ConflictPredictor {
    /// Error type for prediction calls
    type Error: Into<UpstreamError> + fmt::Display;

    /// Predict potential conflicts from a snapshot-derived payload
    fn predict(&self, features: &PredictionFeatures) -> Result<Vec<Prediction>, Self::Error>;
}
