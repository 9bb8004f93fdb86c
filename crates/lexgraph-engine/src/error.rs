//! Error types for engine operations

use lexgraph_domain::{NodeId, PathError, UpstreamError};
use thiserror::Error;

/// Errors that can occur during engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Case or entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Case store or predictor could not be reached
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Graph exceeds the configured size bounds
    #[error("Graph too large: {count} {what} exceeds limit of {limit}")]
    TooLarge {
        /// "nodes" or "edges"
        what: &'static str,
        /// Size of the rejected graph
        count: usize,
        /// Configured bound
        limit: usize,
    },

    /// Entities are not connected within the hop cap
    #[error("No path from {from} to {to} within {max_hops} hops")]
    NoPath {
        /// Start entity
        from: NodeId,
        /// End entity
        to: NodeId,
        /// Hop cap that was applied
        max_hops: usize,
    },

    /// Entities do not share a conflict finding
    #[error("Entities {from} and {to} are not related by any conflict finding")]
    NotRelated {
        /// Start entity
        from: NodeId,
        /// End entity
        to: NodeId,
    },

    /// Invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            EngineError::TooLarge { .. } => "TOO_LARGE",
            EngineError::NoPath { .. } => "NO_PATH",
            EngineError::NotRelated { .. } => "NOT_RELATED",
            EngineError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<UpstreamError> for EngineError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::NotFound(what) => EngineError::NotFound(what),
            UpstreamError::Unavailable(why) => EngineError::UpstreamUnavailable(why),
        }
    }
}

impl From<PathError> for EngineError {
    fn from(e: PathError) -> Self {
        match e {
            PathError::NotFound(id) => EngineError::NotFound(format!("entity {}", id)),
            PathError::NoPath { from, to, max_hops } => EngineError::NoPath { from, to, max_hops },
        }
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(e: tokio::task::JoinError) -> Self {
        EngineError::Internal(format!("Blocking task failed: {}", e))
    }
}
