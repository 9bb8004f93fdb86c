//! Lexgraph Storage Layer
//!
//! Implements the [`CaseStore`](lexgraph_domain::CaseStore) collaborator trait.
//!
//! # Architecture
//!
//! - [`SqliteCaseStore`]: SQLite-backed store; every write bumps the case version
//! - [`MemoryCaseStore`]: in-memory store with injectable latency, an outage
//!   switch and fetch counters, for tests and demos
//!
//! # Examples
//!
//! ```no_run
//! use lexgraph_domain::{CaseId, CaseStore, EntityRecord};
//! use lexgraph_store::SqliteCaseStore;
//!
//! let store = SqliteCaseStore::new(":memory:").unwrap();
//! let case = CaseId::from("case-1");
//! store.put_entity(&case, &EntityRecord::new("case-1", "case", "Smith v. Jones")).unwrap();
//! assert_eq!(store.current_version(&case).unwrap(), 1);
//! ```

#![warn(missing_docs)]

mod memory;
mod sqlite;

pub use memory::{MemoryCaseStore, MemoryStoreError};
pub use sqlite::SqliteCaseStore;

use lexgraph_domain::UpstreamError;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Case not found
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    /// Record not found in an existing case
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The connection mutex was poisoned by a panicking writer
    #[error("Connection lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

impl From<StoreError> for UpstreamError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CaseNotFound(what) | StoreError::RecordNotFound(what) => {
                UpstreamError::NotFound(what)
            }
            other => UpstreamError::Unavailable(other.to_string()),
        }
    }
}
