//! Lexgraph Engine
//!
//! Query façade of the conflict-of-interest graph engine.
//!
//! # Overview
//!
//! For a case id the engine:
//! - **Builds** an immutable, versioned graph snapshot from case-store records
//! - **Caches** snapshots per case, rebuilding only when the store's version moves
//! - **Detects** conflicts of interest with the deterministic rule set
//! - **Scores** the findings into one bounded risk value
//! - **Explains** a finding by the shortest relationship path between two entities
//! - **Forwards** snapshot features to the external predictor on demand
//!
//! # Architecture
//!
//! Collaborators are blocking and run on `spawn_blocking`. Rule evaluation,
//! risk aggregation and path search are pure functions from `lexgraph-domain`.
//! The snapshot cache is the only shared mutable state:
//!
//! | State | Meaning | Next |
//! |-------|---------|------|
//! | **Unbuilt** | never built | Built |
//! | **Built** | snapshot matches the store version | Stale (version bump) |
//! | **Stale** | store moved on; snapshot kept, never served | Built (rebuild) |
//!
//! At most one rebuild per case is in flight; concurrent requests wait and
//! reuse its result.
//!
//! # Usage
//!
//! ```no_run
//! use lexgraph_domain::CaseId;
//! use lexgraph_engine::{ConflictEngine, EngineConfig};
//! use lexgraph_predict::MockPredictor;
//! use lexgraph_store::SqliteCaseStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteCaseStore::new("cases.db")?);
//!     let engine = ConflictEngine::new(store, Arc::new(MockPredictor::default()), EngineConfig::default());
//!
//!     let report = engine.get_conflicts(&CaseId::from("case-1")).await?;
//!     println!("{} findings, risk {:.1}", report.findings.len(), report.risk.value);
//!     println!("{}", engine.metrics().summary());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The engine can be configured via TOML:
//!
//! ```toml
//! [engine]
//! cache_capacity = 256
//! max_nodes = 10000
//! max_edges = 50000
//! default_max_hops = 6
//! max_hops_limit = 12
//! ```

#![warn(missing_docs)]

mod builder;
mod cache;
mod config;
mod engine;
mod error;
mod metrics;

pub use builder::{BuildReport, GraphBuilder};
pub use cache::CaseState;
pub use config::EngineConfig;
pub use engine::{ConflictEngine, ConflictReport, ExplainRequest, Explanation, PredictionReport};
pub use error::EngineError;
pub use metrics::EngineMetrics;
