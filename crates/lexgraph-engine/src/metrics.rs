//! Metrics collection for engine operations

use crate::builder::BuildReport;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the engine counters
///
/// Tracks cache behavior, builds, data-quality drops and query volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineMetrics {
    /// Requests served from a fresh cached snapshot
    pub cache_hits: u64,

    /// Requests that had to build a snapshot
    pub cache_misses: u64,

    /// Cases evicted from the snapshot cache
    pub evictions: u64,

    /// Successful snapshot builds
    pub builds: u64,

    /// Failed snapshot builds
    pub build_failures: u64,

    /// Entity records dropped during builds
    pub entities_dropped: u64,

    /// Relationship records dropped during builds
    pub edges_dropped: u64,

    /// Entity records merged into an earlier record with the same id
    pub entities_merged: u64,

    /// Parallel edges collapsed during builds
    pub edges_merged: u64,

    /// Conflict detection runs
    pub detections: u64,

    /// Path explanations served
    pub explanations: u64,

    /// Predictor calls
    pub prediction_calls: u64,

    /// Failed predictor calls
    pub prediction_failures: u64,

    /// Cases currently held in the cache
    pub cached_cases: usize,
}

impl EngineMetrics {
    /// Fraction of snapshot requests served from cache
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let lines = [
            "Engine Metrics Summary".to_string(),
            "======================".to_string(),
            format!(
                "Cache: {} hits, {} misses ({:.1}% hit ratio), {} cached, {} evicted",
                self.cache_hits,
                self.cache_misses,
                self.cache_hit_ratio() * 100.0,
                self.cached_cases,
                self.evictions
            ),
            format!("Builds: {} ok, {} failed", self.builds, self.build_failures),
            format!(
                "Dropped records: {} entities, {} edges",
                self.entities_dropped, self.edges_dropped
            ),
            format!(
                "Merged records: {} entities, {} edges",
                self.entities_merged, self.edges_merged
            ),
            format!(
                "Queries: {} detections, {} explanations, {} predictions ({} failed)",
                self.detections, self.explanations, self.prediction_calls, self.prediction_failures
            ),
        ];
        lines.join("\n")
    }
}

/// Lock-free counters shared by all requests
#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    evictions: AtomicU64,
    builds: AtomicU64,
    build_failures: AtomicU64,
    entities_dropped: AtomicU64,
    edges_dropped: AtomicU64,
    entities_merged: AtomicU64,
    edges_merged: AtomicU64,
    detections: AtomicU64,
    explanations: AtomicU64,
    prediction_calls: AtomicU64,
    prediction_failures: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl MetricsRecorder {
    pub(crate) fn record_hit(&self) {
        bump(&self.cache_hits, 1);
    }

    pub(crate) fn record_miss(&self) {
        bump(&self.cache_misses, 1);
    }

    pub(crate) fn record_eviction(&self) {
        bump(&self.evictions, 1);
    }

    pub(crate) fn record_build(&self, report: &BuildReport) {
        bump(&self.builds, 1);
        bump(&self.entities_dropped, report.entities_dropped as u64);
        bump(&self.edges_dropped, report.edges_dropped as u64);
        bump(&self.entities_merged, report.entities_merged as u64);
        bump(&self.edges_merged, report.edges_merged as u64);
    }

    pub(crate) fn record_build_failure(&self) {
        bump(&self.build_failures, 1);
    }

    pub(crate) fn record_detection(&self) {
        bump(&self.detections, 1);
    }

    pub(crate) fn record_explanation(&self) {
        bump(&self.explanations, 1);
    }

    pub(crate) fn record_prediction(&self, ok: bool) {
        bump(&self.prediction_calls, 1);
        if !ok {
            bump(&self.prediction_failures, 1);
        }
    }

    pub(crate) fn snapshot(&self, cached_cases: usize) -> EngineMetrics {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        EngineMetrics {
            cache_hits: read(&self.cache_hits),
            cache_misses: read(&self.cache_misses),
            evictions: read(&self.evictions),
            builds: read(&self.builds),
            build_failures: read(&self.build_failures),
            entities_dropped: read(&self.entities_dropped),
            edges_dropped: read(&self.edges_dropped),
            entities_merged: read(&self.entities_merged),
            edges_merged: read(&self.edges_merged),
            detections: read(&self.detections),
            explanations: read(&self.explanations),
            prediction_calls: read(&self.prediction_calls),
            prediction_failures: read(&self.prediction_failures),
            cached_cases,
        }
    }
}
