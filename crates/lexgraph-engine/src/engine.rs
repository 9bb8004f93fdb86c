//! Query façade over builder, rules, risk and path explanation

use crate::builder::{upstream, GraphBuilder};
use crate::cache::{CaseState, SnapshotCache};
use crate::metrics::{EngineMetrics, MetricsRecorder};
use crate::{EngineConfig, EngineError};
use lexgraph_domain::{
    path, risk, rules, CaseId, CaseStore, ConflictFinding, ConflictPredictor, GraphSnapshot, NodeId,
    Prediction, PredictionFeatures, RiskScore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Findings and risk for one snapshot version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Case
    pub case_id: CaseId,
    /// Snapshot version the findings were computed on
    pub version: u64,
    /// Findings in rule, entity, related order
    pub findings: Vec<ConflictFinding>,
    /// Aggregate risk of `findings`
    pub risk: RiskScore,
}

/// Request to explain the relationship between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainRequest {
    /// Start entity
    pub from: NodeId,
    /// End entity
    pub to: NodeId,
    /// Hop cap; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hops: Option<usize>,
}

/// Shortest relationship path between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    /// Case
    pub case_id: CaseId,
    /// Snapshot version the path was found in
    pub version: u64,
    /// Node sequence from `from` to `to`, both included
    pub path: Vec<NodeId>,
    /// Number of edges on the path
    pub hops: usize,
}

/// Advisory predictions for one snapshot version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Case
    pub case_id: CaseId,
    /// Snapshot version the features were derived from
    pub version: u64,
    /// Predictions as returned by the predictor
    pub predictions: Vec<Prediction>,
}

/// Conflict-of-interest engine for a case store and a predictor
///
/// All operations are read-only. Requests for unrelated cases run
/// concurrently; the snapshot cache is the only shared mutable state.
pub struct ConflictEngine<S, P> {
    store: Arc<S>,
    predictor: Arc<P>,
    builder: GraphBuilder,
    cache: SnapshotCache,
    config: EngineConfig,
    metrics: MetricsRecorder,
}

impl<S, P> ConflictEngine<S, P>
where
    S: CaseStore + Send + Sync + 'static,
    S::Error: Send + 'static,
    P: ConflictPredictor + Send + Sync + 'static,
    P::Error: Send + 'static,
{
    /// Create an engine
    pub fn new(store: Arc<S>, predictor: Arc<P>, config: EngineConfig) -> Self {
        Self {
            store,
            predictor,
            builder: GraphBuilder::from_config(&config),
            cache: SnapshotCache::new(config.cache_capacity),
            config,
            metrics: MetricsRecorder::default(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current snapshot of a case
    ///
    /// Served from cache when the cached snapshot matches the store's current
    /// version; otherwise rebuilt, with at most one rebuild per case in flight.
    pub async fn get_graph(&self, case_id: &CaseId) -> Result<Arc<GraphSnapshot>, EngineError> {
        let (slot, evicted) = self.cache.slot(case_id)?;
        if let Some(evicted) = evicted {
            tracing::debug!(case_id = %evicted, "Evicted case from snapshot cache");
            self.metrics.record_eviction();
        }

        let version = self.current_version(case_id).await?;
        if let Some(snapshot) = slot.fresh(version)? {
            tracing::debug!(case_id = %case_id, version, "Snapshot cache hit");
            self.metrics.record_hit();
            return Ok(snapshot);
        }
        slot.observe_version(version)?;

        let _guard = slot.build_lock.lock().await;

        // Another request may have rebuilt while we waited
        if let Some(snapshot) = slot.fresh(version)? {
            tracing::debug!(case_id = %case_id, version, "Reusing concurrently built snapshot");
            self.metrics.record_hit();
            return Ok(snapshot);
        }
        slot.observe_version(version)?;

        self.metrics.record_miss();
        let started = Instant::now();
        let store = self.store.clone();
        let builder = self.builder.clone();
        let id = case_id.clone();
        let built = tokio::task::spawn_blocking(move || builder.build(store.as_ref(), &id)).await?;

        match built {
            Ok((snapshot, report)) => {
                tracing::info!(
                    case_id = %case_id,
                    version = snapshot.version(),
                    nodes = snapshot.node_count(),
                    edges = snapshot.edge_count(),
                    entities_dropped = report.entities_dropped,
                    edges_dropped = report.edges_dropped,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Built snapshot"
                );
                self.metrics.record_build(&report);
                let snapshot = Arc::new(snapshot);
                slot.install(snapshot.clone())?;
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(case_id = %case_id, error = %e, "Snapshot build failed");
                self.metrics.record_build_failure();
                Err(e)
            }
        }
    }

    /// Conflict findings and aggregate risk for the current snapshot
    pub async fn get_conflicts(&self, case_id: &CaseId) -> Result<ConflictReport, EngineError> {
        let snapshot = self.get_graph(case_id).await?;
        Ok(self.conflicts_on(&snapshot))
    }

    /// Findings, risk and predictions for one snapshot
    ///
    /// Both reports carry the same version even when the store moves on
    /// between the two computations.
    pub async fn get_conflicts_with_predictions(
        &self,
        case_id: &CaseId,
    ) -> Result<(ConflictReport, PredictionReport), EngineError> {
        let snapshot = self.get_graph(case_id).await?;
        let report = self.conflicts_on(&snapshot);
        let predictions = self.predictions_on(&snapshot).await?;
        Ok((report, predictions))
    }

    /// Shortest path between two entities that share a conflict finding
    ///
    /// # Errors
    /// - `NotFound` if either entity is not in the snapshot
    /// - `NotRelated` if no finding involves both entities
    /// - `NoPath` if they are not connected within the hop cap
    pub async fn explain_conflict(
        &self,
        case_id: &CaseId,
        request: ExplainRequest,
    ) -> Result<Explanation, EngineError> {
        let snapshot = self.get_graph(case_id).await?;
        let ExplainRequest { from, to, max_hops } = request;

        for id in [from, to] {
            if !snapshot.contains(id) {
                return Err(EngineError::NotFound(format!("entity {} in case {}", id, case_id)));
            }
        }

        let related = rules::detect(&snapshot)
            .iter()
            .any(|finding| finding.involves(from) && finding.involves(to));
        if !related {
            return Err(EngineError::NotRelated { from, to });
        }

        let max_hops = self.config.effective_max_hops(max_hops);
        let path = path::explain(&snapshot, from, to, max_hops)?;
        self.metrics.record_explanation();

        Ok(Explanation {
            case_id: case_id.clone(),
            version: snapshot.version(),
            hops: path.len() - 1,
            path,
        })
    }

    /// Predictions from the external predictor for the current snapshot
    ///
    /// Single attempt; predictor failures surface as `UpstreamUnavailable`
    /// (or `NotFound` when the predictor does not know the case).
    pub async fn get_predictions(&self, case_id: &CaseId) -> Result<PredictionReport, EngineError> {
        let snapshot = self.get_graph(case_id).await?;
        self.predictions_on(&snapshot).await
    }

    /// Cache state of a case
    pub fn case_state(&self, case_id: &CaseId) -> Result<CaseState, EngineError> {
        self.cache.state(case_id)
    }

    /// Current engine counters
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.snapshot(self.cache.len())
    }

    fn conflicts_on(&self, snapshot: &GraphSnapshot) -> ConflictReport {
        let findings = rules::detect(snapshot);
        let risk = risk::score(&findings);
        self.metrics.record_detection();

        tracing::debug!(
            case_id = %snapshot.case_id(),
            version = snapshot.version(),
            findings = findings.len(),
            risk = risk.value,
            "Detected conflicts"
        );

        ConflictReport {
            case_id: snapshot.case_id().clone(),
            version: snapshot.version(),
            findings,
            risk,
        }
    }

    async fn predictions_on(&self, snapshot: &GraphSnapshot) -> Result<PredictionReport, EngineError> {
        let features = PredictionFeatures::from_snapshot(snapshot);

        let predictor = self.predictor.clone();
        let result = tokio::task::spawn_blocking(move || {
            predictor.predict(&features).map_err(upstream)
        })
        .await?;

        self.metrics.record_prediction(result.is_ok());
        let predictions = result.map_err(|e| {
            tracing::warn!(case_id = %snapshot.case_id(), error = %e, "Prediction request failed");
            e
        })?;

        Ok(PredictionReport {
            case_id: snapshot.case_id().clone(),
            version: snapshot.version(),
            predictions,
        })
    }

    async fn current_version(&self, case_id: &CaseId) -> Result<u64, EngineError> {
        let store = self.store.clone();
        let id = case_id.clone();
        tokio::task::spawn_blocking(move || {
            store.current_version(&id).map_err(upstream)
        })
        .await?
    }
}
