//! Integration tests for lexgraph-engine
//!
//! These tests drive the engine end to end over the in-memory case store:
//! caching, staleness, single-flight rebuilds, failure handling and the
//! conflict scenarios the dashboard relies on.

use lexgraph_domain::{
    CaseId, CaseStore, EntityRecord, NodeId, Prediction, RelationshipRecord, RiskScore, RuleId,
    Severity,
};
use lexgraph_engine::{CaseState, ConflictEngine, EngineConfig, EngineError, ExplainRequest};
use lexgraph_predict::{MockPredictor, PredictError};
use lexgraph_store::{MemoryCaseStore, SqliteCaseStore};
use std::sync::Arc;
use std::time::Duration;

type Engine = ConflictEngine<MemoryCaseStore, MockPredictor>;

fn id(external: &str) -> NodeId {
    NodeId::from_external(external)
}

fn engine_with(store: &Arc<MemoryCaseStore>, config: EngineConfig) -> (Arc<Engine>, MockPredictor) {
    let predictor = MockPredictor::default();
    let engine = ConflictEngine::new(store.clone(), Arc::new(predictor.clone()), config);
    (Arc::new(engine), predictor)
}

fn engine(store: &Arc<MemoryCaseStore>) -> Arc<Engine> {
    engine_with(store, EngineConfig::default()).0
}

/// The firm represents case-1 and case-2; Bee opposes both.
///
/// The firm appears as two records for the same external id, one per case.
fn dual_representation(case_2_status: &str) -> (Vec<EntityRecord>, Vec<RelationshipRecord>) {
    (
        vec![
            EntityRecord::new("case-1", "case", "Ames v. Bee").with_attribute("status", "open"),
            EntityRecord::new("case-2", "case", "Cole v. Bee").with_attribute("status", case_2_status),
            EntityRecord::new("firm-a", "organization", "Ames & Partners").with_case_ref("case-1"),
            EntityRecord::new("firm-a", "organization", "").with_case_ref("case-2"),
            EntityRecord::new("bee", "person", "B. Bee")
                .with_case_ref("case-1")
                .with_case_ref("case-2"),
        ],
        vec![
            RelationshipRecord::new("firm-a", "case-1", "represents"),
            RelationshipRecord::new("firm-a", "case-2", "represents"),
            RelationshipRecord::new("bee", "case-1", "opposing_party"),
            RelationshipRecord::new("bee", "case-2", "opposing_party"),
        ],
    )
}

fn seed_dual(store: &MemoryCaseStore) -> CaseId {
    let (entities, relationships) = dual_representation("open");
    store.put_case("case-1", entities, relationships);
    CaseId::from("case-1")
}

#[tokio::test]
async fn test_adverse_representation_across_cases() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);

    let report = engine.get_conflicts(&case).await.unwrap();
    let adverse: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.rule_id == RuleId::AdverseRepresentation)
        .collect();

    assert_eq!(adverse.len(), 1);
    assert_eq!(adverse[0].entity_id, id("firm-a"));
    assert_eq!(adverse[0].related_entities, vec![id("bee")]);
    assert_eq!(adverse[0].severity, Severity::Critical);

    let shared = report
        .findings
        .iter()
        .find(|f| f.rule_id == RuleId::SharedOpposingParty)
        .unwrap();
    assert_eq!(shared.entity_id, id("bee"));
    let mut cases = vec![id("case-1"), id("case-2")];
    cases.sort();
    assert_eq!(shared.related_entities, cases);
}

#[tokio::test]
async fn test_closed_case_lowers_severity() {
    let store = Arc::new(MemoryCaseStore::new());
    let (entities, relationships) = dual_representation("closed");
    store.put_case("case-1", entities, relationships);
    let engine = engine(&store);

    let report = engine.get_conflicts(&CaseId::from("case-1")).await.unwrap();
    let finding = report
        .findings
        .iter()
        .find(|f| f.rule_id == RuleId::AdverseRepresentation)
        .unwrap();
    assert_eq!(finding.severity, Severity::High);
}

#[tokio::test]
async fn test_isolated_entities_have_no_findings() {
    let store = Arc::new(MemoryCaseStore::new());
    let mut entities = vec![EntityRecord::new("case-1", "case", "Quiet matter")];
    entities.extend((0..4).map(|i| EntityRecord::new(format!("p{}", i), "person", "Someone")));
    store.put_case("case-1", entities, vec![]);
    let engine = engine(&store);

    let report = engine.get_conflicts(&CaseId::from("case-1")).await.unwrap();
    let snapshot = engine.get_graph(&CaseId::from("case-1")).await.unwrap();

    assert_eq!(snapshot.node_count(), 5);
    assert!(report.findings.is_empty());
    assert_eq!(report.risk, RiskScore::zero());
}

#[tokio::test]
async fn test_explain_path_and_hop_cap() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);

    let request = ExplainRequest {
        from: id("firm-a"),
        to: id("bee"),
        max_hops: None,
    };
    let explanation = engine.explain_conflict(&case, request.clone()).await.unwrap();
    assert_eq!(explanation.hops, 2);
    assert_eq!(explanation.path.len(), 3);
    assert!(explanation.path[1] == id("case-1") || explanation.path[1] == id("case-2"));

    let capped = ExplainRequest {
        max_hops: Some(1),
        ..request
    };
    assert!(matches!(
        engine.explain_conflict(&case, capped).await,
        Err(EngineError::NoPath { max_hops: 1, .. })
    ));
}

#[tokio::test]
async fn test_version_bump_triggers_rebuild() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);

    let first = engine.get_graph(&case).await.unwrap();
    assert_eq!(engine.case_state(&case).unwrap(), CaseState::Built);

    store.add_relationship("case-1", RelationshipRecord::new("firm-a", "bee", "family_tie"));
    let second = engine.get_graph(&case).await.unwrap();

    assert_eq!(first.version(), 1);
    assert_eq!(second.version(), 2);
    assert_eq!(second.edge_count(), first.edge_count() + 1);
    assert_eq!(store.fetch_count(), 2);
    assert_eq!(engine.metrics().builds, 2);
}

#[tokio::test]
async fn test_rebuild_from_identical_data_is_structurally_equal() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);

    let first = engine.get_graph(&case).await.unwrap();
    seed_dual(&store);
    let second = engine.get_graph(&case).await.unwrap();

    assert_ne!(first.version(), second.version());
    assert!(first.same_structure(&second));
}

#[tokio::test]
async fn test_timestamps_keep_identity_stable() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);
    let before = engine.get_graph(&case).await.unwrap();

    let (entities, relationships) = dual_representation("open");
    store.put_case(
        "case-1",
        entities.into_iter().map(|e| e.with_updated_at(99)).collect(),
        relationships.into_iter().map(|r| r.with_updated_at(99)).collect(),
    );
    let after = engine.get_graph(&case).await.unwrap();

    assert!(before.same_structure(&after));
    assert!(after.contains(id("firm-a")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_rebuild() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);

    engine.get_graph(&case).await.unwrap();
    store.touch("case-1");
    store.set_latency(Duration::from_millis(200));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            let case = case.clone();
            tokio::spawn(async move { engine.get_graph(&case).await })
        })
        .collect();

    let mut snapshots = Vec::new();
    for handle in handles {
        snapshots.push(handle.await.unwrap().unwrap());
    }

    // One initial build plus one rebuild for all eight waiters
    assert_eq!(store.fetch_count(), 2);
    assert!(snapshots.iter().all(|s| s.version() == 2));
    assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_detection_is_deterministic_under_concurrency() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            let case = case.clone();
            tokio::spawn(async move { engine.get_conflicts(&case).await })
        })
        .collect();

    let mut reports = Vec::new();
    for handle in handles {
        reports.push(handle.await.unwrap().unwrap());
    }
    assert!(reports.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_failed_refresh_keeps_snapshot_and_surfaces_error() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);
    let original = engine.get_graph(&case).await.unwrap();

    store.touch("case-1");
    store.set_fetches_available(false);

    let result = engine.get_graph(&case).await;
    assert!(matches!(result, Err(EngineError::UpstreamUnavailable(_))));
    assert_eq!(engine.case_state(&case).unwrap(), CaseState::Stale);
    assert_eq!(engine.metrics().build_failures, 1);

    store.set_fetches_available(true);
    let refreshed = engine.get_graph(&case).await.unwrap();
    assert_eq!(refreshed.version(), 2);
    assert!(original.same_structure(&refreshed));
    assert_eq!(engine.case_state(&case).unwrap(), CaseState::Built);
}

#[tokio::test]
async fn test_store_outage() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let engine = engine(&store);
    store.set_available(false);

    let result = engine.get_conflicts(&case).await;
    assert!(matches!(result, Err(EngineError::UpstreamUnavailable(_))));
    assert_eq!(engine.case_state(&case).unwrap(), CaseState::Unbuilt);
}

#[tokio::test]
async fn test_graph_too_large() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let config = EngineConfig {
        max_nodes: 2,
        ..EngineConfig::default()
    };
    let (engine, _) = engine_with(&store, config);

    assert!(matches!(
        engine.get_graph(&case).await,
        Err(EngineError::TooLarge { what: "nodes", count: 4, limit: 2 })
    ));
}

#[tokio::test]
async fn test_lru_eviction() {
    let store = Arc::new(MemoryCaseStore::new());
    seed_dual(&store);
    store.put_case("case-9", vec![EntityRecord::new("case-9", "case", "Other")], vec![]);
    let config = EngineConfig {
        cache_capacity: 1,
        ..EngineConfig::default()
    };
    let (engine, _) = engine_with(&store, config);

    engine.get_graph(&CaseId::from("case-1")).await.unwrap();
    engine.get_graph(&CaseId::from("case-9")).await.unwrap();

    assert_eq!(engine.case_state(&CaseId::from("case-1")).unwrap(), CaseState::Unbuilt);
    let metrics = engine.metrics();
    assert_eq!(metrics.evictions, 1);
    assert_eq!(metrics.cached_cases, 1);
}

#[tokio::test]
async fn test_predictions_are_passed_through() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let (engine, predictor) = engine_with(&store, EngineConfig::default());
    let prediction = Prediction {
        entity_id: id("bee"),
        related_case_refs: vec![CaseId::from("case-7")],
        relevance: 0.9,
    };
    predictor.set_predictions(vec![prediction.clone()]);

    let before = engine.get_conflicts(&case).await.unwrap();
    let report = engine.get_predictions(&case).await.unwrap();
    let after = engine.get_conflicts(&case).await.unwrap();

    assert_eq!(report.predictions, vec![prediction]);
    assert_eq!(report.version, 1);
    assert_eq!(predictor.last_features().unwrap().nodes.len(), 4);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_prediction_failure() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let (engine, predictor) = engine_with(&store, EngineConfig::default());
    predictor.fail_with(PredictError::Communication("connection refused".to_string()));

    assert!(matches!(
        engine.get_predictions(&case).await,
        Err(EngineError::UpstreamUnavailable(_))
    ));
    let metrics = engine.metrics();
    assert_eq!((metrics.prediction_calls, metrics.prediction_failures), (1, 1));
}

#[tokio::test]
async fn test_engine_over_sqlite_store() {
    let store = Arc::new(SqliteCaseStore::new(":memory:").unwrap());
    let case = CaseId::from("case-1");
    let (entities, relationships) = dual_representation("open");
    for entity in &entities {
        store.put_entity(&case, entity).unwrap();
    }
    for relationship in &relationships {
        store.put_relationship(&case, relationship).unwrap();
    }

    let engine = ConflictEngine::new(
        store.clone(),
        Arc::new(MockPredictor::default()),
        EngineConfig::default(),
    );
    let report = engine.get_conflicts(&case).await.unwrap();

    assert_eq!(report.version, store.current_version(&case).unwrap());
    assert!(report
        .findings
        .iter()
        .any(|f| f.rule_id == RuleId::AdverseRepresentation && f.entity_id == id("firm-a")));
}

#[tokio::test]
async fn test_case_id_recorded_as_party_is_dropped() {
    let store = Arc::new(MemoryCaseStore::new());
    store.put_case(
        "case-1",
        vec![
            EntityRecord::new("case-1", "person", "Mislabelled"),
            EntityRecord::new("firm-a", "organization", "Ames & Partners"),
        ],
        vec![RelationshipRecord::new("firm-a", "case-1", "represents")],
    );
    let engine = engine(&store);

    let report = engine.get_conflicts(&CaseId::from("case-1")).await.unwrap();
    let snapshot = engine.get_graph(&CaseId::from("case-1")).await.unwrap();

    assert!(report.findings.is_empty());
    assert!(snapshot.node(id("case-1")).is_some_and(|n| !n.is_party()));
    assert_eq!(snapshot.edge_count(), 1);
    assert_eq!(engine.metrics().entities_dropped, 1);
}

#[tokio::test]
async fn test_conflicts_and_predictions_share_one_snapshot() {
    let store = Arc::new(MemoryCaseStore::new());
    let case = seed_dual(&store);
    let (engine, predictor) = engine_with(&store, EngineConfig::default());

    let (report, predictions) = engine.get_conflicts_with_predictions(&case).await.unwrap();

    // One freshness check plus the build's own read; a second lookup would add a third
    assert_eq!(store.version_checks(), 2);
    assert_eq!(report.version, predictions.version);
    assert_eq!(predictor.last_features().unwrap().version, report.version);
    assert!(!report.findings.is_empty());
}
