//! Graph builder: raw case records to an immutable snapshot
//!
//! The builder is the only place that sees raw record strings. Bad records are
//! recovered locally: they are dropped with a structured warning and counted in
//! the [`BuildReport`]. Only upstream failures, size bounds and invariant
//! violations fail a build.

use crate::{EngineConfig, EngineError};
use lexgraph_domain::{
    CaseId, CaseStore, Edge, EntityRecord, GraphSnapshot, Node, NodeId, NodeKind, RelationType,
    RelationshipRecord, UpstreamError,
};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Data-quality summary of one build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Entity records dropped (unknown kind, blank id, conflicting kind, case id used by a party)
    pub entities_dropped: usize,

    /// Relationship records dropped (unknown node or relation, self loop, bad confidence)
    pub edges_dropped: usize,

    /// Entity records merged into an earlier record for the same external id
    pub entities_merged: usize,

    /// Parallel relationship records collapsed into one edge
    pub edges_merged: usize,

    /// Whether the queried case had no CASE record and one was synthesized
    pub case_node_synthesized: bool,
}

/// Converts case-store records into graph snapshots
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    max_nodes: usize,
    max_edges: usize,
}

impl GraphBuilder {
    /// Create a builder with explicit size bounds
    pub fn new(max_nodes: usize, max_edges: usize) -> Self {
        Self { max_nodes, max_edges }
    }

    /// Create a builder from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_nodes, config.max_edges)
    }

    /// Fetch a case from the store and build its snapshot
    ///
    /// Blocking: performs three store calls. The version is read first, so a
    /// concurrent write yields a snapshot labelled with the older version,
    /// which the next request sees as stale.
    ///
    /// # Errors
    /// - `NotFound` if the store does not know the case
    /// - `UpstreamUnavailable` if the store cannot be reached
    /// - `TooLarge` if the graph exceeds the size bounds
    /// - `Internal` on an id collision
    pub fn build<S: CaseStore>(
        &self,
        store: &S,
        case_id: &CaseId,
    ) -> Result<(GraphSnapshot, BuildReport), EngineError> {
        let version = store.current_version(case_id).map_err(upstream)?;
        let entities = store.fetch_entities(case_id).map_err(upstream)?;
        let relationships = store.fetch_relationships(case_id).map_err(upstream)?;

        self.assemble(case_id, version, entities, relationships)
    }

    /// Build a snapshot from already-fetched records
    pub fn assemble(
        &self,
        case_id: &CaseId,
        version: u64,
        entities: Vec<EntityRecord>,
        relationships: Vec<RelationshipRecord>,
    ) -> Result<(GraphSnapshot, BuildReport), EngineError> {
        let mut report = BuildReport::default();

        let mut nodes = self.collect_nodes(case_id, entities, &mut report)?;
        ensure_case_node(case_id, &mut nodes, &mut report);
        if nodes.len() > self.max_nodes {
            return Err(EngineError::TooLarge {
                what: "nodes",
                count: nodes.len(),
                limit: self.max_nodes,
            });
        }

        let edges = collect_edges(case_id, &nodes, relationships, &mut report);
        if edges.len() > self.max_edges {
            return Err(EngineError::TooLarge {
                what: "edges",
                count: edges.len(),
                limit: self.max_edges,
            });
        }

        let snapshot = GraphSnapshot::new(
            case_id.clone(),
            version,
            nodes.into_values().map(|(node, _)| node).collect(),
            edges.into_values().collect(),
        )
        .map_err(|e| {
            tracing::error!(case_id = %case_id, error = %e, "Assembled graph failed validation");
            EngineError::Internal(format!("invalid snapshot for case {}: {}", case_id, e))
        })?;

        Ok((snapshot, report))
    }

    /// Map entity records to nodes, keyed by id, with the external id that produced each
    fn collect_nodes(
        &self,
        case_id: &CaseId,
        entities: Vec<EntityRecord>,
        report: &mut BuildReport,
    ) -> Result<BTreeMap<NodeId, (Node, String)>, EngineError> {
        let mut nodes: BTreeMap<NodeId, (Node, String)> = BTreeMap::new();

        for record in entities {
            let external_id = record.external_id.trim();
            if external_id.is_empty() {
                tracing::warn!(case_id = %case_id, reason = "blank external id", "Dropping entity record");
                report.entities_dropped += 1;
                continue;
            }

            let Some(kind) = NodeKind::parse(&record.kind) else {
                tracing::warn!(
                    case_id = %case_id,
                    external_id = %external_id,
                    kind = %record.kind,
                    reason = "unknown kind",
                    "Dropping entity record"
                );
                report.entities_dropped += 1;
                continue;
            };

            if kind != NodeKind::Case && external_id == case_id.as_str() {
                tracing::warn!(
                    case_id = %case_id,
                    external_id = %external_id,
                    kind = %record.kind,
                    reason = "queried case recorded as a party",
                    "Dropping entity record"
                );
                report.entities_dropped += 1;
                continue;
            }

            let id = NodeId::from_external(external_id);
            match nodes.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert((node_from_record(id, kind, &record), external_id.to_string()));
                }
                Entry::Occupied(mut slot) => {
                    let (existing, existing_external) = slot.get_mut();
                    if existing_external.as_str() != external_id {
                        tracing::error!(
                            case_id = %case_id,
                            node_id = %id,
                            first = %existing_external,
                            second = %external_id,
                            "Node id collision"
                        );
                        return Err(EngineError::Internal(format!(
                            "external ids {} and {} map to the same node id {}",
                            existing_external, external_id, id
                        )));
                    }
                    if existing.kind != kind {
                        tracing::warn!(
                            case_id = %case_id,
                            external_id = %external_id,
                            kind = %record.kind,
                            reason = "conflicting kind",
                            "Dropping entity record"
                        );
                        report.entities_dropped += 1;
                        continue;
                    }
                    merge_into(existing, &record);
                    report.entities_merged += 1;
                }
            }
        }

        Ok(nodes)
    }
}

/// Convert a collaborator error into an engine error
pub(crate) fn upstream<E: Into<UpstreamError>>(e: E) -> EngineError {
    let e: UpstreamError = e.into();
    EngineError::from(e)
}

fn node_from_record(id: NodeId, kind: NodeKind, record: &EntityRecord) -> Node {
    let mut node = Node::new(id, kind, record.display_name.trim());
    merge_into(&mut node, record);
    node
}

/// Union case refs and attributes; the first value of an attribute wins, as
/// does the first non-empty display name
fn merge_into(node: &mut Node, record: &EntityRecord) {
    if node.display_name.is_empty() {
        node.display_name = record.display_name.trim().to_string();
    }
    // Case nodes carry no case refs
    if node.kind != NodeKind::Case {
        node.case_refs.extend(
            record
                .case_refs
                .iter()
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .map(CaseId::from),
        );
    }
    for (key, value) in &record.attributes {
        node.attributes
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
}

/// The queried case always has a CASE node
///
/// Non-case records for the case id were already dropped by `collect_nodes`.
fn ensure_case_node(
    case_id: &CaseId,
    nodes: &mut BTreeMap<NodeId, (Node, String)>,
    report: &mut BuildReport,
) {
    let id = NodeId::from_external(case_id.as_str());
    if nodes.contains_key(&id) {
        return;
    }
    tracing::debug!(case_id = %case_id, "Synthesizing case node");
    nodes.insert(
        id,
        (
            Node::new(id, NodeKind::Case, case_id.as_str()),
            case_id.as_str().to_string(),
        ),
    );
    report.case_node_synthesized = true;
}

fn collect_edges(
    case_id: &CaseId,
    nodes: &BTreeMap<NodeId, (Node, String)>,
    relationships: Vec<RelationshipRecord>,
    report: &mut BuildReport,
) -> BTreeMap<(NodeId, NodeId, RelationType), Edge> {
    let mut edges: BTreeMap<(NodeId, NodeId, RelationType), Edge> = BTreeMap::new();

    for record in relationships {
        let reason = match validate_relationship(nodes, &record) {
            Ok(edge) => {
                match edges.entry(edge.key()) {
                    Entry::Vacant(slot) => {
                        slot.insert(edge);
                    }
                    Entry::Occupied(mut slot) => {
                        if edge.confidence > slot.get().confidence {
                            slot.insert(edge);
                        }
                        report.edges_merged += 1;
                    }
                }
                continue;
            }
            Err(reason) => reason,
        };

        tracing::warn!(
            case_id = %case_id,
            source_id = %record.source_id,
            target_id = %record.target_id,
            relation = %record.relation,
            reason,
            "Dropping relationship record"
        );
        report.edges_dropped += 1;
    }

    edges
}

fn validate_relationship(
    nodes: &BTreeMap<NodeId, (Node, String)>,
    record: &RelationshipRecord,
) -> Result<Edge, &'static str> {
    let relation = RelationType::parse(&record.relation).ok_or("unknown relation")?;

    let source = NodeId::from_external(record.source_id.trim());
    let target = NodeId::from_external(record.target_id.trim());
    if !nodes.contains_key(&source) || !nodes.contains_key(&target) {
        return Err("unknown node");
    }
    if source == target {
        return Err("self loop");
    }

    let confidence = match record.confidence {
        None => 1.0,
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        Some(_) => return Err("non-finite confidence"),
    };

    Ok(Edge::new(source, target, relation, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_id() -> CaseId {
        CaseId::from("case-1")
    }

    fn builder() -> GraphBuilder {
        GraphBuilder::from_config(&EngineConfig::default())
    }

    fn basic_entities() -> Vec<EntityRecord> {
        vec![
            EntityRecord::new("case-1", "case", "Smith v. Jones"),
            EntityRecord::new("p-ann", "person", "Ann").with_case_ref("case-1"),
            EntityRecord::new("o-acme", "Organization", "Acme").with_case_ref("case-1"),
        ]
    }

    #[test]
    fn test_basic_build() {
        let (snapshot, report) = builder()
            .assemble(
                &case_id(),
                4,
                basic_entities(),
                vec![RelationshipRecord::new("p-ann", "case-1", "represents")],
            )
            .unwrap();

        assert_eq!(snapshot.version(), 4);
        assert_eq!(snapshot.node_count(), 3);
        assert_eq!(snapshot.edge_count(), 1);
        assert_eq!(snapshot.edges()[0].confidence, 1.0);
        assert_eq!(report, BuildReport::default());
    }

    #[test]
    fn test_unknown_kind_dropped() {
        let mut entities = basic_entities();
        entities.push(EntityRecord::new("x-1", "spaceship", "USS Nowhere"));

        let (snapshot, report) = builder().assemble(&case_id(), 1, entities, vec![]).unwrap();
        assert_eq!(snapshot.node_count(), 3);
        assert_eq!(report.entities_dropped, 1);
    }

    #[test]
    fn test_duplicate_entities_merged() {
        let mut entities = basic_entities();
        entities.push(
            EntityRecord::new("p-ann", "PERSON", "Ann Smith")
                .with_case_ref("case-2")
                .with_attribute("role", "plaintiff"),
        );

        let (snapshot, report) = builder().assemble(&case_id(), 1, entities, vec![]).unwrap();
        let ann = snapshot.node(NodeId::from_external("p-ann")).unwrap();

        assert_eq!(report.entities_merged, 1);
        assert_eq!(ann.display_name, "Ann");
        assert_eq!(ann.case_refs.len(), 2);
        assert_eq!(ann.attribute("role"), Some("plaintiff"));
    }

    #[test]
    fn test_conflicting_kind_dropped() {
        let mut entities = basic_entities();
        entities.push(EntityRecord::new("p-ann", "organization", "Ann Inc"));

        let (snapshot, report) = builder().assemble(&case_id(), 1, entities, vec![]).unwrap();
        assert_eq!(report.entities_dropped, 1);
        assert_eq!(
            snapshot.node(NodeId::from_external("p-ann")).unwrap().kind,
            NodeKind::Person
        );
    }

    #[test]
    fn test_case_node_synthesized() {
        let entities = vec![EntityRecord::new("p-ann", "person", "Ann")];
        let (snapshot, report) = builder().assemble(&case_id(), 1, entities, vec![]).unwrap();

        let case = snapshot.node(NodeId::from_external("case-1")).unwrap();
        assert_eq!(case.kind, NodeKind::Case);
        assert!(report.case_node_synthesized);
    }

    #[test]
    fn test_case_id_recorded_as_party() {
        let entities = vec![
            EntityRecord::new("case-1", "person", "Confusing"),
            EntityRecord::new("p-ann", "person", "Ann"),
        ];
        let relationships = vec![RelationshipRecord::new("p-ann", "case-1", "represents")];

        let (snapshot, report) = builder()
            .assemble(&case_id(), 1, entities, relationships)
            .unwrap();

        assert_eq!(report.entities_dropped, 1);
        assert!(report.case_node_synthesized);
        let case_node = snapshot.node(NodeId::from_external("case-1")).unwrap();
        assert_eq!(case_node.kind, NodeKind::Case);
        assert_eq!(snapshot.edge_count(), 1);
    }

    #[test]
    fn test_bad_relationships_dropped() {
        let relationships = vec![
            RelationshipRecord::new("p-ann", "ghost", "represents"),
            RelationshipRecord::new("p-ann", "p-ann", "family_tie"),
            RelationshipRecord::new("p-ann", "o-acme", "rivalry"),
            RelationshipRecord::new("p-ann", "o-acme", "employment").with_confidence(f64::NAN),
            RelationshipRecord::new("p-ann", "o-acme", "employment").with_confidence(1.7),
        ];

        let (snapshot, report) = builder()
            .assemble(&case_id(), 1, basic_entities(), relationships)
            .unwrap();

        assert_eq!(report.edges_dropped, 4);
        assert_eq!(snapshot.edge_count(), 1);
        // Out-of-range confidence is clamped, not dropped
        assert_eq!(snapshot.edges()[0].confidence, 1.0);
    }

    #[test]
    fn test_parallel_edges_keep_highest_confidence() {
        let relationships = vec![
            RelationshipRecord::new("p-ann", "o-acme", "family_tie").with_confidence(0.4),
            RelationshipRecord::new("o-acme", "p-ann", "Family Tie").with_confidence(0.8),
            RelationshipRecord::new("p-ann", "o-acme", "family-tie").with_confidence(0.6),
        ];

        let (snapshot, report) = builder()
            .assemble(&case_id(), 1, basic_entities(), relationships)
            .unwrap();

        assert_eq!(snapshot.edge_count(), 1);
        assert_eq!(snapshot.edges()[0].relation, RelationType::FamilyTie);
        assert_eq!(snapshot.edges()[0].confidence, 0.8);
        assert_eq!(report.edges_merged, 2);
    }

    #[test]
    fn test_too_many_nodes() {
        let result = GraphBuilder::new(2, 10).assemble(&case_id(), 1, basic_entities(), vec![]);
        assert_eq!(
            result.unwrap_err(),
            EngineError::TooLarge { what: "nodes", count: 3, limit: 2 }
        );
    }

    #[test]
    fn test_too_many_edges() {
        let relationships = vec![
            RelationshipRecord::new("p-ann", "case-1", "represents"),
            RelationshipRecord::new("o-acme", "case-1", "opposing_party"),
        ];
        let result = GraphBuilder::new(10, 1).assemble(&case_id(), 1, basic_entities(), relationships);
        assert!(matches!(result, Err(EngineError::TooLarge { what: "edges", .. })));
    }

    #[test]
    fn test_timestamps_do_not_affect_snapshot() {
        let build = |stamp: u64| {
            let entities = basic_entities()
                .into_iter()
                .map(|e| e.with_updated_at(stamp))
                .collect();
            let relationships =
                vec![RelationshipRecord::new("p-ann", "case-1", "represents").with_updated_at(stamp)];
            builder().assemble(&case_id(), 1, entities, relationships).unwrap().0
        };

        assert_eq!(build(1), build(2));
    }
}
