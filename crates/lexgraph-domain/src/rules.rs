//! Conflict rule evaluator
//!
//! Every rule is a pure function of a [`GraphSnapshot`]: no hidden state, no
//! randomness, no clock. Rules run in [`RuleId`] order and each rule emits its
//! findings ordered by `entity_id`, then `related_entities`, so two runs over
//! the same snapshot yield identical output.
//!
//! Vocabulary used below:
//! - a *party* is a PERSON or ORGANIZATION node
//! - a party *represents* a case when it has a REPRESENTS edge into that case
//! - a party is *adverse in* a case when an OPPOSING_PARTY edge joins the two
//! - two parties are *opponents* when an OPPOSING_PARTY edge joins them; a
//!   party is then also adverse in every case its opponent represents, for the
//!   FAMILY_TIE_OPPOSING and FINANCIAL_INTEREST rules
//! - a case is *represented* when some party represents it

use crate::{ConflictFinding, GraphSnapshot, NodeId, RelationType, RuleId, Severity};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Financial-interest findings below this edge confidence are downgraded to LOW
pub const FINANCIAL_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Run every rule over a snapshot
///
/// # Examples
///
/// ```
/// use lexgraph_domain::{rules, CaseId, GraphSnapshot, Node, NodeId, NodeKind};
///
/// let nodes = (0..5)
///     .map(|i| {
///         let name = format!("p{}", i);
///         Node::new(NodeId::from_external(&name), NodeKind::Person, name)
///     })
///     .collect();
/// let snapshot = GraphSnapshot::new(CaseId::from("c"), 1, nodes, vec![]).unwrap();
/// assert!(rules::detect(&snapshot).is_empty());
/// ```
pub fn detect(snapshot: &GraphSnapshot) -> Vec<ConflictFinding> {
    let index = RoleIndex::new(snapshot);
    RuleId::ALL
        .iter()
        .flat_map(|&rule| evaluate(rule, snapshot, &index))
        .collect()
}

/// Run a single rule over a snapshot
pub fn evaluate_rule(rule: RuleId, snapshot: &GraphSnapshot) -> Vec<ConflictFinding> {
    evaluate(rule, snapshot, &RoleIndex::new(snapshot))
}

fn evaluate(rule: RuleId, snapshot: &GraphSnapshot, index: &RoleIndex) -> Vec<ConflictFinding> {
    match rule {
        RuleId::AdverseRepresentation => adverse_representation(snapshot, index),
        RuleId::FamilyTieOpposing => family_tie_opposing(snapshot, index),
        RuleId::FinancialInterest => financial_interest(snapshot, index),
        RuleId::SharedOpposingParty => shared_opposing_party(index),
    }
}

/// Who represents and who opposes which case, with edge confidences
#[derive(Default)]
struct RoleIndex {
    /// party -> cases it represents
    represents: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
    /// case -> parties representing it
    representatives: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
    /// party -> cases it is adverse in
    adverse: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
    /// case -> parties adverse in it
    adversaries: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
    /// party -> parties joined to it by a counter-party edge, both directions
    opponents: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
}

impl RoleIndex {
    fn new(snapshot: &GraphSnapshot) -> Self {
        let mut index = RoleIndex::default();
        let is_party = |id: NodeId| snapshot.node(id).is_some_and(|n| n.is_party());
        let is_case = |id: NodeId| snapshot.node(id).is_some_and(|n| !n.is_party());

        for edge in snapshot.edges_of(RelationType::Represents) {
            if is_party(edge.source) && is_case(edge.target) {
                keep_max(&mut index.represents, edge.source, edge.target, edge.confidence);
                keep_max(&mut index.representatives, edge.target, edge.source, edge.confidence);
            }
        }

        for edge in snapshot.edges_of(RelationType::OpposingParty) {
            let pair = if is_party(edge.source) && is_case(edge.target) {
                Some((edge.source, edge.target))
            } else if is_case(edge.source) && is_party(edge.target) {
                Some((edge.target, edge.source))
            } else {
                None
            };
            if let Some((party, case)) = pair {
                keep_max(&mut index.adverse, party, case, edge.confidence);
                keep_max(&mut index.adversaries, case, party, edge.confidence);
            } else if is_party(edge.source) && is_party(edge.target) {
                keep_max(&mut index.opponents, edge.source, edge.target, edge.confidence);
                keep_max(&mut index.opponents, edge.target, edge.source, edge.confidence);
            }
        }

        index
    }

    /// Cases a party is adverse in, directly or against a party representing the case
    fn adverse_cases(&self, party: NodeId) -> BTreeMap<NodeId, f64> {
        let mut cases = self.adverse.get(&party).cloned().unwrap_or_default();
        for (opponent, &opp_conf) in self.opponents.get(&party).into_iter().flatten() {
            for (&case, &rep_conf) in self.represents.get(opponent).into_iter().flatten() {
                let value = opp_conf.min(rep_conf);
                let slot = cases.entry(case).or_insert(value);
                if value > *slot {
                    *slot = value;
                }
            }
        }
        cases
    }

    /// Strongest evidence that a party is an opposing party anywhere
    fn opposition(&self, party: NodeId) -> Option<f64> {
        self.adverse
            .get(&party)
            .into_iter()
            .chain(self.opponents.get(&party))
            .flat_map(|m| m.values().copied())
            .reduce(f64::max)
    }
}

fn keep_max(map: &mut BTreeMap<NodeId, BTreeMap<NodeId, f64>>, outer: NodeId, inner: NodeId, value: f64) {
    let slot = map.entry(outer).or_default().entry(inner).or_insert(value);
    if value > *slot {
        *slot = value;
    }
}

/// Collapses matches into one finding per `(entity, related)` pair
struct FindingSet {
    rule: RuleId,
    entries: BTreeMap<(NodeId, Vec<NodeId>), (Severity, f64)>,
}

impl FindingSet {
    fn new(rule: RuleId) -> Self {
        Self {
            rule,
            entries: BTreeMap::new(),
        }
    }

    fn record(&mut self, entity: NodeId, mut related: Vec<NodeId>, severity: Severity, confidence: f64) {
        related.sort();
        related.dedup();
        // A finding never implicates its own center
        if related.is_empty() || related.contains(&entity) {
            return;
        }

        match self.entries.entry((entity, related)) {
            Entry::Vacant(slot) => {
                slot.insert((severity, confidence));
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                if severity > current.0 || (severity == current.0 && confidence > current.1) {
                    *current = (severity, confidence);
                }
            }
        }
    }

    fn into_findings(self) -> Vec<ConflictFinding> {
        let rule = self.rule;
        self.entries
            .into_iter()
            .map(|((entity_id, related_entities), (severity, confidence))| ConflictFinding {
                entity_id,
                rule_id: rule,
                severity,
                related_entities,
                confidence,
            })
            .collect()
    }
}

fn both_open(snapshot: &GraphSnapshot, a: NodeId, b: NodeId) -> bool {
    let open = |id: NodeId| snapshot.node(id).is_some_and(|n| n.is_open_case());
    open(a) && open(b)
}

fn representation_severity(snapshot: &GraphSnapshot, a: NodeId, b: NodeId) -> Severity {
    if both_open(snapshot, a, b) {
        Severity::Critical
    } else {
        Severity::High
    }
}

/// ADVERSE_REPRESENTATION: a party represents case A and is tied to an
/// OPPOSING_PARTY edge into case B != A, either directly or through one
/// CO_PARTY / REPRESENTS hop
fn adverse_representation(snapshot: &GraphSnapshot, index: &RoleIndex) -> Vec<ConflictFinding> {
    let mut set = FindingSet::new(RuleId::AdverseRepresentation);

    for (&party, represented) in &index.represents {
        // Direct: the party itself opposes case B
        if let Some(adverse) = index.adverse.get(&party) {
            for (&case_b, &opp_conf) in adverse {
                let counterparts: Vec<NodeId> = index
                    .representatives
                    .get(&case_b)
                    .map(|reps| reps.keys().copied().filter(|&r| r != party).collect())
                    .unwrap_or_default();
                let related = if counterparts.is_empty() {
                    vec![case_b]
                } else {
                    counterparts
                };

                for (&case_a, &rep_conf) in represented {
                    if case_a == case_b {
                        continue;
                    }
                    set.record(
                        party,
                        related.clone(),
                        representation_severity(snapshot, case_a, case_b),
                        rep_conf.min(opp_conf),
                    );
                }
            }
        }

        // One hop through an associated party that opposes case B
        for edge in snapshot.incident_edges(party) {
            if !matches!(edge.relation, RelationType::CoParty | RelationType::Represents) {
                continue;
            }
            let Some(associate) = edge.other_end(party) else {
                continue;
            };
            let Some(adverse) = index.adverse.get(&associate) else {
                continue;
            };
            for (&case_b, &opp_conf) in adverse {
                for (&case_a, &rep_conf) in represented {
                    if case_a == case_b {
                        continue;
                    }
                    set.record(
                        party,
                        vec![associate],
                        representation_severity(snapshot, case_a, case_b),
                        rep_conf.min(edge.confidence).min(opp_conf),
                    );
                }
            }
        }

        // One hop through represented case B, whose adversary also opposes case A
        for (&case_b, &rep_b_conf) in represented {
            let Some(adversaries) = index.adversaries.get(&case_b) else {
                continue;
            };
            for (&adversary, &opp_b_conf) in adversaries {
                if adversary == party {
                    continue;
                }
                let Some(adverse_cases) = index.adverse.get(&adversary) else {
                    continue;
                };
                for (&case_a, &rep_a_conf) in represented {
                    if case_a == case_b {
                        continue;
                    }
                    let Some(&opp_a_conf) = adverse_cases.get(&case_a) else {
                        continue;
                    };
                    set.record(
                        party,
                        vec![adversary],
                        representation_severity(snapshot, case_a, case_b),
                        rep_a_conf.min(rep_b_conf).min(opp_a_conf).min(opp_b_conf),
                    );
                }
            }
        }
    }

    set.into_findings()
}

/// SHARED_OPPOSING_PARTY: one party is adverse in two or more represented cases
fn shared_opposing_party(index: &RoleIndex) -> Vec<ConflictFinding> {
    let mut set = FindingSet::new(RuleId::SharedOpposingParty);

    for (&party, adverse) in &index.adverse {
        let cases: Vec<(NodeId, f64)> = adverse
            .iter()
            .filter(|(case, _)| {
                index
                    .representatives
                    .get(case)
                    .is_some_and(|reps| reps.keys().any(|&r| r != party))
            })
            .map(|(&case, &conf)| (case, conf))
            .collect();

        if cases.len() < 2 {
            continue;
        }

        let confidence = cases.iter().map(|&(_, c)| c).fold(1.0, f64::min);
        set.record(
            party,
            cases.into_iter().map(|(case, _)| case).collect(),
            Severity::High,
            confidence,
        );
    }

    set.into_findings()
}

/// FAMILY_TIE_OPPOSING: a represented party has a family tie to a party
/// adverse in the same case
fn family_tie_opposing(snapshot: &GraphSnapshot, index: &RoleIndex) -> Vec<ConflictFinding> {
    let mut set = FindingSet::new(RuleId::FamilyTieOpposing);

    for edge in snapshot.edges_of(RelationType::FamilyTie) {
        for (represented, relative) in [(edge.source, edge.target), (edge.target, edge.source)] {
            let Some(cases) = index.represents.get(&represented) else {
                continue;
            };
            let adverse = index.adverse_cases(relative);
            for (case, &rep_conf) in cases {
                if let Some(&opp_conf) = adverse.get(case) {
                    set.record(
                        represented,
                        vec![relative],
                        Severity::Medium,
                        edge.confidence.min(rep_conf).min(opp_conf),
                    );
                }
            }
        }
    }

    set.into_findings()
}

/// FINANCIAL_INTEREST: a firm-controlled party and an opposing party are
/// joined by a FINANCIAL_INTEREST edge
fn financial_interest(snapshot: &GraphSnapshot, index: &RoleIndex) -> Vec<ConflictFinding> {
    let mut set = FindingSet::new(RuleId::FinancialInterest);

    for edge in snapshot.edges_of(RelationType::FinancialInterest) {
        for (holder, counterpart) in [(edge.source, edge.target), (edge.target, edge.source)] {
            if !snapshot.node(holder).is_some_and(|n| n.is_firm_controlled()) {
                continue;
            }
            let Some(opp_conf) = index.opposition(counterpart) else {
                continue;
            };
            let severity = if edge.confidence < FINANCIAL_CONFIDENCE_THRESHOLD {
                Severity::Low
            } else {
                Severity::Medium
            };
            set.record(holder, vec![counterpart], severity, edge.confidence.min(opp_conf));
        }
    }

    set.into_findings()
}
