//! Risk aggregation
//!
//! Reduces a set of findings to a single bounded score:
//! 1. Base contribution per severity, scaled by finding confidence
//! 2. Diminishing weight (1, 1/2, 1/4, ...) for repeated findings on one entity
//! 3. Sum, capped at [`MAX_RISK`]

use crate::{ConflictFinding, NodeId, RuleId, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound of a risk score
pub const MAX_RISK: f64 = 100.0;

/// Weight table for risk aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct RiskWeights {
    /// Contribution of a CRITICAL finding at full confidence
    pub critical: f64,
    /// Contribution of a HIGH finding at full confidence
    pub high: f64,
    /// Contribution of a MEDIUM finding at full confidence
    pub medium: f64,
    /// Contribution of a LOW finding at full confidence
    pub low: f64,
    /// Factor applied to each further finding on the same entity
    pub repeat_decay: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            critical: 40.0,
            high: 25.0,
            medium: 10.0,
            low: 3.0,
            repeat_decay: 0.5,
        }
    }
}

impl RiskWeights {
    /// Contribution of a severity at full confidence
    pub fn base(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// Share of the score attributed to one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    /// Rule
    pub rule_id: RuleId,
    /// Points contributed (after capping)
    pub contribution: f64,
}

/// Aggregate risk for a set of findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// Score in [0, 100]
    pub value: f64,
    /// Per-rule contributions in rule order, summing to `value`
    pub basis: Vec<RiskContribution>,
}

impl RiskScore {
    /// Score of an empty finding set
    pub fn zero() -> Self {
        Self {
            value: 0.0,
            basis: Vec::new(),
        }
    }
}

/// Score findings with the default weights
///
/// # Examples
///
/// ```
/// use lexgraph_domain::risk::score;
///
/// let result = score(&[]);
/// assert_eq!(result.value, 0.0);
/// assert!(result.basis.is_empty());
/// ```
pub fn score(findings: &[ConflictFinding]) -> RiskScore {
    score_with(findings, &RiskWeights::default())
}

/// Score findings with explicit weights
///
/// The result does not depend on the order of `findings`: they are sorted into
/// canonical order first. Within one entity, the strongest finding keeps full
/// weight and weaker ones decay, so adding a finding never lowers the score.
pub fn score_with(findings: &[ConflictFinding], weights: &RiskWeights) -> RiskScore {
    if findings.is_empty() {
        return RiskScore::zero();
    }

    let mut ordered: Vec<&ConflictFinding> = findings.iter().collect();
    ordered.sort_by(|a, b| a.canonical_cmp(b));

    let mut by_entity: BTreeMap<NodeId, Vec<(&ConflictFinding, f64)>> = BTreeMap::new();
    for finding in ordered {
        let raw = weights.base(finding.severity) * finding.confidence.clamp(0.0, 1.0);
        by_entity.entry(finding.entity_id).or_default().push((finding, raw));
    }

    let mut per_rule: BTreeMap<RuleId, f64> = BTreeMap::new();
    for group in by_entity.values_mut() {
        // Stable sort keeps canonical order among equal contributions
        group.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut weight = 1.0;
        for (finding, raw) in group.iter() {
            *per_rule.entry(finding.rule_id).or_insert(0.0) += raw * weight;
            weight *= weights.repeat_decay;
        }
    }

    let total: f64 = per_rule.values().sum();
    let scale = if total > MAX_RISK { MAX_RISK / total } else { 1.0 };

    let basis = per_rule
        .into_iter()
        .filter(|&(_, points)| points > 0.0)
        .map(|(rule_id, points)| RiskContribution {
            rule_id,
            contribution: points * scale,
        })
        .collect();

    RiskScore {
        value: total.min(MAX_RISK),
        basis,
    }
}
