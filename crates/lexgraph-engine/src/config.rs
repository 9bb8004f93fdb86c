//! Configuration for the conflict engine
//!
//! Defines the snapshot cache size, graph size bounds and explanation hop caps.

use serde::{Deserialize, Serialize};

/// Configuration for the conflict engine
///
/// # Examples
///
/// ```
/// use lexgraph_engine::EngineConfig;
///
/// // Default configuration (balanced)
/// let config = EngineConfig::default();
/// assert_eq!(config.default_max_hops, 6);
///
/// // Small: for constrained deployments
/// let config = EngineConfig::small();
/// assert_eq!(config.cache_capacity, 32);
///
/// // Large: for big firms with long case histories
/// let config = EngineConfig::large();
/// assert_eq!(config.max_nodes, 50_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of cases whose snapshots are kept in memory
    /// Default: 256
    pub cache_capacity: usize,

    /// Largest accepted graph, in nodes
    /// Default: 10,000
    pub max_nodes: usize,

    /// Largest accepted graph, in edges
    /// Default: 50,000
    pub max_edges: usize,

    /// Hop cap used when an explain request does not give one
    /// Default: 6
    pub default_max_hops: usize,

    /// Upper bound on any requested hop cap
    /// Default: 12
    pub max_hops_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            max_nodes: 10_000,
            max_edges: 50_000,
            default_max_hops: lexgraph_domain::DEFAULT_MAX_HOPS,
            max_hops_limit: 12,
        }
    }
}

impl EngineConfig {
    /// Small configuration (few cached cases, tight graph bounds)
    ///
    /// - Cache: 32 cases
    /// - Graph: 2,000 nodes / 10,000 edges
    /// - Hop limit: 8
    pub fn small() -> Self {
        Self {
            cache_capacity: 32,
            max_nodes: 2_000,
            max_edges: 10_000,
            max_hops_limit: 8,
            ..Self::default()
        }
    }

    /// Large configuration (many cached cases, generous graph bounds)
    ///
    /// - Cache: 1,024 cases
    /// - Graph: 50,000 nodes / 250,000 edges
    /// - Hop limit: 16
    pub fn large() -> Self {
        Self {
            cache_capacity: 1_024,
            max_nodes: 50_000,
            max_edges: 250_000,
            max_hops_limit: 16,
            ..Self::default()
        }
    }

    /// Hop cap for an explain request
    ///
    /// Falls back to `default_max_hops` and never exceeds `max_hops_limit`.
    pub fn effective_max_hops(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_max_hops)
            .min(self.max_hops_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_capacity, 256);
        assert_eq!(config.max_nodes, 10_000);
        assert_eq!(config.max_edges, 50_000);
        assert_eq!(config.default_max_hops, 6);
        assert_eq!(config.max_hops_limit, 12);
    }

    #[test]
    fn test_presets() {
        let small = EngineConfig::small();
        let large = EngineConfig::large();
        assert!(small.max_nodes < EngineConfig::default().max_nodes);
        assert!(large.max_nodes > EngineConfig::default().max_nodes);
        assert_eq!(small.default_max_hops, large.default_max_hops);
    }

    #[test]
    fn test_effective_max_hops() {
        let config = EngineConfig::default();
        assert_eq!(config.effective_max_hops(None), 6);
        assert_eq!(config.effective_max_hops(Some(2)), 2);
        assert_eq!(config.effective_max_hops(Some(100)), 12);
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str("cache_capacity = 8").unwrap();
        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.max_nodes, 10_000);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = EngineConfig::large();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }
}
