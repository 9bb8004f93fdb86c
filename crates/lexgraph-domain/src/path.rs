//! Path explanation between two entities of a snapshot
//!
//! Breadth-first search over the snapshot with every edge traversable in both
//! directions: an explanation is about connectivity, not direction. The search
//! is bounded by a hop cap.

use crate::{GraphSnapshot, NodeId};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Default hop cap for explanations
pub const DEFAULT_MAX_HOPS: usize = 6;

/// Reasons no explanation path can be returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The node is not part of the snapshot
    NotFound(NodeId),

    /// The nodes are not connected within the hop cap
    NoPath {
        /// Start node
        from: NodeId,
        /// End node
        to: NodeId,
        /// Hop cap that was applied
        max_hops: usize,
    },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::NotFound(id) => write!(f, "node {} not found in snapshot", id),
            PathError::NoPath { from, to, max_hops } => {
                write!(f, "no path from {} to {} within {} hops", from, to, max_hops)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Find the shortest path from `from` to `to`
///
/// Returns the node sequence including both endpoints. When several shortest
/// paths exist, the one whose node-id sequence is lexicographically smallest
/// wins.
///
/// # Errors
/// - [`PathError::NotFound`] if either id is absent from the snapshot
/// - [`PathError::NoPath`] if `to` is not reachable within `max_hops`
pub fn explain(
    snapshot: &GraphSnapshot,
    from: NodeId,
    to: NodeId,
    max_hops: usize,
) -> Result<Vec<NodeId>, PathError> {
    for id in [from, to] {
        if !snapshot.contains(id) {
            return Err(PathError::NotFound(id));
        }
    }

    if from == to {
        return Ok(vec![from]);
    }

    let distances = distances_to(snapshot, to, from, max_hops);
    let Some(&hops) = distances.get(&from) else {
        return Err(PathError::NoPath { from, to, max_hops });
    };

    // Greedy walk: the smallest neighbour one step closer to `to` at every
    // position yields the lexicographically smallest shortest path
    let mut path = Vec::with_capacity(hops + 1);
    path.push(from);
    let mut current = from;
    for remaining in (0..hops).rev() {
        let next = snapshot
            .neighbors(current)
            .into_iter()
            .find(|n| distances.get(n) == Some(&remaining))
            .ok_or(PathError::NoPath { from, to, max_hops })?;
        path.push(next);
        current = next;
    }

    Ok(path)
}

/// BFS distances from `target`, stopping once `stop_at` is reached or the
/// hop cap is exhausted
fn distances_to(
    snapshot: &GraphSnapshot,
    target: NodeId,
    stop_at: NodeId,
    max_hops: usize,
) -> HashMap<NodeId, usize> {
    let mut distances = HashMap::new();
    let mut queue = VecDeque::new();

    distances.insert(target, 0);
    queue.push_back(target);

    while let Some(current) = queue.pop_front() {
        let depth = distances[&current];
        if depth >= max_hops {
            continue;
        }

        for neighbor in snapshot.neighbors(current) {
            if distances.contains_key(&neighbor) {
                continue;
            }
            distances.insert(neighbor, depth + 1);
            if neighbor == stop_at {
                // Every node closer to the target is already labelled
                return distances;
            }
            queue.push_back(neighbor);
        }
    }

    distances
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::fixtures::random_snapshot;
    use proptest::prelude::*;

    proptest! {
        /// Property: every returned path is a valid walk within the hop cap
        #[test]
        fn test_path_validity(
            kinds in prop::collection::vec(0u8..3, 2..12),
            edges in prop::collection::vec((0usize..12, 0usize..12, 0u8..7, 0u8..=10), 0..30),
            from in 0usize..12,
            to in 0usize..12,
            max_hops in 0usize..8,
        ) {
            let snapshot = random_snapshot(&kinds, &edges);
            let ids: Vec<NodeId> = snapshot.nodes().iter().map(|n| n.id).collect();
            let from = ids[from % ids.len()];
            let to = ids[to % ids.len()];

            match explain(&snapshot, from, to, max_hops) {
                Ok(path) => {
                    prop_assert_eq!(path[0], from);
                    prop_assert_eq!(*path.last().unwrap(), to);
                    prop_assert!(path.len() - 1 <= max_hops);
                    for pair in path.windows(2) {
                        prop_assert!(snapshot.connected(pair[0], pair[1]));
                    }
                }
                Err(PathError::NoPath { .. }) => {}
                Err(e) => prop_assert!(false, "unexpected error {}", e),
            }
        }

        /// Property: the result is independent of the cap once the cap allows it
        #[test]
        fn test_path_stable_under_larger_cap(
            kinds in prop::collection::vec(0u8..3, 2..12),
            edges in prop::collection::vec((0usize..12, 0usize..12, 0u8..7, 0u8..=10), 0..30),
            from in 0usize..12,
            to in 0usize..12,
        ) {
            let snapshot = random_snapshot(&kinds, &edges);
            let ids: Vec<NodeId> = snapshot.nodes().iter().map(|n| n.id).collect();
            let from = ids[from % ids.len()];
            let to = ids[to % ids.len()];

            if let Ok(path) = explain(&snapshot, from, to, 12) {
                let tight = explain(&snapshot, from, to, path.len() - 1).unwrap();
                prop_assert_eq!(tight, path);
            }
        }
    }
}
