//! Topological ordering of the dependency graph
//!
//! Kahn's algorithm over `node → dependencies`. Among nodes that become
//! eligible at the same time the lowest index (earliest instantiated) goes
//! first. Callers should rely only on every dependency preceding its
//! dependents, not on the order of independent tests.

use crate::NodeIndex;
use std::collections::{BTreeMap, BTreeSet};

/// Order nodes so every dependency precedes its dependents
///
/// A graph from [`crate::DependencyGraph::build`] is acyclic. Should a cycle
/// slip through anyway, its nodes are left out and logged.
pub fn topological_sort(edges: &BTreeMap<NodeIndex, BTreeSet<NodeIndex>>) -> Vec<NodeIndex> {
    let mut remaining: BTreeMap<NodeIndex, BTreeSet<NodeIndex>> = edges.clone();
    // Nodes only ever named as a dependency still need scheduling
    for deps in edges.values() {
        for &dep in deps {
            remaining.entry(dep).or_default();
        }
    }

    let mut ready: BTreeSet<NodeIndex> = remaining
        .iter()
        .filter(|(_, deps)| deps.is_empty())
        .map(|(&node, _)| node)
        .collect();
    for node in &ready {
        remaining.remove(node);
    }

    let mut order = Vec::with_capacity(edges.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);

        let mut unblocked = Vec::new();
        for (&other, deps) in remaining.iter_mut() {
            if deps.remove(&node) && deps.is_empty() {
                unblocked.push(other);
            }
        }
        for other in unblocked {
            remaining.remove(&other);
            ready.insert(other);
        }
    }

    if !remaining.is_empty() {
        tracing::error!(
            unscheduled = ?remaining.keys().collect::<Vec<_>>(),
            "Dependency cycle left tests unscheduled"
        );
    }
    order
}
