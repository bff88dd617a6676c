// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cycle detection over the non-shared subgraph (spec §4.2).
//!
//! Note this is deliberately *not* a strongly-connected-components search: the spec's policy
//! only flags a cycle when a walk starting at a given non-shared root revisits that same root.
//! Revisiting any other node along the way is allowed (it just means more than one import path
//! reaches it), so a plain SCC computation like the teacher's `Sccs`-based `Cycles` would be both
//! the wrong shape (it reports every multi-node SCC, not root-specific revisits) and too coarse
//! (it would treat "reachable from two paths" the same as "forms a cycle").

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction::Outgoing;
use std::collections::{HashSet, VecDeque};

/// Returns the first non-shared part whose walk revisits itself, if any.
///
/// Walks the non-shared subgraph breadth-first from every non-shared root. Edges that would
/// leave the non-shared subgraph (into a shared part) are not followed: a shared part breaks the
/// walk, since its own sharing boundary already gives it independent lifetime.
pub(crate) fn find_cycle_root<N, E>(
    graph: &DiGraph<N, E>,
    is_shared: impl Fn(NodeIndex) -> bool,
) -> Option<NodeIndex> {
    graph
        .node_indices()
        .filter(|&root| !is_shared(root))
        .find(|&root| revisits_root(graph, root, &is_shared))
}

fn revisits_root<N, E>(
    graph: &DiGraph<N, E>,
    root: NodeIndex,
    is_shared: &impl Fn(NodeIndex) -> bool,
) -> bool {
    let mut visited: HashSet<NodeIndex> = HashSet::from([root]);
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        for neighbor in graph.neighbors_directed(node, Outgoing) {
            if is_shared(neighbor) {
                continue;
            }
            if neighbor == root {
                return true;
            }
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
            // A neighbor already in `visited` (and not the root) is a legal revisit of a
            // non-root node reached via more than one path; it is not re-enqueued, but it does
            // not count as a cycle either.
        }
    }
    false
}
