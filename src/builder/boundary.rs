// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sharing-boundary propagation and inferred-boundary synthesis (spec §4.3, §4.4).

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction::Incoming;
use std::collections::{BTreeSet, HashMap};

/// For every node, the set of sharing boundaries its *non-factory* importers require it to be
/// confined to, propagated backwards along the import graph until a fixpoint is reached.
///
/// A `BTreeSet` both dedups and keeps each node's boundary names sorted, which is what makes the
/// inferred-boundary join in [`synthesize_inferred_boundaries`] deterministic without a separate
/// sort step.
pub(crate) type RequiredBoundaries = HashMap<NodeIndex, BTreeSet<String>>;

/// Propagates each shared part's own sharing boundary backwards to every part that imports it
/// (directly or transitively) via a non-factory import.
///
/// Factory imports do not propagate (spec §4.1 step 4): a part imported only through an
/// export-factory gets a fresh, non-shared instance per call, so it never needs to live inside
/// the caller's sharing boundary.
pub(crate) fn propagate_owned_boundaries<N>(
    graph: &DiGraph<N, bool>,
    own_boundaries: &HashMap<NodeIndex, String>,
) -> RequiredBoundaries {
    let mut required: RequiredBoundaries = HashMap::new();
    for (&node, boundary) in own_boundaries {
        if !boundary.is_empty() {
            propagate_from(graph, &mut required, node, boundary);
        }
    }
    required
}

fn propagate_from<N>(
    graph: &DiGraph<N, bool>,
    required: &mut RequiredBoundaries,
    node: NodeIndex,
    boundary: &str,
) {
    let set = required.entry(node).or_default();
    if !set.insert(boundary.to_string()) {
        // Already recorded at this node: every node it would propagate to has already seen it
        // too, by induction. This is the fixpoint termination check (spec §4.3).
        return;
    }

    for edge in graph.edges_directed(node, Incoming) {
        let is_factory = *edge.weight();
        if is_factory {
            continue;
        }
        let importer = edge.source();
        propagate_from(graph, required, importer, boundary);
    }
}

/// For every part whose boundary is inferred rather than declared, synthesizes its effective
/// sharing boundary as the lexicographically sorted join of the boundary names propagated to it
/// (spec §4.4). A part with no required boundaries at all is a process-global singleton (the
/// empty string), per spec §9's resolution of that open question.
pub(crate) fn synthesize_inferred_boundaries<'a>(
    inferred_nodes: impl Iterator<Item = NodeIndex>,
    required: &RequiredBoundaries,
) -> HashMap<NodeIndex, String> {
    inferred_nodes
        .map(|node| {
            let joined = required
                .get(&node)
                .map(|set| set.iter().cloned().collect::<Vec<_>>().join("-"))
                .unwrap_or_default();
            (node, joined)
        })
        .collect()
}
