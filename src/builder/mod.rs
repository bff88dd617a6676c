// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a catalog of composable parts into a validated [`Configuration`] (spec §4.1).

mod boundary;
mod cycles;

use crate::cardinality::Cardinality;
use crate::catalog::{
    ComposableCatalog, ComposablePartDefinition, Export, ExportDefinition, ImportDefinition,
    ImportKey, PartId,
};
use crate::configuration::{ComposablePart, Configuration};
use crate::errors::{Error, PartError};
use crate::provider::{Instantiator, RESERVED_EXPORT_PROVIDER_CONTRACT, SELF_EXPORT_PART_ID};
use crate::sorted_set::SortedSet;
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// The back-edge graph built while resolving a catalog: `u -> v` iff `u` imports some export
/// produced by `v`. Edge weight is whether that import is an export-factory import.
pub(crate) type PartGraph = DiGraph<PartId, bool>;

/// Builds a [`Configuration`] from a catalog.
pub struct Builder;

impl Builder {
    /// Resolves `catalog` into a validated [`Configuration`] (spec §4.1).
    ///
    /// Runs, in order: reserved-contract pre-validation, import resolution against the catalog,
    /// non-shared cycle detection, sharing-boundary propagation and inference, cross-boundary and
    /// cardinality validation, then assembly of the immutable result.
    pub fn create<C: ComposableCatalog>(catalog: &C) -> Result<Configuration, Error> {
        let mut definitions = catalog.parts();

        for def in &definitions {
            for export in &def.exports {
                if export.contract_name.as_str() == RESERVED_EXPORT_PROVIDER_CONTRACT {
                    tracing::warn!(part = %def.part_id, "catalog part exports the reserved contract");
                    return Err(Error::ReservedContractExported(export.contract_name.clone()));
                }
            }
        }
        definitions.push(self_export_definition());

        tracing::debug!(parts = definitions.len(), "building configuration");

        let mut graph: PartGraph = DiGraph::new();
        let mut node_of: HashMap<PartId, NodeIndex> = HashMap::new();
        for def in &definitions {
            let node = graph.add_node(def.part_id.clone());
            node_of.insert(def.part_id.clone(), node);
        }
        let self_export_node = node_of[&PartId::new(SELF_EXPORT_PART_ID)];

        let mut satisfying: HashMap<PartId, IndexMap<ImportKey, Vec<Export>>> = HashMap::new();
        for def in &definitions {
            let mut per_part = IndexMap::new();
            let from = node_of[&def.part_id];
            for binding in def.all_imports() {
                // A part that imports the reserved export-provider contract is satisfied by the
                // synthesized self-export part rather than anything in the catalog (spec §4.6.4).
                if binding.import.contract_name.as_str() == RESERVED_EXPORT_PROVIDER_CONTRACT {
                    graph.add_edge(from, self_export_node, binding.import.is_export_factory);
                    per_part.insert(binding.key.clone(), vec![self_export()]);
                    continue;
                }

                let exports = catalog.get_exports(&binding.import);
                for export in &exports {
                    if let Some(&to) = node_of.get(&export.part_id) {
                        graph.add_edge(from, to, binding.import.is_export_factory);
                    }
                }
                per_part.insert(binding.key.clone(), exports);
            }
            satisfying.insert(def.part_id.clone(), per_part);
        }

        let is_shared: HashMap<NodeIndex, bool> = definitions
            .iter()
            .map(|def| (node_of[&def.part_id], def.is_shared))
            .collect();
        if let Some(root) = cycles::find_cycle_root(&graph, |node| is_shared[&node]) {
            let part_id = graph[root].clone();
            tracing::warn!(part = %part_id, "non-shared import cycle detected");
            return Err(Error::CycleDetected { part_id });
        }

        let mut own_boundaries = HashMap::new();
        for def in &definitions {
            if def.is_shared && !def.is_sharing_boundary_inferred && !def.sharing_boundary.is_empty() {
                own_boundaries.insert(node_of[&def.part_id], def.sharing_boundary.clone());
            }
        }
        let required = boundary::propagate_owned_boundaries(&graph, &own_boundaries);

        for def in &definitions {
            if def.is_shared && !def.is_sharing_boundary_inferred {
                if let Some(required_set) = required.get(&node_of[&def.part_id]) {
                    if let Some(conflicting) = required_set
                        .iter()
                        .find(|boundary| boundary.as_str() != def.sharing_boundary.as_str())
                    {
                        return Err(Error::CrossBoundaryViolation {
                            importer: def.part_id.clone(),
                            boundary: conflicting.clone(),
                        });
                    }
                }
            }
        }

        let inferred_nodes = definitions
            .iter()
            .filter(|def| def.is_sharing_boundary_inferred)
            .map(|def| node_of[&def.part_id]);
        let overrides_by_node = boundary::synthesize_inferred_boundaries(inferred_nodes, &required);
        let inferred_boundary_overrides: HashMap<PartId, String> = overrides_by_node
            .into_iter()
            .map(|(node, boundary)| (graph[node].clone(), boundary))
            .collect();

        let mut part_errors = Vec::new();
        for def in &definitions {
            for binding in def.all_imports() {
                let count = satisfying[&def.part_id][&binding.key].len();
                if !binding.import.cardinality.accepts(count) {
                    part_errors.push(if count == 0 {
                        PartError::UnsatisfiableImport {
                            part_id: def.part_id.clone(),
                            key: binding.key.clone(),
                        }
                    } else {
                        PartError::CardinalityMismatch {
                            part_id: def.part_id.clone(),
                            key: binding.key.clone(),
                            found: count,
                        }
                    });
                }
            }
        }
        if !part_errors.is_empty() {
            tracing::warn!(count = part_errors.len(), "parts failed validation");
            return Err(Error::InvalidParts(part_errors));
        }

        let mut parts = IndexMap::new();
        for def in definitions {
            let node = node_of[&def.part_id];
            let required_boundaries = required
                .get(&node)
                .map(|set| SortedSet::new(set.iter().cloned().collect::<Vec<_>>()))
                .unwrap_or_else(SortedSet::empty);
            let part_id = def.part_id.clone();
            let satisfying_exports = satisfying.remove(&part_id).unwrap_or_default();
            parts.insert(
                part_id,
                ComposablePart {
                    definition: def,
                    satisfying_exports,
                    required_sharing_boundaries: required_boundaries,
                },
            );
        }

        Ok(Configuration::new(parts, inferred_boundary_overrides))
    }
}

/// The synthesized part representing the provider's own self-export (spec §4.6.4): shared,
/// process-global, and exporting only the reserved contract.
fn self_export_definition() -> ComposablePartDefinition {
    let mut def = ComposablePartDefinition::new(PartId::new(SELF_EXPORT_PART_ID));
    def.is_shared = true;
    def.exports.push(ExportDefinition::new(RESERVED_EXPORT_PROVIDER_CONTRACT));
    def
}

/// The [`Export`] standing in for the self-export part wherever a part's import of the reserved
/// export-provider contract needs to be recorded alongside ordinary catalog exports (e.g.
/// [`crate::ComposablePart::exports_for`]). At runtime this factory is never actually invoked:
/// [`crate::provider::ExportProvider`] short-circuits the reserved contract before it reaches any
/// export's factory, so this only delegates back through [`crate::provider::Instantiator::resolve`]
/// for the rare caller that evaluates it directly.
fn self_export() -> Export {
    Export::new(
        ExportDefinition::new(RESERVED_EXPORT_PROVIDER_CONTRACT),
        PartId::new(SELF_EXPORT_PART_ID),
        |instantiator| {
            let mut lazies = instantiator.resolve(&ImportDefinition::new(
                RESERVED_EXPORT_PROVIDER_CONTRACT,
                Cardinality::ExactlyOne,
            ))?;
            lazies.remove(0).value()
        },
    )
}
