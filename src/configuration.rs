// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The immutable result of [`crate::Builder::create`]: a validated set of parts, each annotated
//! with the exports that satisfy its imports and the sharing boundaries it is confined to.

use crate::catalog::{ComposablePartDefinition, Export, ImportKey, PartId};
use crate::sorted_set::SortedSet;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};

/// One part's place in a [`Configuration`]: its definition, the exports that satisfy each of its
/// imports, and the sharing boundaries its non-factory importers require it to honor.
#[derive(Clone, Debug)]
pub struct ComposablePart {
    /// The part's catalog definition.
    pub definition: ComposablePartDefinition,
    /// The resolved exports satisfying each import binding, in binding order.
    pub satisfying_exports: IndexMap<ImportKey, Vec<Export>>,
    /// The sharing boundaries this part must be confined to, sorted lexicographically for
    /// deterministic inference (spec §4.4).
    pub required_sharing_boundaries: SortedSet<String>,
}

impl ComposablePart {
    /// The exports resolved for a given import binding, or an empty slice if the key is unknown.
    pub fn exports_for(&self, key: &ImportKey) -> &[Export] {
        self.satisfying_exports
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A validated composition: every part's imports are known to be satisfiable, no non-shared
/// import cycle exists, and every inferred sharing boundary has been resolved to a concrete name.
#[derive(Clone, Debug)]
pub struct Configuration {
    parts: IndexMap<PartId, ComposablePart>,
    inferred_boundary_overrides: HashMap<PartId, String>,
    reference_assemblies: BTreeSet<String>,
}

impl Configuration {
    pub(crate) fn new(
        parts: IndexMap<PartId, ComposablePart>,
        inferred_boundary_overrides: HashMap<PartId, String>,
    ) -> Self {
        Configuration {
            parts,
            inferred_boundary_overrides,
            reference_assemblies: BTreeSet::new(),
        }
    }

    /// Every part in the configuration, including the synthesized self-export part (spec §4.6.4).
    pub fn parts(&self) -> impl Iterator<Item = &ComposablePart> {
        self.parts.values()
    }

    /// Looks up a part by its identifier.
    pub fn part(&self, part_id: &PartId) -> Option<&ComposablePart> {
        self.parts.get(part_id)
    }

    /// The number of parts in the configuration.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// The reference assembly names attached via [`Configuration::with_reference_assemblies`].
    pub fn reference_assemblies(&self) -> impl Iterator<Item = &str> {
        self.reference_assemblies.iter().map(String::as_str)
    }

    /// Returns a copy of this configuration with `assemblies` added to its reference-assembly
    /// set (spec §6). Reference assemblies are bookkeeping only: they do not affect validation or
    /// resolution, but travel with the configuration so tooling downstream of `Builder::create`
    /// can report where each part's catalog originated.
    pub fn with_reference_assemblies(&self, assemblies: impl IntoIterator<Item = String>) -> Self {
        let mut clone = self.clone();
        clone.reference_assemblies.extend(assemblies);
        clone
    }

    /// The sharing boundary `part`'s definition resolves to once inference (spec §4.4) has run:
    /// the definition's own `sharing_boundary` if it was not inferred, or the synthesized,
    /// lexicographically-sorted join of its importers' required boundaries otherwise.
    pub fn effective_sharing_boundary(&self, part: &ComposablePart) -> &str {
        if part.definition.is_sharing_boundary_inferred {
            self.inferred_boundary_overrides
                .get(&part.definition.part_id)
                .map(String::as_str)
                .unwrap_or("")
        } else {
            &part.definition.sharing_boundary
        }
    }

    /// Renders the part graph as Directed Graph Markup Language (DGML), the format spec §6 names
    /// for external visualization.
    pub fn to_dgml(&self) -> String {
        crate::dgml::render(self)
    }
}
