// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-provider shared-instance cache: one `parking_lot::Mutex` guarding a map from sharing
//! boundary to part to lazily-computed exported value (spec §5).

use crate::catalog::PartId;
use crate::provider::lazy::Lazy;
use crate::provider::ExportedValue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type BoundaryMap = HashMap<String, HashMap<PartId, Lazy<ExportedValue>>>;

/// A cache of shared part instances, keyed first by sharing boundary and then by part.
///
/// Cheap to clone: clones share the same underlying map, which is how a child provider inherits
/// its parent's cache (spec §5: "child providers inherit the parent map and may add fresh
/// boundary keys").
#[derive(Clone)]
pub(crate) struct BoundaryCache {
    boundaries: Arc<Mutex<BoundaryMap>>,
}

impl BoundaryCache {
    pub(crate) fn new() -> Self {
        BoundaryCache {
            boundaries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Forks a cache that shares the same underlying map as `self`.
    pub(crate) fn fork(&self) -> Self {
        BoundaryCache {
            boundaries: self.boundaries.clone(),
        }
    }

    /// Returns the existing lazy value for `(boundary, part_id)`, or inserts the one produced by
    /// `make` and returns that. The mutex is held only for the duration of the map lookup and
    /// insert, never across `make` or any later evaluation of the returned `Lazy`.
    pub(crate) fn get_or_insert_with(
        &self,
        boundary: &str,
        part_id: &PartId,
        make: impl FnOnce() -> Lazy<ExportedValue>,
    ) -> Lazy<ExportedValue> {
        let mut guard = self.boundaries.lock();
        let table = guard.entry(boundary.to_string()).or_default();
        table.entry(part_id.clone()).or_insert_with(make).clone()
    }
}
