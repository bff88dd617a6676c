// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A one-shot memoized thunk, used to defer construction of shared instances until their value
//! is actually observed (spec §4.6.2).

use crate::errors::Error;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// A value that is computed at most once, on first access, and cached thereafter.
///
/// Cloning a `Lazy` is cheap: clones share the same underlying cell and factory, so whichever
/// clone is evaluated first determines the value all clones observe.
pub struct Lazy<T> {
    cell: Arc<OnceCell<T>>,
    factory: Arc<dyn Fn() -> Result<T, Error> + Send + Sync>,
}

impl<T: Clone> Lazy<T> {
    /// Wraps an already-computed value; the factory is never invoked.
    pub fn wrap(value: T) -> Self {
        let cell = OnceCell::new();
        // Always succeeds: the cell was just created.
        let _ = cell.set(value);
        Lazy {
            cell: Arc::new(cell),
            factory: Arc::new(|| unreachable!("Lazy::wrap value is always already present")),
        }
    }

    /// Creates a lazy value computed by `factory` on first access.
    pub fn from_factory(factory: impl Fn() -> Result<T, Error> + Send + Sync + 'static) -> Self {
        Lazy {
            cell: Arc::new(OnceCell::new()),
            factory: Arc::new(factory),
        }
    }

    /// Returns the value, computing it via the factory on first access. Concurrent callers
    /// racing on an unevaluated `Lazy` block on the one that wins; all observe the same value or
    /// the same error.
    pub fn value(&self) -> Result<T, Error> {
        self.cell
            .get_or_try_init(|| (self.factory)())
            .map(|v| v.clone())
    }

    /// Returns `true` if the value has already been computed.
    pub fn is_evaluated(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Lazy {
            cell: self.cell.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Lazy");
        match self.cell.get() {
            Some(v) => s.field("value", v),
            None => s.field("value", &"<unevaluated>"),
        };
        s.finish()
    }
}
