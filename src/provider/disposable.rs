// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracking and disposal of shared part instances that need to release resources when their
//! provider is disposed (spec §4.6.5).

use parking_lot::Mutex;
use std::sync::Arc;

/// Implemented by shared part instances that hold resources needing an explicit teardown step.
///
/// The export provider calls `dispose` at most once per instance, and only after it has been
/// removed from the shared-instance cache, so `dispose` never races a concurrent resolution that
/// might still be constructing or returning the same instance.
pub trait Disposable: Send + Sync {
    /// Releases any resources held by this instance.
    fn dispose(&self);
}

/// Tracks every disposable shared instance a provider has constructed, so they can all be
/// disposed together when the provider itself is disposed.
pub(crate) struct DisposableRegistry {
    instances: Mutex<Vec<Arc<dyn Disposable>>>,
}

impl DisposableRegistry {
    pub(crate) fn new() -> Self {
        DisposableRegistry {
            instances: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn register(&self, instance: Arc<dyn Disposable>) {
        self.instances.lock().push(instance);
    }

    /// Disposes every tracked instance exactly once. Snapshots and clears the registry under the
    /// lock, then disposes outside of it, so no disposable's `dispose` runs while the registry's
    /// mutex is held.
    pub(crate) fn dispose_all(&self) {
        let snapshot = std::mem::take(&mut *self.instances.lock());
        for instance in snapshot {
            instance.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    impl Disposable for Counter {
        fn dispose(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dispose_all_runs_each_instance_once_and_clears_the_registry() {
        let registry = DisposableRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(Arc::new(Counter(count.clone())));
        registry.register(Arc::new(Counter(count.clone())));

        registry.dispose_all();
        assert_eq!(count.load(Ordering::SeqCst), 2);

        registry.dispose_all();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
