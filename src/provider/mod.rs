// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The runtime export provider: instantiates parts on demand, wires their imports, and enforces
//! sharing-boundary singleton semantics (spec §4.6).
//!
//! The teacher (`guppy`) has no runtime counterpart to this module at all -- it is a pure,
//! synchronous graph-query library with nothing resembling a long-lived service. This module's
//! concurrency idiom (one `parking_lot::Mutex` guarding a lazily-populated cache map) is
//! therefore grounded instead in the rest of the retrieval pack, where `turbo-tasks` and
//! `wrt-sync` both reach for `parking_lot`/`once_cell` for exactly this shape of problem.

mod cache;
mod disposable;
mod lazy;

pub use disposable::Disposable;
pub use lazy::Lazy;

use crate::cardinality::Cardinality;
use crate::catalog::{ComposableCatalog, ContractName, Export, ImportDefinition, MetadataValue, PartId};
use crate::configuration::Configuration;
use crate::errors::Error;
use cache::BoundaryCache;
use disposable::DisposableRegistry;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// The contract name reserved for the export provider's own self-export (spec §4.6.4).
///
/// No catalog part may export this contract; [`crate::Builder::create`] rejects any catalog that
/// tries to.
pub const RESERVED_EXPORT_PROVIDER_CONTRACT: &str = "compose_graph::ExportProvider";

/// The identifier of the synthesized part that represents the provider's self-export.
pub const SELF_EXPORT_PART_ID: &str = "compose_graph::__self_export";

/// A fully resolved export value, type-erased. Callers downcast via [`ExportProvider::get_export`]
/// or [`ExportProvider::get_exported_value`].
pub type ExportedValue = Arc<dyn Any + Send + Sync>;

/// The capability an [`Export`]'s value factory uses to resolve its own nested imports and to
/// participate in shared-instance construction (spec §4.6.2, "CoreResolver"-adjacent design
/// note).
pub trait Instantiator {
    /// Resolves every export currently satisfying `import`, each as a value that is computed at
    /// most once on first access. Non-shared exports produce a fresh, independent [`Lazy`] every
    /// call; shared exports produce the same [`Lazy`] (and, once evaluated, the same value) for
    /// every caller within the same sharing boundary.
    fn resolve(&mut self, import: &ImportDefinition) -> Result<Vec<Lazy<ExportedValue>>, Error>;

    /// Registers `instance` to be disposed when the owning provider is disposed (spec §4.6.5).
    ///
    /// The teacher's own reflection-based runtime detects `IDisposable` automatically; without
    /// reflection, a factory that constructs a disposable instance calls this explicitly instead.
    fn track_disposable(&mut self, instance: Arc<dyn Disposable>) -> Result<(), Error>;
}

/// A per-resolution-call record of shared parts that are mid-construction, used to let
/// mutually-recursive shared parts see each other's not-yet-finished `Lazy` handle instead of
/// recursing forever (spec §4.6.2).
#[derive(Clone)]
struct Provisional {
    inner: Arc<Mutex<HashMap<PartId, Lazy<ExportedValue>>>>,
}

impl Provisional {
    fn new() -> Self {
        Provisional {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn get(&self, part_id: &PartId) -> Option<Lazy<ExportedValue>> {
        self.inner.lock().get(part_id).cloned()
    }

    fn insert(&self, part_id: PartId, lazy: Lazy<ExportedValue>) {
        self.inner.lock().insert(part_id, lazy);
    }
}

/// Resolves exports for one in-flight call into [`ExportProvider`], threading the provisional map
/// through recursive import resolution.
struct ResolutionContext<'p, C> {
    provider: &'p ExportProvider<C>,
    provisional: Provisional,
    part_id: PartId,
}

impl<'p, C: ComposableCatalog + Send + Sync + 'static> Instantiator for ResolutionContext<'p, C> {
    fn resolve(&mut self, import: &ImportDefinition) -> Result<Vec<Lazy<ExportedValue>>, Error> {
        self.provider
            .resolve_import(import, &self.provisional)
    }

    fn track_disposable(&mut self, instance: Arc<dyn Disposable>) -> Result<(), Error> {
        self.provider.register_disposable(&self.part_id, instance)
    }
}

/// A reflection-style cache of catalog lookups by contract name, avoiding a full catalog scan on
/// every resolution (spec §4.6: "reflection caches").
struct ReflectionCache {
    by_contract: Mutex<HashMap<ContractName, Arc<Vec<Export>>>>,
}

impl ReflectionCache {
    fn new() -> Self {
        ReflectionCache {
            by_contract: Mutex::new(HashMap::new()),
        }
    }

    fn exports_for<C: ComposableCatalog>(&self, catalog: &C, contract: &ContractName) -> Arc<Vec<Export>> {
        if let Some(cached) = self.by_contract.lock().get(contract) {
            return cached.clone();
        }
        let bare = ImportDefinition::new(contract.clone(), Cardinality::ZeroOrMore);
        let exports = Arc::new(catalog.get_exports(&bare));
        self.by_contract
            .lock()
            .insert(contract.clone(), exports.clone());
        exports
    }
}

/// Runtime counterpart to a [`Configuration`]: instantiates parts on demand and enforces sharing
/// boundaries.
///
/// Cloning an `ExportProvider` is cheap and produces a *child* provider: the clone shares the
/// same underlying shared-instance cache as its parent (spec §5), so a singleton resolved through
/// either handle is the same instance. Use [`ExportProvider::fork`] to make this sharing explicit
/// at a call site.
pub struct ExportProvider<C: ComposableCatalog + Send + Sync + 'static> {
    inner: Arc<ProviderInner<C>>,
}

struct ProviderInner<C> {
    configuration: Configuration,
    catalog: Arc<C>,
    cache: BoundaryCache,
    reflection: ReflectionCache,
    disposables: DisposableRegistry,
    self_export: OnceLock<ExportedValue>,
}

impl<C: ComposableCatalog + Send + Sync + 'static> Clone for ExportProvider<C> {
    fn clone(&self) -> Self {
        ExportProvider {
            inner: self.inner.clone(),
        }
    }
}

impl<C: ComposableCatalog + Send + Sync + 'static> ExportProvider<C> {
    /// Creates a new export provider for `configuration`, using `catalog` to resolve imports at
    /// runtime.
    pub fn new(configuration: Configuration, catalog: C) -> Self {
        ExportProvider {
            inner: Arc::new(ProviderInner {
                configuration,
                catalog: Arc::new(catalog),
                cache: BoundaryCache::new(),
                reflection: ReflectionCache::new(),
                disposables: DisposableRegistry::new(),
                self_export: OnceLock::new(),
            }),
        }
    }

    /// The configuration this provider was built from.
    pub fn configuration(&self) -> &Configuration {
        &self.inner.configuration
    }

    /// Creates a child provider that shares this provider's shared-instance cache but may
    /// introduce fresh boundary keys of its own (spec §5).
    pub fn fork(&self) -> Self {
        ExportProvider {
            inner: Arc::new(ProviderInner {
                configuration: self.inner.configuration.clone(),
                catalog: self.inner.catalog.clone(),
                cache: self.inner.cache.fork(),
                reflection: ReflectionCache::new(),
                disposables: DisposableRegistry::new(),
                self_export: OnceLock::new(),
            }),
        }
    }

    /// Resolves exactly one export satisfying `contract_name`, downcasting it to `T`.
    ///
    /// Fails if zero or more than one export matches, or if the matching export's value is not
    /// actually a `T`.
    pub fn get_export<T: Send + Sync + 'static>(&self, contract_name: &str) -> Result<Arc<T>, Error> {
        let import = ImportDefinition::new(contract_name, Cardinality::ExactlyOne);
        let values = self.get_exports_raw(&import)?;
        let value = values.into_iter().next().expect("ExactlyOne cardinality was enforced");
        downcast(value)
    }

    /// Resolves every export satisfying `contract_name`, downcasting each to `T`.
    pub fn get_exports<T: Send + Sync + 'static>(&self, contract_name: &str) -> Result<Vec<Arc<T>>, Error> {
        let import = ImportDefinition::new(contract_name, Cardinality::ZeroOrMore);
        self.get_exports_raw(&import)?
            .into_iter()
            .map(downcast)
            .collect()
    }

    /// Resolves exactly one export and returns the bare value, without downcasting.
    pub fn get_exported_value(&self, contract_name: &str) -> Result<ExportedValue, Error> {
        let import = ImportDefinition::new(contract_name, Cardinality::ExactlyOne);
        let mut values = self.get_exports_raw(&import)?;
        Ok(values.remove(0))
    }

    /// Resolves every export satisfying `contract_name` and returns the bare values.
    pub fn get_exported_values(&self, contract_name: &str) -> Result<Vec<ExportedValue>, Error> {
        let import = ImportDefinition::new(contract_name, Cardinality::ZeroOrMore);
        self.get_exports_raw(&import)
    }

    /// The full resolution protocol (spec §4.6.1): reserved-contract short-circuit, catalog
    /// lookup, open-generic closing, constraint filtering, cardinality enforcement, then
    /// evaluation of each surviving export's lazily-computed value.
    pub fn get_exports_raw(&self, import: &ImportDefinition) -> Result<Vec<ExportedValue>, Error> {
        tracing::trace!(contract = %import.contract_name, cardinality = %import.cardinality, "resolving import");

        if import.contract_name.as_str() == RESERVED_EXPORT_PROVIDER_CONTRACT {
            return Ok(vec![self.self_export_value()]);
        }

        let provisional = Provisional::new();
        let lazies = self.resolve_import(import, &provisional)?;

        if !import.cardinality.accepts(lazies.len()) {
            tracing::warn!(
                contract = %import.contract_name,
                found = lazies.len(),
                cardinality = %import.cardinality,
                "cardinality mismatch resolving import"
            );
            return Err(Error::MissingImport {
                part_id: PartId::new("<external request>"),
                key: crate::catalog::ImportKey::Member(import.contract_name.to_string()),
                found: lazies.len(),
            });
        }

        lazies.into_iter().map(|lazy| lazy.value()).collect()
    }

    /// Disposes every shared instance this provider has constructed that implements
    /// [`Disposable`]. Safe to call more than once; later calls are no-ops.
    pub fn dispose(&self) {
        tracing::debug!("disposing export provider");
        self.inner.disposables.dispose_all();
    }

    fn resolve_import(
        &self,
        import: &ImportDefinition,
        provisional: &Provisional,
    ) -> Result<Vec<Lazy<ExportedValue>>, Error> {
        if import.contract_name.as_str() == RESERVED_EXPORT_PROVIDER_CONTRACT {
            return Ok(vec![Lazy::wrap(self.self_export_value())]);
        }

        let candidates = self
            .inner
            .reflection
            .exports_for(self.inner.catalog.as_ref(), &import.contract_name);

        let closed;
        let candidates: &[Export] = if candidates.is_empty() {
            closed = self.close_open_generic(import).unwrap_or_default();
            &closed
        } else {
            candidates.as_slice()
        };

        let mut lazies = Vec::new();
        for export in candidates {
            if !import
                .constraints
                .iter()
                .all(|c| c.is_satisfied_by(&export.definition))
            {
                continue;
            }
            lazies.push(self.lazy_for_export(export, provisional));
        }
        Ok(lazies)
    }

    /// Implements open-generic closing (spec §4.6.1 step 3): when `import`'s contract name is a
    /// closed generic form (e.g. `"Cache<widget::Widget>"`) and no export is registered under
    /// that exact name, looks up an open-generic export declared under the same base contract
    /// and closes it against the type arguments parsed out of `import`'s contract name.
    fn close_open_generic(&self, import: &ImportDefinition) -> Option<Vec<Export>> {
        let (base, args) = import.contract_name.as_str().split_once('<')?;
        let args = args.strip_suffix('>')?;
        let type_args: Vec<PartId> = args.split(',').map(|arg| PartId::new(arg.trim())).collect();

        let mut derived = ImportDefinition::new(base, Cardinality::ZeroOrMore);
        derived.metadata.insert(
            "GenericParameters".to_string(),
            MetadataValue::PartIdList(type_args),
        );

        let opened = self.inner.catalog.open_generic_exports(base);
        if opened.is_empty() {
            return None;
        }

        let type_args = match derived.metadata.get("GenericParameters") {
            Some(MetadataValue::PartIdList(args)) => args.clone(),
            _ => unreachable!("inserted above"),
        };

        tracing::debug!(
            contract = %import.contract_name,
            base,
            count = opened.len(),
            "closing open-generic export(s)"
        );

        Some(opened.iter().map(|export| export.close(&type_args)).collect())
    }

    fn lazy_for_export(&self, export: &Export, provisional: &Provisional) -> Lazy<ExportedValue> {
        let part_id = export.part_id.clone();
        let part = self.inner.configuration.part(&part_id);
        let is_shared = part.map(|p| p.definition.is_shared).unwrap_or(false);
        let boundary = part
            .map(|p| self.inner.configuration.effective_sharing_boundary(p))
            .unwrap_or("")
            .to_string();

        let export = export.clone();
        let build = {
            let provider = self.clone();
            let provisional = provisional.clone();
            let part_id = part_id.clone();
            move || -> Result<ExportedValue, Error> {
                let mut ctx = ResolutionContext {
                    provider: &provider,
                    provisional: provisional.clone(),
                    part_id: part_id.clone(),
                };
                export.produce(&mut ctx)
            }
        };

        if !is_shared {
            return Lazy::from_factory(build);
        }

        if let Some(existing) = provisional.get(&part_id) {
            return existing;
        }

        let provisional_for_insert = provisional.clone();
        let part_id_for_insert = part_id.clone();
        self.inner.cache.get_or_insert_with(&boundary, &part_id, move || {
            let lazy = Lazy::from_factory(build);
            provisional_for_insert.insert(part_id_for_insert, lazy.clone());
            lazy
        })
    }

    fn self_export_value(&self) -> ExportedValue {
        self.inner
            .self_export
            .get_or_init(|| Arc::new(self.clone()) as ExportedValue)
            .clone()
    }

    /// Registers a disposable shared instance, refusing registration if `part_id` is the
    /// synthesized self-export part (spec §4.6.4: the self-export facade is not disposable).
    pub(crate) fn register_disposable(
        &self,
        part_id: &PartId,
        instance: Arc<dyn Disposable>,
    ) -> Result<(), Error> {
        if part_id.as_str() == SELF_EXPORT_PART_ID {
            return Err(Error::SelfDisposeOnFacade);
        }
        self.inner.disposables.register(instance);
        Ok(())
    }
}

fn downcast<T: Send + Sync + 'static>(value: ExportedValue) -> Result<Arc<T>, Error> {
    value.downcast::<T>().map_err(|_| Error::UnexpectedExportType {
        requested: std::any::type_name::<T>().to_string(),
    })
}

/// A statically registered constructor for a compiled export provider, looked up by an assembly
/// name (spec §6 `load_factory`). Out-of-process assembly loading is out of scope (spec §1); this
/// registry only resolves names a process has registered with itself.
pub struct ExportProviderRegistry {
    factories: Mutex<HashMap<String, Arc<dyn Fn() -> ExportedValue + Send + Sync>>>,
    known_names: Mutex<HashSet<String>>,
}

impl ExportProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ExportProviderRegistry {
            factories: Mutex::new(HashMap::new()),
            known_names: Mutex::new(HashSet::new()),
        }
    }

    /// Registers a factory under `assembly_name`.
    pub fn register(
        &self,
        assembly_name: impl Into<String>,
        factory: impl Fn() -> ExportedValue + Send + Sync + 'static,
    ) {
        let name = assembly_name.into();
        self.known_names.lock().insert(name.clone());
        self.factories.lock().insert(name, Arc::new(factory));
    }

    /// Looks up the factory registered under `assembly_name`.
    pub fn load_factory(&self, assembly_name: &str) -> Result<ExportedValue, Error> {
        self.factories
            .lock()
            .get(assembly_name)
            .map(|f| f())
            .ok_or_else(|| Error::UnknownAssembly(assembly_name.to_string()))
    }
}

impl Default for ExportProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::catalog::{ComposablePartDefinition, ExportDefinition, StaticCatalog};

    fn greeter_catalog() -> StaticCatalog {
        let mut catalog = StaticCatalog::new();
        let part = ComposablePartDefinition::new("greeter::Greeter");
        let export = Export::new(
            ExportDefinition::new("IGreeter"),
            "greeter::Greeter",
            |_| Ok(Arc::new("hello".to_string()) as ExportedValue),
        );
        catalog.add_part(part, vec![export]);
        catalog
    }

    #[test]
    fn get_export_downcasts_to_requested_type() {
        let catalog = greeter_catalog();
        let configuration = Builder::create(&catalog).unwrap();
        let provider = ExportProvider::new(configuration, catalog);

        let greeting: Arc<String> = provider.get_export("IGreeter").unwrap();
        assert_eq!(*greeting, "hello");
    }

    #[test]
    fn missing_import_reports_cardinality_mismatch() {
        let catalog = greeter_catalog();
        let configuration = Builder::create(&catalog).unwrap();
        let provider = ExportProvider::new(configuration, catalog);

        let err = provider.get_export::<String>("INotRegistered").unwrap_err();
        assert!(matches!(err, Error::MissingImport { found: 0, .. }));
    }

    #[test]
    fn shared_part_returns_the_same_instance_across_threads() {
        let _ = tracing_subscriber::fmt::try_init();

        let mut catalog = StaticCatalog::new();
        let mut part = ComposablePartDefinition::new("counter::Counter");
        part.is_shared = true;
        let export = Export::new(ExportDefinition::new("ICounter"), "counter::Counter", |_| {
            Ok(Arc::new(()) as ExportedValue)
        });
        catalog.add_part(part, vec![export]);

        let configuration = Builder::create(&catalog).unwrap();
        let provider = ExportProvider::new(configuration, catalog);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let provider = provider.clone();
                    scope.spawn(move || provider.get_exported_value("ICounter").unwrap())
                })
                .collect();
            let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            for value in &values[1..] {
                assert!(Arc::ptr_eq(&values[0], value));
            }
        });
    }

    #[test]
    fn self_export_resolves_to_the_provider_itself() {
        let catalog = greeter_catalog();
        let configuration = Builder::create(&catalog).unwrap();
        let provider = ExportProvider::new(configuration, catalog);

        let handle: Arc<ExportProvider<StaticCatalog>> =
            provider.get_export(RESERVED_EXPORT_PROVIDER_CONTRACT).unwrap();
        let greeting: Arc<String> = handle.get_export("IGreeter").unwrap();
        assert_eq!(*greeting, "hello");
    }

    #[test]
    fn a_part_that_imports_the_provider_as_a_nested_dependency_receives_the_self_export() {
        use crate::catalog::{ImportDefinitionBinding, ImportKey};

        let mut catalog = greeter_catalog();
        let mut part = ComposablePartDefinition::new("widget::Consumer");
        part.importing_members.push(ImportDefinitionBinding::new(
            ImportKey::Member("provider".to_string()),
            ImportDefinition::new(RESERVED_EXPORT_PROVIDER_CONTRACT, Cardinality::ExactlyOne),
        ));
        let export = Export::new(ExportDefinition::new("IConsumer"), "widget::Consumer", |instantiator| {
            let mut lazies = instantiator.resolve(&ImportDefinition::new(
                RESERVED_EXPORT_PROVIDER_CONTRACT,
                Cardinality::ExactlyOne,
            ))?;
            lazies.remove(0).value()
        });
        catalog.add_part(part, vec![export]);

        let configuration = Builder::create(&catalog).unwrap();
        let provider = ExportProvider::new(configuration, catalog);

        let handle: Arc<ExportProvider<StaticCatalog>> = provider.get_export("IConsumer").unwrap();
        assert!(Arc::ptr_eq(&handle.inner, &provider.inner));
    }

    #[test]
    fn closed_generic_import_resolves_against_an_open_generic_export() {
        let mut catalog = StaticCatalog::new();
        let mut part = ComposablePartDefinition::new("cache::Cache");
        part.is_open_generic = true;
        let export = Export::new(ExportDefinition::new("ICache<T>"), "cache::Cache", |_| {
            Ok(Arc::new("generic-cache".to_string()) as ExportedValue)
        });
        catalog.add_part(part, vec![export]);

        let configuration = Builder::create(&catalog).unwrap();
        let provider = ExportProvider::new(configuration, catalog);

        let cache: Arc<String> = provider.get_export("ICache<widget::Widget>").unwrap();
        assert_eq!(*cache, "generic-cache");
    }

    struct Resource(Arc<std::sync::atomic::AtomicBool>);

    impl Disposable for Resource {
        fn dispose(&self) {
            self.0.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn a_factory_tracked_disposable_is_disposed_with_the_provider() {
        let mut catalog = StaticCatalog::new();
        let mut part = ComposablePartDefinition::new("widget::Connection");
        part.is_shared = true;
        let closed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let closed_for_factory = closed.clone();
        let export = Export::new(
            ExportDefinition::new("IConnection"),
            "widget::Connection",
            move |instantiator| {
                let resource = Arc::new(Resource(closed_for_factory.clone()));
                instantiator.track_disposable(resource.clone())?;
                Ok(resource as ExportedValue)
            },
        );
        catalog.add_part(part, vec![export]);

        let configuration = Builder::create(&catalog).unwrap();
        let provider = ExportProvider::new(configuration, catalog);
        let _value = provider.get_exported_value("IConnection").unwrap();

        assert!(!closed.load(std::sync::atomic::Ordering::SeqCst));
        provider.dispose();
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }
}
