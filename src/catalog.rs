// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The data model a catalog hands to [`crate::Builder`]: part definitions, their exports and
//! imports, and the `ComposableCatalog` trait a catalog implements to be resolvable.

use crate::cardinality::Cardinality;
use crate::debug_ignore::DebugIgnore;
use crate::errors::Error;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The identifier of a composable part's underlying type.
///
/// Real discovery systems derive this from reflection; this crate treats it as an opaque,
/// caller-assigned string (see spec Glossary: "a string identifier").
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PartId(Arc<str>);

impl PartId {
    /// Creates a part identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        PartId(Arc::from(id.into()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartId {
    fn from(s: &str) -> Self {
        PartId::new(s)
    }
}

impl From<String> for PartId {
    fn from(s: String) -> Self {
        PartId::new(s)
    }
}

/// The name under which an export is resolved. Imports are matched to exports by contract name.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ContractName(Arc<str>);

impl ContractName {
    /// Creates a contract name from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        ContractName(Arc::from(name.into()))
    }

    /// Returns the contract name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContractName {
    fn from(s: &str) -> Self {
        ContractName::new(s)
    }
}

impl From<String> for ContractName {
    fn from(s: String) -> Self {
        ContractName::new(s)
    }
}

/// A metadata value attached to an export or import definition.
///
/// Metadata is used both descriptively (surfaced to consumers) and prescriptively (matched by
/// [`ExportConstraint`]s and used to close open-generic exports against type arguments).
#[derive(Clone, Debug, PartialEq)]
pub enum MetadataValue {
    /// A string value.
    String(String),
    /// A boolean value.
    Bool(bool),
    /// A signed integer value.
    Int(i64),
    /// An ordered list of part identifiers, used for generic type arguments.
    PartIdList(Vec<PartId>),
}

/// A named value exported by a part.
#[derive(Clone, Debug)]
pub struct ExportDefinition {
    /// The contract name under which this export is resolved.
    pub contract_name: ContractName,
    /// Descriptive/prescriptive metadata attached to the export.
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl ExportDefinition {
    /// Creates an export definition with no metadata.
    pub fn new(contract_name: impl Into<ContractName>) -> Self {
        ExportDefinition {
            contract_name: contract_name.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches a metadata entry, returning the modified definition.
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A predicate over an [`ExportDefinition`]'s metadata, used to further constrain which exports
/// satisfy an import beyond contract-name equality.
#[derive(Clone)]
pub struct ExportConstraint(DebugIgnore<Arc<dyn Fn(&ExportDefinition) -> bool + Send + Sync>>);

impl ExportConstraint {
    /// Creates a constraint from a predicate closure.
    pub fn new(predicate: impl Fn(&ExportDefinition) -> bool + Send + Sync + 'static) -> Self {
        ExportConstraint(DebugIgnore(Arc::new(predicate)))
    }

    /// Evaluates the constraint against an export definition.
    pub fn is_satisfied_by(&self, export: &ExportDefinition) -> bool {
        (self.0).0(export)
    }
}

impl fmt::Debug for ExportConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExportConstraint").field(&self.0).finish()
    }
}

/// What a part requires in order to be constructed or populated.
#[derive(Clone, Debug)]
pub struct ImportDefinition {
    /// The contract name this import is resolved against.
    pub contract_name: ContractName,
    /// How many matching exports this import accepts.
    pub cardinality: Cardinality,
    /// Descriptive metadata attached to the import.
    pub metadata: BTreeMap<String, MetadataValue>,
    /// Additional constraints an export must satisfy beyond contract-name equality.
    pub constraints: Vec<ExportConstraint>,
    /// Whether this import is satisfied by an export factory (a non-shared, deferred
    /// construction) rather than a direct value. Export-factory imports do not participate in
    /// sharing-boundary propagation (spec §4.1 step 4) but do count for cycle detection.
    pub is_export_factory: bool,
}

impl ImportDefinition {
    /// Creates an import definition with no metadata or constraints.
    pub fn new(contract_name: impl Into<ContractName>, cardinality: Cardinality) -> Self {
        ImportDefinition {
            contract_name: contract_name.into(),
            cardinality,
            metadata: BTreeMap::new(),
            constraints: Vec::new(),
            is_export_factory: false,
        }
    }

    /// Marks this import as an export-factory import.
    pub fn as_export_factory(mut self) -> Self {
        self.is_export_factory = true;
        self
    }

    /// Adds a constraint, returning the modified definition.
    pub fn with_constraint(mut self, constraint: ExportConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    fn satisfied_by(&self, export: &ExportDefinition) -> bool {
        export.contract_name == self.contract_name
            && self.constraints.iter().all(|c| c.is_satisfied_by(export))
    }
}

/// Identifies one import slot within a part: a named member or a positional constructor
/// parameter.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ImportKey {
    /// A settable member (field or property) on the constructed part.
    Member(String),
    /// A positional constructor parameter.
    ConstructorParam(usize),
}

impl fmt::Display for ImportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKey::Member(name) => write!(f, "member `{name}`"),
            ImportKey::ConstructorParam(index) => write!(f, "constructor parameter #{index}"),
        }
    }
}

/// An import definition paired with the key that identifies where it is bound on the owning
/// part.
#[derive(Clone, Debug)]
pub struct ImportDefinitionBinding {
    /// Where the import is bound.
    pub key: ImportKey,
    /// The import requirement.
    pub import: ImportDefinition,
}

impl ImportDefinitionBinding {
    /// Creates a new binding.
    pub fn new(key: ImportKey, import: ImportDefinition) -> Self {
        ImportDefinitionBinding { key, import }
    }
}

/// A factory that produces the actual exported value at runtime, given a handle back into the
/// provider for import resolution and shared-instance lookup. See
/// [`crate::provider::Instantiator`].
pub type ExportFactory =
    Arc<dyn Fn(&mut dyn crate::provider::Instantiator) -> Result<crate::provider::ExportedValue, Error> + Send + Sync>;

/// A pairing of an [`ExportDefinition`] with the part that produces it and the runtime factory
/// that builds the exported value.
#[derive(Clone)]
pub struct Export {
    /// The export's declared contract and metadata.
    pub definition: ExportDefinition,
    /// The part that produces this export.
    pub part_id: PartId,
    factory: DebugIgnore<ExportFactory>,
}

impl Export {
    /// Creates an export backed by a runtime factory.
    pub fn new(
        definition: ExportDefinition,
        part_id: impl Into<PartId>,
        factory: impl Fn(&mut dyn crate::provider::Instantiator) -> Result<crate::provider::ExportedValue, Error>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Export {
            definition,
            part_id: part_id.into(),
            factory: DebugIgnore(Arc::new(factory)),
        }
    }

    /// Invokes the export's value factory.
    pub fn produce(
        &self,
        instantiator: &mut dyn crate::provider::Instantiator,
    ) -> Result<crate::provider::ExportedValue, Error> {
        (self.factory.0)(instantiator)
    }

    /// Closes an open-generic export against concrete type arguments, producing a new export
    /// whose contract name has the arguments substituted in. The owning part must declare
    /// `is_open_generic`; closing rewrites only the contract name, matching the way a generic
    /// export's identity is specialized per-usage (spec §4.6.1 step 3).
    pub fn close(&self, type_args: &[PartId]) -> Export {
        let base = self
            .definition
            .contract_name
            .as_str()
            .split_once('<')
            .map(|(base, _)| base)
            .unwrap_or_else(|| self.definition.contract_name.as_str());
        let closed_name = format!(
            "{base}<{}>",
            type_args
                .iter()
                .map(PartId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut definition = self.definition.clone();
        definition.contract_name = ContractName::new(closed_name);
        Export {
            definition,
            part_id: self.part_id.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Export")
            .field("definition", &self.definition)
            .field("part_id", &self.part_id)
            .finish()
    }
}

/// The definition of a single composable part: what it exports, what it imports, and how it
/// participates in sharing.
#[derive(Clone, Debug)]
pub struct ComposablePartDefinition {
    /// The part's type identifier.
    pub part_id: PartId,
    /// Everything this part exports.
    pub exports: Vec<ExportDefinition>,
    /// Imports satisfied by setting a member after construction.
    pub importing_members: Vec<ImportDefinitionBinding>,
    /// Imports satisfied by passing a constructor argument, if the part has an importing
    /// constructor at all.
    pub importing_constructor: Option<Vec<ImportDefinitionBinding>>,
    /// Whether instances of this part are shared (singleton within a sharing boundary) rather
    /// than created fresh on every request.
    pub is_shared: bool,
    /// The sharing boundary this part's shared instances live in. Empty means the
    /// process-global boundary.
    pub sharing_boundary: String,
    /// Whether `sharing_boundary` was left unset by the catalog and must be inferred from this
    /// part's importers (spec §4.4).
    pub is_sharing_boundary_inferred: bool,
    /// Whether this part declares an open-generic export that must be closed against concrete
    /// type arguments before use.
    pub is_open_generic: bool,
}

impl ComposablePartDefinition {
    /// Creates a non-shared part definition with no imports and no exports.
    pub fn new(part_id: impl Into<PartId>) -> Self {
        ComposablePartDefinition {
            part_id: part_id.into(),
            exports: Vec::new(),
            importing_members: Vec::new(),
            importing_constructor: None,
            is_shared: false,
            sharing_boundary: String::new(),
            is_sharing_boundary_inferred: false,
            is_open_generic: false,
        }
    }

    /// All import bindings on this part: constructor imports first (in positional order), then
    /// member imports.
    pub fn all_imports(&self) -> impl Iterator<Item = &ImportDefinitionBinding> {
        self.importing_constructor
            .iter()
            .flatten()
            .chain(self.importing_members.iter())
    }
}

/// The input to [`crate::Builder::create`]: a catalog of discoverable part definitions, capable
/// of resolving an import down to the exports that satisfy it.
///
/// Implementations are typically backed by reflection or a build-time scan; this crate treats
/// discovery as out of scope (spec §1) and only consumes the result.
pub trait ComposableCatalog {
    /// All part definitions in the catalog, in an order callers may rely on for diagnostics but
    /// not for semantics.
    fn parts(&self) -> Vec<ComposablePartDefinition>;

    /// All exports across the catalog whose contract name and constraints satisfy `import`.
    /// Cardinality is not applied here; callers check cardinality separately (spec §4.1 step 3,
    /// §4.6.1 step 6).
    fn get_exports(&self, import: &ImportDefinition) -> Vec<Export>;

    /// Exports declared by open-generic parts whose contract name's base (the substring before
    /// the first `<`) equals `base`. Used to locate an open-generic export to close against
    /// concrete type arguments when a closed-generic import has no direct match (spec §4.6.1
    /// step 3).
    ///
    /// The default implementation derives this from [`ComposableCatalog::parts`] and
    /// [`ComposableCatalog::get_exports`], so catalogs do not need to override it unless they can
    /// answer more efficiently.
    fn open_generic_exports(&self, base: &str) -> Vec<Export> {
        self.parts()
            .into_iter()
            .filter(|part| part.is_open_generic)
            .flat_map(|part| part.exports)
            .filter(|definition| {
                definition.contract_name.as_str().split_once('<').map(|(b, _)| b) == Some(base)
            })
            .flat_map(|definition| {
                self.get_exports(&ImportDefinition::new(
                    definition.contract_name,
                    Cardinality::ZeroOrMore,
                ))
            })
            .collect()
    }
}

/// A catalog backed by a fixed, in-memory list of parts and exports. Useful for tests and for
/// small, hand-assembled catalogs that do not need reflection-based discovery.
#[derive(Default)]
pub struct StaticCatalog {
    parts: Vec<ComposablePartDefinition>,
    exports: Vec<Export>,
}

impl StaticCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        StaticCatalog::default()
    }

    /// Registers a part definition along with the exports it produces.
    pub fn add_part(&mut self, part: ComposablePartDefinition, exports: Vec<Export>) -> &mut Self {
        self.parts.push(part);
        self.exports.extend(exports);
        self
    }
}

impl ComposableCatalog for StaticCatalog {
    fn parts(&self) -> Vec<ComposablePartDefinition> {
        self.parts.clone()
    }

    fn get_exports(&self, import: &ImportDefinition) -> Vec<Export> {
        self.exports
            .iter()
            .filter(|export| import.satisfied_by(&export.definition))
            .cloned()
            .collect()
    }
}

/// Small in-memory catalog fixtures used in doctests and by downstream integration tests.
#[doc(hidden)]
pub mod testing {
    use super::*;
    use crate::provider::ExportedValue;
    use std::sync::Arc as StdArc;

    /// A catalog with a single non-shared part exporting one contract, with no imports.
    pub fn single_part_catalog(part_id: &str, contract: &str) -> StaticCatalog {
        let mut catalog = StaticCatalog::new();
        let part = ComposablePartDefinition::new(part_id);
        let contract_name = ContractName::new(contract);
        let export = Export::new(
            ExportDefinition::new(contract_name),
            part_id,
            move |_instantiator| -> Result<ExportedValue, Error> {
                Ok(StdArc::new(String::from(part_id)) as ExportedValue)
            },
        );
        catalog.add_part(part, vec![export]);
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_filters_by_metadata() {
        let constraint = ExportConstraint::new(|export| {
            matches!(export.metadata.get("color"), Some(MetadataValue::String(c)) if c == "red")
        });
        let import = ImportDefinition::new("widget", Cardinality::ZeroOrMore)
            .with_constraint(constraint);

        let red = ExportDefinition::new("widget").with_metadata(
            "color",
            MetadataValue::String("red".to_string()),
        );
        let blue = ExportDefinition::new("widget").with_metadata(
            "color",
            MetadataValue::String("blue".to_string()),
        );

        assert!(import.satisfied_by(&red));
        assert!(!import.satisfied_by(&blue));
    }

    #[test]
    fn close_rewrites_contract_name() {
        let export = Export::new(
            ExportDefinition::new("Cache<T>"),
            "cache::Cache",
            |_| Ok(Arc::new(()) as crate::provider::ExportedValue),
        );
        let closed = export.close(&[PartId::new("widget::Widget")]);
        assert_eq!(closed.definition.contract_name.as_str(), "Cache<widget::Widget>");
    }
}
