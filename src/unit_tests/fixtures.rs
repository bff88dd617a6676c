// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::cardinality::Cardinality;
use crate::catalog::{
    ComposablePartDefinition, Export, ExportDefinition, ImportDefinition, ImportDefinitionBinding,
    ImportKey, StaticCatalog,
};
use crate::errors::Error;
use crate::provider::{ExportedValue, Instantiator, RESERVED_EXPORT_PROVIDER_CONTRACT};
use std::sync::Arc;

/// Part `A` requires `ICustomFormatter` (cardinality controlled by the caller) and no catalog
/// part exports it.
pub(crate) fn unsatisfiable_import_catalog(cardinality: Cardinality) -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    let mut a = ComposablePartDefinition::new("scenario::A");
    a.importing_members.push(ImportDefinitionBinding::new(
        ImportKey::Member("formatter".to_string()),
        ImportDefinition::new("ICustomFormatter", cardinality),
    ));
    let export_a = Export::new(ExportDefinition::new("IA"), "scenario::A", |instantiator| {
        let missing = instantiator.resolve(&ImportDefinition::new(
            "ICustomFormatter",
            Cardinality::ZeroOrOne,
        ))?;
        Ok(Arc::new(missing.is_empty()) as ExportedValue)
    });
    catalog.add_part(a, vec![export_a]);
    catalog
}

/// Two non-shared parts importing each other directly: `A -> B -> A`.
pub(crate) fn non_shared_cycle_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();

    let mut a = ComposablePartDefinition::new("scenario::A");
    a.importing_members.push(ImportDefinitionBinding::new(
        ImportKey::Member("b".to_string()),
        ImportDefinition::new("IB", Cardinality::ExactlyOne),
    ));
    let export_a = Export::new(ExportDefinition::new("IA"), "scenario::A", |_| {
        Ok(Arc::new(()) as ExportedValue)
    });

    let mut b = ComposablePartDefinition::new("scenario::B");
    b.importing_members.push(ImportDefinitionBinding::new(
        ImportKey::Member("a".to_string()),
        ImportDefinition::new("IA", Cardinality::ExactlyOne),
    ));
    let export_b = Export::new(ExportDefinition::new("IB"), "scenario::B", |_| {
        Ok(Arc::new(()) as ExportedValue)
    });

    catalog.add_part(a, vec![export_a]);
    catalog.add_part(b, vec![export_b]);
    catalog
}

/// Shared `A` imports shared `B`; `B` imports shared `A`. Neither factory forces the other's
/// value -- only a consumer that stores a `Lazy<T>` field rather than eagerly unwrapping it
/// survives a mutual shared cycle, per the design notes on recursive construction.
pub(crate) fn mutually_shared_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();

    let mut a = ComposablePartDefinition::new("scenario::A");
    a.is_shared = true;
    a.importing_members.push(ImportDefinitionBinding::new(
        ImportKey::Member("b".to_string()),
        ImportDefinition::new("IB", Cardinality::ExactlyOne),
    ));
    let export_a = Export::new(ExportDefinition::new("IA"), "scenario::A", |instantiator| {
        let _b = instantiator.resolve(&ImportDefinition::new("IB", Cardinality::ExactlyOne))?;
        Ok(Arc::new("A".to_string()) as ExportedValue)
    });

    let mut b = ComposablePartDefinition::new("scenario::B");
    b.is_shared = true;
    b.importing_members.push(ImportDefinitionBinding::new(
        ImportKey::Member("a".to_string()),
        ImportDefinition::new("IA", Cardinality::ExactlyOne),
    ));
    let export_b = Export::new(ExportDefinition::new("IB"), "scenario::B", |instantiator| {
        let _a = instantiator.resolve(&ImportDefinition::new("IA", Cardinality::ExactlyOne))?;
        Ok(Arc::new("B".to_string()) as ExportedValue)
    });

    catalog.add_part(a, vec![export_a]);
    catalog.add_part(b, vec![export_b]);
    catalog
}

/// Shared part `A` with an inferred sharing boundary, transitively importing parts declared in
/// boundaries `"x"` and `"y"`.
pub(crate) fn inferred_boundary_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();

    let mut x = ComposablePartDefinition::new("scenario::X");
    x.is_shared = true;
    x.sharing_boundary = "x".to_string();
    let export_x = Export::new(ExportDefinition::new("IX"), "scenario::X", |_| {
        Ok(Arc::new(()) as ExportedValue)
    });

    let mut y = ComposablePartDefinition::new("scenario::Y");
    y.is_shared = true;
    y.sharing_boundary = "y".to_string();
    let export_y = Export::new(ExportDefinition::new("IY"), "scenario::Y", |_| {
        Ok(Arc::new(()) as ExportedValue)
    });

    let mut a = ComposablePartDefinition::new("scenario::A");
    a.is_shared = true;
    a.is_sharing_boundary_inferred = true;
    a.importing_members.push(ImportDefinitionBinding::new(
        ImportKey::Member("x".to_string()),
        ImportDefinition::new("IX", Cardinality::ExactlyOne),
    ));
    a.importing_members.push(ImportDefinitionBinding::new(
        ImportKey::Member("y".to_string()),
        ImportDefinition::new("IY", Cardinality::ExactlyOne),
    ));
    let export_a = Export::new(ExportDefinition::new("IA"), "scenario::A", |_| {
        Ok(Arc::new(()) as ExportedValue)
    });

    catalog.add_part(x, vec![export_x]);
    catalog.add_part(y, vec![export_y]);
    catalog.add_part(a, vec![export_a]);
    catalog
}

/// A single part that exports the reserved `ExportProvider` contract, which no catalog part may
/// claim.
pub(crate) fn reserved_contract_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    let part = ComposablePartDefinition::new("scenario::Rogue");
    let export = Export::new(
        ExportDefinition::new(RESERVED_EXPORT_PROVIDER_CONTRACT),
        "scenario::Rogue",
        |_| -> Result<ExportedValue, Error> { Ok(Arc::new(()) as ExportedValue) },
    );
    catalog.add_part(part, vec![export]);
    catalog
}
