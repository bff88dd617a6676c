// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::fixtures;
use crate::builder::Builder;
use crate::cardinality::Cardinality;
use crate::catalog::{ImportKey, PartId};
use crate::errors::{Error, PartError};
use crate::provider::ExportProvider;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn required_import_without_an_exporter_fails_configuration() {
    let catalog = fixtures::unsatisfiable_import_catalog(Cardinality::ExactlyOne);
    let err = Builder::create(&catalog).unwrap_err();
    match err {
        Error::InvalidParts(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(matches!(errors[0], PartError::UnsatisfiableImport { .. }));
        }
        other => panic!("expected InvalidParts, got {other:?}"),
    }
}

#[test]
fn optional_import_without_an_exporter_still_configures() {
    let catalog = fixtures::unsatisfiable_import_catalog(Cardinality::ZeroOrOne);
    let configuration = Builder::create(&catalog).unwrap();

    let part = configuration.part(&PartId::new("scenario::A")).unwrap();
    let key = ImportKey::Member("formatter".to_string());
    assert!(part.exports_for(&key).is_empty());

    let provider = ExportProvider::new(configuration, catalog);
    let missing: Arc<bool> = provider.get_export("IA").unwrap();
    assert!(*missing, "A observed no ICustomFormatter export");
}

#[test]
fn a_direct_non_shared_cycle_fails_configuration() {
    let catalog = fixtures::non_shared_cycle_catalog();
    let err = Builder::create(&catalog).unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));
}

#[test]
fn mutually_shared_parts_configure_and_share_a_single_instance() {
    let catalog = fixtures::mutually_shared_catalog();
    let configuration = Builder::create(&catalog).unwrap();
    let provider = ExportProvider::new(configuration, catalog);

    let first = provider.get_exported_value("IA").unwrap();
    let second = provider.get_exported_value("IA").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn inferred_boundary_joins_transitively_required_boundaries_sorted() {
    let catalog = fixtures::inferred_boundary_catalog();
    let configuration = Builder::create(&catalog).unwrap();
    let part = configuration.part(&PartId::new("scenario::A")).unwrap();
    assert_eq!(configuration.effective_sharing_boundary(part), "x-y");
}

#[test]
fn exporting_the_reserved_contract_fails_configuration() {
    let catalog = fixtures::reserved_contract_catalog();
    let err = Builder::create(&catalog).unwrap_err();
    assert!(matches!(err, Error::ReservedContractExported(_)));
}
