// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolve a catalog of composable parts into a validated composition graph.
//!
//! `compose-graph` takes a catalog of [`ComposablePartDefinition`]s -- classes that declare what
//! they export and what they import -- and produces a validated [`Configuration`] plus, at
//! runtime, an [`ExportProvider`] that instantiates parts on demand and wires their imports
//! together while respecting sharing-boundary singleton semantics.
//!
//! # Examples
//!
//! Build a configuration from a small in-memory catalog and resolve an export at runtime:
//!
//! ```
//! use compose_graph::{Builder, catalog::testing::single_part_catalog};
//!
//! let catalog = single_part_catalog("widget::Widget", "widget::IWidget");
//! let configuration = Builder::create(&catalog).unwrap();
//! assert_eq!(configuration.parts().count(), 2); // the part plus the synthesized self-export
//! ```

#![warn(missing_docs)]

mod debug_ignore;
pub mod errors;

pub mod builder;
pub mod cardinality;
pub mod catalog;
pub mod configuration;
mod dgml;
pub mod provider;
mod sorted_set;

#[cfg(test)]
mod unit_tests;

pub use builder::Builder;
pub use cardinality::Cardinality;
pub use catalog::{
    ComposableCatalog, ComposablePartDefinition, ContractName, Export, ExportConstraint,
    ExportDefinition, ImportDefinition, ImportDefinitionBinding, ImportKey, MetadataValue, PartId,
};
pub use configuration::{ComposablePart, Configuration};
pub use errors::Error;
pub use provider::{ExportProvider, RESERVED_EXPORT_PROVIDER_CONTRACT};
