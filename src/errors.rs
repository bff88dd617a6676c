// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors returned while building a [`crate::Configuration`] or
//! resolving exports at runtime.

use crate::catalog::{ContractName, ImportKey, PartId};
use std::error;
use std::fmt;

use Error::*;

/// Error type describing the sorts of errors `compose-graph` can return.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A part in the catalog exports the reserved export-provider contract
    /// ([`crate::RESERVED_EXPORT_PROVIDER_CONTRACT`]). Only the provider itself may export it.
    ReservedContractExported(ContractName),
    /// One or more parts failed validation.
    InvalidParts(Vec<PartError>),
    /// The catalog contains a non-shared import cycle (spec §4.2).
    CycleDetected {
        /// The part at which the cycle was detected.
        part_id: PartId,
    },
    /// A shared part attempted to import, directly or transitively, a part confined to a
    /// narrower sharing boundary than its own.
    CrossBoundaryViolation {
        /// The importing part.
        importer: PartId,
        /// The sharing boundary the import would require.
        boundary: String,
    },
    /// An import could not be satisfied at the required cardinality.
    MissingImport {
        /// The part whose import failed.
        part_id: PartId,
        /// The import slot.
        key: ImportKey,
        /// How many exports were actually found.
        found: usize,
    },
    /// A part declares importing constructor parameters but the catalog never supplied an
    /// importing constructor to invoke.
    MissingImportingConstructor(PartId),
    /// Code attempted to dispose of the export provider's self-export facade, which is not
    /// disposable (spec §4.6.4).
    SelfDisposeOnFacade,
    /// No exporter is registered under the requested assembly name (spec §6 `load_factory`).
    UnknownAssembly(String),
    /// An export was resolved but its value could not be downcast to the requested type.
    UnexpectedExportType {
        /// The Rust type name the caller asked to downcast to.
        requested: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservedContractExported(contract) => write!(
                f,
                "part exports reserved contract '{}', which only the export provider itself may \
                 export",
                contract
            ),
            InvalidParts(errors) => {
                writeln!(f, "{} part(s) failed validation:", errors.len())?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
            CycleDetected { part_id } => {
                write!(f, "non-shared import cycle detected at part '{}'", part_id)
            }
            CrossBoundaryViolation { importer, boundary } => write!(
                f,
                "part '{}' requires sharing boundary '{}' but is not confined to it",
                importer, boundary
            ),
            MissingImport {
                part_id,
                key,
                found,
            } => write!(
                f,
                "part '{}' could not satisfy its {} ({} matching export(s) found)",
                part_id, key, found
            ),
            MissingImportingConstructor(part_id) => write!(
                f,
                "part '{}' declares constructor imports but has no importing constructor",
                part_id
            ),
            SelfDisposeOnFacade => {
                write!(f, "the export provider's self-export facade cannot be disposed")
            }
            UnknownAssembly(name) => {
                write!(f, "no export provider factory is registered under '{}'", name)
            }
            UnexpectedExportType { requested } => {
                write!(f, "resolved export could not be downcast to '{}'", requested)
            }
        }
    }
}

impl error::Error for Error {}

/// A single part-level validation failure, aggregated into [`Error::InvalidParts`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum PartError {
    /// A part's import cannot be satisfied under any circumstance, independent of cardinality
    /// (e.g. no export in the catalog matches its contract name at all).
    UnsatisfiableImport {
        /// The offending part.
        part_id: PartId,
        /// The import slot.
        key: ImportKey,
    },
    /// A part's import declares `ExactlyOne` cardinality but the catalog can statically prove
    /// the count will not be exactly one.
    CardinalityMismatch {
        /// The offending part.
        part_id: PartId,
        /// The import slot.
        key: ImportKey,
        /// The statically known number of matching exports.
        found: usize,
    },
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PartError::*;
        match self {
            UnsatisfiableImport { part_id, key } => {
                write!(f, "part '{}' has an unsatisfiable {}", part_id, key)
            }
            CardinalityMismatch {
                part_id,
                key,
                found,
            } => write!(
                f,
                "part '{}' requires exactly one export for {} but {} were found",
                part_id, key, found
            ),
        }
    }
}

impl error::Error for PartError {}
