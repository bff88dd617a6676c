// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cardinality constraints on an import.

use std::fmt;

/// How many exports an import is willing to accept.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Cardinality {
    /// Zero or one matching export. More than one is a validation error.
    ZeroOrOne,
    /// Exactly one matching export. Zero or more than one is a validation error.
    ExactlyOne,
    /// Any number of matching exports, including zero.
    ZeroOrMore,
}

impl Cardinality {
    /// Whether `count` matching exports satisfies this cardinality.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Cardinality::ZeroOrOne => count <= 1,
            Cardinality::ExactlyOne => count == 1,
            Cardinality::ZeroOrMore => true,
        }
    }

    /// Whether this cardinality can ever be satisfied by more than one export.
    pub fn is_plural(self) -> bool {
        matches!(self, Cardinality::ZeroOrMore)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cardinality::ZeroOrOne => "zero-or-one",
            Cardinality::ExactlyOne => "exactly-one",
            Cardinality::ZeroOrMore => "zero-or-more",
        };
        f.write_str(s)
    }
}
