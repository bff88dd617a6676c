// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenario tests, kept separate from the per-file `#[cfg(test)] mod tests` units so
//! that the six catalog/action/expectation scenarios from the design notes live in one place.

mod fixtures;
mod scenarios;
