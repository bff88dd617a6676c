// Copyright (c) The compose-graph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders a [`Configuration`] as Directed Graph Markup Language (DGML), the format spec §6
//! names for external visualization.
//!
//! The teacher (`guppy`) renders its own package graph through a `PackageDotVisitor` trait
//! (`graph/print.rs`) plumbed into a shared `petgraph_support::dot` formatter that was not
//! available to copy into this crate. `PartDgmlVisitor` keeps that visitor shape -- callers
//! customize node/edge labels without touching the XML plumbing -- but targets DGML directly
//! instead of routing through a generic `dot`-writer abstraction.

use crate::configuration::{ComposablePart, Configuration};
use std::collections::HashSet;
use std::fmt::{self, Write as _};

/// Customizes the labels attached to nodes and links when rendering a [`Configuration`] as DGML.
pub(crate) trait PartDgmlVisitor {
    /// Writes this part's node label.
    fn visit_part(&self, part: &ComposablePart, f: &mut dyn fmt::Write) -> fmt::Result;
}

/// The default visitor: labels each node with its part identifier and, for shared parts, its
/// effective sharing boundary.
struct DefaultVisitor<'a> {
    configuration: &'a Configuration,
}

impl<'a> PartDgmlVisitor for DefaultVisitor<'a> {
    fn visit_part(&self, part: &ComposablePart, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", part.definition.part_id)?;
        if part.definition.is_shared {
            let boundary = self.configuration.effective_sharing_boundary(part);
            let boundary = if boundary.is_empty() { "global" } else { boundary };
            write!(f, " [{boundary}]")?;
        }
        Ok(())
    }
}

pub(crate) fn render(configuration: &Configuration) -> String {
    render_with_visitor(configuration, &DefaultVisitor { configuration })
}

/// Renders `configuration` as DGML using a custom [`PartDgmlVisitor`] for node labels.
fn render_with_visitor(configuration: &Configuration, visitor: &dyn PartDgmlVisitor) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<DirectedGraph xmlns=\"http://schemas.microsoft.com/vs/2009/dgml\">\n");

    out.push_str("  <Nodes>\n");
    for part in configuration.parts() {
        let mut label = String::new();
        // Visitor errors would only come from a broken `fmt::Write` impl on a `String`, which
        // cannot fail; ignore for a cleaner call site.
        let _ = visitor.visit_part(part, &mut label);
        let _ = writeln!(
            out,
            "    <Node Id=\"{}\" Label=\"{}\" />",
            escape(part.definition.part_id.as_str()),
            escape(&label)
        );
    }
    out.push_str("  </Nodes>\n");

    out.push_str("  <Links>\n");
    let mut seen = HashSet::new();
    for part in configuration.parts() {
        for exports in part.satisfying_exports.values() {
            for export in exports {
                let edge = (part.definition.part_id.clone(), export.part_id.clone());
                if !seen.insert(edge) {
                    continue;
                }
                let _ = writeln!(
                    out,
                    "    <Link Source=\"{}\" Target=\"{}\" />",
                    escape(part.definition.part_id.as_str()),
                    escape(export.part_id.as_str())
                );
            }
        }
    }
    out.push_str("  </Links>\n");

    out.push_str("</DirectedGraph>\n");
    out
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
