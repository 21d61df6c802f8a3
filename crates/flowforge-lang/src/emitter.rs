//! Serializes a `ParsedGraph` back to FlowScript source.
//!
//! Used to round-trip a graph built by [`crate::parser::parse`] — the
//! emitted text need not match any particular input byte-for-byte, only
//! reparse to an equivalent graph (property 5 in the scheduler's testable
//! properties list).

use crate::ast::{NodeType, ParsedGraph};

/// Emit FlowScript source for `graph`. Each node is written as a standalone
/// declaration; dependencies are written as trailing `prereq -> dependent;`
/// edges in node declaration order.
pub fn emit(graph: &ParsedGraph) -> String {
    let mut out = String::from("digraph {\n");

    for node in graph.nodes_in_order() {
        out.push_str("  ");
        out.push_str(&node.id);

        let shape = match node.node_type {
            NodeType::Data => Some("circle"),
            NodeType::Job => Some("box"),
            NodeType::Status => Some("diamond"),
            NodeType::Undefined => None,
        };

        let mut props = Vec::new();
        if let Some(shape) = shape {
            props.push(format!("shape=\"{shape}\""));
        }
        if let Some(label) = &node.label {
            props.push(format!("label=\"{label}\""));
        }
        if let Some(data) = &node.input_data {
            let raw = serde_json::to_string(data).expect("Value always serializes");
            props.push(format!("data='{raw}'"));
        }

        if props.is_empty() {
            out.push_str(";\n");
        } else {
            out.push_str(" [");
            out.push_str(&props.join(" "));
            out.push_str("];\n");
        }
    }

    for node in graph.nodes_in_order() {
        for prereq in &node.dependencies {
            out.push_str(&format!("  {prereq} -> {};\n", node.id));
        }
    }

    out.push_str("}\n");
    out
}
