//! The parsed representation of a FlowScript workflow.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The identifier a FlowScript node is declared under; also the map key.
pub type NodeId = String;

/// The semantic role of a FlowScript node, determined by its `shape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// `shape="circle"` — carries an inline payload, has no dependencies.
    Data,
    /// `shape="box"` — runnable work, dispatched to the job engine.
    Job,
    /// `shape="diamond"` — a single-dependency gate, short-circuited by the runner.
    Status,
    /// No shape was ever declared for this identifier.
    Undefined,
}

/// A single node in a parsed FlowScript graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Echoes the map key this node is stored under.
    pub id: NodeId,
    pub node_type: NodeType,
    pub label: Option<String>,
    pub input_data: Option<Value>,
    /// Prerequisite node ids, in declaration order.
    pub dependencies: Vec<NodeId>,
}

impl Node {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            node_type: NodeType::Undefined,
            label: None,
            input_data: None,
            dependencies: Vec::new(),
        }
    }
}

/// A fully parsed FlowScript workflow: every declared node, keyed by id.
///
/// Node insertion order is preserved (`FxHashMap` does not preserve order by
/// itself, so callers that need declaration order should use
/// [`ParsedGraph::node_order`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedGraph {
    nodes: FxHashMap<NodeId, Node>,
    order: Vec<NodeId>,
}

impl ParsedGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entry(&mut self, id: &str) -> &mut Node {
        if !self.nodes.contains_key(id) {
            self.order.push(id.to_string());
            self.nodes.insert(id.to_string(), Node::new(id.to_string()));
        }
        self.nodes.get_mut(id).expect("just inserted")
    }

    /// Look up a node by id.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Declaration order of node ids, for deterministic iteration.
    pub fn node_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Iterate over nodes in declaration order.
    pub fn nodes_in_order(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().map(move |id| &self.nodes[id])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
