use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction, Graph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::parsers::{DeclKind, UnitId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
pub enum NodeType {
    Unit,
    Symbol(DeclKind),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
pub enum EdgeType {
    /// unit -> symbol it declares at top level
    Defines,
    /// unit -> symbol declared elsewhere whose name it mentions
    References,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    pub unit: UnitId,
    pub line_number: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub edge_type: EdgeType,
    pub source_id: String,
    pub target_id: String,
}

pub type ReferenceGraph = Graph<Node, Edge, Directed>;

impl Node {
    pub fn unit(unit: UnitId, file_name: &str) -> Self {
        Self {
            id: unit_node_id(unit),
            name: file_name.to_string(),
            node_type: NodeType::Unit,
            unit,
            line_number: 0,
        }
    }

    pub fn symbol(unit: UnitId, index: usize, name: &str, kind: DeclKind, line: usize) -> Self {
        Self {
            id: symbol_node_id(unit, index),
            name: name.to_string(),
            node_type: NodeType::Symbol(kind),
            unit,
            line_number: line,
        }
    }
}

impl Edge {
    pub fn new(edge_type: EdgeType, source_id: String, target_id: String) -> Self {
        Self {
            edge_type,
            source_id,
            target_id,
        }
    }
}

pub fn unit_node_id(unit: UnitId) -> String {
    format!("u{unit}")
}

pub fn symbol_node_id(unit: UnitId, index: usize) -> String {
    format!("u{unit}:d{index}")
}

pub struct GraphBuilder {
    graph: ReferenceGraph,
    node_map: HashMap<String, NodeIndex>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            node_map: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.node_map.insert(id, index);
        index
    }

    pub fn add_edge(&mut self, edge: Edge) -> Option<EdgeIndex> {
        let source_idx = self.node_map.get(&edge.source_id)?;
        let target_idx = self.node_map.get(&edge.target_id)?;
        Some(self.graph.add_edge(*source_idx, *target_idx, edge))
    }

    pub fn build(self) -> (ReferenceGraph, HashMap<String, NodeIndex>) {
        (self.graph, self.node_map)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Units with an edge of `edge_type` into `symbol`, ascending.
pub fn incoming_units(graph: &ReferenceGraph, symbol: NodeIndex, edge_type: EdgeType) -> Vec<UnitId> {
    let mut units: Vec<UnitId> = graph
        .edges_directed(symbol, Direction::Incoming)
        .filter(|edge| edge.weight().edge_type == edge_type)
        .filter_map(|edge| graph.node_weight(edge.source()))
        .map(|node| node.unit)
        .collect();
    units.sort_unstable();
    units.dedup();
    units
}
