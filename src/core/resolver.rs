use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::graph::{
    incoming_units, symbol_node_id, unit_node_id, Edge, EdgeType, GraphBuilder, Node,
    ReferenceGraph,
};
use crate::parsers::common::identifiers;
use crate::parsers::{SourceUnit, UnitId};

/// A declaration addressed by its unit and its position in that unit's
/// declaration list.
pub type DeclKey = (UnitId, usize);

/// Which units mention each declared name outside the unit that declares it.
///
/// Matching is by whole identifier over normalized text, so comments, string
/// contents and substrings never count as references. A local variable that
/// happens to share a name with a global still counts: the table answers
/// "does this name appear anywhere outside its home file" and leans towards
/// hoisting.
pub struct CrossReferenceTable {
    graph: ReferenceGraph,
    node_map: HashMap<String, NodeIndex>,
}

impl CrossReferenceTable {
    pub fn build(units: &[SourceUnit]) -> Self {
        let identifier_sets: Vec<HashSet<&str>> = units
            .par_iter()
            .map(|unit| identifiers(&unit.normalized.text).collect())
            .collect();

        let mut builder = GraphBuilder::new();
        for unit in units {
            builder.add_node(Node::unit(unit.id, &unit.file_name));
        }

        let mut references = 0usize;
        for unit in units {
            for (index, decl) in unit.declarations.iter().enumerate() {
                builder.add_node(Node::symbol(unit.id, index, &decl.name, decl.kind, decl.line));
                let symbol_id = symbol_node_id(unit.id, index);
                builder.add_edge(Edge::new(
                    EdgeType::Defines,
                    unit_node_id(unit.id),
                    symbol_id.clone(),
                ));

                for (other, names) in identifier_sets.iter().enumerate() {
                    if other != unit.id && names.contains(decl.name.as_str()) {
                        builder.add_edge(Edge::new(
                            EdgeType::References,
                            unit_node_id(other),
                            symbol_id.clone(),
                        ));
                        references += 1;
                    }
                }
            }
        }

        debug!(units = units.len(), references, "cross-reference table built");
        let (graph, node_map) = builder.build();
        Self { graph, node_map }
    }

    /// Units other than the home unit that mention the declaration's name, in
    /// traversal order.
    pub fn referencing_units(&self, key: DeclKey) -> Vec<UnitId> {
        self.node_map
            .get(&symbol_node_id(key.0, key.1))
            .map(|&index| incoming_units(&self.graph, index, EdgeType::References))
            .unwrap_or_default()
    }

    pub fn is_file_local(&self, key: DeclKey) -> bool {
        self.referencing_units(key).is_empty()
    }

    pub fn graph(&self) -> &ReferenceGraph {
        &self.graph
    }
}
