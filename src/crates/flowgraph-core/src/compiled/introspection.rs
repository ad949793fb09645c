//! Serializable graph structure summaries
//!
//! Node functions and predicates are opaque, so a [`GraphDescription`] lists
//! only what can be serialized: identifiers, labels, edge kinds and their
//! destinations, loop bounds and the start node.

use crate::graph::{Destination, Edge, Graph, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub id: NodeId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeDescription {
    Direct {
        from: NodeId,
        to: Destination,
    },
    Conditional {
        from: NodeId,
        /// Branch destinations in evaluation order
        branches: Vec<Destination>,
        default: Destination,
    },
    Loop {
        from: NodeId,
        target: NodeId,
        max_iterations: usize,
        exit: Option<NodeId>,
    },
}

impl EdgeDescription {
    pub fn from_id(&self) -> &str {
        match self {
            Self::Direct { from, .. }
            | Self::Conditional { from, .. }
            | Self::Loop { from, .. } => from,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDescription {
    pub id: String,
    pub label: String,
    pub start_node: Option<NodeId>,
    pub nodes: Vec<NodeDescription>,
    pub edges: Vec<EdgeDescription>,
}

impl GraphDescription {
    pub fn from_graph(graph: &Graph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| NodeDescription {
                id: node.id.clone(),
                label: node.label.clone(),
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(from, edge)| match edge {
                Edge::Direct(to) => EdgeDescription::Direct {
                    from: from.to_string(),
                    to: to.clone(),
                },
                Edge::Conditional { branches, default } => EdgeDescription::Conditional {
                    from: from.to_string(),
                    branches: branches.iter().map(|b| b.destination.clone()).collect(),
                    default: default.clone(),
                },
                Edge::Loop(edge) => EdgeDescription::Loop {
                    from: from.to_string(),
                    target: edge.target.clone(),
                    max_iterations: edge.max_iterations,
                    exit: edge.exit.clone(),
                },
            })
            .collect();

        Self {
            id: graph.id().to_string(),
            label: graph.label().to_string(),
            start_node: graph.start_node().map(str::to_string),
            nodes,
            edges,
        }
    }
}

impl Graph {
    pub fn describe(&self) -> GraphDescription {
        GraphDescription::from_graph(self)
    }
}
