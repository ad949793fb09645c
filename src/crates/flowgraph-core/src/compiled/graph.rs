//! CompiledGraph struct and accessors

use super::introspection::GraphDescription;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::Graph;
use crate::visualization::{visualize, VisualizationOptions};
use std::sync::Arc;

/// Validated, immutable graph ready for execution.
///
/// Cloning is cheap and clones share the same underlying graph, so a single
/// compiled graph can serve many concurrent runs.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub(crate) graph: Arc<Graph>,
}

impl CompiledGraph {
    pub(crate) fn new(graph: Graph) -> Result<Self> {
        graph.validate()?;
        tracing::debug!(
            graph = %graph.id(),
            nodes = graph.node_count(),
            "Compiled graph"
        );
        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    pub fn id(&self) -> &str {
        self.graph.id()
    }

    pub fn label(&self) -> &str {
        self.graph.label()
    }

    pub fn config(&self) -> &EngineConfig {
        self.graph.config()
    }

    /// Get a reference to the underlying graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn describe(&self) -> GraphDescription {
        GraphDescription::from_graph(&self.graph)
    }

    /// Render the graph structure as DOT, Mermaid or ASCII text.
    pub fn visualize(&self, options: &VisualizationOptions) -> String {
        visualize(&self.graph, options)
    }
}
