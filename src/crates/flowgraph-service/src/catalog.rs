//! Registry of compiled graphs keyed by graph id

use flowgraph_core::{CompiledGraph, GraphDescription};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct GraphCatalog {
    graphs: HashMap<String, CompiledGraph>,
}

impl GraphCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the graph's own id. Returns the graph it replaced, if any.
    pub fn register(&mut self, graph: CompiledGraph) -> Option<CompiledGraph> {
        let replaced = self.graphs.insert(graph.id().to_string(), graph);
        if let Some(previous) = &replaced {
            tracing::debug!(graph_id = %previous.id(), "Replaced registered graph");
        }
        replaced
    }

    /// Cheap clone of the registered graph.
    pub fn get(&self, graph_id: &str) -> Option<CompiledGraph> {
        self.graphs.get(graph_id).cloned()
    }

    pub fn contains(&self, graph_id: &str) -> bool {
        self.graphs.contains_key(graph_id)
    }

    pub fn remove(&mut self, graph_id: &str) -> Option<CompiledGraph> {
        self.graphs.remove(graph_id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.graphs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Descriptions of every registered graph, sorted by id.
    pub fn list(&self) -> Vec<GraphDescription> {
        let mut descriptions: Vec<GraphDescription> =
            self.graphs.values().map(CompiledGraph::describe).collect();
        descriptions.sort_by(|a, b| a.id.cmp(&b.id));
        descriptions
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgraph_core::{Graph, State};

    fn compiled(id: &str, label: &str) -> CompiledGraph {
        let mut graph = Graph::new(id, label);
        graph
            .add_node("only", "Only", |_: &State| Ok(State::new()))
            .unwrap()
            .set_start_node("only")
            .unwrap();
        graph.compile().unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = GraphCatalog::new();
        assert!(catalog.register(compiled("b", "B")).is_none());
        assert!(catalog.register(compiled("a", "A")).is_none());

        assert!(catalog.contains("a"));
        assert_eq!(catalog.get("b").unwrap().label(), "B");
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.ids(), vec!["a", "b"]);
        assert_eq!(catalog.list()[0].id, "a");
    }

    #[test]
    fn test_register_replaces() {
        let mut catalog = GraphCatalog::new();
        catalog.register(compiled("a", "First"));
        let replaced = catalog.register(compiled("a", "Second")).unwrap();

        assert_eq!(replaced.label(), "First");
        assert_eq!(catalog.get("a").unwrap().label(), "Second");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut catalog = GraphCatalog::new();
        catalog.register(compiled("a", "A"));
        assert!(catalog.remove("a").is_some());
        assert!(catalog.is_empty());
        assert!(catalog.remove("a").is_none());
    }
}
