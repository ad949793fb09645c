//! Graph visualization in DOT, Mermaid and ASCII formats
//!
//! Renders the structure of a [`Graph`]: nodes, edge groups and the start
//! node. Predicates are opaque, so conditional branches are labelled by their
//! evaluation position (`1`, `2`, ... and `default`) and loop edges by their
//! iteration cap.
//!
//! ```rust,ignore
//! use flowgraph_core::visualization::{visualize, VisualizationOptions};
//!
//! let dot = visualize(&graph, &VisualizationOptions::dot());
//! std::fs::write("workflow.dot", dot)?;
//! // dot -Tpng workflow.dot -o workflow.png
//!
//! let mermaid = visualize(&graph, &VisualizationOptions::mermaid().with_title("Review"));
//! ```
//!
//! | Element | DOT | Mermaid |
//! |---------|-----|---------|
//! | start marker | green circle | `((START))` |
//! | end marker | red circle | `((END))` |
//! | node | rounded box | `["label"]` |
//! | conditional source | rounded box | `{"label"}` diamond |
//! | conditional branch | dashed edge | `-.->` |
//! | loop back | bold blue edge | `==>` |

use crate::graph::{Destination, Edge, Graph, END};
use std::collections::HashSet;

/// Pseudo-node rendered before the start node
const START_MARKER: &str = "__start__";

/// Graph visualization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizationFormat {
    /// DOT format for Graphviz
    Dot,
    /// Mermaid diagram format
    Mermaid,
    /// Simple ASCII art
    Ascii,
}

impl std::str::FromStr for VisualizationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" | "graphviz" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            "ascii" | "text" => Ok(Self::Ascii),
            other => Err(format!("unknown visualization format: {}", other)),
        }
    }
}

/// Visualization options
#[derive(Debug, Clone)]
pub struct VisualizationOptions {
    /// Output format
    pub format: VisualizationFormat,
    /// Include node ids next to labels and loop caps on edges
    pub include_details: bool,
    /// Graph title/label
    pub title: Option<String>,
}

impl Default for VisualizationOptions {
    fn default() -> Self {
        Self {
            format: VisualizationFormat::Dot,
            include_details: false,
            title: None,
        }
    }
}

impl VisualizationOptions {
    pub fn new(format: VisualizationFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Create with DOT format
    pub fn dot() -> Self {
        Self::new(VisualizationFormat::Dot)
    }

    /// Create with Mermaid format
    pub fn mermaid() -> Self {
        Self::new(VisualizationFormat::Mermaid)
    }

    /// Create with ASCII format
    pub fn ascii() -> Self {
        Self::new(VisualizationFormat::Ascii)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_details(mut self) -> Self {
        self.include_details = true;
        self
    }
}

/// Visualize a graph as a string
pub fn visualize(graph: &Graph, options: &VisualizationOptions) -> String {
    match options.format {
        VisualizationFormat::Dot => visualize_dot(graph, options),
        VisualizationFormat::Mermaid => visualize_mermaid(graph, options),
        VisualizationFormat::Ascii => visualize_ascii(graph, options),
    }
}

/// An edge flattened for rendering.
struct RenderedEdge {
    from: String,
    to: String,
    label: Option<String>,
    style: EdgeStyle,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EdgeStyle {
    Solid,
    Branch,
    LoopBack,
}

fn destination_id(destination: &Destination) -> String {
    match destination {
        Destination::Node(id) => id.clone(),
        Destination::End => END.to_string(),
    }
}

fn flatten_edges(graph: &Graph, options: &VisualizationOptions) -> Vec<RenderedEdge> {
    let mut rendered = Vec::new();
    for (from, edge) in graph.edges() {
        match edge {
            Edge::Direct(to) => rendered.push(RenderedEdge {
                from: from.to_string(),
                to: destination_id(to),
                label: None,
                style: EdgeStyle::Solid,
            }),
            Edge::Conditional { branches, default } => {
                for (position, branch) in branches.iter().enumerate() {
                    rendered.push(RenderedEdge {
                        from: from.to_string(),
                        to: destination_id(&branch.destination),
                        label: Some((position + 1).to_string()),
                        style: EdgeStyle::Branch,
                    });
                }
                rendered.push(RenderedEdge {
                    from: from.to_string(),
                    to: destination_id(default),
                    label: Some("default".to_string()),
                    style: EdgeStyle::Branch,
                });
            }
            Edge::Loop(edge) => {
                let label = if options.include_details {
                    format!("loop (max {})", edge.max_iterations)
                } else {
                    "loop".to_string()
                };
                rendered.push(RenderedEdge {
                    from: from.to_string(),
                    to: edge.target.clone(),
                    label: Some(label),
                    style: EdgeStyle::LoopBack,
                });
                rendered.push(RenderedEdge {
                    from: from.to_string(),
                    to: edge
                        .exit
                        .clone()
                        .unwrap_or_else(|| END.to_string()),
                    label: Some("exit".to_string()),
                    style: EdgeStyle::Solid,
                });
            }
        }
    }
    rendered
}

fn node_label(id: &str, label: &str, options: &VisualizationOptions) -> String {
    if options.include_details && id != label {
        format!("{}\n({})", label, id)
    } else {
        label.to_string()
    }
}

fn conditional_sources(graph: &Graph) -> HashSet<&str> {
    graph
        .edges()
        .filter(|(_, edge)| matches!(edge, Edge::Conditional { .. }))
        .map(|(from, _)| from)
        .collect()
}

/// Generate DOT format visualization
fn visualize_dot(graph: &Graph, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("digraph \"{}\" {{\n", escape_dot(graph.id())));
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n");

    let title = options.title.as_deref().unwrap_or(graph.label());
    if !title.is_empty() {
        output.push_str("    labelloc=\"t\";\n");
        output.push_str(&format!("    label=\"{}\";\n", escape_dot(title)));
    }

    output.push_str(&format!(
        "    \"{}\" [shape=circle, style=filled, fillcolor=green, label=\"START\"];\n",
        START_MARKER
    ));
    output.push_str(&format!(
        "    \"{}\" [shape=circle, style=filled, fillcolor=red, label=\"END\"];\n",
        END
    ));

    for node in graph.nodes() {
        output.push_str(&format!(
            "    \"{}\" [label=\"{}\"];\n",
            escape_dot(&node.id),
            escape_dot(&node_label(&node.id, &node.label, options))
        ));
    }

    if let Some(start) = graph.start_node() {
        output.push_str(&format!(
            "    \"{}\" -> \"{}\";\n",
            START_MARKER,
            escape_dot(start)
        ));
    }

    for edge in flatten_edges(graph, options) {
        let mut attributes = Vec::new();
        if let Some(label) = &edge.label {
            attributes.push(format!("label=\"{}\"", escape_dot(label)));
        }
        match edge.style {
            EdgeStyle::Solid => {}
            EdgeStyle::Branch => attributes.push("style=dashed".to_string()),
            EdgeStyle::LoopBack => {
                attributes.push("style=bold".to_string());
                attributes.push("color=blue".to_string());
            }
        }

        if attributes.is_empty() {
            output.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                escape_dot(&edge.from),
                escape_dot(&edge.to)
            ));
        } else {
            output.push_str(&format!(
                "    \"{}\" -> \"{}\" [{}];\n",
                escape_dot(&edge.from),
                escape_dot(&edge.to),
                attributes.join(", ")
            ));
        }
    }

    output.push_str("}\n");
    output
}

/// Generate Mermaid format visualization
fn visualize_mermaid(graph: &Graph, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    if let Some(title) = &options.title {
        output.push_str("---\n");
        output.push_str(&format!("title: {}\n", escape_mermaid(title)));
        output.push_str("---\n");
    }
    output.push_str("graph TD\n");

    output.push_str(&format!("    {}((START))\n", sanitize_id(START_MARKER)));
    output.push_str(&format!(
        "    style {} fill:#90EE90,stroke:#228B22,stroke-width:3px\n",
        sanitize_id(START_MARKER)
    ));
    output.push_str(&format!("    {}((END))\n", sanitize_id(END)));
    output.push_str(&format!(
        "    style {} fill:#FFB6C1,stroke:#DC143C,stroke-width:3px\n",
        sanitize_id(END)
    ));

    let conditional = conditional_sources(graph);

    for node in graph.nodes() {
        let label = escape_mermaid(&node_label(&node.id, &node.label, options));
        let id = sanitize_id(&node.id);
        if conditional.contains(node.id.as_str()) {
            output.push_str(&format!("    {}{{\"{}\"}}\n", id, label));
            output.push_str(&format!(
                "    style {} fill:#FFE4B5,stroke:#FF8C00,stroke-width:2px\n",
                id
            ));
        } else {
            output.push_str(&format!("    {}[\"{}\"]\n", id, label));
            output.push_str(&format!(
                "    style {} fill:#F0F0F0,stroke:#666,stroke-width:2px\n",
                id
            ));
        }
    }

    if let Some(start) = graph.start_node() {
        output.push_str(&format!(
            "    {} --> {}\n",
            sanitize_id(START_MARKER),
            sanitize_id(start)
        ));
    }

    for edge in flatten_edges(graph, options) {
        let from = sanitize_id(&edge.from);
        let to = sanitize_id(&edge.to);
        let line = match (edge.style, &edge.label) {
            (EdgeStyle::Solid, None) => format!("    {} --> {}\n", from, to),
            (EdgeStyle::Solid, Some(label)) => {
                format!("    {} -->|\"{}\"| {}\n", from, escape_mermaid(label), to)
            }
            (EdgeStyle::Branch, label) => format!(
                "    {} -.\"{}\".-> {}\n",
                from,
                escape_mermaid(label.as_deref().unwrap_or("")),
                to
            ),
            (EdgeStyle::LoopBack, label) => format!(
                "    {} ==\"{}\"==> {}\n",
                from,
                escape_mermaid(label.as_deref().unwrap_or("")),
                to
            ),
        };
        output.push_str(&line);
    }

    output
}

/// Generate simple ASCII art visualization
fn visualize_ascii(graph: &Graph, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    let title = options
        .title
        .clone()
        .unwrap_or_else(|| format!("Graph: {}", graph.label()));
    output.push_str(&format!("{}\n", title));
    output.push_str(&format!("{}\n\n", "=".repeat(title.chars().count())));

    match graph.start_node() {
        Some(start) => output.push_str(&format!("START -> {}\n", start)),
        None => output.push_str("START -> (unset)\n"),
    }

    for node in graph.nodes() {
        output.push_str(&format!("\n[{}]", node.id));
        if node.label != node.id {
            output.push_str(&format!(" {}", node.label));
        }
        output.push('\n');

        match graph.edge(&node.id) {
            None => output.push_str("  (no outgoing edges, run ends here)\n"),
            Some(Edge::Direct(to)) => output.push_str(&format!("  -> {}\n", to)),
            Some(Edge::Conditional { branches, default }) => {
                output.push_str("  -> (conditional)\n");
                for (position, branch) in branches.iter().enumerate() {
                    output.push_str(&format!(
                        "     [{}] -> {}\n",
                        position + 1,
                        branch.destination
                    ));
                }
                output.push_str(&format!("     [default] -> {}\n", default));
            }
            Some(Edge::Loop(edge)) => {
                output.push_str(&format!(
                    "  -> (loop, max {}) -> {}\n",
                    edge.max_iterations, edge.target
                ));
                output.push_str(&format!(
                    "  -> (exit) -> {}\n",
                    edge.exit.as_deref().unwrap_or(END)
                ));
            }
        }
    }

    output.push_str("\nEND\n");
    output
}

/// Escape special characters for DOT format
fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Escape special characters for Mermaid format
fn escape_mermaid(s: &str) -> String {
    s.replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br/>")
}

/// Sanitize node IDs for Mermaid (must be alphanumeric + underscore)
fn sanitize_id(s: &str) -> String {
    let trimmed = s.trim_matches('_');
    let sanitized: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    match sanitized.as_str() {
        // Mermaid reserves lowercase `end`
        "end" => "END".to_string(),
        "" => "node".to_string(),
        _ => sanitized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Branch;
    use crate::State;

    fn noop(_: &State) -> Result<State, crate::NodeError> {
        Ok(State::new())
    }

    fn review_graph() -> Graph {
        let mut graph = Graph::new("review", "Code Review");
        graph
            .add_node("check", "Check Style", noop)
            .unwrap()
            .add_node("route", "Route", noop)
            .unwrap()
            .add_node("finalize", "Finalize", noop)
            .unwrap();
        graph.add_edge("check", "route").unwrap();
        graph
            .add_conditional_edge(
                "route",
                vec![Branch::new(|_: &State| false, "finalize")],
                END,
            )
            .unwrap();
        graph
            .add_loop_with_exit("finalize", "check", |_: &State| false, Some(3), "route")
            .unwrap();
        graph.set_start_node("check").unwrap();
        graph
    }

    #[test]
    fn test_visualize_dot() {
        let dot = visualize(&review_graph(), &VisualizationOptions::dot());

        assert!(dot.starts_with("digraph \"review\""));
        assert!(dot.contains("\"__start__\" -> \"check\";"));
        assert!(dot.contains("\"check\" -> \"route\";"));
        assert!(dot.contains("\"route\" -> \"finalize\" [label=\"1\", style=dashed];"));
        assert!(dot.contains("\"route\" -> \"__end__\" [label=\"default\", style=dashed];"));
        assert!(
            dot.contains("\"finalize\" -> \"check\" [label=\"loop\", style=bold, color=blue];")
        );
        assert!(dot.contains("\"finalize\" -> \"route\" [label=\"exit\"];"));
        assert!(dot.contains("label=\"Code Review\""));
    }

    #[test]
    fn test_visualize_mermaid() {
        let mermaid = visualize(&review_graph(), &VisualizationOptions::mermaid());

        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("start((START))"));
        assert!(mermaid.contains("END((END))"));
        assert!(mermaid.contains("check[\"Check Style\"]"));
        assert!(mermaid.contains("route{\"Route\"}"));
        assert!(mermaid.contains("#FFE4B5"));
        assert!(mermaid.contains("start --> check"));
        assert!(mermaid.contains("route -.\"default\".-> END"));
        assert!(mermaid.contains("finalize ==\"loop\"==> check"));
    }

    #[test]
    fn test_mermaid_title_and_details() {
        let mermaid = visualize(
            &review_graph(),
            &VisualizationOptions::mermaid()
                .with_title("Review <v2>")
                .with_details(),
        );

        assert!(mermaid.starts_with("---\ntitle: Review &lt;v2&gt;\n---\n"));
        assert!(mermaid.contains("Check Style<br/>(check)"));
        assert!(mermaid.contains("loop (max 3)"));
    }

    #[test]
    fn test_visualize_ascii() {
        let ascii = visualize(&review_graph(), &VisualizationOptions::ascii());

        assert!(ascii.starts_with("Graph: Code Review\n"));
        assert!(ascii.contains("START -> check"));
        assert!(ascii.contains("[route] Route\n  -> (conditional)"));
        assert!(ascii.contains("[default] -> __end__"));
        assert!(ascii.contains("(loop, max 3) -> check"));
        assert!(ascii.contains("(exit) -> route"));
        assert!(ascii.ends_with("END\n"));
    }

    #[test]
    fn test_ascii_marks_terminal_nodes() {
        let mut graph = Graph::new("single", "Single");
        graph.add_node("only", "only", noop).unwrap();
        graph.set_start_node("only").unwrap();

        let ascii = visualize(&graph, &VisualizationOptions::ascii());
        assert!(ascii.contains("[only]\n  (no outgoing edges, run ends here)"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_dot("say \"hi\"\n"), "say \\\"hi\\\"\\n");
        assert_eq!(escape_mermaid("a<b>\"c\""), "a&lt;b&gt;&quot;c&quot;");
        assert_eq!(sanitize_id("__end__"), "END");
        assert_eq!(sanitize_id("step-1.a"), "step_1_a");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("DOT".parse::<VisualizationFormat>(), Ok(VisualizationFormat::Dot));
        assert_eq!("mermaid".parse::<VisualizationFormat>(), Ok(VisualizationFormat::Mermaid));
        assert_eq!("text".parse::<VisualizationFormat>(), Ok(VisualizationFormat::Ascii));
        assert!("svg".parse::<VisualizationFormat>().is_err());
    }
}
