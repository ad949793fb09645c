//! Core graph data structures and the graph builder
//!
//! A [`Graph`] is a named collection of nodes, the edge table connecting them
//! and a designated start node. It is assembled once, validated as it is
//! built, and may then be executed many times.
//!
//! # Graph Structure
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │  Graph "code-review"                                  │
//! │                                                       │
//! │  start ─▶ extract ──Direct──▶ check                   │
//! │                                 │                     │
//! │                         Conditional (ordered)         │
//! │                      ┌──────────┴──────────┐          │
//! │                      ▼                     ▼          │
//! │                   detect ◀──Loop──┐     finalize ─▶ END│
//! │                      │            │                   │
//! │                      └────────────┘                   │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Every node has *at most one* outgoing edge group: a direct edge, an ordered
//! conditional group, or a bounded loop. A node without one is terminal.
//!
//! # Examples
//!
//! ```rust
//! use flowgraph_core::{Graph, State, END};
//! use serde_json::json;
//!
//! let mut graph = Graph::new("greeting", "Greeting workflow");
//! graph
//!     .add_node("greet", "Greet", |state: &State| {
//!         let name = state.get("name").and_then(|v| v.as_str()).unwrap_or("world");
//!         let mut update = State::new();
//!         update.insert("greeting".into(), json!(format!("hello, {}", name)));
//!         Ok(update)
//!     })?
//!     .add_edge("greet", END)?
//!     .set_start_node("greet")?;
//!
//! let mut input = State::new();
//! input.insert("name".into(), json!("flowgraph"));
//! let run = graph.execute(input)?;
//! assert_eq!(run.final_state()["greeting"], json!("hello, flowgraph"));
//! # Ok::<(), flowgraph_core::GraphError>(())
//! ```

use crate::compiled::CompiledGraph;
use crate::config::EngineConfig;
use crate::error::{GraphError, NodeError, Result};
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Node identifier - unique name for each node in the graph
pub type NodeId = String;

/// Reserved destination marking explicit termination.
///
/// Edges may point at `END`; nodes may not be registered under it.
pub const END: &str = "__end__";

/// Executable unit of a node.
///
/// A node receives a read-only view of the current state and returns a
/// partial update. Closures of the shape `Fn(&State) -> Result<State, NodeError>`
/// implement this trait automatically.
pub trait NodeFn: Send + Sync {
    fn run(&self, state: &State) -> std::result::Result<State, NodeError>;
}

impl<F> NodeFn for F
where
    F: Fn(&State) -> std::result::Result<State, NodeError> + Send + Sync,
{
    fn run(&self, state: &State) -> std::result::Result<State, NodeError> {
        self(state)
    }
}

/// Shared handle to a node's executable unit.
pub type NodeExecutor = Arc<dyn NodeFn>;

/// Boolean test over the post-merge state, used by conditional and loop edges.
pub type Predicate = Arc<dyn Fn(&State) -> bool + Send + Sync>;

/// A registered node.
#[derive(Clone)]
pub struct NodeSpec {
    pub id: NodeId,

    /// Descriptive, non-semantic label
    pub label: String,

    pub executor: NodeExecutor,
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("executor", &"<function>")
            .finish()
    }
}

/// Where an edge leads: a registered node or explicit termination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Node(NodeId),
    End,
}

impl Destination {
    pub fn node(id: impl Into<NodeId>) -> Self {
        Self::Node(id.into())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    pub fn as_node(&self) -> Option<&str> {
        match self {
            Self::Node(id) => Some(id),
            Self::End => None,
        }
    }
}

impl From<&str> for Destination {
    fn from(id: &str) -> Self {
        if id == END {
            Self::End
        } else {
            Self::Node(id.to_string())
        }
    }
}

impl From<String> for Destination {
    fn from(id: String) -> Self {
        if id == END {
            Self::End
        } else {
            Self::Node(id)
        }
    }
}

impl From<&String> for Destination {
    fn from(id: &String) -> Self {
        Self::from(id.as_str())
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => f.write_str(id),
            Self::End => f.write_str(END),
        }
    }
}

/// One `(predicate, destination)` pair of a conditional edge group.
#[derive(Clone)]
pub struct Branch {
    pub condition: Predicate,
    pub destination: Destination,
}

impl Branch {
    pub fn new<F>(condition: F, destination: impl Into<Destination>) -> Self
    where
        F: Fn(&State) -> bool + Send + Sync + 'static,
    {
        Self {
            condition: Arc::new(condition),
            destination: destination.into(),
        }
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("condition", &"<predicate>")
            .field("destination", &self.destination)
            .finish()
    }
}

/// Bounded loop-back edge.
///
/// While `condition` holds after the source node runs, execution returns to
/// `target`. `max_iterations` bounds the number of passes through the loop
/// body, counting the first; when the predicate is still true after the last
/// permitted pass the run is aborted. When the predicate is false execution
/// continues at `exit`, or terminates if no exit is configured.
#[derive(Clone)]
pub struct LoopEdge {
    pub target: NodeId,
    pub condition: Predicate,
    pub max_iterations: usize,
    pub exit: Option<NodeId>,
}

impl fmt::Debug for LoopEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopEdge")
            .field("target", &self.target)
            .field("condition", &"<predicate>")
            .field("max_iterations", &self.max_iterations)
            .field("exit", &self.exit)
            .finish()
    }
}

/// Outgoing edge group of a node.
#[derive(Clone)]
pub enum Edge {
    /// Unconditional transition
    Direct(Destination),

    /// Ordered predicates, first match wins, `default` otherwise
    Conditional {
        branches: Vec<Branch>,
        default: Destination,
    },

    /// Bounded loop back to an earlier (or the same) node
    Loop(LoopEdge),
}

impl Edge {
    /// Every destination this edge group can lead to, in declaration order.
    pub fn destinations(&self) -> Vec<Destination> {
        match self {
            Edge::Direct(to) => vec![to.clone()],
            Edge::Conditional { branches, default } => branches
                .iter()
                .map(|b| b.destination.clone())
                .chain(std::iter::once(default.clone()))
                .collect(),
            Edge::Loop(edge) => {
                let mut targets = vec![Destination::Node(edge.target.clone())];
                if let Some(exit) = &edge.exit {
                    targets.push(Destination::Node(exit.clone()));
                }
                targets
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Edge::Direct(_) => "direct",
            Edge::Conditional { .. } => "conditional",
            Edge::Loop(_) => "loop",
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, default } => f
                .debug_struct("Conditional")
                .field("branches", branches)
                .field("default", default)
                .finish(),
            Edge::Loop(edge) => f.debug_tuple("Loop").field(edge).finish(),
        }
    }
}

/// Workflow graph: node registry, edge table and start node.
///
/// Registration methods validate eagerly and return `&mut Self` so calls can
/// be chained with `?`. A failed registration leaves the graph unchanged.
///
/// The graph holds no execution-local state, so [`execute`](Self::execute)
/// takes `&self` and can be called any number of times. Use
/// [`compile`](Self::compile) to freeze it into a shareable [`CompiledGraph`].
#[derive(Debug, Clone)]
pub struct Graph {
    id: String,
    label: String,
    nodes: HashMap<NodeId, NodeSpec>,
    /// Registration order, for deterministic introspection
    order: Vec<NodeId>,
    edges: HashMap<NodeId, Edge>,
    start: Option<NodeId>,
    config: EngineConfig,
}

impl Graph {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            start: None,
            config: EngineConfig::default(),
        }
    }

    /// Replace the engine configuration.
    ///
    /// Loop edges registered without an explicit cap take
    /// `default_loop_iterations` from the configuration in effect when they
    /// are added, so set this before calling [`add_loop`](Self::add_loop).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn start_node(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Outgoing edge group of `from`, if any.
    pub fn edge(&self, from: &str) -> Option<&Edge> {
        self.edges.get(from)
    }

    /// Edge groups ordered by their source's registration order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &Edge)> {
        self.order
            .iter()
            .filter_map(|id| self.edges.get(id).map(|edge| (id.as_str(), edge)))
    }

    /// Register a node.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateNode`] if `id` is already registered; the
    ///   existing registration is kept
    /// - [`GraphError::InvalidGraph`] if `id` is empty or the reserved [`END`]
    ///
    /// Types implementing [`NodeFn`] directly can be registered through
    /// [`add_node_with_executor`](Self::add_node_with_executor).
    pub fn add_node<F>(
        &mut self,
        id: impl Into<NodeId>,
        label: impl Into<String>,
        executor: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&State) -> std::result::Result<State, NodeError> + Send + Sync + 'static,
    {
        self.add_node_with_executor(id, label, Arc::new(executor))
    }

    /// Register a node with a pre-built executor handle.
    pub fn add_node_with_executor(
        &mut self,
        id: impl Into<NodeId>,
        label: impl Into<String>,
        executor: NodeExecutor,
    ) -> Result<&mut Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(GraphError::invalid_graph("node id must not be empty"));
        }
        if id == END {
            return Err(GraphError::invalid_graph(format!(
                "'{}' is reserved and cannot be used as a node id",
                END
            )));
        }
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }

        tracing::debug!(graph = %self.id, node = %id, "Registered node");
        self.order.push(id.clone());
        self.nodes.insert(
            id.clone(),
            NodeSpec {
                id,
                label: label.into(),
                executor,
            },
        );
        Ok(self)
    }

    /// Register an unconditional edge. `to` may be [`END`].
    pub fn add_edge(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
    ) -> Result<&mut Self> {
        let from = from.into();
        let to = Destination::from(to.into());
        self.check_source(&from)?;
        self.check_destination(&to)?;
        self.insert_edge(from, Edge::Direct(to));
        Ok(self)
    }

    /// Register an ordered conditional edge group.
    ///
    /// Predicates are evaluated in the given order against the post-merge
    /// state; the first that returns `true` wins. When none match, execution
    /// continues at `default` ([`Destination::End`] terminates the run).
    pub fn add_conditional_edge(
        &mut self,
        from: impl Into<NodeId>,
        branches: Vec<Branch>,
        default: impl Into<Destination>,
    ) -> Result<&mut Self> {
        let from = from.into();
        let default = default.into();
        self.check_source(&from)?;
        for branch in &branches {
            self.check_destination(&branch.destination)?;
        }
        self.check_destination(&default)?;
        self.insert_edge(from, Edge::Conditional { branches, default });
        Ok(self)
    }

    /// Register a bounded loop from `from` back to `target`.
    ///
    /// `max_iterations` defaults to the configured
    /// `default_loop_iterations` and must be positive. When the predicate
    /// turns false the run terminates; use
    /// [`add_loop_with_exit`](Self::add_loop_with_exit) to continue elsewhere.
    pub fn add_loop<F>(
        &mut self,
        from: impl Into<NodeId>,
        target: impl Into<NodeId>,
        condition: F,
        max_iterations: Option<usize>,
    ) -> Result<&mut Self>
    where
        F: Fn(&State) -> bool + Send + Sync + 'static,
    {
        self.insert_loop(from.into(), target.into(), Arc::new(condition), max_iterations, None)
    }

    /// Register a bounded loop with a post-loop destination taken when the
    /// predicate is false.
    ///
    /// `exit` must be a registered node. Passing [`END`] is rejected with
    /// [`GraphError::InvalidGraph`]; [`add_loop`](Self::add_loop) already ends
    /// the run when the predicate is false.
    pub fn add_loop_with_exit<F>(
        &mut self,
        from: impl Into<NodeId>,
        target: impl Into<NodeId>,
        condition: F,
        max_iterations: Option<usize>,
        exit: impl Into<NodeId>,
    ) -> Result<&mut Self>
    where
        F: Fn(&State) -> bool + Send + Sync + 'static,
    {
        self.insert_loop(
            from.into(),
            target.into(),
            Arc::new(condition),
            max_iterations,
            Some(exit.into()),
        )
    }

    /// Designate the node where execution begins.
    pub fn set_start_node(&mut self, id: impl Into<NodeId>) -> Result<&mut Self> {
        let id = id.into();
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::UnknownNode(id));
        }
        self.start = Some(id);
        Ok(self)
    }

    /// Check the start node and every edge reference.
    ///
    /// Registration already rejects dangling references; this is the
    /// pre-execution gate and reports everything as
    /// [`GraphError::InvalidGraph`].
    pub fn validate(&self) -> Result<()> {
        let start = self
            .start
            .as_deref()
            .ok_or_else(|| GraphError::invalid_graph("start node is not set"))?;
        if !self.nodes.contains_key(start) {
            return Err(GraphError::invalid_graph(format!(
                "start node '{}' is not registered",
                start
            )));
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::invalid_graph(format!(
                    "edge source '{}' is not registered",
                    from
                )));
            }
            for destination in edge.destinations() {
                if let Destination::Node(to) = &destination {
                    if !self.nodes.contains_key(to) {
                        return Err(GraphError::invalid_graph(format!(
                            "edge '{}' -> '{}' points at an unregistered node",
                            from, to
                        )));
                    }
                }
            }
            if let Edge::Loop(edge) = edge {
                if edge.max_iterations == 0 {
                    return Err(GraphError::invalid_graph(format!(
                        "loop on '{}' has a zero iteration bound",
                        from
                    )));
                }
            }
        }

        self.config.validate()
    }

    /// Validate and run the graph once.
    ///
    /// The initial state is moved into the run; the caller keeps no alias to
    /// the working state. Only structural problems are returned as `Err`;
    /// node failures and guard exhaustion are reported by the returned
    /// [`Run`](crate::Run)'s status.
    pub fn execute(&self, initial_state: State) -> Result<crate::run::Run> {
        self.execute_with(initial_state, |_| {})
    }

    /// [`execute`](Self::execute), reporting each
    /// [`StepEvent`](crate::StepEvent) to `observer`.
    pub fn execute_with<F>(
        &self,
        initial_state: State,
        mut observer: F,
    ) -> Result<crate::run::Run>
    where
        F: FnMut(&crate::stream::StepEvent),
    {
        crate::compiled::execute_graph(self, initial_state, &mut observer)
    }

    /// Validate once and freeze into an immutable, shareable graph.
    pub fn compile(self) -> Result<CompiledGraph> {
        CompiledGraph::new(self)
    }

    fn check_source(&self, from: &str) -> Result<()> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::UnknownNode(from.to_string()));
        }
        if let Some(existing) = self.edges.get(from) {
            return Err(GraphError::invalid_graph(format!(
                "node '{}' already has a {} edge; a node may have only one outgoing edge group",
                from,
                existing.kind()
            )));
        }
        Ok(())
    }

    fn check_destination(&self, to: &Destination) -> Result<()> {
        match to {
            Destination::Node(id) if !self.nodes.contains_key(id) => {
                Err(GraphError::UnknownNode(id.clone()))
            }
            _ => Ok(()),
        }
    }

    fn insert_loop(
        &mut self,
        from: NodeId,
        target: NodeId,
        condition: Predicate,
        max_iterations: Option<usize>,
        exit: Option<NodeId>,
    ) -> Result<&mut Self> {
        let max_iterations = max_iterations.unwrap_or(self.config.default_loop_iterations);
        if max_iterations == 0 {
            return Err(GraphError::invalid_graph(format!(
                "loop on '{}' must allow at least one iteration",
                from
            )));
        }
        if target == END {
            return Err(GraphError::invalid_graph(format!(
                "loop on '{}' must target a node, not '{}'",
                from, END
            )));
        }
        if exit.as_deref() == Some(END) {
            return Err(GraphError::invalid_graph(format!(
                "loop on '{}' cannot exit to '{}'; use add_loop, which ends the run when \
                 the condition is false",
                from, END
            )));
        }
        self.check_source(&from)?;
        self.check_destination(&Destination::Node(target.clone()))?;
        if let Some(exit) = &exit {
            self.check_destination(&Destination::Node(exit.clone()))?;
        }
        self.insert_edge(
            from,
            Edge::Loop(LoopEdge {
                target,
                condition,
                max_iterations,
                exit,
            }),
        );
        Ok(self)
    }

    fn insert_edge(&mut self, from: NodeId, edge: Edge) {
        tracing::debug!(graph = %self.id, from = %from, kind = edge.kind(), "Registered edge");
        self.edges.insert(from, edge);
    }
}
