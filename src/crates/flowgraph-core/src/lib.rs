//! # flowgraph-core - Directed-Graph Workflow Execution
//!
//! Build a workflow as a directed graph of named nodes, then execute it
//! against a shared JSON state and get back a complete, replayable trace.
//!
//! ## Core Concepts
//!
//! - **Nodes** are functions `Fn(&State) -> Result<State, NodeError>` that
//!   return a *partial update*. The engine shallow-merges each update into the
//!   working state: returned keys overwrite, absent keys are preserved.
//! - **Edges** come in three kinds, at most one group per source node:
//!   - [`Edge::Direct`] always moves to one destination
//!   - [`Edge::Conditional`] evaluates ordered predicates, first match wins,
//!     with a default destination otherwise
//!   - [`Edge::Loop`] returns to an earlier node while a predicate holds,
//!     bounded by `max_iterations`
//! - A node with no outgoing edge, or an edge leading to [`END`], completes
//!   the run.
//! - Every execution produces a [`Run`]: ordered [`Step`]s with pre-state
//!   snapshots and partial updates, final state and status.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgraph_core::{Graph, RunStatus, State};
//! use serde_json::json;
//!
//! let mut graph = Graph::new("counter", "Counter");
//! graph
//!     .add_node("increment", "Increment", |state: &State| {
//!         let count = state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
//!         let mut update = State::new();
//!         update.insert("count".into(), json!(count + 1));
//!         Ok(update)
//!     })?
//!     .add_loop("increment", "increment", |state: &State| {
//!         state.get("count").and_then(|v| v.as_i64()).unwrap_or(0) < 3
//!     }, Some(10))?
//!     .set_start_node("increment")?;
//!
//! let run = graph.execute(State::new())?;
//! assert_eq!(run.status(), RunStatus::Completed);
//! assert_eq!(run.final_state()["count"], json!(3));
//! assert_eq!(run.steps().len(), 3);
//! # Ok::<(), flowgraph_core::GraphError>(())
//! ```
//!
//! ## Guards
//!
//! Two guards bound non-termination at the graph level:
//!
//! - [`EngineConfig::max_steps`] caps the number of node executions per run
//! - each loop edge's `max_iterations` caps the passes through its body
//!
//! Exhausting either seals the run with [`RunStatus::AbortedMaxSteps`] and an
//! [`AbortReason`]. Guard exhaustion is a run outcome, not an error.
//!
//! ## Failures
//!
//! Node errors and panics are contained per node. The failing step is
//! recorded with [`StepOutcome::Failed`], the run is sealed
//! [`RunStatus::Failed`] and its final state is the state before the failing
//! node. [`Graph::execute`] only returns `Err` for structural problems found
//! before any node runs.
//!
//! ## Sharing
//!
//! [`Graph::compile`] validates once and returns a [`CompiledGraph`], a cheap
//! `Arc` handle that is `Send + Sync` and can execute many runs concurrently.
//! Each run owns its own state, step counter and loop counters.
//!
//! ## Observing runs
//!
//! [`CompiledGraph::execute_with`] takes an observer that receives a
//! [`StepEvent`] when the run starts, around every step and when it is
//! sealed.

pub mod compiled;
pub mod config;
pub mod error;
pub mod graph;
pub mod run;
pub mod state;
pub mod stream;
pub mod tool;
pub mod visualization;

pub use compiled::{CompiledGraph, EdgeDescription, GraphDescription, NodeDescription};
pub use config::EngineConfig;
pub use error::{GraphError, NodeError, Result};
pub use graph::{
    Branch, Destination, Edge, Graph, LoopEdge, NodeExecutor, NodeFn, NodeId, NodeSpec,
    Predicate, END,
};
pub use run::{AbortReason, Run, RunError, RunStatus, Step, StepOutcome};
pub use state::State;
pub use stream::StepEvent;
pub use tool::{Tool, ToolError, ToolInfo, ToolRegistry};
pub use visualization::{visualize, VisualizationFormat, VisualizationOptions};
