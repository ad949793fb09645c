//! Compiled graphs and the execution engine
//!
//! A [`Graph`](crate::Graph) is validated once and frozen into a
//! [`CompiledGraph`]: an immutable, cheaply clonable handle that can be shared
//! across threads and executed any number of times. Every execution owns its
//! own working state, step counter and loop counters; the graph itself holds
//! no execution-local state.
//!
//! # Execution Model
//!
//! Execution is synchronous and single-threaded: one node runs at a time and
//! runs to completion before the engine routes to the next. After each node:
//!
//! 1. its partial update is shallow-merged into the working state
//! 2. the node's outgoing edge group is evaluated against the merged state
//! 3. a [`Step`](crate::Step) is appended to the run trace
//!
//! Two guards bound graph-level non-termination: the global step cap
//! (`EngineConfig::max_steps`) and each loop edge's `max_iterations`.
//! Exhausting either seals the run as `aborted-max-steps`.
//!
//! # Key Types
//!
//! - [`CompiledGraph`] - The executable graph
//! - [`GraphDescription`] - Serializable structure summary

mod execution;
mod graph;
mod introspection;

pub use graph::CompiledGraph;
pub use introspection::{EdgeDescription, GraphDescription, NodeDescription};

pub(crate) use execution::execute_graph;
