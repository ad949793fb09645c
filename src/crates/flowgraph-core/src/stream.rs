//! Step events emitted while a run executes
//!
//! Pass an observer to [`CompiledGraph::execute_with`] (or
//! [`Graph::execute_with`]) to watch a run as it happens. Every run emits, in
//! order:
//!
//! ```text
//! started
//! step_started ─┬─▶ step_completed ─▶ (next step_started ...)
//!               └─▶ step_failed
//! finished
//! ```
//!
//! `finished` is always the last event and carries the sealed status. A run
//! stopped by a guard emits `finished` right after its last
//! `step_completed`.
//!
//! [`CompiledGraph::execute_with`]: crate::CompiledGraph::execute_with
//! [`Graph::execute_with`]: crate::Graph::execute_with

use crate::graph::NodeId;
use crate::run::{AbortReason, RunStatus};
use crate::state::State;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StepEvent {
    Started {
        run_id: String,
        graph_id: String,
        start_node: NodeId,
    },

    /// A node is about to execute
    StepStarted {
        run_id: String,
        index: usize,
        node_id: NodeId,
        label: String,
    },

    /// A node returned; `update` is its partial update
    StepCompleted {
        run_id: String,
        index: usize,
        node_id: NodeId,
        update: State,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next: Option<NodeId>,
        duration_ms: u64,
    },

    StepFailed {
        run_id: String,
        index: usize,
        node_id: NodeId,
        error: String,
    },

    /// The run was sealed
    Finished {
        run_id: String,
        status: RunStatus,
        steps: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        abort_reason: Option<AbortReason>,
    },
}

impl StepEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::Started { run_id, .. }
            | Self::StepStarted { run_id, .. }
            | Self::StepCompleted { run_id, .. }
            | Self::StepFailed { run_id, .. }
            | Self::Finished { run_id, .. } => run_id,
        }
    }

    /// Wire name of the event, as used in the `event` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::StepStarted { .. } => "step_started",
            Self::StepCompleted { .. } => "step_completed",
            Self::StepFailed { .. } => "step_failed",
            Self::Finished { .. } => "finished",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}
