//! Run records: the replayable trace of one execution
//!
//! A [`Run`] is produced by the engine and is sealed by the time a caller sees
//! it. Its lifecycle is:
//!
//! ```text
//! pending ──▶ running ──┬──▶ completed
//!                       ├──▶ failed
//!                       └──▶ aborted-max-steps
//! ```
//!
//! `running` is the only non-terminal state the engine passes through; the
//! internal recorder appends one [`Step`] per node execution and is consumed
//! when it seals the run, so a sealed run cannot be appended to.
//!
//! Each step stores the full state *before* the node ran together with the
//! partial update it returned, so the state at any point of the run can be
//! reconstructed with [`Run::state_before`] and [`Run::state_after`].

use crate::error::GraphError;
use crate::graph::NodeId;
use crate::state::{merge, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    AbortedMaxSteps,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::AbortedMaxSteps)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::AbortedMaxSteps => "aborted-max-steps",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed,
}

/// Which guard stopped a run that did not converge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "guard", rename_all = "snake_case")]
pub enum AbortReason {
    /// The global step cap was reached
    StepLimit { max_steps: usize },

    /// A loop edge's predicate still held after its last permitted pass
    LoopLimit { node: NodeId, max_iterations: usize },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepLimit { max_steps } => {
                write!(f, "step limit of {} reached", max_steps)
            }
            Self::LoopLimit {
                node,
                max_iterations,
            } => write!(
                f,
                "loop on '{}' still active after {} iterations",
                node, max_iterations
            ),
        }
    }
}

/// Failure that ended a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub node: NodeId,
    pub message: String,
}

impl RunError {
    pub fn to_graph_error(&self) -> GraphError {
        GraphError::node_execution(self.node.clone(), self.message.clone())
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node '{}' failed: {}", self.node, self.message)
    }
}

/// One node execution within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Zero-based position in the run
    pub index: usize,

    pub node_id: NodeId,

    pub label: String,

    /// Full state snapshot taken before the node executed
    pub state_before: State,

    /// Partial update returned by the node (empty for failed steps)
    pub update: State,

    /// Node chosen by routing, `None` when the run ended here
    pub next: Option<NodeId>,

    pub timestamp: DateTime<Utc>,

    pub duration_ms: u64,

    pub outcome: StepOutcome,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Step {
    /// State after this step's update was applied.
    pub fn state_after(&self) -> State {
        let mut state = self.state_before.clone();
        if self.outcome == StepOutcome::Completed {
            merge(&mut state, self.update.clone());
        }
        state
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == StepOutcome::Failed
    }
}

/// Sealed record of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    run_id: String,
    graph_id: String,
    status: RunStatus,
    steps: Vec<Step>,
    initial_state: State,
    final_state: State,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    abort_reason: Option<AbortReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<RunError>,
    started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ended_at: Option<DateTime<Utc>>,
}

impl Run {
    /// Placeholder for a run that has been accepted but not sealed yet.
    ///
    /// The placeholder has status [`RunStatus::Running`], no steps, and the
    /// initial state as its final state. Execute it with
    /// [`CompiledGraph::execute_as`](crate::CompiledGraph::execute_as) so the
    /// sealed run keeps the same id.
    pub fn running(graph_id: impl Into<String>, initial_state: State) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            graph_id: graph_id.into(),
            status: RunStatus::Running,
            steps: Vec::new(),
            final_state: initial_state.clone(),
            initial_state,
            abort_reason: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Seal an unfinished run as failed. Sealed runs are returned unchanged.
    pub fn interrupt(mut self, error: RunError) -> Self {
        if self.status.is_terminal() {
            return self;
        }
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.ended_at = Some(Utc::now());
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    pub fn final_state(&self) -> &State {
        &self.final_state
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.abort_reason.as_ref()
    }

    pub fn error(&self) -> Option<&RunError> {
        self.error.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// `None` while the run is still in progress.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Elapsed time so far for unfinished runs.
    pub fn duration(&self) -> Duration {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).to_std().unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Node ids in execution order.
    pub fn visited_nodes(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.node_id.as_str()).collect()
    }

    /// How many times `node_id` executed.
    pub fn executions_of(&self, node_id: &str) -> usize {
        self.steps.iter().filter(|s| s.node_id == node_id).count()
    }

    pub fn state_before(&self, index: usize) -> Option<&State> {
        self.steps.get(index).map(|s| &s.state_before)
    }

    pub fn state_after(&self, index: usize) -> Option<State> {
        self.steps.get(index).map(Step::state_after)
    }

    /// Convert a failed run into its [`GraphError::NodeExecution`].
    pub fn into_result(self) -> crate::error::Result<Self> {
        match &self.error {
            Some(error) => Err(error.to_graph_error()),
            None => Ok(self),
        }
    }
}

/// Append-only builder owned by the engine for the duration of one run.
#[derive(Debug)]
pub(crate) struct RunRecorder {
    run_id: String,
    graph_id: String,
    status: RunStatus,
    steps: Vec<Step>,
    initial_state: State,
    started_at: DateTime<Utc>,
}

impl RunRecorder {
    pub(crate) fn new(graph_id: &str) -> Self {
        Self::with_run_id(graph_id, uuid::Uuid::new_v4().to_string())
    }

    pub(crate) fn with_run_id(graph_id: &str, run_id: String) -> Self {
        Self {
            run_id,
            graph_id: graph_id.to_string(),
            status: RunStatus::Pending,
            steps: Vec::new(),
            initial_state: State::new(),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn start(&mut self, initial_state: &State) {
        debug_assert_eq!(self.status, RunStatus::Pending);
        self.initial_state = initial_state.clone();
        self.started_at = Utc::now();
        self.status = RunStatus::Running;
    }

    pub(crate) fn run_id(&self) -> &str {
        &self.run_id
    }

    pub(crate) fn next_index(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn record(&mut self, step: Step) {
        debug_assert_eq!(self.status, RunStatus::Running);
        self.steps.push(step);
    }

    pub(crate) fn complete(self, final_state: State) -> Run {
        self.seal(RunStatus::Completed, final_state, None, None)
    }

    pub(crate) fn fail(self, final_state: State, error: RunError) -> Run {
        self.seal(RunStatus::Failed, final_state, None, Some(error))
    }

    pub(crate) fn abort(self, final_state: State, reason: AbortReason) -> Run {
        self.seal(RunStatus::AbortedMaxSteps, final_state, Some(reason), None)
    }

    fn seal(
        self,
        status: RunStatus,
        final_state: State,
        abort_reason: Option<AbortReason>,
        error: Option<RunError>,
    ) -> Run {
        debug_assert!(status.is_terminal());
        Run {
            run_id: self.run_id,
            graph_id: self.graph_id,
            status,
            steps: self.steps,
            initial_state: self.initial_state,
            final_state,
            abort_reason,
            error,
            started_at: self.started_at,
            ended_at: Some(Utc::now()),
        }
    }
}
