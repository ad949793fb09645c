//! Graph execution (the traversal loop)
//!
//! This module contains the engine that walks a validated graph and produces
//! a sealed [`Run`], reporting each step to an optional observer.

use super::CompiledGraph;
use crate::error::{GraphError, Result};
use crate::graph::{Destination, Edge, Graph, NodeId, NodeSpec};
use crate::run::{AbortReason, Run, RunError, RunRecorder, Step, StepOutcome};
use crate::state::{merge, State};
use crate::stream::StepEvent;
use chrono::Utc;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

impl CompiledGraph {
    /// Execute the graph once with the given initial state.
    ///
    /// The graph was validated at compile time, so this always returns a
    /// sealed [`Run`]; inspect [`Run::status`] to learn how it ended.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowgraph_core::{Graph, RunStatus, State};
    /// use serde_json::json;
    ///
    /// let mut graph = Graph::new("counter", "Counter");
    /// graph
    ///     .add_node("inc", "Increment", |state: &State| {
    ///         let n = state.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
    ///         let mut update = State::new();
    ///         update.insert("n".into(), json!(n + 1));
    ///         Ok(update)
    ///     })?
    ///     .set_start_node("inc")?;
    ///
    /// let compiled = graph.compile()?;
    /// let first = compiled.execute(State::new());
    /// let second = compiled.execute(State::new());
    ///
    /// assert_eq!(first.status(), RunStatus::Completed);
    /// assert_eq!(first.final_state()["n"], json!(1));
    /// assert_eq!(second.final_state()["n"], json!(1));
    /// assert_ne!(first.run_id(), second.run_id());
    /// # Ok::<(), flowgraph_core::GraphError>(())
    /// ```
    pub fn execute(&self, initial_state: State) -> Run {
        self.execute_with(initial_state, |_| {})
    }

    /// Execute once, passing every [`StepEvent`] to `observer` as it happens.
    pub fn execute_with<F>(&self, initial_state: State, mut observer: F) -> Run
    where
        F: FnMut(&StepEvent),
    {
        let recorder = RunRecorder::new(self.graph.id());
        self.run_recorded(recorder, initial_state, &mut observer)
    }

    /// Execute under a run id chosen by the caller, typically the id of a
    /// [`Run::running`] placeholder.
    pub fn execute_as<F>(
        &self,
        run_id: impl Into<String>,
        initial_state: State,
        mut observer: F,
    ) -> Run
    where
        F: FnMut(&StepEvent),
    {
        let recorder = RunRecorder::with_run_id(self.graph.id(), run_id.into());
        self.run_recorded(recorder, initial_state, &mut observer)
    }

    fn run_recorded(
        &self,
        recorder: RunRecorder,
        initial_state: State,
        observer: &mut dyn FnMut(&StepEvent),
    ) -> Run {
        // Compilation guarantees a registered start node.
        let start = self.graph.start_node().unwrap_or_default().to_string();
        Executor::new(&self.graph, observer).run(recorder, start, initial_state)
    }
}

/// Validate `graph` and execute it once.
pub(crate) fn execute_graph(
    graph: &Graph,
    initial_state: State,
    observer: &mut dyn FnMut(&StepEvent),
) -> Result<Run> {
    graph.validate()?;
    let start = graph
        .start_node()
        .ok_or_else(|| GraphError::invalid_graph("start node is not set"))?
        .to_string();
    let recorder = RunRecorder::new(graph.id());
    Ok(Executor::new(graph, observer).run(recorder, start, initial_state))
}

/// Routing decision taken after a node completes.
#[derive(Debug, PartialEq, Eq)]
enum Transition {
    Next(NodeId),
    Complete,
    Abort(AbortReason),
}

impl From<&Destination> for Transition {
    fn from(destination: &Destination) -> Self {
        match destination {
            Destination::Node(id) => Transition::Next(id.clone()),
            Destination::End => Transition::Complete,
        }
    }
}

/// Per-run traversal state. Owns everything that changes during a run.
struct Executor<'g, 'o> {
    graph: &'g Graph,
    max_steps: usize,
    /// Loop-backs taken so far, keyed by the loop edge's source node
    loop_counters: HashMap<NodeId, usize>,
    observer: &'o mut dyn FnMut(&StepEvent),
}

impl<'g, 'o> Executor<'g, 'o> {
    fn new(graph: &'g Graph, observer: &'o mut dyn FnMut(&StepEvent)) -> Self {
        Self {
            graph,
            max_steps: graph.config().max_steps,
            loop_counters: HashMap::new(),
            observer,
        }
    }

    fn emit(&mut self, event: StepEvent) {
        (self.observer)(&event);
    }

    fn run(mut self, mut recorder: RunRecorder, start: NodeId, initial_state: State) -> Run {
        recorder.start(&initial_state);
        let run_id = recorder.run_id().to_string();

        let span = tracing::info_span!("run", run_id = %run_id, graph_id = %self.graph.id());
        let _entered = span.enter();
        info!(start = %start, "Starting run");
        self.emit(StepEvent::Started {
            run_id: run_id.clone(),
            graph_id: self.graph.id().to_string(),
            start_node: start.clone(),
        });

        let run = self.traverse(recorder, &run_id, start, initial_state);

        info!(status = %run.status(), steps = run.steps().len(), "Run sealed");
        self.emit(StepEvent::Finished {
            run_id,
            status: run.status(),
            steps: run.steps().len(),
            abort_reason: run.abort_reason().cloned(),
        });
        run
    }

    fn traverse(
        &mut self,
        mut recorder: RunRecorder,
        run_id: &str,
        start: NodeId,
        initial_state: State,
    ) -> Run {
        let graph = self.graph;
        let mut state = initial_state;
        let mut current = start;
        let mut step_count = 0usize;

        loop {
            if step_count >= self.max_steps {
                warn!(max_steps = self.max_steps, "Step guard exhausted, aborting run");
                return recorder.abort(
                    state,
                    AbortReason::StepLimit {
                        max_steps: self.max_steps,
                    },
                );
            }

            let Some(node) = graph.node(&current) else {
                // Unreachable for validated graphs; fail the run rather than panic.
                let error = RunError {
                    node: current.clone(),
                    message: "node is not registered".to_string(),
                };
                warn!(node = %current, "Routed to unregistered node");
                return recorder.fail(state, error);
            };

            let index = recorder.next_index();
            self.emit(StepEvent::StepStarted {
                run_id: run_id.to_string(),
                index,
                node_id: node.id.clone(),
                label: node.label.clone(),
            });

            let timestamp = Utc::now();
            let started = Instant::now();
            let outcome = invoke(node, &state);

            // Routing panics are treated like node failures: no partial output applied.
            let routed = outcome.and_then(|update| {
                let mut next_state = state.clone();
                merge(&mut next_state, update.clone());
                let transition =
                    panic::catch_unwind(AssertUnwindSafe(|| self.route(&current, &next_state)))
                        .map_err(|payload| {
                            format!("routing panicked: {}", panic_message(payload.as_ref()))
                        })?;
                Ok((update, next_state, transition))
            });
            let duration_ms = started.elapsed().as_millis() as u64;

            match routed {
                Err(message) => {
                    warn!(node = %current, step = index, error = %message, "Node execution failed");
                    self.emit(StepEvent::StepFailed {
                        run_id: run_id.to_string(),
                        index,
                        node_id: node.id.clone(),
                        error: message.clone(),
                    });
                    recorder.record(Step {
                        index,
                        node_id: node.id.clone(),
                        label: node.label.clone(),
                        state_before: state.clone(),
                        update: State::new(),
                        next: None,
                        timestamp,
                        duration_ms,
                        outcome: StepOutcome::Failed,
                        error: Some(message.clone()),
                    });
                    return recorder.fail(
                        state,
                        RunError {
                            node: current,
                            message,
                        },
                    );
                }
                Ok((update, next_state, transition)) => {
                    let next = match &transition {
                        Transition::Next(id) => Some(id.clone()),
                        _ => None,
                    };
                    debug!(
                        node = %current,
                        step = index,
                        updated = update.len(),
                        next = next.as_deref().unwrap_or("-"),
                        "Step completed"
                    );
                    self.emit(StepEvent::StepCompleted {
                        run_id: run_id.to_string(),
                        index,
                        node_id: node.id.clone(),
                        update: update.clone(),
                        next: next.clone(),
                        duration_ms,
                    });
                    recorder.record(Step {
                        index,
                        node_id: node.id.clone(),
                        label: node.label.clone(),
                        state_before: std::mem::replace(&mut state, next_state),
                        update,
                        next,
                        timestamp,
                        duration_ms,
                        outcome: StepOutcome::Completed,
                        error: None,
                    });
                    step_count += 1;

                    match transition {
                        Transition::Next(id) => current = id,
                        Transition::Complete => return recorder.complete(state),
                        Transition::Abort(reason) => {
                            warn!(reason = %reason, "Loop guard exhausted, aborting run");
                            return recorder.abort(state, reason);
                        }
                    }
                }
            }
        }
    }

    /// Pick the next node from `from`'s outgoing edge group.
    fn route(&mut self, from: &str, state: &State) -> Transition {
        let Some(edge) = self.graph.edge(from) else {
            return Transition::Complete;
        };

        match edge {
            Edge::Direct(to) => Transition::from(to),
            Edge::Conditional { branches, default } => {
                let destination = branches
                    .iter()
                    .find(|branch| (branch.condition)(state))
                    .map(|branch| &branch.destination)
                    .unwrap_or(default);
                Transition::from(destination)
            }
            Edge::Loop(edge) => {
                if !(edge.condition)(state) {
                    return match &edge.exit {
                        Some(exit) => Transition::Next(exit.clone()),
                        None => Transition::Complete,
                    };
                }

                // The first pass through the body counts towards the bound.
                let taken = self.loop_counters.entry(from.to_string()).or_insert(0);
                if *taken + 1 < edge.max_iterations {
                    *taken += 1;
                    Transition::Next(edge.target.clone())
                } else {
                    Transition::Abort(AbortReason::LoopLimit {
                        node: from.to_string(),
                        max_iterations: edge.max_iterations,
                    })
                }
            }
        }
    }
}

/// Run a node, converting both errors and panics into a message.
fn invoke(node: &NodeSpec, state: &State) -> std::result::Result<State, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| node.executor.run(state))) {
        Ok(Ok(update)) => Ok(update),
        Ok(Err(error)) => Err(error.to_string()),
        Err(payload) => Err(format!("node panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
