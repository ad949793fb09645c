//! Async facade over the engine: graph catalog, execution and run lookup
//!
//! The engine is synchronous, so every run goes to tokio's blocking pool
//! under the configured wall-clock timeout. Three ways to start one:
//!
//! | Method | Returns | Run stored |
//! |--------|---------|------------|
//! | [`execute`](WorkflowService::execute) | the sealed [`Run`] | when sealed |
//! | [`submit`](WorkflowService::submit) | the run id, at once | as `running`, then sealed |
//! | [`execute_stream`](WorkflowService::execute_stream) | a [`StepEvent`] receiver | when sealed |
//!
//! Node code cannot be interrupted. When a run times out the worker finishes
//! in the background and whatever it produces is discarded.

use crate::catalog::GraphCatalog;
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::memory::InMemoryRunRepository;
use crate::traits::RunRepository;
use flowgraph_core::{
    CompiledGraph, EngineConfig, Graph, GraphDescription, NodeId, Run, RunError, RunStatus,
    State, StepEvent,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Final state and outcome of a stored run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub graph_id: String,
    pub status: RunStatus,
    /// False while a submitted run is still executing
    pub is_completed: bool,
    pub state: State,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    pub steps: usize,
}

impl From<&Run> for RunState {
    fn from(run: &Run) -> Self {
        Self {
            run_id: run.run_id().to_string(),
            graph_id: run.graph_id().to_string(),
            status: run.status(),
            is_completed: run.status().is_terminal(),
            state: run.final_state().clone(),
            error: run.error().cloned(),
            steps: run.steps().len(),
        }
    }
}

pub struct WorkflowService {
    catalog: RwLock<GraphCatalog>,
    repository: Arc<dyn RunRepository>,
    config: ServiceConfig,
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("catalog", &self.catalog)
            .field("repository", &"<dyn RunRepository>")
            .field("config", &self.config)
            .finish()
    }
}

impl Default for WorkflowService {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}

impl WorkflowService {
    /// Service backed by an [`InMemoryRunRepository`].
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_repository(config, Arc::new(InMemoryRunRepository::new()))
    }

    pub fn with_repository(config: ServiceConfig, repository: Arc<dyn RunRepository>) -> Self {
        Self {
            catalog: RwLock::new(GraphCatalog::new()),
            repository,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Engine guards for graphs built for this service. Registration rejects
    /// graphs whose step guard is looser than `max_steps` here.
    pub fn engine_config(&self) -> &EngineConfig {
        &self.config.engine
    }

    /// Compile and register a graph under its own id, replacing any graph
    /// already registered with that id.
    pub async fn register_graph(&self, graph: Graph) -> Result<GraphDescription> {
        let compiled = graph.compile()?;
        self.register_compiled(compiled).await
    }

    /// Register an already compiled graph.
    ///
    /// Fails with [`ServiceError::Configuration`] when the graph's
    /// `max_steps` exceeds the service's.
    pub async fn register_compiled(&self, graph: CompiledGraph) -> Result<GraphDescription> {
        let limit = self.config.engine.max_steps;
        if graph.config().max_steps > limit {
            return Err(ServiceError::Configuration(format!(
                "graph '{}' allows {} steps but this service allows at most {}",
                graph.id(),
                graph.config().max_steps,
                limit
            )));
        }

        let description = graph.describe();
        info!(graph_id = %graph.id(), nodes = description.nodes.len(), "Registered graph");
        self.catalog.write().await.register(graph);
        Ok(description)
    }

    pub async fn remove_graph(&self, graph_id: &str) -> Result<()> {
        self.catalog
            .write()
            .await
            .remove(graph_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::GraphNotFound(graph_id.to_string()))
    }

    /// Registered graph ids, sorted.
    pub async fn graph_ids(&self) -> Vec<String> {
        self.catalog.read().await.ids()
    }

    pub async fn describe_graph(&self, graph_id: &str) -> Result<GraphDescription> {
        self.graph(graph_id).await.map(|graph| graph.describe())
    }

    pub async fn list_graphs(&self) -> Vec<GraphDescription> {
        self.catalog.read().await.list()
    }

    async fn graph(&self, graph_id: &str) -> Result<CompiledGraph> {
        self.catalog
            .read()
            .await
            .get(graph_id)
            .ok_or_else(|| ServiceError::GraphNotFound(graph_id.to_string()))
    }

    /// Execute a registered graph and store the sealed run.
    ///
    /// Node failures and guard exhaustion are reported through the returned
    /// run's status. `Err` means the run could not be produced at all:
    /// unknown graph, timeout, worker failure or storage failure.
    pub async fn execute(&self, graph_id: &str, initial_state: State) -> Result<Run> {
        let graph = self.graph(graph_id).await?;
        debug!(graph_id = %graph_id, "Dispatching run to blocking worker");

        let worker = tokio::task::spawn_blocking(move || graph.execute(initial_state));
        let run = run_within(graph_id, self.config.run_timeout(), worker).await?;

        log_finished(&run);
        self.repository.save(run.clone()).await?;
        Ok(run)
    }

    /// Start a run in the background and return its id at once.
    ///
    /// The run is stored straight away with status `running`;
    /// [`get_state`](Self::get_state) reports `is_completed == false` until
    /// the sealed run replaces it. A run that times out or whose worker dies
    /// is stored as failed, blamed on the node that was executing.
    pub async fn submit(&self, graph_id: &str, initial_state: State) -> Result<String> {
        let graph = self.graph(graph_id).await?;
        let placeholder = Run::running(graph.id(), initial_state.clone());
        let run_id = placeholder.run_id().to_string();
        self.repository.save(placeholder.clone()).await?;
        info!(run_id = %run_id, graph_id = %graph_id, "Run submitted");

        let start = graph.graph().start_node().unwrap_or_default().to_string();
        let (current_tx, current_rx) = watch::channel::<NodeId>(start);
        let worker_run_id = run_id.clone();
        let worker = tokio::task::spawn_blocking(move || {
            graph.execute_as(worker_run_id, initial_state, |event: &StepEvent| {
                if let StepEvent::StepStarted { node_id, .. } = event {
                    current_tx.send_replace(node_id.clone());
                }
            })
        });

        let repository = Arc::clone(&self.repository);
        let timeout = self.config.run_timeout();
        let graph_id = graph_id.to_string();
        tokio::spawn(async move {
            let run = match run_within(&graph_id, timeout, worker).await {
                Ok(run) => run,
                Err(err) => placeholder.interrupt(RunError {
                    node: current_rx.borrow().clone(),
                    message: err.to_string(),
                }),
            };
            log_finished(&run);
            if let Err(err) = repository.save(run).await {
                warn!(graph_id = %graph_id, error = %err, "Failed to store submitted run");
            }
        });

        Ok(run_id)
    }

    /// Execute a registered graph and stream its [`StepEvent`]s.
    ///
    /// The receiver yields events as nodes run and closes after `finished`.
    /// If the run exceeds the timeout the receiver closes early, without a
    /// `finished` event, and nothing is stored. Dropping the receiver does
    /// not cancel the run.
    pub async fn execute_stream(
        &self,
        graph_id: &str,
        initial_state: State,
    ) -> Result<mpsc::UnboundedReceiver<StepEvent>> {
        let graph = self.graph(graph_id).await?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (worker_tx, mut worker_rx) = mpsc::unbounded_channel();

        let worker = tokio::task::spawn_blocking(move || {
            graph.execute_with(initial_state, |event: &StepEvent| {
                // The forwarder is gone once the run timed out.
                let _ = worker_tx.send(event.clone());
            })
        });
        let forward = async move {
            while let Some(event) = worker_rx.recv().await {
                let _ = events_tx.send(event);
            }
            worker.await
        };

        let repository = Arc::clone(&self.repository);
        let timeout = self.config.run_timeout();
        let graph_id = graph_id.to_string();
        tokio::spawn(async move {
            match run_within(&graph_id, timeout, forward).await {
                Ok(run) => {
                    log_finished(&run);
                    if let Err(err) = repository.save(run).await {
                        warn!(graph_id = %graph_id, error = %err, "Failed to store streamed run");
                    }
                }
                Err(err) => warn!(graph_id = %graph_id, error = %err, "Streamed run lost"),
            }
        });

        Ok(events_rx)
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Run> {
        self.repository
            .get(run_id)
            .await?
            .ok_or_else(|| ServiceError::RunNotFound(run_id.to_string()))
    }

    /// Stored runs ordered by start time, optionally for one graph only.
    pub async fn list_runs(&self, graph_id: Option<&str>) -> Result<Vec<Run>> {
        self.repository.list(graph_id).await
    }

    pub async fn get_state(&self, run_id: &str) -> Result<RunState> {
        self.get_run(run_id).await.map(|run| RunState::from(&run))
    }

    pub async fn delete_run(&self, run_id: &str) -> Result<()> {
        if self.repository.delete(run_id).await? {
            Ok(())
        } else {
            Err(ServiceError::RunNotFound(run_id.to_string()))
        }
    }
}

/// Await a blocking worker, giving up after `timeout`.
async fn run_within<F>(graph_id: &str, timeout: Option<Duration>, worker: F) -> Result<Run>
where
    F: Future<Output = std::result::Result<Run, JoinError>>,
{
    let Some(timeout) = timeout else {
        return Ok(worker.await?);
    };
    match tokio::time::timeout(timeout, worker).await {
        Ok(joined) => Ok(joined?),
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!(graph_id = %graph_id, timeout_ms, "Run exceeded wall-clock timeout");
            Err(ServiceError::Timeout {
                graph_id: graph_id.to_string(),
                timeout_ms,
            })
        }
    }
}

fn log_finished(run: &Run) {
    info!(
        run_id = %run.run_id(),
        graph_id = %run.graph_id(),
        status = %run.status(),
        steps = run.steps().len(),
        "Run finished"
    );
}
