//! # flowgraph-service - Workflow Execution Service
//!
//! In-process service layer on top of `flowgraph-core`:
//!
//! - [`GraphCatalog`] - compiled graphs keyed by graph id
//! - [`RunRepository`] - async storage trait for sealed runs, with
//!   [`InMemoryRunRepository`] as the bundled backend
//! - [`WorkflowService`] - registers graphs, executes them on tokio's
//!   blocking pool under a wall-clock timeout and stores every run. Runs can
//!   be awaited, submitted in the background or streamed step by step.
//!
//! ```rust,no_run
//! use flowgraph_core::{Graph, State};
//! use flowgraph_service::{ServiceConfig, WorkflowService};
//! use std::time::Duration;
//!
//! # async fn demo() -> flowgraph_service::Result<()> {
//! let service = WorkflowService::new(
//!     ServiceConfig::default().with_run_timeout(Duration::from_secs(5)),
//! );
//!
//! let mut graph = Graph::new("hello", "Hello");
//! graph
//!     .add_node("greet", "Greet", |_: &State| {
//!         let mut update = State::new();
//!         update.insert("greeting".into(), "hello".into());
//!         Ok(update)
//!     })?
//!     .set_start_node("greet")?;
//! service.register_graph(graph).await?;
//!
//! let run = service.execute("hello", State::new()).await?;
//! let state = service.get_state(run.run_id()).await?;
//! assert_eq!(state.state["greeting"], "hello");
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod memory;
pub mod service;
pub mod traits;

pub use catalog::GraphCatalog;
pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use memory::InMemoryRunRepository;
pub use service::{RunState, WorkflowService};
pub use traits::RunRepository;
