//! Storage abstraction for sealed runs
//!
//! The engine never persists anything itself; the service hands every sealed
//! [`Run`] to a [`RunRepository`]. [`InMemoryRunRepository`](crate::InMemoryRunRepository)
//! is the bundled implementation. Durable backends implement the same trait:
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use flowgraph_core::Run;
//! use flowgraph_service::{RunRepository, Result};
//!
//! pub struct SqliteRunRepository { /* pool */ }
//!
//! #[async_trait]
//! impl RunRepository for SqliteRunRepository {
//!     async fn save(&self, run: Run) -> Result<()> {
//!         let json = serde_json::to_string(&run)
//!             .map_err(|e| flowgraph_service::ServiceError::storage(e.to_string()))?;
//!         // INSERT OR REPLACE INTO runs (id, graph_id, body) VALUES (?, ?, ?)
//!         Ok(())
//!     }
//!     // ...
//! }
//! ```

use crate::error::Result;
use async_trait::async_trait;
use flowgraph_core::Run;

#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Store a sealed run, replacing any run with the same id.
    async fn save(&self, run: Run) -> Result<()>;

    /// Fetch a run by id, or `None` if it was never stored.
    async fn get(&self, run_id: &str) -> Result<Option<Run>>;

    /// Stored runs ordered by start time, optionally only those of one graph.
    async fn list(&self, graph_id: Option<&str>) -> Result<Vec<Run>>;

    /// Remove a run. Returns whether anything was removed.
    async fn delete(&self, run_id: &str) -> Result<bool>;

    /// Number of stored runs.
    async fn count(&self) -> Result<usize> {
        Ok(self.list(None).await?.len())
    }
}
