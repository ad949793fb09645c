//! In-memory run storage
//!
//! [`InMemoryRunRepository`] keeps sealed runs in an `Arc<RwLock<HashMap>>`.
//! Clones share the same storage. Nothing survives a restart.

use crate::error::Result;
use crate::traits::RunRepository;
use async_trait::async_trait;
use flowgraph_core::Run;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory run storage
type RunStorage = Arc<RwLock<HashMap<String, Run>>>;

#[derive(Debug, Clone, Default)]
pub struct InMemoryRunRepository {
    storage: RunStorage,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all runs (useful for testing)
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn save(&self, run: Run) -> Result<()> {
        let mut storage = self.storage.write().await;
        tracing::trace!(run_id = %run.run_id(), graph_id = %run.graph_id(), "Storing run");
        storage.insert(run.run_id().to_string(), run);
        Ok(())
    }

    async fn get(&self, run_id: &str) -> Result<Option<Run>> {
        Ok(self.storage.read().await.get(run_id).cloned())
    }

    async fn list(&self, graph_id: Option<&str>) -> Result<Vec<Run>> {
        let storage = self.storage.read().await;
        let mut runs: Vec<Run> = storage
            .values()
            .filter(|run| graph_id.map_or(true, |id| run.graph_id() == id))
            .cloned()
            .collect();
        runs.sort_by(|a, b| {
            a.started_at()
                .cmp(&b.started_at())
                .then_with(|| a.run_id().cmp(b.run_id()))
        });
        Ok(runs)
    }

    async fn delete(&self, run_id: &str) -> Result<bool> {
        Ok(self.storage.write().await.remove(run_id).is_some())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.storage.read().await.len())
    }
}
