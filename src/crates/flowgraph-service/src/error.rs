//! Error types for service operations

use flowgraph_core::GraphError;
use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that can occur while registering, executing or looking up runs
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No graph registered under this id
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    /// No run stored under this id
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Structural graph error (validation or compilation)
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The run did not finish within the configured wall-clock budget
    #[error("Run of graph '{graph_id}' exceeded {timeout_ms}ms")]
    Timeout { graph_id: String, timeout_ms: u64 },

    /// The blocking worker running the engine panicked or was cancelled
    #[error("Execution worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Run storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid service configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// True for lookups that found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GraphNotFound(_) | Self::RunNotFound(_))
    }
}
