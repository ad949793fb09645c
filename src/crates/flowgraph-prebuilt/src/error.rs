//! Error types for prebuilt workflows

use flowgraph_core::{GraphError, ToolError};
use thiserror::Error;

/// Result type for prebuilt operations
pub type Result<T> = std::result::Result<T, PrebuiltError>;

#[derive(Error, Debug)]
pub enum PrebuiltError {
    /// Graph construction or validation failed
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Workflow parameters out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PrebuiltError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
