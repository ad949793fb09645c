//! Error types for graph construction, validation and configuration
//!
//! Structural problems are reported eagerly, at registration time, so a
//! malformed [`Graph`](crate::Graph) can never begin a run. Failures *inside* a
//! node are not returned as errors from `execute`: the engine catches them,
//! records them on the [`Run`](crate::Run) and seals it with status `failed`.
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── DuplicateNode     - node id registered twice
//! ├── UnknownNode       - edge or start node refers to a missing node
//! ├── InvalidGraph      - pre-execution validation failures
//! ├── NodeExecution     - a node failed during a run (carried by the Run)
//! ├── InvalidState      - initial state is not a mapping
//! ├── Configuration     - bad engine configuration
//! ├── Serialization     - JSON errors
//! └── Io                - reading configuration files
//! ```
//!
//! # Matching Specific Errors
//!
//! ```rust
//! use flowgraph_core::{Graph, GraphError, State};
//!
//! let mut graph = Graph::new("demo", "Demo");
//! graph.add_node("a", "A", |_: &State| Ok(State::new())).unwrap();
//!
//! match graph.add_edge("a", "missing") {
//!     Err(GraphError::UnknownNode(id)) => assert_eq!(id, "missing"),
//!     other => panic!("unexpected: {:?}", other.map(|_| ())),
//! }
//! ```

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type returned by node functions.
///
/// Any error type can be boxed into it with `?` or `.into()`.
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node '{0}' is already registered")]
    DuplicateNode(String),

    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("Graph validation failed: {0}")]
    InvalidGraph(String),

    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        node: String,
        error: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }

    pub fn invalid_graph(message: impl Into<String>) -> Self {
        Self::InvalidGraph(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for errors that describe a malformed graph rather than a failed run.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateNode(_) | Self::UnknownNode(_) | Self::InvalidGraph(_)
        )
    }
}
