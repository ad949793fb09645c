//! # flowgraph-prebuilt - Ready-made Workflows
//!
//! Workflows assembled from [`flowgraph_core`] building blocks:
//!
//! - **[`ToolNode`]** - a graph node that calls a registered tool with the
//!   current state and merges the object it returns
//! - **[`code_review`]** - heuristic Python code review, as a single pass or
//!   with a bounded revision loop
//!
//! # Quick Start
//!
//! ```rust
//! use flowgraph_core::{RunStatus, State};
//! use flowgraph_prebuilt::{code_review_graph, CodeReviewConfig};
//! use serde_json::json;
//!
//! let graph = code_review_graph(&CodeReviewConfig::default())?;
//!
//! let mut state = State::new();
//! state.insert("code".into(), json!("def hello(): pass"));
//! let run = graph.execute(state)?;
//!
//! assert_eq!(run.status(), RunStatus::Completed);
//! assert_eq!(run.final_state()["final_quality_score"], json!(85.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod code_review;
pub mod error;
pub mod tool_node;

pub use code_review::{
    analysis_tools, code_review_graph, code_review_loop_graph, CodeReviewConfig,
};
pub use error::{PrebuiltError, Result};
pub use tool_node::ToolNode;
