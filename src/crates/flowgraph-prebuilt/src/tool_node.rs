//! ToolNode - graph node backed by a registered tool
//!
//! A [`ToolNode`] calls one tool from a shared [`ToolRegistry`] with the
//! current state as its JSON argument. The tool must return a JSON object,
//! which becomes the node's partial update.
//!
//! ```rust,ignore
//! let registry = Arc::new(analysis_tools());
//! graph.add_node_with_executor(
//!     "extract",
//!     "Extract Functions",
//!     ToolNode::new(registry.clone(), "extract_functions").into_executor(),
//! )?;
//! ```
//!
//! The tool is resolved on every call, so a registry entry that disappears
//! surfaces as a failed step carrying [`ToolError::NotFound`].

use flowgraph_core::{NodeError, NodeExecutor, NodeFn, State, ToolError, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ToolNode {
    registry: Arc<ToolRegistry>,
    tool: String,
}

impl ToolNode {
    pub fn new(registry: Arc<ToolRegistry>, tool: impl Into<String>) -> Self {
        Self {
            registry,
            tool: tool.into(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn into_executor(self) -> NodeExecutor {
        Arc::new(self)
    }
}

impl NodeFn for ToolNode {
    fn run(&self, state: &State) -> Result<State, NodeError> {
        let args = Value::Object(state.clone());
        match self.registry.call(&self.tool, &args)? {
            Value::Object(update) => Ok(update),
            other => Err(ToolError::execution(
                self.tool.clone(),
                format!("expected an object update, got {}", json_kind(&other)),
            )
            .into()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
