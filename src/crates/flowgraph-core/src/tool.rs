//! Named tool registry
//!
//! Tools are plain synchronous functions over JSON values that node
//! implementations can look up by name. The registry is independent of the
//! execution engine: nodes typically capture an `Arc<ToolRegistry>` and call
//! into it.
//!
//! ```rust
//! use flowgraph_core::tool::{Tool, ToolRegistry};
//! use serde_json::json;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Tool::new("double", "Double a number", |args| {
//!     let x = args["x"].as_i64().unwrap_or(0);
//!     Ok(json!(x * 2))
//! }));
//!
//! assert_eq!(registry.call("double", &json!({"x": 21})).unwrap(), json!(42));
//! assert!(registry.call("missing", &json!({})).is_err());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Tool function type
pub type ToolFn = Arc<dyn Fn(&Value) -> Result<Value, ToolError> + Send + Sync>;

/// Errors that can occur during tool lookup or execution
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolError {
    /// Tool not found in registry
    #[error("Tool '{name}' not found. Available tools: {available}")]
    NotFound { name: String, available: String },

    /// Invalid tool arguments
    #[error("Invalid arguments for tool '{tool}': {error}")]
    InvalidArguments { tool: String, error: String },

    /// Tool execution failed
    #[error("Tool '{tool}' execution failed: {error}")]
    Execution { tool: String, error: String },
}

impl ToolError {
    pub fn invalid_arguments(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            error: error.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Execution {
            tool: tool.into(),
            error: error.into(),
        }
    }
}

/// Tool specification
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub func: ToolFn,
}

impl Tool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            func: Arc::new(func),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Execute the tool with given arguments
    pub fn execute(&self, args: &Value) -> Result<Value, ToolError> {
        (self.func)(args)
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("tags", &self.tags)
            .field("func", &"<function>")
            .finish()
    }
}

/// Listing metadata for a registered tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub description: String,
    pub tags: Vec<String>,
}

/// Tool registry for managing available tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Tool) -> &mut Self {
        if self.tools.contains_key(&tool.name) {
            tracing::debug!(tool = %tool.name, "Replacing registered tool");
        }
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    pub fn unregister(&mut self, name: &str) -> Option<Tool> {
        self.tools.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up `name` and run it with `args`.
    pub fn call(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
            available: self.tool_names().join(", "),
        })?;

        tracing::trace!(tool = %name, "Calling tool");
        tool.execute(args).map_err(|e| {
            tracing::debug!(tool = %name, error = %e, "Tool call failed");
            e
        })
    }

    /// Name to metadata for every registered tool.
    pub fn list_tools(&self) -> BTreeMap<String, ToolInfo> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.info()))
            .collect()
    }
}
