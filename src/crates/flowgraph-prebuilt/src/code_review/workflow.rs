//! Code review graph assembly
//!
//! The four analysis steps are registered as tools and wired into the graph
//! through [`ToolNode`]s. Revision and finalization are plain nodes.

use super::analysis::{self, StepResult};
use crate::error::{PrebuiltError, Result};
use crate::tool_node::ToolNode;
use flowgraph_core::{EngineConfig, Graph, State, Tool, ToolError, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_QUALITY_THRESHOLD: f64 = 75.0;
pub const DEFAULT_MAX_REVISIONS: u64 = 3;

/// Tag attached to every analysis tool.
pub const CODE_REVIEW_TAG: &str = "code-review";

pub const REVIEW_GRAPH_ID: &str = "code_review";
pub const REVIEW_LOOP_GRAPH_ID: &str = "code_review_loop";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeReviewConfig {
    /// Scores below this trigger another revision pass. A
    /// `quality_threshold` key in the initial state takes precedence.
    pub quality_threshold: f64,

    /// Upper bound on revision passes in the loop workflow
    pub max_revisions: u64,

    pub engine: EngineConfig,
}

impl Default for CodeReviewConfig {
    fn default() -> Self {
        Self {
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            max_revisions: DEFAULT_MAX_REVISIONS,
            engine: EngineConfig::default(),
        }
    }
}

impl CodeReviewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    pub fn with_max_revisions(mut self, max_revisions: u64) -> Self {
        self.max_revisions = max_revisions;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.quality_threshold.is_finite() {
            return Err(PrebuiltError::invalid_input(
                "quality_threshold must be a finite number",
            ));
        }
        self.loop_bound()?;
        self.engine.validate()?;
        Ok(())
    }

    /// Passes through `suggest` the revision loop allows: every revision plus
    /// the final check.
    fn loop_bound(&self) -> Result<usize> {
        usize::try_from(self.max_revisions)
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| {
                PrebuiltError::invalid_input(format!(
                    "max_revisions must be below {}, got {}",
                    usize::MAX,
                    self.max_revisions
                ))
            })
    }
}

fn analysis_tool(
    name: &'static str,
    description: &'static str,
    step: fn(&State) -> StepResult,
) -> Tool {
    Tool::new(name, description, move |args: &Value| {
        let state = args
            .as_object()
            .ok_or_else(|| ToolError::invalid_arguments(name, "expected a JSON object"))?;
        step(state)
            .map(Value::Object)
            .map_err(|e| ToolError::execution(name, e.to_string()))
    })
    .with_tags([CODE_REVIEW_TAG])
}

/// Registry holding the four analysis tools, tagged `code-review`.
pub fn analysis_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(analysis_tool(
            "extract_functions",
            "Extracts function definitions from Python code",
            analysis::extract_functions,
        ))
        .register(analysis_tool(
            "check_complexity",
            "Analyzes function complexity",
            analysis::check_complexity,
        ))
        .register(analysis_tool(
            "detect_issues",
            "Detects common code quality issues",
            analysis::detect_issues,
        ))
        .register(analysis_tool(
            "suggest_improvements",
            "Generates improvement suggestions",
            analysis::suggest_improvements,
        ));
    registry
}

fn add_analysis_nodes(graph: &mut Graph, registry: &Arc<ToolRegistry>) -> Result<()> {
    let steps = [
        ("extract", "Extract Functions", "extract_functions"),
        ("check", "Check Complexity", "check_complexity"),
        ("detect", "Detect Issues", "detect_issues"),
        ("suggest", "Suggest Improvements", "suggest_improvements"),
    ];
    for (id, label, tool) in steps {
        graph.add_node_with_executor(
            id,
            label,
            ToolNode::new(Arc::clone(registry), tool).into_executor(),
        )?;
    }
    graph
        .add_node("finalize", "Finalize Review", analysis::finalize_review)?
        .add_edge("extract", "check")?
        .add_edge("check", "detect")?
        .add_edge("detect", "suggest")?
        .set_start_node("extract")?;
    Ok(())
}

/// Single pass: extract, check, detect, suggest, finalize.
pub fn code_review_graph(config: &CodeReviewConfig) -> Result<Graph> {
    config.validate()?;
    let registry = Arc::new(analysis_tools());

    let mut graph =
        Graph::new(REVIEW_GRAPH_ID, "Code Review").with_config(config.engine.clone());
    add_analysis_nodes(&mut graph, &registry)?;
    graph.add_edge("suggest", "finalize")?;
    Ok(graph)
}

/// Review with revision passes.
///
/// After `suggest`, the run goes through `revise` and back to `extract` while
/// the score is below the threshold and fewer than `max_revisions` revisions
/// have happened. Otherwise it exits to `finalize`.
pub fn code_review_loop_graph(config: &CodeReviewConfig) -> Result<Graph> {
    config.validate()?;
    let bound = config.loop_bound()?;
    let registry = Arc::new(analysis_tools());
    let fallback_threshold = config.quality_threshold;
    let max_revisions = config.max_revisions;

    let mut graph = Graph::new(REVIEW_LOOP_GRAPH_ID, "Code Review with Revisions")
        .with_config(config.engine.clone());
    add_analysis_nodes(&mut graph, &registry)?;
    graph
        .add_node("revise", "Revise Code", analysis::revise)?
        .add_edge("revise", "extract")?
        .add_loop_with_exit(
            "suggest",
            "revise",
            move |state: &State| {
                needs_revision(state, fallback_threshold, max_revisions)
            },
            Some(bound),
            "finalize",
        )?;
    Ok(graph)
}

fn needs_revision(state: &State, fallback_threshold: f64, max_revisions: u64) -> bool {
    let score = state
        .get("quality_score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let threshold = state
        .get("quality_threshold")
        .and_then(Value::as_f64)
        .unwrap_or(fallback_threshold);
    let iteration = state.get("iteration").and_then(Value::as_u64).unwrap_or(0);
    score < threshold && iteration < max_revisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgraph_core::{Edge, RunStatus};
    use serde_json::json;

    #[test]
    fn test_analysis_tools_are_tagged() {
        let registry = analysis_tools();
        assert_eq!(
            registry.tool_names(),
            vec![
                "check_complexity",
                "detect_issues",
                "extract_functions",
                "suggest_improvements"
            ]
        );
        for info in registry.list_tools().values() {
            assert_eq!(info.tags, vec![CODE_REVIEW_TAG.to_string()]);
        }
    }

    #[test]
    fn test_tool_rejects_non_object_arguments() {
        let err = analysis_tools()
            .call("extract_functions", &json!("def f(): pass"))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_loop_graph_structure() {
        let graph = code_review_loop_graph(&CodeReviewConfig::default()).unwrap();
        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.start_node(), Some("extract"));
        match graph.edge("suggest") {
            Some(Edge::Loop(edge)) => {
                assert_eq!(edge.target, "revise");
                assert_eq!(edge.max_iterations, 4);
                assert_eq!(edge.exit.as_deref(), Some("finalize"));
            }
            other => panic!("unexpected edge: {:?}", other.map(|e| e.kind())),
        }
    }

    #[test]
    fn test_state_threshold_overrides_config() {
        let mut state = State::new();
        state.insert("quality_score".into(), json!(80.0));
        assert!(!needs_revision(&state, 75.0, 3));

        state.insert("quality_threshold".into(), json!(90));
        assert!(needs_revision(&state, 75.0, 3));

        state.insert("iteration".into(), json!(3));
        assert!(!needs_revision(&state, 75.0, 3));
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        let config = CodeReviewConfig::default().with_quality_threshold(f64::NAN);
        assert!(matches!(
            code_review_graph(&config),
            Err(PrebuiltError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unbounded_revisions_rejected() {
        let config = CodeReviewConfig::default().with_max_revisions(u64::MAX);
        let err = code_review_loop_graph(&config).unwrap_err();
        assert!(
            matches!(err, PrebuiltError::InvalidInput(ref m) if m.contains("max_revisions")),
            "{}",
            err
        );

        let config = CodeReviewConfig::default().with_max_revisions(1_000);
        match code_review_loop_graph(&config).unwrap().edge("suggest") {
            Some(Edge::Loop(edge)) => assert_eq!(edge.max_iterations, 1_001),
            other => panic!("expected loop edge, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_config_is_carried() {
        let config = CodeReviewConfig::default()
            .with_engine(EngineConfig::default().with_max_steps(3));
        let graph = code_review_graph(&config).unwrap();
        assert_eq!(graph.config().max_steps, 3);

        let mut state = State::new();
        state.insert("code".into(), json!("def f(): pass"));
        let run = graph.execute(state).unwrap();
        assert_eq!(run.status(), RunStatus::AbortedMaxSteps);
        assert_eq!(run.steps().len(), 3);
    }
}
