use crate::cli::{DescribeFormat, ReviewArgs, Workflow};
use anyhow::{bail, Context, Result};
use flowgraph_core::config::ENV_PREFIX;
use flowgraph_core::{state, Graph, Run, State, VisualizationFormat, VisualizationOptions};
use flowgraph_prebuilt::{
    analysis_tools, code_review_graph, code_review_loop_graph, CodeReviewConfig,
};
use flowgraph_service::{RunState, ServiceConfig, WorkflowService};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Load the service configuration, then apply `FLOWGRAPH_*` overrides.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let config = match path {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    config
        .apply_env(ENV_PREFIX)
        .context("applying environment overrides")
}

pub fn review_config(service: &ServiceConfig, args: &ReviewArgs) -> CodeReviewConfig {
    let mut config = CodeReviewConfig::default().with_engine(service.engine.clone());
    if let Some(threshold) = args.threshold {
        config = config.with_quality_threshold(threshold);
    }
    if let Some(max_revisions) = args.max_revisions {
        config = config.with_max_revisions(max_revisions);
    }
    config
}

pub fn build_workflow(workflow: Workflow, config: &CodeReviewConfig) -> Result<Graph> {
    let graph = match workflow {
        Workflow::Review => code_review_graph(config)?,
        Workflow::ReviewLoop => code_review_loop_graph(config)?,
    };
    Ok(graph)
}

/// Initial state from `--state`, with `code` taken from `--code` or `--file`.
pub fn initial_state(
    state_json: Option<&str>,
    code: Option<String>,
    file: Option<&PathBuf>,
) -> Result<State> {
    let mut initial = match state_json {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw).context("parsing --state")?;
            state::from_value(value).context("parsing --state")?
        }
        None => State::new(),
    };

    let code = match (code, file) {
        (Some(code), _) => Some(code),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        (None, None) => None,
    };
    if let Some(code) = code {
        initial.insert("code".to_string(), Value::String(code));
    }
    if !initial.contains_key("code") {
        bail!("no code to review: pass --code, --file or a \"code\" key in --state");
    }
    Ok(initial)
}

/// Execute through the service and render the outcome as pretty JSON.
pub async fn run(
    config: ServiceConfig,
    graph: Graph,
    initial: State,
    trace: bool,
) -> Result<(Run, String)> {
    let service = WorkflowService::new(config);
    let description = service.register_graph(graph).await?;
    let run = service.execute(&description.id, initial).await?;

    let rendered = if trace {
        serde_json::to_string_pretty(&run)?
    } else {
        serde_json::to_string_pretty(&RunState::from(&run))?
    };
    Ok((run, rendered))
}

pub fn describe(graph: &Graph, format: DescribeFormat) -> Result<String> {
    let format = match format {
        DescribeFormat::Json => return Ok(serde_json::to_string_pretty(&graph.describe())?),
        DescribeFormat::Dot => VisualizationFormat::Dot,
        DescribeFormat::Mermaid => VisualizationFormat::Mermaid,
        DescribeFormat::Ascii => VisualizationFormat::Ascii,
    };
    Ok(flowgraph_core::visualize(
        graph,
        &VisualizationOptions::new(format),
    ))
}

pub fn list_tools() -> String {
    let mut out = String::new();
    for (name, info) in analysis_tools().list_tools() {
        out.push_str(&format!("{:<22} {}", name, info.description));
        if !info.tags.is_empty() {
            out.push_str(&format!(" [{}]", info.tags.join(", ")));
        }
        out.push('\n');
    }
    out
}
