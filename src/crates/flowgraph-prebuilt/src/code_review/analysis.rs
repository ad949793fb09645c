//! Heuristic Python source analysis steps
//!
//! Each step reads what it needs from the state and returns only the keys it
//! produces. None of them mutate their input.

use flowgraph_core::{NodeError, State};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;

pub type StepResult = Result<State, NodeError>;

/// Complexity is capped at this value per function.
pub const MAX_COMPLEXITY: u64 = 10;

/// Functions scoring above this get a "break it down" suggestion.
pub const HIGH_COMPLEXITY: u64 = 7;

pub const LONG_LINE_CHARS: usize = 100;
pub const MAX_IMPORTS: usize = 10;

pub const ISSUE_MAGIC_NUMBERS: &str = "Magic numbers detected";
pub const ISSUE_LONG_LINES: &str = "Long lines detected";
pub const ISSUE_MISSING_DOCSTRINGS: &str = "Some functions lack docstrings";
pub const ISSUE_TOO_MANY_IMPORTS: &str = "Too many imports";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub function: String,
    pub complexity_score: u64,
}

static FUNCTION_DEF: OnceLock<Regex> = OnceLock::new();
static MAGIC_NUMBER: OnceLock<Regex> = OnceLock::new();

/// Compile `pattern` on first use and reuse it afterwards.
fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex, regex::Error> {
    if let Some(regex) = cell.get() {
        return Ok(regex);
    }
    let regex = Regex::new(pattern)?;
    Ok(cell.get_or_init(|| regex))
}

fn function_def() -> Result<&'static Regex, regex::Error> {
    cached(&FUNCTION_DEF, r"def\s+(\w+)\s*\((.*?)\):")
}

fn magic_number() -> Result<&'static Regex, regex::Error> {
    cached(&MAGIC_NUMBER, r"= \d{2,}")
}

fn code(state: &State) -> &str {
    state.get("code").and_then(Value::as_str).unwrap_or("")
}

fn number(state: &State, key: &str) -> f64 {
    state.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn list_of<T: serde::de::DeserializeOwned>(state: &State, key: &str) -> Result<Vec<T>, NodeError> {
    match state.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| format!("malformed '{}': {}", key, e).into()),
    }
}

fn update(pairs: Vec<(&str, Value)>) -> State {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Find `def name(params):` signatures.
pub fn extract_functions(state: &State) -> StepResult {
    let functions: Vec<FunctionInfo> = function_def()?
        .captures_iter(code(state))
        .map(|caps| FunctionInfo {
            name: caps[1].to_string(),
            params: caps[2]
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        })
        .collect();

    tracing::debug!(functions = functions.len(), "Extracted functions");
    Ok(update(vec![
        ("function_count", json!(functions.len())),
        ("functions", serde_json::to_value(&functions)?),
        ("extraction_done", json!(true)),
    ]))
}

/// Score every extracted function from loop and branch keywords in the source.
///
/// The keyword counts are taken over the whole source, not per function body,
/// so every function in a file receives the same score.
pub fn check_complexity(state: &State) -> StepResult {
    let functions: Vec<FunctionInfo> = list_of(state, "functions")?;
    let source = code(state);

    let loops = (source.matches("for ").count() + source.matches("while ").count()) as u64;
    let branches = (source.matches("if ").count() + source.matches("elif ").count()) as u64;
    let complexity = (1 + loops * 2 + branches).min(MAX_COMPLEXITY);

    let scores: Vec<ComplexityScore> = functions
        .into_iter()
        .map(|f| ComplexityScore {
            function: f.name,
            complexity_score: complexity,
        })
        .collect();

    let avg = if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|s| s.complexity_score as f64).sum::<f64>() / scores.len() as f64
    };

    Ok(update(vec![
        ("complexity_scores", serde_json::to_value(&scores)?),
        ("avg_complexity", json!(avg)),
        ("complexity_check_done", json!(true)),
    ]))
}

/// Flag magic numbers, long lines, missing docstrings and import sprawl.
pub fn detect_issues(state: &State) -> StepResult {
    let source = code(state);
    let mut issues = Vec::new();

    if magic_number()?.is_match(source) {
        issues.push(ISSUE_MAGIC_NUMBERS.to_string());
    }

    let long_lines: Vec<usize> = source
        .split('\n')
        .enumerate()
        .filter(|(_, line)| line.chars().count() > LONG_LINE_CHARS)
        .map(|(i, _)| i)
        .collect();
    if !long_lines.is_empty() {
        issues.push(format!("{} (lines: {:?})", ISSUE_LONG_LINES, long_lines));
    }

    if source.matches("\"\"\"").count() < source.matches("def ").count() {
        issues.push(ISSUE_MISSING_DOCSTRINGS.to_string());
    }

    if source.matches("import ").count() > MAX_IMPORTS {
        issues.push(ISSUE_TOO_MANY_IMPORTS.to_string());
    }

    Ok(update(vec![
        ("issue_count", json!(issues.len())),
        ("detected_issues", json!(issues)),
        ("issues_detected", json!(true)),
    ]))
}

/// `100 - 10 * issues - 5 * avg_complexity`, floored at zero.
pub fn quality_score(issue_count: usize, avg_complexity: f64) -> f64 {
    (100.0 - issue_count as f64 * 10.0 - avg_complexity * 5.0).max(0.0)
}

/// Turn detected issues and complexity into suggestions and a quality score.
pub fn suggest_improvements(state: &State) -> StepResult {
    let scores: Vec<ComplexityScore> = list_of(state, "complexity_scores")?;
    let issues: Vec<String> = list_of(state, "detected_issues")?;

    let mut suggestions: Vec<String> = scores
        .iter()
        .filter(|s| s.complexity_score > HIGH_COMPLEXITY)
        .map(|s| {
            format!(
                "Function '{}' has high complexity. Consider breaking it down.",
                s.function
            )
        })
        .collect();

    let has = |prefix: &str| issues.iter().any(|issue| issue.starts_with(prefix));
    if has(ISSUE_MAGIC_NUMBERS) {
        suggestions.push("Define constants for magic numbers".to_string());
    }
    if has(ISSUE_LONG_LINES) {
        suggestions.push("Break down long lines for readability".to_string());
    }
    if has(ISSUE_MISSING_DOCSTRINGS) {
        suggestions.push("Add docstrings to all functions".to_string());
    }

    let score = quality_score(issues.len(), number(state, "avg_complexity"));
    tracing::debug!(quality_score = score, suggestions = suggestions.len(), "Scored review");

    Ok(update(vec![
        ("suggestions", json!(suggestions)),
        ("quality_score", json!(score)),
        ("improvements_suggested", json!(true)),
    ]))
}

/// Bump the revision counter before another review pass.
pub fn revise(state: &State) -> StepResult {
    let iteration = state.get("iteration").and_then(Value::as_u64).unwrap_or(0);
    Ok(update(vec![("iteration", json!(iteration + 1))]))
}

pub fn finalize_review(state: &State) -> StepResult {
    Ok(update(vec![
        ("final_quality_score", json!(number(state, "quality_score"))),
        ("review_completed", json!(true)),
        (
            "iterations",
            json!(state.get("iteration").and_then(Value::as_u64).unwrap_or(0)),
        ),
    ]))
}
