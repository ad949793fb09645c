//! Integration tests for the flowgraph binary
//!
//! Each test runs the built binary with a scratch directory for inputs.

use serde_json::{json, Value};
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn flowgraph(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flowgraph"))
        .args(args)
        .env_remove("FLOWGRAPH_CONFIG")
        .env_remove("FLOWGRAPH_MAX_STEPS")
        .env_remove("FLOWGRAPH_QUALITY_THRESHOLD")
        .env_remove("FLOWGRAPH_MAX_REVISIONS")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch flowgraph")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_run_review_from_file() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("hello.py");
    fs::write(&source, "def hello():\n    \"\"\"Greet.\"\"\"\n    return 1\n").unwrap();

    let output = flowgraph(&["run", "review", "--file", source.to_str().unwrap()]);
    assert!(output.status.success());

    let result = stdout_json(&output);
    assert_eq!(result["status"], json!("completed"));
    assert_eq!(result["steps"], json!(5));
    assert_eq!(result["state"]["final_quality_score"], json!(95.0));
}

#[test]
fn test_run_with_trace() {
    let output = flowgraph(&["run", "review", "--code", "def hello(): pass", "--trace"]);
    assert!(output.status.success());

    let run = stdout_json(&output);
    let steps = run["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 5);
    assert_eq!(steps[0]["node_id"], json!("extract"));
    assert_eq!(steps[4]["node_id"], json!("finalize"));
}

#[test]
fn test_config_file_step_guard_fails_run() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("flowgraph.toml");
    fs::write(&config, "[engine]\nmax_steps = 2\n").unwrap();

    let output = flowgraph(&[
        "--config",
        config.to_str().unwrap(),
        "run",
        "review",
        "--code",
        "def hello(): pass",
    ]);
    assert!(!output.status.success());

    let result = stdout_json(&output);
    assert_eq!(result["status"], json!("aborted-max-steps"));
    assert_eq!(result["steps"], json!(2));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("flowgraph.toml");
    fs::write(&config, "[engine]\nmax_steps = 0\n").unwrap();

    let output = flowgraph(&[
        "--config",
        config.to_str().unwrap(),
        "run",
        "review",
        "--code",
        "x = 1",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_steps"), "stderr: {}", stderr);
}

#[test]
fn test_review_loop_honours_threshold_flag() {
    let output = flowgraph(&[
        "run",
        "review-loop",
        "--code",
        "def hello(): pass",
        "--threshold",
        "90",
        "--max-revisions",
        "2",
    ]);
    assert!(output.status.success());

    let result = stdout_json(&output);
    assert_eq!(result["state"]["iterations"], json!(2));
    assert_eq!(result["steps"], json!(15));
}

#[test]
fn test_missing_code_is_an_error() {
    let output = flowgraph(&["run", "review"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no code to review"));
}

#[test]
fn test_describe_mermaid() {
    let output = flowgraph(&["describe", "review-loop", "--format", "mermaid"]);
    assert!(output.status.success());

    let diagram = String::from_utf8_lossy(&output.stdout);
    assert!(diagram.contains("graph TD"));
    assert!(diagram.contains("revise"));
}

#[test]
fn test_tools_listing() {
    let output = flowgraph(&["tools"]);
    assert!(output.status.success());

    let listing = String::from_utf8_lossy(&output.stdout);
    for name in [
        "check_complexity",
        "detect_issues",
        "extract_functions",
        "suggest_improvements",
    ] {
        assert!(listing.contains(name), "missing {}", name);
    }
}
