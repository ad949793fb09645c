//! End-to-end workflow scenarios
//!
//! Each test builds a small review-style workflow and checks the sealed run:
//! status, trace shape and final state.

use flowgraph_core::{
    AbortReason, Branch, Graph, GraphError, NodeError, RunStatus, State, StepEvent, StepOutcome,
    END,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type NodeResult = Result<State, NodeError>;

fn update(pairs: &[(&str, Value)]) -> State {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn score(state: &State) -> i64 {
    state
        .get("quality_score")
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

fn review_pipeline() -> Graph {
    let mut graph = Graph::new("review", "Code Review");
    graph
        .add_node("extract", "Extract Functions", |state: &State| -> NodeResult {
            let code = state.get("code").and_then(Value::as_str).unwrap_or("");
            let count = code.matches("def ").count();
            Ok(update(&[("function_count", json!(count))]))
        })
        .unwrap()
        .add_node("check", "Check Style", |_: &State| -> NodeResult {
            Ok(update(&[("style_issues", json!([]))]))
        })
        .unwrap()
        .add_node("detect", "Detect Issues", |_: &State| -> NodeResult {
            Ok(update(&[("issues", json!(["missing docstring"]))]))
        })
        .unwrap()
        .add_node("suggest", "Suggest Improvements", |_: &State| -> NodeResult {
            Ok(update(&[("suggestions", json!(["add a docstring"]))]))
        })
        .unwrap()
        .add_node("finalize", "Finalize", |_: &State| -> NodeResult {
            Ok(update(&[("review_completed", json!(true))]))
        })
        .unwrap();
    graph
}

fn quality_loop(increment: i64) -> Graph {
    let mut graph = Graph::new("quality", "Quality Loop");
    graph
        .add_node("check", "Check", move |state: &State| -> NodeResult {
            Ok(update(&[("quality_score", json!(score(state) + increment))]))
        })
        .unwrap()
        .add_node("finalize", "Finalize", |_: &State| -> NodeResult {
            Ok(update(&[("review_completed", json!(true))]))
        })
        .unwrap()
        .add_loop_with_exit(
            "check",
            "check",
            |state: &State| {
                let threshold = state
                    .get("quality_threshold")
                    .and_then(Value::as_i64)
                    .unwrap_or(75);
                score(state) < threshold
            },
            Some(10),
            "finalize",
        )
        .unwrap()
        .set_start_node("check")
        .unwrap();
    graph
}

#[test]
fn linear_review_completes_with_every_node_contributing() {
    let mut graph = review_pipeline();
    graph
        .add_edge("extract", "check")
        .unwrap()
        .add_edge("check", "detect")
        .unwrap()
        .add_edge("detect", "suggest")
        .unwrap()
        .add_edge("suggest", "finalize")
        .unwrap()
        .set_start_node("extract")
        .unwrap();

    let run = graph
        .execute(update(&[("code", json!("def hello(): pass"))]))
        .unwrap();

    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(run.steps().len(), 5);
    assert_eq!(
        run.visited_nodes(),
        vec!["extract", "check", "detect", "suggest", "finalize"]
    );

    let final_state = run.final_state();
    assert_eq!(final_state["code"], json!("def hello(): pass"));
    assert_eq!(final_state["function_count"], json!(1));
    for key in ["style_issues", "issues", "suggestions", "review_completed"] {
        assert!(final_state.contains_key(key), "missing key {}", key);
    }
    assert!(run.steps().iter().all(|s| s.outcome == StepOutcome::Completed));
    assert_eq!(run.last_step().unwrap().label, "Finalize");
}

#[test]
fn improving_loop_exits_to_finalize() {
    let run = quality_loop(20).execute(State::new()).unwrap();

    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(run.executions_of("check"), 4);
    assert_eq!(
        run.visited_nodes(),
        vec!["check", "check", "check", "check", "finalize"]
    );
    assert_eq!(run.final_state()["quality_score"], json!(80));
    assert_eq!(run.final_state()["review_completed"], json!(true));
}

#[test]
fn stagnant_loop_aborts_after_exactly_max_iterations() {
    let run = quality_loop(0).execute(State::new()).unwrap();

    assert_eq!(run.status(), RunStatus::AbortedMaxSteps);
    assert_eq!(run.executions_of("check"), 10);
    assert_eq!(run.steps().len(), 10);
    assert!(!run.final_state().contains_key("review_completed"));
    assert_eq!(
        run.abort_reason(),
        Some(&AbortReason::LoopLimit {
            node: "check".to_string(),
            max_iterations: 10,
        })
    );
}

#[test]
fn failing_middle_node_seals_run_as_failed() {
    let mut graph = Graph::new("fragile", "Fragile");
    graph
        .add_node("first", "First", |_: &State| -> NodeResult {
            Ok(update(&[("first", json!(1))]))
        })
        .unwrap()
        .add_node("second", "Second", |_: &State| -> NodeResult {
            Err("upstream unavailable".into())
        })
        .unwrap()
        .add_node("third", "Third", |_: &State| -> NodeResult {
            Ok(update(&[("third", json!(3))]))
        })
        .unwrap()
        .add_edge("first", "second")
        .unwrap()
        .add_edge("second", "third")
        .unwrap()
        .set_start_node("first")
        .unwrap();

    let run = graph.execute(update(&[("input", json!("x"))])).unwrap();

    assert_eq!(run.status(), RunStatus::Failed);
    assert_eq!(run.steps().len(), 2);
    assert_eq!(run.steps()[1].outcome, StepOutcome::Failed);
    assert_eq!(run.final_state(), run.state_before(1).unwrap());
    assert_eq!(
        run.final_state(),
        &update(&[("input", json!("x")), ("first", json!(1))])
    );

    let error = run.error().unwrap();
    assert_eq!(error.node, "second");
    assert_eq!(error.message, "upstream unavailable");
    assert!(run.into_result().is_err());
}

#[test]
fn duplicate_registration_keeps_the_original() {
    let mut graph = Graph::new("dup", "Duplicates");
    graph
        .add_node("a", "Original", |_: &State| -> NodeResult {
            Ok(update(&[("who", json!("original"))]))
        })
        .unwrap();

    let err = graph
        .add_node("a", "Impostor", |_: &State| -> NodeResult {
            Ok(update(&[("who", json!("impostor"))]))
        })
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateNode(ref id) if id == "a"));

    graph.set_start_node("a").unwrap();
    let run = graph.execute(State::new()).unwrap();
    assert_eq!(run.final_state()["who"], json!("original"));
    assert_eq!(run.steps()[0].label, "Original");
}

#[test]
fn structural_errors_surface_before_any_node_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut graph = Graph::new("broken", "Broken");
    graph
        .add_node("a", "A", move |_: &State| -> NodeResult {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(State::new())
        })
        .unwrap();

    let err = graph.add_edge("a", "ghost").unwrap_err();
    assert!(matches!(err, GraphError::UnknownNode(ref id) if id == "ghost"));

    let err = graph
        .add_conditional_edge("a", vec![Branch::new(|_: &State| true, "ghost")], END)
        .unwrap_err();
    assert!(matches!(err, GraphError::UnknownNode(_)));

    // No start node set yet.
    let err = graph.execute(State::new()).unwrap_err();
    assert!(matches!(err, GraphError::InvalidGraph(_)));
    assert!(graph.clone().compile().is_err());

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn replay_reconstructs_every_intermediate_state() {
    let run = quality_loop(20).execute(State::new()).unwrap();

    for (i, step) in run.steps().iter().enumerate() {
        let before = run.state_before(i).unwrap();
        let after = run.state_after(i).unwrap();
        assert_eq!(before, &step.state_before);
        if i + 1 < run.steps().len() {
            assert_eq!(&after, run.state_before(i + 1).unwrap());
        } else {
            assert_eq!(&after, run.final_state());
        }
    }
}

#[test]
fn run_serializes_with_kebab_case_status() {
    let run = quality_loop(0).execute(State::new()).unwrap();
    let value = serde_json::to_value(&run).unwrap();
    assert_eq!(value["status"], json!("aborted-max-steps"));
    assert_eq!(value["steps"].as_array().unwrap().len(), 10);
}

#[test]
fn observer_sees_every_step_in_order() {
    let mut graph = review_pipeline();
    graph
        .add_edge("extract", "check")
        .unwrap()
        .add_edge("check", "detect")
        .unwrap()
        .add_edge("detect", "suggest")
        .unwrap()
        .add_edge("suggest", "finalize")
        .unwrap()
        .set_start_node("extract")
        .unwrap();

    let mut events = Vec::new();
    let run = graph
        .execute_with(update(&[("code", json!("def a(): pass"))]), |event: &StepEvent| {
            events.push(event.clone())
        })
        .unwrap();

    let kinds: Vec<&str> = events.iter().map(StepEvent::kind).collect();
    let mut expected = vec!["started"];
    for _ in 0..5 {
        expected.extend(["step_started", "step_completed"]);
    }
    expected.push("finished");
    assert_eq!(kinds, expected);
    assert!(events.iter().all(|e| e.run_id() == run.run_id()));

    let completed: Vec<(&str, Option<&str>)> = events
        .iter()
        .filter_map(|event| match event {
            StepEvent::StepCompleted { node_id, next, .. } => {
                Some((node_id.as_str(), next.as_deref()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        completed,
        vec![
            ("extract", Some("check")),
            ("check", Some("detect")),
            ("detect", Some("suggest")),
            ("suggest", Some("finalize")),
            ("finalize", None),
        ]
    );

    match events.last() {
        Some(StepEvent::Finished { status, steps, .. }) => {
            assert_eq!(*status, RunStatus::Completed);
            assert_eq!(*steps, 5);
        }
        other => panic!("expected finished, got {:?}", other),
    }
}

#[test]
fn observer_sees_failure_before_finish() {
    let mut graph = Graph::new("fragile", "Fragile");
    graph
        .add_node("first", "First", |_: &State| -> NodeResult {
            Ok(update(&[("first", json!(1))]))
        })
        .unwrap()
        .add_node("second", "Second", |_: &State| -> NodeResult {
            Err("upstream unavailable".into())
        })
        .unwrap()
        .add_node("third", "Third", |_: &State| -> NodeResult {
            Ok(update(&[("third", json!(3))]))
        })
        .unwrap()
        .add_edge("first", "second")
        .unwrap()
        .add_edge("second", "third")
        .unwrap()
        .set_start_node("first")
        .unwrap();

    let mut events = Vec::new();
    let run = graph
        .execute_with(State::new(), |event: &StepEvent| events.push(event.clone()))
        .unwrap();
    assert_eq!(run.status(), RunStatus::Failed);

    let kinds: Vec<&str> = events.iter().map(StepEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "started",
            "step_started",
            "step_completed",
            "step_started",
            "step_failed",
            "finished",
        ]
    );
    match &events[4] {
        StepEvent::StepFailed { node_id, error, index, .. } => {
            assert_eq!(node_id, "second");
            assert_eq!(*index, 1);
            assert_eq!(error, "upstream unavailable");
        }
        other => panic!("expected step_failed, got {:?}", other),
    }
    assert!(matches!(
        events.last(),
        Some(StepEvent::Finished { status: RunStatus::Failed, steps: 2, .. })
    ));
}

#[test]
fn observer_sees_guard_abort() {
    let mut events = Vec::new();
    let run = quality_loop(0)
        .execute_with(State::new(), |event: &StepEvent| events.push(event.clone()))
        .unwrap();

    assert_eq!(run.status(), RunStatus::AbortedMaxSteps);
    let started = events
        .iter()
        .filter(|e| matches!(e, StepEvent::StepStarted { .. }))
        .count();
    assert_eq!(started, 10);
    assert!(matches!(
        events.last(),
        Some(StepEvent::Finished {
            status: RunStatus::AbortedMaxSteps,
            abort_reason: Some(AbortReason::LoopLimit { .. }),
            ..
        })
    ));
}

proptest! {
    #[test]
    fn acyclic_chains_visit_each_node_once(len in 1usize..20) {
        let mut graph = Graph::new("chain", "Chain");
        for i in 0..len {
            let key = format!("n{}", i);
            graph
                .add_node(key.clone(), key.clone(), move |_: &State| -> NodeResult {
                    Ok(update(&[(key.as_str(), json!(true))]))
                })
                .unwrap();
            if i > 0 {
                graph.add_edge(format!("n{}", i - 1), format!("n{}", i)).unwrap();
            }
        }
        graph.set_start_node("n0").unwrap();

        let run = graph.execute(State::new()).unwrap();
        prop_assert_eq!(run.status(), RunStatus::Completed);
        prop_assert_eq!(run.steps().len(), len);
        prop_assert_eq!(run.final_state().len(), len);
    }

    #[test]
    fn always_true_loop_runs_its_bound(bound in 1usize..30) {
        let mut graph = Graph::new("spin", "Spin");
        graph
            .add_node("spin", "Spin", |state: &State| -> NodeResult {
                let n = state.get("n").and_then(Value::as_i64).unwrap_or(0);
                Ok(update(&[("n", json!(n + 1))]))
            })
            .unwrap()
            .add_loop("spin", "spin", |_: &State| true, Some(bound))
            .unwrap()
            .set_start_node("spin")
            .unwrap();

        let run = graph.execute(State::new()).unwrap();
        prop_assert_eq!(run.status(), RunStatus::AbortedMaxSteps);
        prop_assert_eq!(run.executions_of("spin"), bound);
    }
}
