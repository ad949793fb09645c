//! Workflow state and the shallow-merge rule
//!
//! State is an open mapping from string keys to arbitrary JSON values. It is
//! the only channel of information between nodes: each node receives a
//! read-only view of the current state and returns a *partial update*, which
//! the engine merges back with overwrite semantics:
//!
//! | key in update? | key in state? | result            |
//! |----------------|---------------|-------------------|
//! | yes            | either        | update's value    |
//! | no             | yes           | state's value     |
//!
//! Merging is shallow: nested objects are replaced wholesale, never combined.
//!
//! ```rust
//! use flowgraph_core::state::{merge, State};
//! use serde_json::json;
//!
//! let mut state = State::new();
//! state.insert("code".into(), json!("def f(): pass"));
//! state.insert("score".into(), json!(10));
//!
//! let mut update = State::new();
//! update.insert("score".into(), json!(30));
//!
//! merge(&mut state, update);
//! assert_eq!(state["score"], json!(30));
//! assert_eq!(state["code"], json!("def f(): pass"));
//! ```

use crate::error::{GraphError, Result};
use serde_json::{Map, Value};

/// String-keyed mapping threaded through a run.
pub type State = Map<String, Value>;

/// Merge `update` into `state`, overwriting keys of the same name.
///
/// An empty update leaves `state` untouched.
pub fn merge(state: &mut State, update: State) {
    for (key, value) in update {
        state.insert(key, value);
    }
}

/// Return the keys whose values differ between `before` and `after`,
/// including keys present in only one of them.
pub fn changed_keys(before: &State, after: &State) -> Vec<String> {
    let mut keys: Vec<String> = after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    keys.extend(
        before
            .keys()
            .filter(|key| !after.contains_key(*key))
            .cloned(),
    );
    keys
}

/// Convert an arbitrary JSON value into a state mapping.
///
/// `null` becomes an empty state; any other non-object value is rejected.
pub fn from_value(value: Value) -> Result<State> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(State::new()),
        other => Err(GraphError::InvalidState(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn state(value: Value) -> State {
        from_value(value).unwrap()
    }

    #[test]
    fn test_merge_overwrites_and_preserves() {
        let mut current = state(json!({"a": 1, "b": {"nested": true}}));
        merge(&mut current, state(json!({"b": 2, "c": "new"})));

        assert_eq!(Value::Object(current), json!({"a": 1, "b": 2, "c": "new"}));
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut current = state(json!({"config": {"x": 1, "y": 2}}));
        merge(&mut current, state(json!({"config": {"x": 5}})));

        assert_eq!(current["config"], json!({"x": 5}));
    }

    #[test]
    fn test_from_value() {
        assert!(from_value(json!({"k": "v"})).is_ok());
        assert!(from_value(Value::Null).unwrap().is_empty());

        let err = from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, GraphError::InvalidState(msg) if msg.contains("array")));
    }

    #[test]
    fn test_changed_keys() {
        let before = state(json!({"a": 1, "b": 2, "gone": true}));
        let after = state(json!({"a": 1, "b": 3, "c": 4}));

        let mut keys = changed_keys(&before, &after);
        keys.sort();
        assert_eq!(keys, vec!["b", "c", "gone"]);
    }

    fn arb_state() -> impl Strategy<Value = State> {
        prop::collection::hash_map("[a-e]{1,3}", any::<i64>(), 0..8).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(key, value)| (key, json!(value)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_empty_update_is_identity(initial in arb_state()) {
            let mut merged = initial.clone();
            merge(&mut merged, State::new());
            prop_assert_eq!(merged, initial);
        }

        #[test]
        fn prop_update_keys_win_and_others_survive(initial in arb_state(), update in arb_state()) {
            let mut merged = initial.clone();
            merge(&mut merged, update.clone());

            for (key, value) in &update {
                prop_assert_eq!(merged.get(key), Some(value));
            }
            for (key, value) in &initial {
                if !update.contains_key(key) {
                    prop_assert_eq!(merged.get(key), Some(value));
                }
            }
            prop_assert!(merged.len() <= initial.len() + update.len());
        }
    }
}
