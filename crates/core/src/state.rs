//! Dynamic state maps and merge semantics.

use serde_json::{Map, Value};

/// Field → value mapping held by stores and passed around as snapshots.
pub type StateMap = Map<String, Value>;

/// Shallow merge: every top-level field of `partial` replaces the field in
/// `target`. Nested objects are replaced wholesale, never deep-merged.
///
/// Returns the names of the fields that were written, in `partial` order.
pub fn shallow_merge(target: &mut StateMap, partial: StateMap) -> Vec<String> {
    let mut written = Vec::with_capacity(partial.len());
    for (field, value) in partial {
        written.push(field.clone());
        target.insert(field, value);
    }
    written
}

/// Build a [`StateMap`] from a JSON value.
///
/// Non-object values yield an empty map; callers that need to reject them
/// should check with [`crate::helpers::is_object`] first.
pub fn state_from(value: Value) -> StateMap {
    match value {
        Value::Object(map) => map,
        _ => StateMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn nested_objects_are_replaced_not_merged() {
        let mut state = state_from(json!({"user": {"name": "a", "theme": "light"}, "count": 1}));
        let written = shallow_merge(&mut state, state_from(json!({"user": {"theme": "dark"}})));

        assert_eq!(written, vec!["user".to_string()]);
        assert_eq!(Value::Object(state), json!({"user": {"theme": "dark"}, "count": 1}));
    }

    #[test]
    fn non_object_values_give_empty_state() {
        assert!(state_from(json!([1, 2, 3])).is_empty());
        assert!(state_from(Value::Null).is_empty());
    }

    proptest! {
        #[test]
        fn untouched_fields_keep_their_values(
            base in proptest::collection::btree_map("[a-e]", 0i64..100, 0..5),
            patch in proptest::collection::btree_map("[c-h]", 0i64..100, 0..5),
        ) {
            let mut state: StateMap = base.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let partial: StateMap = patch.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            shallow_merge(&mut state, partial);

            for (k, v) in &base {
                let expected = patch.get(k).unwrap_or(v);
                prop_assert_eq!(state.get(k), Some(&json!(expected)));
            }
            for (k, v) in &patch {
                prop_assert_eq!(state.get(k), Some(&json!(v)));
            }
        }
    }
}
