//! Property-based tests over generated payloads.
//!
//! Converters are compiled once and shared by every generated case.

use super::*;
use openapi_convert::{Converter, ErrorKind, Path};
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

const DECLARED: [&str; 6] = ["p0", "p1", "p2", "p3", "p4", "p5"];
const REQUIRED: [&str; 4] = ["r0", "r1", "r2", "r3"];

static CLOSED: LazyLock<Converter> = LazyLock::new(|| {
    let properties: Map<String, Value> = DECLARED
        .iter()
        .map(|name| (name.to_string(), json!({"type": "string"})))
        .collect();
    openapi_convert::compile(
        json!({"type": "object", "properties": properties, "additionalProperties": false}),
        "#",
    )
    .unwrap()
});

static STRICT: LazyLock<Converter> = LazyLock::new(|| {
    let properties: Map<String, Value> = REQUIRED
        .iter()
        .map(|name| (name.to_string(), json!({"type": "string"})))
        .collect();
    openapi_convert::compile(
        json!({
            "type": "object",
            "required": REQUIRED,
            "properties": properties,
            "additionalProperties": false
        }),
        "#",
    )
    .unwrap()
});

static TREE: LazyLock<Converter> =
    LazyLock::new(|| openapi_convert::compile(samples::tree(), "#").unwrap());

static COUNTS: LazyLock<Converter> = LazyLock::new(|| {
    openapi_convert::compile(
        json!({"type": "object", "additionalProperties": {"type": "integer"}}),
        "#",
    )
    .unwrap()
});

prop_compose! {
    fn declared_subset()
        (names in prop::sample::subsequence(DECLARED.to_vec(), 0..=DECLARED.len()),
         text in "[a-z]{0,8}")
        -> Value {
        Value::Object(names.into_iter().map(|name| (name.to_string(), json!(text))).collect())
    }
}

fn nested(depth: usize) -> Value {
    let mut payload = json!({"label": "leaf"});
    for level in 0..depth {
        payload = json!({"label": format!("level-{}", level), "child": payload});
    }
    payload
}

proptest! {
    #[test]
    fn prop_closed_objects_keep_exactly_the_given_keys(payload in declared_subset()) {
        let converted = CLOSED.request(&payload).unwrap();
        prop_assert_eq!(converted.value.to_json(), payload);
    }

    #[test]
    fn prop_self_reference_converts_any_depth(depth in 0usize..48) {
        let payload = nested(depth);
        let converted = TREE.response(&payload).unwrap();
        prop_assert_eq!(converted.value.to_json(), payload);
    }

    #[test]
    fn prop_object_errors_are_all_collected(
        present in prop::sample::subsequence(REQUIRED.to_vec(), 0..=REQUIRED.len()),
        extras in prop::collection::btree_set("x[a-z]{1,6}", 0..4),
    ) {
        let mut payload = Map::new();
        for name in &present {
            payload.insert(name.to_string(), json!("value"));
        }
        for name in &extras {
            payload.insert(name.clone(), json!(1));
        }

        let missing = REQUIRED.len() - present.len();
        let unexpected = usize::from(!extras.is_empty());
        match STRICT.request(&Value::Object(payload)) {
            Ok(_) => prop_assert_eq!(missing + unexpected, 0),
            Err(error) => {
                prop_assert_eq!(error.len(), missing + unexpected);
                prop_assert!(error.errors().iter().all(|e| e.path.is_root()));

                let kinds = error.kinds();
                let required = kinds.iter().filter(|k| **k == ErrorKind::RequiredMissing).count();
                prop_assert_eq!(required, missing);
            }
        }
    }

    #[test]
    fn prop_errors_are_reported_at_the_escaped_key(key in "[a-z/~ ]{1,8}") {
        let mut payload = Map::new();
        payload.insert(key.clone(), json!("many"));
        let error = COUNTS.response(&Value::Object(payload)).unwrap_err();

        prop_assert_eq!(error.len(), 1);
        let reported = &error.errors()[0];
        prop_assert_eq!(reported.kind, ErrorKind::TypeMismatch);
        prop_assert_eq!(&reported.path, &Path::root().child(&key));

        let reparsed = Path::from_uri(&reported.path.to_string());
        prop_assert_eq!(reparsed.parts().last(), Some(&key));
    }
}
