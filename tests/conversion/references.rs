//! `$ref` handling: recursion, cycles, other documents and custom schemes.

use super::*;
use openapi_convert::{Compiler, CompilerConfig, ErrorKind, RefResolver, ResolveError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_self_reference_converts_any_depth() {
    init_logging();
    let tree = openapi_convert::compile(samples::tree(), "#").unwrap();

    let payload = json!({"label": "root", "child": {"child": {}}});
    assert_converted!(tree.request(&payload), payload);
    assert_single_error!(
        tree.response(&json!({"child": {"child": {"label": 1}}})),
        "#/child/child/label",
        ErrorKind::TypeMismatch
    );
}

#[test]
fn test_pure_cycle_is_reported_once() {
    let document = json!({"A": {"$ref": "#/A"}});

    let error = openapi_convert::compile(document.clone(), "#/A").unwrap_err();
    assert_eq!(failures(&error), [("#/A".to_string(), ErrorKind::ReferenceRecursive)]);

    let config = CompilerConfig::default().with_check_schemas(false);
    let error = openapi_convert::compile_with(document, "#/A", config).unwrap_err();
    assert_eq!(failures(&error), [("#/A".to_string(), ErrorKind::ReferenceRecursive)]);
}

#[test]
fn test_mutual_recursion() {
    let person = DocumentBuilder::new()
        .schema(
            "Person",
            json!({
                "type": "object",
                "properties": {
                    "age": {"type": "integer"},
                    "friends": {"type": "array", "items": {"$ref": "#/components/schemas/Friend"}}
                }
            }),
        )
        .schema("Friend", json!({"$ref": "#/components/schemas/Person"}))
        .compile("Person")
        .unwrap();

    assert_converted!(
        person.request(&json!({"friends": [{"friends": [{"age": "30"}]}]})),
        json!({"friends": [{"friends": [{"age": 30}]}]})
    );
    assert_single_error!(
        person.request(&json!({"friends": [{"friends": [{"age": "old"}]}]})),
        "#/friends/0/friends/0/age",
        ErrorKind::CastFailure
    );
}

#[test]
fn test_references_into_other_files() {
    let mut compiler = fixture_compiler("petstore.yaml", CompilerConfig::default());
    let root = compiler.compile(&pointer("Pet")).unwrap();
    let pet = compiler.into_converter(root).unwrap();

    assert_converted!(
        pet.request(&json!({
            "name": "Rex",
            "born": "2020-02-29",
            "tags": [{"name": "good-boy"}],
            "owner": {"email": "owner@example.com", "password": "bones"}
        })),
        json!({
            "name": "Rex",
            "born": "2020-02-29",
            "status": "available",
            "tags": [{"name": "good-boy"}],
            "owner": {"email": "owner@example.com", "password": "bones"}
        })
    );

    let error = pet
        .response(&json!({
            "id": 1,
            "name": "Rex",
            "tags": [{"name": "Good Boy"}],
            "owner": {"email": "owner@example.com", "password": "bones"}
        }))
        .unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#/owner".to_string(), ErrorKind::WriteOnlyViolation),
            ("#/tags/0/name".to_string(), ErrorKind::PatternMismatch),
        ]
    );
}

#[test]
fn test_missing_file_is_unresolvable() {
    for config in [
        CompilerConfig::default(),
        CompilerConfig::default().with_check_schemas(false),
    ] {
        let mut compiler = fixture_compiler("petstore.yaml", config);
        let error = compiler.compile(&pointer("Stray")).unwrap_err();

        assert!(error.contains_kind(ErrorKind::ReferenceUnresolvable), "{}", error);
        assert!(
            error
                .errors()
                .iter()
                .any(|e| e.path.to_string().ends_with("#/components/schemas/Stray/properties/collar")),
            "{}",
            error
        );
        assert!(error.errors()[0].path.base_uri().starts_with("file://"));
    }
}

#[test]
fn test_custom_scheme_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let shared = json!({"Tag": {"type": "string", "pattern": "^[a-z]+$"}});

    let document = DocumentBuilder::new()
        .schema(
            "Post",
            json!({"type": "object", "properties": {"tag": {"$ref": "mem:shared#/Tag"}}}),
        )
        .schema(
            "Note",
            json!({
                "type": "object",
                "properties": {"tags": {"type": "array", "items": {"$ref": "mem:shared#/Tag"}}}
            }),
        )
        .build();
    let resolver = RefResolver::new("", document).with_handler("mem", move |uri: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        match uri {
            "mem:shared" => Ok(shared.clone()),
            other => Err(ResolveError::fetch(other, "no such document")),
        }
    });

    let mut compiler = Compiler::with_resolver(resolver, CompilerConfig::default());
    let post = compiler.compile(&pointer("Post")).unwrap();
    compiler.compile(&pointer("Note")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let post = compiler.into_converter(post).unwrap();
    assert_converted!(post.request(&json!({"tag": "rust"})), json!({"tag": "rust"}));
    assert_single_error!(
        post.request(&json!({"tag": "Rust"})),
        "#/tag",
        ErrorKind::PatternMismatch
    );
}

#[test]
fn test_added_documents_need_no_handler() {
    let document = DocumentBuilder::new()
        .schema(
            "Person",
            json!({"type": "object", "properties": {"age": {"$ref": "urn:defs#/Age"}}}),
        )
        .build();
    let mut compiler = Compiler::new(document, CompilerConfig::default());
    compiler
        .resolver_mut()
        .add_document("urn:defs", json!({"Age": {"type": "integer", "minimum": 0}}));

    let root = compiler.compile(&pointer("Person")).unwrap();
    let person = compiler.into_converter(root).unwrap();
    assert_converted!(person.request(&json!({"age": "4"})), json!({"age": 4}));
    assert_single_error!(
        person.request(&json!({"age": -4})),
        "#/age",
        ErrorKind::NumericBoundsViolation
    );
}

#[test]
fn test_unsupported_scheme() {
    let document = json!({"type": "object", "properties": {"x": {"$ref": "gopher://host/x"}}});
    let config = CompilerConfig::default().with_check_schemas(false);

    let error = openapi_convert::compile_with(document, "#", config).unwrap_err();
    assert_eq!(
        failures(&error),
        [("#/properties/x".to_string(), ErrorKind::ReferenceUnresolvable)]
    );
}
