//! Whole documents: YAML input, configuration, typed values and error
//! bodies.

use super::*;
use openapi_convert::{CompilerConfig, ConvertOptions, Entity, ErrorKind, Value, parse_document};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use url::Url;

#[test]
fn test_yaml_document() {
    init_logging();
    let document = parse_document(
        "inline.yaml",
        r#"
type: object
required: [when]
properties:
  when:
    type: string
    format: date-time
  ref:
    type: string
    format: uuid
"#,
    )
    .unwrap();
    let event = openapi_convert::compile(document, "#").unwrap();

    let converted = event
        .request(&json!({
            "when": "2024-05-01T10:00:00+02:00",
            "ref": "3f2504e0-4f89-11d3-9a0c-0305e82c3301"
        }))
        .unwrap();
    assert!(matches!(converted.value.get("when"), Some(Value::DateTime(_))));
    assert_eq!(
        converted.value.to_json(),
        json!({
            "when": "2024-05-01T10:00:00+02:00",
            "ref": "3f2504e0-4f89-11d3-9a0c-0305e82c3301"
        })
    );

    assert_single_error!(
        event.request(&json!({"when": "tomorrow"})),
        "#/when",
        ErrorKind::FormatViolation
    );
}

#[test]
fn test_fixture_collection() {
    let mut compiler = fixture_compiler("petstore.yaml", CompilerConfig::default());
    let root = compiler.compile(&pointer("Pets")).unwrap();
    let pets = compiler.into_converter(root).unwrap();

    assert_converted!(
        pets.response(&json!([{"id": 1, "name": "Rex"}, {"id": 2, "name": "Tom", "status": "sold"}])),
        json!([{"id": 1, "name": "Rex"}, {"id": 2, "name": "Tom", "status": "sold"}])
    );

    let error = pets
        .request(&json!([{"id": 1, "name": ""}, {"name": "Tom", "status": "lost"}]))
        .unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#/0".to_string(), ErrorKind::ReadOnlyViolation),
            ("#/0/name".to_string(), ErrorKind::BoundsViolation),
            ("#/1/status".to_string(), ErrorKind::EnumMismatch),
        ]
    );
    assert_error_message_contains!(
        Err::<(), _>(error),
        "Must be equal to one of the following values: available, pending, sold"
    );
}

#[test]
fn test_documents_written_at_runtime() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("api.yaml"),
        "Money:\n  type: object\n  properties:\n    amount:\n      $ref: 'units.json#/Cents'\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("units.json"),
        r#"{"Cents": {"type": "integer", "format": "int32", "minimum": 0}}"#,
    )
    .unwrap();

    let base_uri = Url::from_file_path(dir.path().join("api.yaml")).unwrap();
    let document = parse_document(
        base_uri.as_str(),
        &fs::read_to_string(dir.path().join("api.yaml")).unwrap(),
    )
    .unwrap();
    let config = CompilerConfig::default().with_base_uri(base_uri.to_string());
    let money = openapi_convert::compile_with(document, "#/Money", config).unwrap();

    assert_converted!(money.request(&json!({"amount": "250"})), json!({"amount": 250}));
    assert_single_error!(
        money.request(&json!({"amount": 4_294_967_296u64})),
        "#/amount",
        ErrorKind::FormatViolation
    );
}

#[test]
fn test_configuration_from_yaml() {
    let config: CompilerConfig = serde_yaml::from_str(
        r#"
strict_formats: true
check_schemas: false
message_overrides:
  required: "Missing {0}"
"#,
    )
    .unwrap();
    assert!(config.cache_remote);
    assert_eq!(config.join_cache_size, 1024);

    let document = DocumentBuilder::new()
        .schema(
            "Person",
            json!({"type": "object", "required": ["name"], "properties": {"name": {"type": "string"}}}),
        )
        .schema("Host", json!({"type": "string", "format": "hostname"}))
        .config(config);

    let person = document.compile("Person").unwrap();
    assert_eq!(
        person.request(&json!({})).unwrap_err().to_pairs(),
        [("#".to_string(), "Missing name".to_string())]
    );

    let error = document.compile("Host").unwrap_err();
    assert_eq!(
        failures(&error),
        [("#/components/schemas/Host/format".to_string(), ErrorKind::InvalidSchema)]
    );
}

#[test]
fn test_schema_check_reports_every_mistake() {
    let document = DocumentBuilder::new().schema(
        "Broken",
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 4, "maxLength": 2},
                "tags": {"type": "array"},
                "size": {"type": "integer", "maxLenght": 3}
            }
        }),
    );

    let mut compiler = document.compiler();
    let error = compiler.check(&pointer("Broken")).unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#/components/schemas/Broken/properties/name".to_string(), ErrorKind::InvalidSchema),
            (
                "#/components/schemas/Broken/properties/size".to_string(),
                ErrorKind::UnexpectedAdditionalProperty
            ),
            ("#/components/schemas/Broken/properties/tags".to_string(), ErrorKind::InvalidSchema),
        ]
    );

    // Compiling checks first and reports the same errors
    let compiled = compiler.compile(&pointer("Broken")).unwrap_err();
    assert_eq!(failures(&compiled), failures(&error));
    assert!(compiler.is_empty());
}

#[test]
fn test_error_body() {
    let person = DocumentBuilder::new()
        .schema(
            "Person",
            json!({
                "type": "object",
                "required": ["name"],
                "properties": {"name": {"type": "string"}, "age": {"type": "integer"}}
            }),
        )
        .compile("Person")
        .unwrap();

    let error = person.request(&json!({"age": "ten"})).unwrap_err();
    assert_eq!(
        serde_json::to_value(&error).unwrap(),
        json!([
            {"path": "#", "message": "Required property 'name' is missing"},
            {"path": "#/age", "message": "Couldn't cast to an integer"}
        ])
    );
    assert_eq!(
        error.to_string(),
        "#: Required property 'name' is missing\n#/age: Couldn't cast to an integer"
    );
}

#[test]
fn test_explicit_strictness() {
    let age = openapi_convert::compile(json!({"type": "integer"}), "#").unwrap();

    let strict_request = ConvertOptions::request().with_strict(true);
    assert_single_error!(age.convert(&json!("4"), &strict_request), "#", ErrorKind::TypeMismatch);

    let lenient_response = ConvertOptions::new(Entity::Response).with_strict(false);
    assert_converted!(age.convert(&json!("4"), &lenient_response), json!(4));
}

#[test]
fn test_converter_is_shared_between_threads() {
    let tree = openapi_convert::compile(samples::tree(), "#").unwrap();

    std::thread::scope(|scope| {
        for depth in 0..4 {
            let tree = tree.clone();
            scope.spawn(move || {
                let mut payload = json!({"label": "leaf"});
                for _ in 0..depth {
                    payload = json!({"child": payload});
                }
                assert_converted!(tree.request(&payload), payload);
            });
        }
    });
}
