//! Object conversion: required, additional, read-only and write-only
//! properties, defaults and error accumulation.

use super::*;
use openapi_convert::ErrorKind;
use pretty_assertions::assert_eq;
use serde_json::json;

fn pet() -> DocumentBuilder {
    DocumentBuilder::new().schema(
        "Pet",
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "id": {"type": "integer", "readOnly": true},
                "name": {"type": "string"},
                "nickname": {"type": "string"},
                "secret": {"type": "string", "writeOnly": true},
                "status": {"type": "string", "default": "available"}
            },
            "additionalProperties": false
        }),
    )
}

#[test]
fn test_required_property_missing() {
    init_logging();
    let person = DocumentBuilder::new()
        .schema(
            "Person",
            json!({
                "type": "object",
                "required": ["name"],
                "properties": {"name": {"type": "string"}}
            }),
        )
        .compile("Person")
        .unwrap();

    let error = person.request(&json!({})).unwrap_err();
    assert_eq!(
        error.to_pairs(),
        [(
            "#".to_string(),
            "Required property 'name' is missing".to_string()
        )]
    );
    assert_eq!(error.kinds(), [ErrorKind::RequiredMissing]);
}

#[test]
fn test_declared_keys_only() {
    let pet = pet().compile("Pet").unwrap();

    let converted = pet.response(&json!({"id": 7, "name": "Rex"})).unwrap();
    let rendered = converted.value.to_json();

    // Absent properties without a default are left out, not set to null
    assert_eq!(rendered, json!({"id": 7, "name": "Rex"}));
    assert!(rendered.get("nickname").is_none());
}

#[test]
fn test_every_error_is_reported() {
    let thing = DocumentBuilder::new()
        .schema(
            "Thing",
            json!({
                "type": "object",
                "required": ["a", "b"],
                "properties": {
                    "a": {"type": "string"},
                    "b": {"type": "string"},
                    "c": {"type": "string"}
                },
                "additionalProperties": false
            }),
        )
        .compile("Thing")
        .unwrap();

    let error = thing.request(&json!({"c": "x", "extra": true})).unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#".to_string(), ErrorKind::RequiredMissing),
            ("#".to_string(), ErrorKind::RequiredMissing),
            ("#".to_string(), ErrorKind::UnexpectedAdditionalProperty),
        ]
    );
    assert_error_message_contains!(
        Err::<(), _>(error),
        "The following unspecified properties were found: extra"
    );
}

#[test]
fn test_read_only_depends_on_entity() {
    let record = DocumentBuilder::new()
        .schema(
            "Record",
            json!({"type": "object", "properties": {"id": {"readOnly": true}}}),
        )
        .compile("Record")
        .unwrap();
    let payload = json!({"id": 5});

    assert_single_error!(record.request(&payload), "#", ErrorKind::ReadOnlyViolation);
    assert_converted!(record.response(&payload), payload);
}

#[test]
fn test_write_only_depends_on_entity() {
    let pet = pet().compile("Pet").unwrap();
    let payload = json!({"name": "Rex", "secret": "bones"});

    assert_converted!(
        pet.request(&payload),
        json!({"name": "Rex", "secret": "bones", "status": "available"})
    );
    let error = pet.response(&payload).unwrap_err();
    assert_eq!(
        error.to_pairs(),
        [(
            "#".to_string(),
            "The following properties are write only: secret".to_string()
        )]
    );
}

#[test]
fn test_defaults_fill_requests_only() {
    let pet = pet().compile("Pet").unwrap();

    assert_converted!(
        pet.request(&json!({"name": "Rex"})),
        json!({"name": "Rex", "status": "available"})
    );
    assert_converted!(pet.response(&json!({"name": "Rex"})), json!({"name": "Rex"}));
}

#[test]
fn test_request_values_are_cast() {
    let order = DocumentBuilder::new()
        .schema(
            "Order",
            json!({
                "type": "object",
                "properties": {
                    "quantity": {"type": "integer", "enum": [1, 2, 3]},
                    "express": {"type": "boolean"},
                    "price": {"type": "number"}
                }
            }),
        )
        .compile("Order")
        .unwrap();
    let payload = json!({"quantity": "2", "express": "true", "price": "9.5"});

    assert_converted!(
        order.request(&payload),
        json!({"quantity": 2, "express": true, "price": 9.5})
    );

    // Responses are strict
    let error = order.response(&payload).unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#/express".to_string(), ErrorKind::TypeMismatch),
            ("#/price".to_string(), ErrorKind::TypeMismatch),
            ("#/quantity".to_string(), ErrorKind::TypeMismatch),
        ]
    );
}

#[test]
fn test_nested_error_paths() {
    let account = DocumentBuilder::new()
        .schema(
            "Owner",
            json!({
                "type": "object",
                "properties": {"age": {"type": "integer", "minimum": 0}}
            }),
        )
        .schema(
            "Account",
            json!({
                "type": "object",
                "properties": {
                    "owner": {"$ref": "#/components/schemas/Owner"},
                    "aliases": {"type": "array", "items": {"type": "string", "maxLength": 3}}
                }
            }),
        )
        .compile("Account")
        .unwrap();

    let error = account
        .request(&json!({"owner": {"age": "old"}, "aliases": ["bob", "robert"]}))
        .unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#/aliases/1".to_string(), ErrorKind::BoundsViolation),
            ("#/owner/age".to_string(), ErrorKind::CastFailure),
        ]
    );
}

#[test]
fn test_nullable() {
    let document = DocumentBuilder::new()
        .schema("Maybe", json!({"type": "string", "nullable": true}))
        .schema("Never", json!({"type": "string"}));

    assert_converted!(document.compile("Maybe").unwrap().request(&json!(null)), json!(null));
    assert_single_error!(
        document.compile("Never").unwrap().response(&json!(null)),
        "#",
        ErrorKind::NullNotAllowed
    );
}

#[test]
fn test_pattern_and_additional_properties() {
    let labels = DocumentBuilder::new()
        .schema(
            "Labels",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "x-patternProperties": {"^x-": {"type": "integer"}},
                "additionalProperties": {"type": "boolean"}
            }),
        )
        .compile("Labels")
        .unwrap();

    assert_converted!(
        labels.request(&json!({"name": "n", "x-rank": "4", "visible": "false"})),
        json!({"name": "n", "x-rank": 4, "visible": false})
    );
    let error = labels.request(&json!({"x-rank": "high", "visible": "maybe"})).unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#/visible".to_string(), ErrorKind::CastFailure),
            ("#/x-rank".to_string(), ErrorKind::CastFailure),
        ]
    );
}
