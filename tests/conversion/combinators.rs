//! `allOf`, `anyOf`, `oneOf`, `not` and discriminated unions.

use super::*;
use openapi_convert::{CompilerConfig, ErrorKind};
use pretty_assertions::assert_eq;
use serde_json::json;

fn choice() -> DocumentBuilder {
    DocumentBuilder::new().schema(
        "Choice",
        json!({"oneOf": [{"type": "string"}, {"type": "string", "maxLength": 5}]}),
    )
}

#[test]
fn test_one_of_ambiguous() {
    let choice = choice().compile("Choice").unwrap();

    let error = choice.request(&json!("ab")).unwrap_err();
    assert_eq!(
        error.to_pairs(),
        [(
            "#".to_string(),
            "Is valid against more than one schema from `oneOf`. Valid schema indexes: 0, 1"
                .to_string()
        )]
    );
    assert_eq!(error.kinds(), [ErrorKind::OneOfAmbiguous]);
}

#[test]
fn test_one_of_no_match() {
    let choice = choice().compile("Choice").unwrap();

    let error = choice.response(&json!(5)).unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#".to_string(), ErrorKind::OneOfNoMatch),
            ("#/0".to_string(), ErrorKind::TypeMismatch),
            ("#/1".to_string(), ErrorKind::TypeMismatch),
        ]
    );
}

#[test]
fn test_one_of_single_match() {
    let choice = choice().compile("Choice").unwrap();
    assert_converted!(choice.request(&json!("abcdefgh")), json!("abcdefgh"));
}

#[test]
fn test_all_of_merges_results() {
    let merged = DocumentBuilder::new()
        .schema(
            "Merged",
            json!({"allOf": [
                {"properties": {"a": {"type": "string"}}},
                {"properties": {"b": {"type": "integer"}}}
            ]}),
        )
        .compile("Merged")
        .unwrap();

    assert_converted!(merged.request(&json!({"a": "x", "b": 1})), json!({"a": "x", "b": 1}));
    assert_converted!(merged.request(&json!({"a": "x", "b": "1"})), json!({"a": "x", "b": 1}));

    let error = merged.response(&json!({"a": 1, "b": 1})).unwrap_err();
    assert_eq!(
        failures(&error),
        [
            ("#".to_string(), ErrorKind::AllOfPartialFailure),
            ("#/0/a".to_string(), ErrorKind::TypeMismatch),
        ]
    );
}

#[test]
fn test_any_of_first_match_wins() {
    let loose = DocumentBuilder::new()
        .schema("Loose", json!({"anyOf": [{"type": "integer"}, {"type": "string"}]}))
        .compile("Loose")
        .unwrap();

    assert_converted!(loose.request(&json!("12")), json!(12));
    assert_converted!(loose.request(&json!("twelve")), json!("twelve"));
    assert_conversion_error!(loose.response(&json!(true)), "#", ErrorKind::AnyOfNoMatch);
}

#[test]
fn test_not() {
    let document = DocumentBuilder::new()
        .schema("NotString", json!({"not": {"type": "string"}}))
        .schema("Neither", json!({"not": [{"type": "string"}, {"type": "boolean"}]}));

    let not_string = document.compile("NotString").unwrap();
    assert_converted!(not_string.response(&json!(5)), json!(5));
    assert_single_error!(not_string.response(&json!("x")), "#", ErrorKind::NotAcceptable);

    let neither = document.compile("Neither").unwrap();
    assert_converted!(neither.response(&json!([1])), json!([1]));
    assert_single_error!(neither.response(&json!(false)), "#", ErrorKind::NotAcceptable);
}

#[test]
fn test_discriminator_selects_subtype() {
    let pet = openapi_convert::compile(samples::pets(), &pointer("Pet")).unwrap();

    assert_converted!(
        pet.request(&json!({"petType": "Cat", "lives": "3"})),
        json!({"petType": "Cat", "lives": 3})
    );
    assert_converted!(
        pet.request(&json!({"petType": "Dog", "goodBoy": "yes"})),
        json!({"petType": "Dog", "goodBoy": true})
    );
    assert_single_error!(
        pet.request(&json!({"petType": "Cat", "lives": 12})),
        "#/lives",
        ErrorKind::NumericBoundsViolation
    );
}

#[test]
fn test_discriminator_unmatched() {
    let pet = openapi_convert::compile(samples::pets(), &pointer("Pet")).unwrap();

    let error = pet.request(&json!({"petType": "Fish"})).unwrap_err();
    assert_eq!(
        error.to_pairs(),
        [(
            "#".to_string(),
            "The discriminator value must be equal to one of the following values: Cat, Dog"
                .to_string()
        )]
    );
    assert_eq!(error.kinds(), [ErrorKind::DiscriminatorUnmatched]);

    assert_single_error!(
        pet.request(&json!({"name": "Nemo"})),
        "#",
        ErrorKind::DiscriminatorMissing
    );
}

#[test]
fn test_model_level_polymorphism() {
    let document = json!({"components": {"schemas": {
        "Shape": {
            "type": "object",
            "required": ["kind"],
            "properties": {"kind": {"type": "string"}},
            "discriminator": {"propertyName": "kind"}
        },
        "Circle": {"allOf": [
            {"$ref": "#/components/schemas/Shape"},
            {"type": "object", "required": ["radius"], "properties": {"radius": {"type": "number"}}}
        ]},
        "Square": {"allOf": [
            {"$ref": "#/components/schemas/Shape"},
            {"type": "object", "properties": {"side": {"type": "number", "minimum": 0}}}
        ]}
    }}});

    let shape = openapi_convert::compile(document.clone(), &pointer("Shape")).unwrap();
    assert_converted!(
        shape.request(&json!({"kind": "Circle", "radius": "1.5"})),
        json!({"kind": "Circle", "radius": 1.5})
    );
    assert_conversion_error!(
        shape.request(&json!({"kind": "Square", "side": -1})),
        "#/1/side",
        ErrorKind::NumericBoundsViolation
    );
    assert_single_error!(
        shape.request(&json!({"kind": "Hexagon"})),
        "#",
        ErrorKind::DiscriminatorUnmatched
    );

    // Without polymorphism the base is a plain object
    let config = CompilerConfig::default().with_polymorphism(false);
    let shape = openapi_convert::compile_with(document, &pointer("Shape"), config).unwrap();
    assert_converted!(
        shape.request(&json!({"kind": "Hexagon"})),
        json!({"kind": "Hexagon"})
    );
}
