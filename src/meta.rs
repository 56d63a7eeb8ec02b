//! The Schema Object as a conversion graph.
//!
//! [`schema_object`] describes what a valid OpenAPI 3.0 Schema Object looks
//! like, using the same nodes compiled schemas are made of. Converting a
//! schema document with it in [`Entity::Specification`] mode checks every
//! keyword, follows `$ref`s through the resolver handed to the conversion
//! and runs the authoring rules of [`keyword_checks`] on every schema found.
//!
//! [`Entity::Specification`]: crate::graph::Entity::Specification

use crate::compiler::{SchemaType, keyword_checks};
use crate::error::BuildResult;
use crate::graph::{Converter, GraphBuilder, NodeId};
use crate::messages::Messages;
use crate::types::{
    AdditionalProperties, AnyType, ArrayType, BooleanType, Common, IntegerType, LazyType, MapType,
    NumberType, NumericBounds, ObjectType, OneOfType, ReferenceType, RegexType, StringType,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

const EXTENSION_PATTERN: &str = "^x-";

/// A converter for Schema Objects, entered through a `$ref` aware node.
pub fn schema_object(messages: &Messages) -> BuildResult<Converter> {
    let mut builder = GraphBuilder::new();
    let common = || Common::new().with_messages(messages.clone());

    // Every nested schema goes through a reference back to the schema node
    let schema = builder.reserve();
    let lazy = builder.add(LazyType::new(schema));
    let schema_ref = builder.add(ReferenceType::new(common(), lazy));

    let any = builder.add(AnyType::new(common()));
    let string = builder.add(StringType::new(common()));
    let boolean = builder.add(BooleanType::new(common()));
    let number = builder.add(NumberType::new(common()));
    let count = builder.add(IntegerType::new(common()).with_bounds(NumericBounds {
        minimum: Some(0.0),
        ..NumericBounds::default()
    }));
    let multiple_of = builder.add(NumberType::new(common()).with_bounds(NumericBounds {
        minimum: Some(0.0),
        exclusive_minimum: true,
        ..NumericBounds::default()
    }));
    let schema_type = builder.add(StringType::new(
        common().with_enum(
            SchemaType::ALL
                .iter()
                .map(|t| JsonValue::String(t.as_str().to_string()))
                .collect(),
        ),
    ));
    let pattern = builder.add(RegexType::new(
        StringType::new(common()).with_min_length(1),
    ));

    let enumeration = builder.add(
        ArrayType::new(common(), any)
            .with_min_items(1)
            .with_unique_items(true),
    );
    let required = builder.add(
        ArrayType::new(common(), string)
            .with_min_items(1)
            .with_unique_items(true),
    );
    let schema_list = builder.add(ArrayType::new(common(), schema_ref).with_min_items(1));
    let schema_map = builder.add(MapType::new(common(), schema_ref));
    let not = builder.add(OneOfType::new(common(), vec![schema_ref, schema_list]));
    let additional = builder.add(OneOfType::new(common(), vec![boolean, schema_ref]));

    let string_map = builder.add(MapType::new(common(), string));
    let discriminator = builder.add(
        ObjectType::builder(common())
            .property("propertyName", string)
            .property("mapping", string_map)
            .required(["propertyName"])
            .additional_properties(AdditionalProperties::Deny)
            .build()?,
    );
    let external_docs = builder.add(
        ObjectType::builder(common())
            .property("description", string)
            .property("url", string)
            .required(["url"])
            .pattern_property(EXTENSION_PATTERN, any)
            .additional_properties(AdditionalProperties::Deny)
            .build()?,
    );
    let xml = builder.add(
        ObjectType::builder(common())
            .property("name", string)
            .property("namespace", string)
            .property("prefix", string)
            .property("attribute", boolean)
            .property("wrapped", boolean)
            .pattern_property(EXTENSION_PATTERN, any)
            .additional_properties(AdditionalProperties::Deny)
            .build()?,
    );

    let properties: [(&str, NodeId); 37] = [
        ("type", schema_type),
        ("format", string),
        ("title", string),
        ("description", string),
        ("default", any),
        ("nullable", boolean),
        ("enum", enumeration),
        ("readOnly", boolean),
        ("writeOnly", boolean),
        ("xml", xml),
        ("externalDocs", external_docs),
        ("example", any),
        ("deprecated", boolean),
        ("multipleOf", multiple_of),
        ("minimum", number),
        ("maximum", number),
        ("exclusiveMinimum", boolean),
        ("exclusiveMaximum", boolean),
        ("minLength", count),
        ("maxLength", count),
        ("pattern", pattern),
        ("discriminator", discriminator),
        ("allOf", schema_list),
        ("anyOf", schema_list),
        ("oneOf", schema_list),
        ("not", not),
        ("items", schema_ref),
        ("minItems", count),
        ("maxItems", count),
        ("uniqueItems", boolean),
        ("required", required),
        ("properties", schema_map),
        ("minProperties", count),
        ("maxProperties", count),
        ("additionalProperties", additional),
        ("x-patternProperties", schema_map),
        ("$ref", string),
    ];

    let mut checks = common();
    for check in keyword_checks(messages) {
        checks.validators.push(Arc::new(check));
    }
    let mut object = ObjectType::builder(checks)
        .pattern_property(EXTENSION_PATTERN, any)
        .additional_properties(AdditionalProperties::Deny);
    for (name, node) in properties {
        object = object.property(name, node);
    }
    builder.define(schema, object.build()?)?;

    Ok(Converter::new(Arc::new(builder.build()?), schema_ref))
}
