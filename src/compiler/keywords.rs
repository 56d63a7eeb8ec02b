//! Schema keywords: type inference, typed keyword access and the authoring
//! checks run on every Schema Object.

use crate::error::Error;
use crate::graph::ConvertMode;
use crate::messages::{MessageKey, Messages};
use crate::path::Path;
use crate::types::{Validator, Violation};
use crate::value::{Value, render};
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// The `type` of a Schema Object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    pub const ALL: [SchemaType; 6] = [
        SchemaType::String,
        SchemaType::Number,
        SchemaType::Integer,
        SchemaType::Boolean,
        SchemaType::Array,
        SchemaType::Object,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
        }
    }

    pub fn is_primitive(self) -> bool {
        !matches!(self, SchemaType::Array | SchemaType::Object)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, SchemaType::Number | SchemaType::Integer)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords that only make sense for one type, and imply it when `type` is
/// absent.
const TYPE_SPECIFIC_KEYWORDS: [(SchemaType, &[&str]); 4] = [
    (SchemaType::String, &["minLength", "maxLength", "pattern"]),
    (
        SchemaType::Number,
        &[
            "minimum",
            "maximum",
            "exclusiveMinimum",
            "exclusiveMaximum",
            "multipleOf",
        ],
    ),
    (
        SchemaType::Object,
        &[
            "properties",
            "required",
            "additionalProperties",
            "minProperties",
            "maxProperties",
        ],
    ),
    (
        SchemaType::Array,
        &["items", "minItems", "maxItems", "uniqueItems"],
    ),
];

/// The declared type of `schema`, or the type implied by its keywords.
///
/// Keywords of more than one type make the type ambiguous.
pub fn schema_type(
    schema: &Map<String, JsonValue>,
    messages: &Messages,
) -> Result<Option<SchemaType>, Violation> {
    if let Some(declared) = schema.get("type") {
        let name = match declared {
            JsonValue::String(name) => name.clone(),
            other => render(other),
        };
        return SchemaType::parse(&name)
            .map(Some)
            .ok_or_else(|| Violation::from_key(messages, MessageKey::UnknownType, &[&name]));
    }

    let inferred: Vec<SchemaType> = TYPE_SPECIFIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| schema.contains_key(*keyword)))
        .map(|(schema_type, _)| *schema_type)
        .collect();

    match inferred.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(*single)),
        _ => Err(Violation::from_key(messages, MessageKey::AmbiguousType, &[])),
    }
}

/// Typed access to the keywords of one schema.
///
/// A keyword of the wrong JSON type reads as absent and is reported at
/// `path/<keyword>`.
pub(crate) struct Keywords<'s> {
    schema: &'s Map<String, JsonValue>,
    path: &'s Path,
    messages: &'s Messages,
    errors: Vec<Error>,
}

impl<'s> Keywords<'s> {
    pub fn new(schema: &'s Map<String, JsonValue>, path: &'s Path, messages: &'s Messages) -> Self {
        Self {
            schema,
            path,
            messages,
            errors: Vec::new(),
        }
    }

    pub fn invalid(&mut self, name: &str) {
        let error = Violation::from_key(self.messages, MessageKey::InvalidKeyword, &[&name])
            .at(&self.path.child(name));
        self.errors.push(error);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schema.contains_key(name)
    }

    pub fn raw(&self, name: &str) -> Option<&'s JsonValue> {
        self.schema.get(name)
    }

    pub fn flag(&mut self, name: &str) -> bool {
        match self.schema.get(name) {
            None => false,
            Some(JsonValue::Bool(flag)) => *flag,
            Some(_) => {
                self.invalid(name);
                false
            }
        }
    }

    pub fn number(&mut self, name: &str) -> Option<f64> {
        let value = self.schema.get(name)?;
        let number = value.as_f64();
        if number.is_none() {
            self.invalid(name);
        }
        number
    }

    /// A number greater than zero.
    pub fn positive(&mut self, name: &str) -> Option<f64> {
        let number = self.number(name)?;
        if number <= 0.0 {
            let error = Violation::from_key(self.messages, MessageKey::NonPositiveMultipleOf, &[])
                .at(&self.path.child(name));
            self.errors.push(error);
            return None;
        }
        Some(number)
    }

    /// A non-negative integer.
    pub fn count(&mut self, name: &str) -> Option<usize> {
        let value = self.schema.get(name)?;
        let count = value.as_u64().and_then(|count| usize::try_from(count).ok());
        if count.is_none() {
            self.invalid(name);
        }
        count
    }

    pub fn string(&mut self, name: &str) -> Option<&'s str> {
        let value = self.schema.get(name)?;
        let text = value.as_str();
        if text.is_none() {
            self.invalid(name);
        }
        text
    }

    pub fn array(&mut self, name: &str) -> Option<&'s [JsonValue]> {
        let value = self.schema.get(name)?;
        let items = value.as_array().map(Vec::as_slice);
        if items.is_none() {
            self.invalid(name);
        }
        items
    }

    pub fn mapping(&mut self, name: &str) -> Option<&'s Map<String, JsonValue>> {
        let value = self.schema.get(name)?;
        let mapping = value.as_object();
        if mapping.is_none() {
            self.invalid(name);
        }
        mapping
    }

    /// A string keyword that must compile as a regular expression.
    pub fn regex(&mut self, name: &str) -> Option<Regex> {
        let pattern = self.string(name)?;
        match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(_) => {
                let error = Violation::from_key(self.messages, MessageKey::RegexFormat, &[])
                    .at(&self.path.child(name));
                self.errors.push(error);
                None
            }
        }
    }

    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }
}

/// One authoring rule of the Schema Object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Type,
    Format,
    Items,
    Discriminator,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MultipleOf,
    MinLength,
    MaxLength,
    MinItems,
    MaxItems,
    UniqueItems,
    Properties,
    AdditionalProperties,
    Required,
    MinProperties,
    MaxProperties,
    ReadOnlyWriteOnly,
    PatternProperties,
}

impl Rule {
    pub const ALL: [Rule; 21] = [
        Rule::Type,
        Rule::Format,
        Rule::Items,
        Rule::Discriminator,
        Rule::Minimum,
        Rule::Maximum,
        Rule::ExclusiveMinimum,
        Rule::ExclusiveMaximum,
        Rule::MultipleOf,
        Rule::MinLength,
        Rule::MaxLength,
        Rule::MinItems,
        Rule::MaxItems,
        Rule::UniqueItems,
        Rule::Properties,
        Rule::AdditionalProperties,
        Rule::Required,
        Rule::MinProperties,
        Rule::MaxProperties,
        Rule::ReadOnlyWriteOnly,
        Rule::PatternProperties,
    ];
}

fn number(schema: &Map<String, JsonValue>, name: &str) -> Option<f64> {
    schema.get(name).and_then(JsonValue::as_f64)
}

/// Checks one [`Rule`] against a Schema Object.
#[derive(Debug, Clone)]
pub struct KeywordCheck {
    rule: Rule,
    messages: Messages,
}

impl KeywordCheck {
    pub fn new(rule: Rule, messages: Messages) -> Self {
        Self { rule, messages }
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    pub fn check(&self, schema: &Map<String, JsonValue>) -> Option<Violation> {
        let schema_type = match schema_type(schema, &self.messages) {
            Ok(schema_type) => schema_type,
            // An unusable type is reported once, by the type rule
            Err(violation) => return (self.rule == Rule::Type).then_some(violation),
        };
        let is = |expected: SchemaType| schema_type == Some(expected);
        let numeric = schema_type.is_some_and(SchemaType::is_numeric);
        let has = |name: &str| schema.contains_key(name);

        let key = match self.rule {
            Rule::Type => return None,
            Rule::Format => {
                (has("format") && !schema_type.is_some_and(SchemaType::is_primitive))
                    .then_some(MessageKey::FormatOnNonPrimitive)
            }
            Rule::Items => {
                (is(SchemaType::Array) && !has("items")).then_some(MessageKey::ItemsRequired)
            }
            Rule::Discriminator => (has("discriminator") && (has("allOf") || has("not")))
                .then_some(MessageKey::ImproperDiscriminator),
            Rule::Minimum => {
                (has("minimum") && !numeric).then_some(MessageKey::InvalidTypeForMinimum)
            }
            Rule::Maximum => match number(schema, "maximum") {
                _ if !has("maximum") => None,
                _ if !numeric => Some(MessageKey::InvalidTypeForMaximum),
                Some(maximum) => number(schema, "minimum")
                    .filter(|minimum| maximum < *minimum)
                    .map(|_| MessageKey::MaximumBelowMinimum),
                None => None,
            },
            Rule::ExclusiveMinimum => (has("exclusiveMinimum") && !has("minimum"))
                .then_some(MessageKey::ExclusiveMinimumWithoutMinimum),
            Rule::ExclusiveMaximum => (has("exclusiveMaximum") && !has("maximum"))
                .then_some(MessageKey::ExclusiveMaximumWithoutMaximum),
            Rule::MultipleOf => match number(schema, "multipleOf") {
                _ if !has("multipleOf") => None,
                _ if !numeric => Some(MessageKey::InvalidTypeForMultipleOf),
                Some(multiple_of) if multiple_of <= 0.0 => Some(MessageKey::NonPositiveMultipleOf),
                _ => None,
            },
            Rule::MinLength => (has("minLength") && !is(SchemaType::String))
                .then_some(MessageKey::InvalidTypeForMinLength),
            Rule::MaxLength => self.upper_bound(
                schema,
                ("maxLength", "minLength"),
                is(SchemaType::String),
                (
                    MessageKey::InvalidTypeForMaxLength,
                    MessageKey::MaxLengthBelowMinLength,
                ),
            ),
            Rule::MinItems => (has("minItems") && !is(SchemaType::Array))
                .then_some(MessageKey::InvalidTypeForMinItems),
            Rule::MaxItems => self.upper_bound(
                schema,
                ("maxItems", "minItems"),
                is(SchemaType::Array),
                (
                    MessageKey::InvalidTypeForMaxItems,
                    MessageKey::MaxItemsBelowMinItems,
                ),
            ),
            Rule::UniqueItems => (has("uniqueItems") && !is(SchemaType::Array))
                .then_some(MessageKey::InvalidTypeForUniqueItems),
            Rule::Properties => (has("properties") && !is(SchemaType::Object))
                .then_some(MessageKey::InvalidTypeForProperties),
            Rule::AdditionalProperties => (has("additionalProperties")
                && !is(SchemaType::Object))
            .then_some(MessageKey::InvalidTypeForAdditionalProperties),
            Rule::Required => (has("required") && !is(SchemaType::Object))
                .then_some(MessageKey::InvalidTypeForRequired),
            Rule::MinProperties => (has("minProperties") && !is(SchemaType::Object))
                .then_some(MessageKey::InvalidTypeForMinProperties),
            Rule::MaxProperties => self.upper_bound(
                schema,
                ("maxProperties", "minProperties"),
                is(SchemaType::Object),
                (
                    MessageKey::InvalidTypeForMaxProperties,
                    MessageKey::MaxPropertiesBelowMinProperties,
                ),
            ),
            Rule::ReadOnlyWriteOnly => {
                let set = |name: &str| schema.get(name) == Some(&JsonValue::Bool(true));
                (set("readOnly") && set("writeOnly")).then_some(MessageKey::ReadOnlyAndWriteOnly)
            }
            Rule::PatternProperties => schema
                .get("x-patternProperties")
                .and_then(JsonValue::as_object)
                .filter(|patterns| patterns.keys().any(|pattern| Regex::new(pattern).is_err()))
                .map(|_| MessageKey::RegexFormat),
        };

        key.map(|key| Violation::from_key(&self.messages, key, &[]))
    }

    /// `upper` needs the right type and must not be below `lower`, which
    /// defaults to zero.
    fn upper_bound(
        &self,
        schema: &Map<String, JsonValue>,
        (upper, lower): (&str, &str),
        type_matches: bool,
        (wrong_type, below): (MessageKey, MessageKey),
    ) -> Option<MessageKey> {
        let maximum = schema.get(upper)?;
        if !type_matches {
            return Some(wrong_type);
        }
        let minimum = number(schema, lower).unwrap_or(0.0);
        maximum
            .as_f64()
            .filter(|maximum| *maximum < minimum)
            .map(|_| below)
    }
}

impl Validator for KeywordCheck {
    fn validate(&self, _value: &Value, original: &JsonValue, _mode: ConvertMode) -> Option<Violation> {
        self.check(original.as_object()?)
    }
}

/// One check per [`Rule`].
pub fn keyword_checks(messages: &Messages) -> Vec<KeywordCheck> {
    Rule::ALL
        .into_iter()
        .map(|rule| KeywordCheck::new(rule, messages.clone()))
        .collect()
}

/// Run every authoring rule against `schema`.
pub fn check_schema(schema: &Map<String, JsonValue>, messages: &Messages) -> Vec<Violation> {
    keyword_checks(messages)
        .iter()
        .filter_map(|check| check.check(schema))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn keys(schema: JsonValue) -> Vec<String> {
        check_schema(&object(schema), &Messages::new())
            .into_iter()
            .map(|violation| violation.message)
            .collect()
    }

    #[test]
    fn test_explicit_type() {
        let messages = Messages::new();
        assert_eq!(
            schema_type(&object(json!({"type": "integer"})), &messages),
            Ok(Some(SchemaType::Integer))
        );
        let unknown = schema_type(&object(json!({"type": "file"})), &messages).unwrap_err();
        assert_eq!(unknown.message, "Unknown schema type 'file'");
    }

    #[test]
    fn test_inferred_type() {
        let messages = Messages::new();
        assert_eq!(
            schema_type(&object(json!({"properties": {}})), &messages),
            Ok(Some(SchemaType::Object))
        );
        assert_eq!(
            schema_type(&object(json!({"pattern": "^a"})), &messages),
            Ok(Some(SchemaType::String))
        );
        assert_eq!(schema_type(&object(json!({"allOf": []})), &messages), Ok(None));
    }

    #[test]
    fn test_ambiguous_type_is_the_only_report() {
        assert_eq!(
            keys(json!({"items": {}, "properties": {}, "format": "x"})),
            ["The schema type is ambiguous"]
        );
    }

    #[test]
    fn test_wrong_type_keywords() {
        let messages = keys(json!({"type": "string", "minimum": 1, "items": {}, "required": ["a"]}));
        assert_eq!(
            messages,
            [
                "`minimum` can only be used for number types",
                "`required` can only be used for object types",
            ]
        );
    }

    #[test]
    fn test_bounds_must_be_ordered() {
        assert_eq!(
            keys(json!({"type": "integer", "minimum": 5, "maximum": 1})),
            ["The value of `maximum` must be greater than or equal to the value of `minimum`"]
        );
        assert_eq!(
            keys(json!({"type": "array", "items": {}, "minItems": 3, "maxItems": 2})),
            ["The value of `maxItems` must be greater than or equal to the value of `minItems`"]
        );
    }

    #[test]
    fn test_multiple_of_must_be_positive() {
        assert_eq!(
            keys(json!({"type": "integer", "multipleOf": -1})),
            ["The value of `multipleOf` must be greater than 0"]
        );
        assert_eq!(
            keys(json!({"type": "string", "multipleOf": 0})),
            ["`multipleOf` can only be used for number types"]
        );
        assert!(keys(json!({"type": "number", "multipleOf": 0.5})).is_empty());
    }

    #[test]
    fn test_structural_rules() {
        assert_eq!(keys(json!({"type": "array"})), ["`items` must be specified for array type"]);
        assert_eq!(
            keys(json!({"type": "object", "format": "date"})),
            ["Format is applicable only for primitive types"]
        );
        assert_eq!(
            keys(json!({"readOnly": true, "writeOnly": true})),
            ["`readOnly` and `writeOnly` are mutually exclusive and cannot be set simultaneously"]
        );
        assert_eq!(
            keys(json!({"discriminator": {"propertyName": "kind"}, "allOf": [{}]})),
            ["The `discriminator` can only be used with the keywords `anyOf` or `oneOf`"]
        );
        assert_eq!(
            keys(json!({"exclusiveMinimum": true})),
            ["When `exclusiveMinimum` is set, `minimum` is required"]
        );
    }

    #[test]
    fn test_invalid_pattern_property() {
        assert_eq!(
            keys(json!({"type": "object", "x-patternProperties": {"(": {}}})),
            ["Is not a valid regular expression"]
        );
    }

    #[test]
    fn test_valid_schema_passes() {
        assert!(keys(json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}},
            "minProperties": 1,
            "maxProperties": 4
        }))
        .is_empty());
    }

    #[test]
    fn test_keywords_report_wrong_json_types() {
        let schema = object(json!({"minLength": "two", "nullable": "yes", "pattern": "("}));
        let path = Path::from_uri("#/components/schemas/Name");
        let messages = Messages::new();
        let mut keywords = Keywords::new(&schema, &path, &messages);
        assert_eq!(keywords.count("minLength"), None);
        assert!(!keywords.flag("nullable"));
        assert!(keywords.regex("pattern").is_none());
        assert_eq!(keywords.count("maxLength"), None);

        let errors = keywords.into_errors();
        let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            [
                "#/components/schemas/Name/minLength: The value of `minLength` is invalid",
                "#/components/schemas/Name/nullable: The value of `nullable` is invalid",
                "#/components/schemas/Name/pattern: Is not a valid regular expression",
            ]
        );
    }
}
