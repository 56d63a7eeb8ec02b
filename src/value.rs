//! Conversion inputs and outputs.
//!
//! Payloads come in as [`serde_json::Value`] wrapped in an [`Input`], which
//! additionally distinguishes an absent value ([`Undefined`]) from `null`.
//! Converted results are [`Value`]s: JSON-like data enriched with the typed
//! values produced by format converters, and with [`Object`], which keeps the
//! declared, pattern-matched and additional properties of an object apart.

use crate::path::Path;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Marker for "no value supplied", distinct from `null`.
///
/// It deliberately implements neither `PartialEq` nor `PartialOrd`.
#[derive(Debug, Clone, Copy)]
pub struct Undefined;

/// A value handed to a node for conversion.
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    Undefined,
    Value(&'a JsonValue),
}

impl<'a> Input<'a> {
    /// `None` becomes [`Input::Undefined`].
    pub fn from_option(value: Option<&'a JsonValue>) -> Self {
        match value {
            Some(value) => Input::Value(value),
            None => Input::Undefined,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Input::Undefined)
    }

    pub fn value(&self) -> Option<&'a JsonValue> {
        match self {
            Input::Value(value) => Some(value),
            Input::Undefined => None,
        }
    }
}

impl<'a> From<&'a JsonValue> for Input<'a> {
    fn from(value: &'a JsonValue) -> Self {
        Input::Value(value)
    }
}

impl From<Undefined> for Input<'_> {
    fn from(_: Undefined) -> Self {
        Input::Undefined
    }
}

/// A converted value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Object),
    /// A value that was still being converted when it was referenced again.
    /// The converted value is in [`Converted::links`](crate::graph::Converted).
    Link(Path),
}

impl Value {
    /// Take a JSON value over as is.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render back to JSON. Typed values become their textual form.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            Value::Uuid(u) => JsonValue::String(u.hyphenated().to_string()),
            Value::Bytes(bytes) => JsonValue::String(STANDARD.encode(bytes)),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Object(object) => JsonValue::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Link(path) => serde_json::json!({ "$ref": path.to_string() }),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` for [`Value::Map`] and [`Value::Object`].
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Look a key up in a map or an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::Object(object) => object.get(key),
            _ => None,
        }
    }

    fn entries(&self) -> Option<BTreeMap<&str, &Value>> {
        match self {
            Value::Map(map) => Some(map.iter().map(|(k, v)| (k.as_str(), v)).collect()),
            Value::Object(object) => Some(object.iter().map(|(k, v)| (k.as_str(), v)).collect()),
            _ => None,
        }
    }

    /// Equality used for uniqueness checks.
    ///
    /// Integers and numbers compare by numeric value, booleans never equal
    /// numbers, and maps compare equal to objects with the same entries.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(_) | Value::Number(_), Value::Integer(_) | Value::Number(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_eq(y))
            }
            (left, right) if left.is_mapping() && right.is_mapping() => {
                match (left.entries(), right.entries()) {
                    (Some(a), Some(b)) => {
                        a.len() == b.len()
                            && a.iter()
                                .all(|(k, v)| b.get(k).is_some_and(|w| v.loosely_eq(w)))
                    }
                    _ => false,
                }
            }
            _ => self == other,
        }
    }
}

impl From<&JsonValue> for Value {
    fn from(value: &JsonValue) -> Self {
        Value::from_json(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::DateTime(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Value::Uuid(u) => serializer.collect_str(&u.hyphenated()),
            Value::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Value::Array(items) => items.serialize(serializer),
            Value::Map(map) => map.serialize(serializer),
            Value::Object(object) => object.serialize(serializer),
            Value::Link(path) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$ref", path)?;
                map.end()
            }
        }
    }
}

/// The result of converting an object.
///
/// Property names are unique across the three buckets, with the declared
/// properties taking precedence over pattern properties, and pattern
/// properties over additional ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    pub properties: IndexMap<String, Value>,
    pub pattern_properties: IndexMap<String, Value>,
    pub additional_properties: IndexMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties
            .get(key)
            .or_else(|| self.pattern_properties.get(key))
            .or_else(|| self.additional_properties.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.properties.len() + self.pattern_properties.len() + self.additional_properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries: declared first, then pattern, then additional.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.properties
            .iter()
            .chain(self.pattern_properties.iter())
            .chain(self.additional_properties.iter())
    }

    /// Remove `key` from whichever buckets hold it.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let declared = self.properties.shift_remove(key);
        let pattern = self.pattern_properties.shift_remove(key);
        let additional = self.additional_properties.shift_remove(key);
        declared.or(pattern).or(additional)
    }

    /// Fold another mapping result into this one.
    ///
    /// An [`Object`] updates bucket by bucket; a plain map lands in the
    /// additional bucket. Other values are ignored.
    pub fn absorb(&mut self, value: Value) {
        match value {
            Value::Object(other) => {
                self.properties.extend(other.properties);
                self.pattern_properties.extend(other.pattern_properties);
                self.additional_properties.extend(other.additional_properties);
            }
            Value::Map(map) => self.additional_properties.extend(map),
            _ => return,
        }

        for key in self.properties.keys() {
            self.pattern_properties.shift_remove(key);
            self.additional_properties.shift_remove(key);
        }
        for key in self.pattern_properties.keys() {
            self.additional_properties.shift_remove(key);
        }
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Merge the results of every `allOf` branch.
///
/// Mappings merge left to right into one [`Object`]; arrays merge element by
/// element with the same rule; otherwise the last result wins.
pub fn merge(results: Vec<Value>) -> Value {
    if results.iter().all(Value::is_mapping) {
        return Value::Object(merge_mappings(results));
    }

    if results.iter().all(|value| matches!(value, Value::Array(_))) {
        let arrays: Vec<Vec<Value>> = results
            .into_iter()
            .filter_map(|value| match value {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .collect();
        let len = arrays.iter().map(Vec::len).min().unwrap_or(0);
        let mut columns: Vec<_> = arrays.into_iter().map(IntoIterator::into_iter).collect();

        let mut merged = Vec::with_capacity(len);
        for _ in 0..len {
            let column: Vec<Value> = columns.iter_mut().filter_map(Iterator::next).collect();
            if column.iter().all(Value::is_mapping) {
                merged.push(Value::Object(merge_mappings(column)));
            } else {
                merged.push(column.into_iter().last().unwrap_or(Value::Null));
            }
        }
        return Value::Array(merged);
    }

    results.into_iter().last().unwrap_or(Value::Null)
}

fn merge_mappings(results: Vec<Value>) -> Object {
    let mut object = Object::new();
    for result in results {
        object.absorb(result);
    }
    object
}

/// Text used for a JSON value inside an error message. Strings appear
/// without quotes.
pub fn render(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric-aware JSON equality: `1` equals `1.0`.
pub fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(properties: &[(&str, Value)], additional: &[(&str, Value)]) -> Value {
        Value::Object(Object {
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            pattern_properties: IndexMap::new(),
            additional_properties: additional
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        })
    }

    #[test]
    fn test_merge_declared_wins_over_additional() {
        let merged = merge(vec![
            object(&[("a", Value::String("x".into()))], &[("b", Value::String("raw".into()))]),
            object(&[("b", Value::Integer(1))], &[]),
        ]);

        let merged = merged.as_object().unwrap();
        assert_eq!(merged.properties.len(), 2);
        assert!(merged.additional_properties.is_empty());
        assert_eq!(merged.get("b"), Some(&Value::Integer(1)));
        assert_eq!(
            serde_json::to_value(merged).unwrap(),
            json!({"a": "x", "b": 1})
        );
    }

    #[test]
    fn test_merge_later_declared_overrides_earlier() {
        let merged = merge(vec![
            object(&[("a", Value::Integer(1))], &[]),
            object(&[("a", Value::Integer(2))], &[]),
        ]);
        assert_eq!(merged.get("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_merge_arrays_elementwise() {
        let merged = merge(vec![
            Value::Array(vec![object(&[("a", Value::Integer(1))], &[]), Value::Integer(1)]),
            Value::Array(vec![object(&[("b", Value::Integer(2))], &[]), Value::Integer(2)]),
        ]);
        let items = merged.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("a"), Some(&Value::Integer(1)));
        assert_eq!(items[0].get("b"), Some(&Value::Integer(2)));
        assert_eq!(items[1], Value::Integer(2));
    }

    #[test]
    fn test_merge_mixed_takes_last() {
        let merged = merge(vec![Value::Integer(1), Value::String("s".into())]);
        assert_eq!(merged, Value::String("s".into()));
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Integer(1).loosely_eq(&Value::Number(1.0)));
        assert!(!Value::Bool(true).loosely_eq(&Value::Integer(1)));

        let map = Value::from_json(&json!({"a": 1}));
        assert!(map.loosely_eq(&object(&[("a", Value::Integer(1))], &[])));
    }

    #[test]
    fn test_typed_values_serialize_as_text() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        assert_eq!(serde_json::to_value(Value::Date(date)).unwrap(), json!("2020-01-31"));
        assert_eq!(
            serde_json::to_value(Value::Bytes(b"hi".to_vec())).unwrap(),
            json!("aGk=")
        );
        assert_eq!(
            serde_json::to_value(Value::Link(Path::from_uri("#/a"))).unwrap(),
            json!({"$ref": "#/a"})
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let payload = json!({"a": [1, 2.5, "x", null, true]});
        assert_eq!(Value::from_json(&payload).to_json(), payload);
    }

    #[test]
    fn test_json_eq_is_numeric() {
        assert!(json_eq(&json!(1), &json!(1.0)));
        assert!(!json_eq(&json!(1), &json!("1")));
        assert_eq!(render(&json!("a")), "a");
        assert_eq!(render(&json!(1)), "1");
    }

    #[test]
    fn test_input_from_option() {
        assert!(Input::from_option(None).is_undefined());
        let value = json!(1);
        assert!(Input::from_option(Some(&value)).value().is_some());
        assert!(Input::from(Undefined).is_undefined());
    }
}
