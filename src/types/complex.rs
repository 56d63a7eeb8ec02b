//! Sequence and keyed composites.

use super::{Common, Convertible, Violation};
use crate::error::{ConvertResult, SchemaError};
use crate::graph::{Context, ConvertMode, NodeId};
use crate::messages::MessageKey;
use crate::path::Path;
use crate::value::{Input, Value};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A JSON array whose items all convert through one node.
#[derive(Debug, Clone)]
pub struct ArrayType {
    common: Common,
    pub items: NodeId,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
    /// Compare items by these properties only when checking uniqueness.
    pub unique_item_properties: Option<Vec<String>>,
}

impl ArrayType {
    pub fn new(common: Common, items: NodeId) -> Self {
        Self {
            common,
            items,
            min_items: None,
            max_items: None,
            unique_items: false,
            unique_item_properties: None,
        }
    }

    pub fn with_min_items(mut self, min_items: usize) -> Self {
        self.min_items = Some(min_items);
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_unique_items(mut self, unique_items: bool) -> Self {
        self.unique_items = unique_items;
        self
    }

    pub fn with_unique_item_properties(mut self, properties: Vec<String>) -> Self {
        self.unique_items = true;
        self.unique_item_properties = Some(properties);
        self
    }

    fn has_duplicates(items: &[Value]) -> bool {
        items
            .iter()
            .enumerate()
            .any(|(i, item)| items[i + 1..].iter().any(|other| item.loosely_eq(other)))
    }

    fn check_uniqueness(&self, items: &[Value]) -> Option<MessageKey> {
        let Some(properties) = &self.unique_item_properties else {
            return Self::has_duplicates(items).then_some(MessageKey::UniqueItems);
        };

        if !items.iter().all(Value::is_mapping) {
            return Some(MessageKey::UniqueItemProperties);
        }

        let projected: Vec<Value> = items
            .iter()
            .map(|item| {
                Value::Array(
                    properties
                        .iter()
                        .map(|name| item.get(name).cloned().unwrap_or(Value::Null))
                        .collect(),
                )
            })
            .collect();
        Self::has_duplicates(&projected).then_some(MessageKey::UniqueItems)
    }
}

impl Convertible for ArrayType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn type_message(&self) -> MessageKey {
        MessageKey::ArrayType
    }

    fn children(&self) -> Vec<NodeId> {
        vec![self.items]
    }

    fn check_type(&self, value: &JsonValue, _mode: ConvertMode) -> bool {
        value.is_array()
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
        let mut result = Vec::with_capacity(items.len());
        let mut errors = Vec::new();

        for (i, item) in items.iter().enumerate() {
            match ctx.convert(self.items, Input::Value(item), &path.child(i)) {
                Ok(converted) => result.push(converted),
                Err(error) => error.collect_into(&mut errors)?,
            }
        }

        SchemaError::check(errors)?;
        Ok(Value::Array(result))
    }

    fn validate(
        &self,
        result: &Value,
        _original: &JsonValue,
        _mode: ConvertMode,
        violations: &mut Vec<Violation>,
    ) {
        let Some(items) = result.as_array() else {
            return;
        };
        let messages = &self.common.messages;
        let count = items.len();

        if let Some(min) = self.min_items.filter(|min| count < *min) {
            violations.push(Violation::from_key(messages, MessageKey::MinItems, &[&min, &count]));
        } else if let Some(max) = self.max_items.filter(|max| count > *max) {
            violations.push(Violation::from_key(messages, MessageKey::MaxItems, &[&max, &count]));
        }

        if self.unique_items {
            if let Some(key) = self.check_uniqueness(items) {
                violations.push(Violation::from_key(messages, key, &[]));
            }
        }
    }
}

/// A JSON object used as a dictionary: every value converts through one
/// node, keys are free.
#[derive(Debug, Clone)]
pub struct MapType {
    common: Common,
    pub values: NodeId,
    pub min_values: Option<usize>,
    pub max_values: Option<usize>,
}

impl MapType {
    pub fn new(common: Common, values: NodeId) -> Self {
        Self {
            common,
            values,
            min_values: None,
            max_values: None,
        }
    }

    pub fn with_min_values(mut self, min_values: usize) -> Self {
        self.min_values = Some(min_values);
        self
    }

    pub fn with_max_values(mut self, max_values: usize) -> Self {
        self.max_values = Some(max_values);
        self
    }
}

impl Convertible for MapType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn type_message(&self) -> MessageKey {
        MessageKey::MappingType
    }

    fn children(&self) -> Vec<NodeId> {
        vec![self.values]
    }

    fn check_type(&self, value: &JsonValue, _mode: ConvertMode) -> bool {
        value.is_object()
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        let mut entries: Vec<(&String, &JsonValue)> =
            value.as_object().into_iter().flatten().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut result = BTreeMap::new();
        let mut errors = Vec::new();
        for (key, item) in entries {
            match ctx.convert(self.values, Input::Value(item), &path.child(key)) {
                Ok(converted) => {
                    result.insert(key.clone(), converted);
                }
                Err(error) => error.collect_into(&mut errors)?,
            }
        }

        SchemaError::check(errors)?;
        Ok(Value::Map(result))
    }

    fn validate(
        &self,
        result: &Value,
        _original: &JsonValue,
        _mode: ConvertMode,
        violations: &mut Vec<Violation>,
    ) {
        let Value::Map(map) = result else {
            return;
        };
        let messages = &self.common.messages;
        let count = map.len();

        if let Some(min) = self.min_values.filter(|min| count < *min) {
            violations.push(Violation::from_key(messages, MessageKey::MinValues, &[&min, &count]));
        } else if let Some(max) = self.max_values.filter(|max| count > *max) {
            violations.push(Violation::from_key(messages, MessageKey::MaxValues, &[&max, &count]));
        }
    }
}
