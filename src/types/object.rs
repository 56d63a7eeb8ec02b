//! The object composite.
//!
//! An object sorts every input key into one of three buckets of the
//! resulting [`Object`]: declared properties, properties matched by a
//! pattern, and additional properties. Which declared properties are
//! required, forbidden or skipped depends on the entity being converted:
//! read-only properties may not appear in a request and write-only
//! properties may not appear in a response.

use super::primitive::matches_from_start;
use super::{Common, Convertible, Violation};
use crate::error::{BuildError, BuildResult, ConvertError, ConvertResult, SchemaError};
use crate::graph::{Context, ConvertMode, Entity, NodeId};
use crate::messages::{MessageKey, comma_delimited};
use crate::path::Path;
use crate::value::{Input, Object, Value};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

/// Policy for keys that are neither declared nor matched by a pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdditionalProperties {
    /// Keep them verbatim.
    #[default]
    Allow,
    /// Report them all in one error.
    Deny,
    /// Convert them through a node.
    Schema(NodeId),
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    common: Common,
    properties: IndexMap<String, NodeId>,
    required: BTreeSet<String>,
    pattern_properties: Vec<(Regex, NodeId)>,
    additional_properties: AdditionalProperties,
    read_only: BTreeSet<String>,
    write_only: BTreeSet<String>,
    min_properties: Option<usize>,
    max_properties: Option<usize>,
}

impl ObjectType {
    pub fn builder(common: Common) -> ObjectTypeBuilder {
        ObjectTypeBuilder::new(common)
    }

    pub fn properties(&self) -> &IndexMap<String, NodeId> {
        &self.properties
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn additional_properties(&self) -> AdditionalProperties {
        self.additional_properties
    }

    pub fn read_only(&self) -> &BTreeSet<String> {
        &self.read_only
    }

    pub fn write_only(&self) -> &BTreeSet<String> {
        &self.write_only
    }

    /// Properties the entity must not send, with the message used when it
    /// does.
    fn excluded(&self, entity: Entity) -> Option<(&BTreeSet<String>, MessageKey)> {
        match entity {
            Entity::Request => Some((&self.read_only, MessageKey::ReadOnly)),
            Entity::Response => Some((&self.write_only, MessageKey::WriteOnly)),
            Entity::Specification => None,
        }
    }

    fn pattern_for(&self, key: &str) -> Option<NodeId> {
        self.pattern_properties
            .iter()
            .find(|(pattern, _)| matches_from_start(pattern, key))
            .map(|(_, node)| *node)
    }
}

impl Convertible for ObjectType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn type_message(&self) -> MessageKey {
        MessageKey::MappingType
    }

    fn children(&self) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self.properties.values().copied().collect();
        children.extend(self.pattern_properties.iter().map(|(_, node)| *node));
        if let AdditionalProperties::Schema(node) = self.additional_properties {
            children.push(node);
        }
        children
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
        let Some(input) = value.as_object() else {
            return Err(self.common.fail(path, MessageKey::MappingType, &[]));
        };
        let excluded = self.excluded(ctx.entity());
        let is_excluded =
            |name: &str| excluded.is_some_and(|(names, _)| names.contains(name));

        let mut errors = Vec::new();
        let mut result = Object::new();

        if let Some((names, key)) = excluded {
            let present: Vec<&String> = names
                .iter()
                .filter(|name| input.contains_key(name.as_str()))
                .collect();
            if !present.is_empty() {
                errors.push(self.common.error(path, key, &[&comma_delimited(present)]));
            }
        }

        let missing: BTreeSet<&str> = self
            .required
            .iter()
            .map(String::as_str)
            .filter(|name| !is_excluded(name) && !input.contains_key(*name))
            .collect();
        for name in &missing {
            errors.push(self.common.error(path, MessageKey::Required, &[name]));
        }

        let mut unexpected = Vec::new();
        for (key, item) in input {
            if self.properties.contains_key(key) {
                continue;
            }

            let target = match (self.pattern_for(key), self.additional_properties) {
                (Some(node), _) => Some((node, true)),
                (None, AdditionalProperties::Schema(node)) => Some((node, false)),
                (None, AdditionalProperties::Allow) => {
                    result
                        .additional_properties
                        .insert(key.clone(), Value::from_json(item));
                    None
                }
                (None, AdditionalProperties::Deny) => {
                    unexpected.push(key.as_str());
                    None
                }
            };

            if let Some((node, by_pattern)) = target {
                match ctx.convert(node, Input::Value(item), &path.child(key)) {
                    Ok(converted) if by_pattern => {
                        result.pattern_properties.insert(key.clone(), converted);
                    }
                    Ok(converted) => {
                        result.additional_properties.insert(key.clone(), converted);
                    }
                    Err(error) => error.collect_into(&mut errors)?,
                }
            }
        }

        if !unexpected.is_empty() {
            errors.push(self.common.error(
                path,
                MessageKey::AdditionalProperties,
                &[&comma_delimited(unexpected)],
            ));
        }

        for (name, node) in &self.properties {
            if missing.contains(name.as_str()) || is_excluded(name) {
                continue;
            }
            let item = Input::from_option(input.get(name));
            match ctx.convert(*node, item, &path.child(name)) {
                Ok(converted) => {
                    result.properties.insert(name.clone(), converted);
                }
                // Absent and not defaulted: leave it out
                Err(ConvertError::UndefinedResult) => {}
                Err(error) => error.collect_into(&mut errors)?,
            }
        }

        SchemaError::check(errors)?;
        Ok(Value::Object(result))
    }

    fn validate(
        &self,
        _result: &Value,
        original: &JsonValue,
        _mode: ConvertMode,
        violations: &mut Vec<Violation>,
    ) {
        let Some(count) = original.as_object().map(serde_json::Map::len) else {
            return;
        };
        let messages = &self.common.messages;

        if let Some(min) = self.min_properties.filter(|min| count < *min) {
            violations.push(Violation::from_key(
                messages,
                MessageKey::MinProperties,
                &[&min, &count],
            ));
        } else if let Some(max) = self.max_properties.filter(|max| count > *max) {
            violations.push(Violation::from_key(
                messages,
                MessageKey::MaxProperties,
                &[&max, &count],
            ));
        }
    }
}

/// Assembles an [`ObjectType`], checking its invariants on
/// [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ObjectTypeBuilder {
    common: Common,
    properties: IndexMap<String, NodeId>,
    required: BTreeSet<String>,
    pattern_properties: Vec<(String, NodeId)>,
    additional_properties: AdditionalProperties,
    read_only: BTreeSet<String>,
    write_only: BTreeSet<String>,
    min_properties: Option<usize>,
    max_properties: Option<usize>,
}

impl ObjectTypeBuilder {
    pub fn new(common: Common) -> Self {
        Self {
            common,
            ..Self::default()
        }
    }

    pub fn property(mut self, name: impl Into<String>, node: NodeId) -> Self {
        self.properties.insert(name.into(), node);
        self
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Keys matching `pattern` from their first character convert through
    /// `node`. Patterns are tried in the order they were added.
    pub fn pattern_property(mut self, pattern: impl Into<String>, node: NodeId) -> Self {
        self.pattern_properties.push((pattern.into(), node));
        self
    }

    pub fn additional_properties(mut self, policy: AdditionalProperties) -> Self {
        self.additional_properties = policy;
        self
    }

    pub fn read_only(mut self, name: impl Into<String>) -> Self {
        self.read_only.insert(name.into());
        self
    }

    pub fn write_only(mut self, name: impl Into<String>) -> Self {
        self.write_only.insert(name.into());
        self
    }

    pub fn min_properties(mut self, min: usize) -> Self {
        self.min_properties = Some(min);
        self
    }

    pub fn max_properties(mut self, max: usize) -> Self {
        self.max_properties = Some(max);
        self
    }

    pub fn build(self) -> BuildResult<ObjectType> {
        let overlap: Vec<&String> = self.read_only.intersection(&self.write_only).collect();
        if !overlap.is_empty() {
            return Err(BuildError::ReadWriteOverlap(comma_delimited(overlap)));
        }

        let unknown: Vec<&String> = self
            .read_only
            .iter()
            .chain(&self.write_only)
            .filter(|name| !self.properties.contains_key(name.as_str()))
            .collect();
        if !unknown.is_empty() {
            return Err(BuildError::UnknownProperty(comma_delimited(unknown)));
        }

        let pattern_properties = self
            .pattern_properties
            .into_iter()
            .map(|(pattern, node)| {
                Regex::new(&pattern)
                    .map(|regex| (regex, node))
                    .map_err(|e| BuildError::InvalidPattern {
                        pattern,
                        message: e.to_string(),
                    })
            })
            .collect::<BuildResult<Vec<_>>>()?;

        Ok(ObjectType {
            common: self.common,
            properties: self.properties,
            required: self.required,
            pattern_properties,
            additional_properties: self.additional_properties,
            read_only: self.read_only,
            write_only: self.write_only,
            min_properties: self.min_properties,
            max_properties: self.max_properties,
        })
    }
}
