//! Combinators: `allOf`, `anyOf`, `oneOf`, `not` and discriminated unions.
//!
//! Every subtype is converted at `path/<index>`, so the errors of a failing
//! branch can be told apart from those of its siblings.

use super::{Common, Convertible};
use crate::error::{ConvertResult, SchemaError};
use crate::graph::{Context, ConvertMode, NodeId};
use crate::messages::{MessageKey, comma_delimited, comma_delimited_indexes};
use crate::path::Path;
use crate::value::{Input, Value, merge};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// Picks the subtype named by one property of the payload.
#[derive(Debug, Clone)]
pub struct DiscriminatedType {
    common: Common,
    pub property_name: String,
    pub mapping: IndexMap<String, NodeId>,
}

impl DiscriminatedType {
    pub fn new(
        common: Common,
        property_name: impl Into<String>,
        mapping: IndexMap<String, NodeId>,
    ) -> Self {
        Self {
            common,
            property_name: property_name.into(),
            mapping,
        }
    }
}

impl Convertible for DiscriminatedType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn type_message(&self) -> MessageKey {
        MessageKey::MappingType
    }

    fn children(&self) -> Vec<NodeId> {
        self.mapping.values().copied().collect()
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
        let Some(discriminator) = value.get(&self.property_name) else {
            return Err(self.common.fail(
                path,
                MessageKey::DiscriminatorNotPresent,
                &[&self.property_name],
            ));
        };

        let Some(node) = discriminator
            .as_str()
            .and_then(|name| self.mapping.get(name))
        else {
            let allowed = comma_delimited(self.mapping.keys().map(String::as_str));
            return Err(self
                .common
                .fail(path, MessageKey::DiscriminatorNotMatch, &[&allowed]));
        };

        ctx.convert(*node, Input::Value(value), path)
    }
}

/// Valid against every subtype. The results are merged.
#[derive(Debug, Clone)]
pub struct AllOfType {
    common: Common,
    pub subtypes: Vec<NodeId>,
}

impl AllOfType {
    pub fn new(common: Common, subtypes: Vec<NodeId>) -> Self {
        Self { common, subtypes }
    }
}

impl Convertible for AllOfType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn children(&self) -> Vec<NodeId> {
        self.subtypes.clone()
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        let mut matched = Vec::with_capacity(self.subtypes.len());
        let mut failed = Vec::new();
        let mut errors = Vec::new();

        for (i, subtype) in self.subtypes.iter().enumerate() {
            match ctx.convert(*subtype, Input::Value(value), &path.child(i)) {
                Ok(converted) => matched.push(converted),
                Err(error) => {
                    error.collect_into(&mut errors)?;
                    failed.push(i);
                }
            }
        }

        if !failed.is_empty() {
            let summary = self.common.error(
                path,
                MessageKey::NotAll,
                &[&comma_delimited_indexes(&failed)],
            );
            return Err(SchemaError::new(summary).extended(errors).into());
        }

        Ok(merge(matched))
    }
}

/// Valid against at least one subtype. The first match wins.
#[derive(Debug, Clone)]
pub struct AnyOfType {
    common: Common,
    pub subtypes: Vec<NodeId>,
}

impl AnyOfType {
    pub fn new(common: Common, subtypes: Vec<NodeId>) -> Self {
        Self { common, subtypes }
    }
}

impl Convertible for AnyOfType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn children(&self) -> Vec<NodeId> {
        self.subtypes.clone()
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        let mut errors = Vec::new();

        for (i, subtype) in self.subtypes.iter().enumerate() {
            match ctx.convert(*subtype, Input::Value(value), &path.child(i)) {
                Ok(converted) => return Ok(converted),
                Err(error) => error.collect_into(&mut errors)?,
            }
        }

        let summary = self.common.error(path, MessageKey::NotAny, &[]);
        Err(SchemaError::new(summary).extended(errors).into())
    }
}

/// Valid against exactly one subtype.
#[derive(Debug, Clone)]
pub struct OneOfType {
    common: Common,
    pub subtypes: Vec<NodeId>,
}

impl OneOfType {
    pub fn new(common: Common, subtypes: Vec<NodeId>) -> Self {
        Self { common, subtypes }
    }
}

impl Convertible for OneOfType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn children(&self) -> Vec<NodeId> {
        self.subtypes.clone()
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        let mut matched = Vec::new();
        let mut errors = Vec::new();

        for (i, subtype) in self.subtypes.iter().enumerate() {
            match ctx.convert(*subtype, Input::Value(value), &path.child(i)) {
                Ok(converted) => matched.push((i, converted)),
                Err(error) => error.collect_into(&mut errors)?,
            }
        }

        if matched.len() > 1 {
            let indexes: Vec<usize> = matched.iter().map(|(i, _)| *i).collect();
            return Err(self.common.fail(
                path,
                MessageKey::Ambiguous,
                &[&comma_delimited_indexes(&indexes)],
            ));
        }

        match matched.pop() {
            Some((_, converted)) => Ok(converted),
            None => {
                let summary = self.common.error(path, MessageKey::NoOne, &[]);
                Err(SchemaError::new(summary).extended(errors).into())
            }
        }
    }
}

/// Valid only if no subtype accepts the value.
#[derive(Debug, Clone)]
pub struct NotType {
    common: Common,
    pub subtypes: Vec<NodeId>,
}

impl NotType {
    pub fn new(common: Common, subtypes: Vec<NodeId>) -> Self {
        Self { common, subtypes }
    }
}

impl Convertible for NotType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn children(&self) -> Vec<NodeId> {
        self.subtypes.clone()
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        for (i, subtype) in self.subtypes.iter().enumerate() {
            match ctx.convert(*subtype, Input::Value(value), &path.child(i)) {
                Ok(_) => return Err(self.common.fail(path, MessageKey::NotAcceptable, &[])),
                Err(error) => error.collect_into(&mut Vec::new())?,
            }
        }
        Ok(Value::from_json(value))
    }
}
