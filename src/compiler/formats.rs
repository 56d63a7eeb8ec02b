//! Format factories.
//!
//! A schema with both `type` and `format` is first compiled to the plain
//! node of its type; the factory registered for the pair then turns that
//! node into the final one.

use super::keywords::SchemaType;
use crate::types::{
    BooleanType, ByteType, Convertible, DateTimeType, DateType, FormatCheck, FormatValidator,
    IntegerType, NumberType, RegexType, StringType, UuidType,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The node a typed schema compiles to before its format is applied.
#[derive(Debug)]
pub enum PlainNode {
    String(StringType),
    Number(NumberType),
    Integer(IntegerType),
    Boolean(BooleanType),
}

impl PlainNode {
    pub fn schema_type(&self) -> SchemaType {
        match self {
            PlainNode::String(_) => SchemaType::String,
            PlainNode::Number(_) => SchemaType::Number,
            PlainNode::Integer(_) => SchemaType::Integer,
            PlainNode::Boolean(_) => SchemaType::Boolean,
        }
    }

    pub fn into_boxed(self) -> Box<dyn Convertible> {
        match self {
            PlainNode::String(node) => Box::new(node),
            PlainNode::Number(node) => Box::new(node),
            PlainNode::Integer(node) => Box::new(node),
            PlainNode::Boolean(node) => Box::new(node),
        }
    }
}

pub type FormatFactory = Arc<dyn Fn(PlainNode) -> Box<dyn Convertible> + Send + Sync>;

fn string_format<F, N>(wrap: F) -> FormatFactory
where
    F: Fn(StringType) -> N + Send + Sync + 'static,
    N: Convertible + 'static,
{
    Arc::new(move |node| match node {
        PlainNode::String(inner) => Box::new(wrap(inner)),
        other => other.into_boxed(),
    })
}

fn checked(check: FormatCheck) -> FormatFactory {
    Arc::new(move |node| match node {
        PlainNode::String(mut inner) => {
            let validator = FormatValidator::new(check, inner.common().messages.clone());
            inner.common_mut().validators.push(Arc::new(validator));
            Box::new(inner)
        }
        PlainNode::Integer(mut inner) => {
            let validator = FormatValidator::new(check, inner.common().messages.clone());
            inner.common_mut().validators.push(Arc::new(validator));
            Box::new(inner)
        }
        other => other.into_boxed(),
    })
}

fn plain() -> FormatFactory {
    Arc::new(PlainNode::into_boxed)
}

/// Factories keyed by `(type, format)`.
#[derive(Clone)]
pub struct FormatRegistry {
    factories: HashMap<(SchemaType, String), FormatFactory>,
}

impl FormatRegistry {
    /// A registry with the built-in formats.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(SchemaType::Integer, "int32", checked(FormatCheck::Int32));
        registry.register(SchemaType::Integer, "int64", checked(FormatCheck::Int64));
        registry.register(SchemaType::Number, "float", plain());
        registry.register(SchemaType::Number, "double", plain());
        registry.register(SchemaType::String, "byte", string_format(ByteType::new));
        registry.register(SchemaType::String, "binary", plain());
        registry.register(SchemaType::String, "date", string_format(DateType::new));
        registry.register(SchemaType::String, "date-time", string_format(DateTimeType::new));
        registry.register(SchemaType::String, "password", plain());
        registry.register(SchemaType::String, "regex", string_format(RegexType::new));
        registry.register(SchemaType::String, "uuid", string_format(UuidType::new));
        registry.register(SchemaType::String, "email", checked(FormatCheck::Email));
        registry.register(SchemaType::String, "uri", checked(FormatCheck::Uri));
        registry
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Install or replace the factory of a format.
    pub fn register(
        &mut self,
        schema_type: SchemaType,
        format: impl Into<String>,
        factory: FormatFactory,
    ) {
        self.factories.insert((schema_type, format.into()), factory);
    }

    pub fn get(&self, schema_type: SchemaType, format: &str) -> Option<&FormatFactory> {
        self.factories.get(&(schema_type, format.to_string()))
    }

    pub fn contains(&self, schema_type: SchemaType, format: &str) -> bool {
        self.get(schema_type, format).is_some()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .factories
            .keys()
            .map(|(schema_type, format)| format!("{}/{}", schema_type, format))
            .collect();
        keys.sort();
        f.debug_struct("FormatRegistry").field("formats", &keys).finish()
    }
}
