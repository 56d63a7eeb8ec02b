//! Convertible nodes.
//!
//! A compiled schema is a graph of [`Convertible`] nodes. Every node runs the
//! same pipeline, provided by [`Convertible::convert`]:
//!
//! 1. `null` yields `null` for nullable nodes and an error otherwise.
//! 2. An absent value fails with [`ConvertError::UndefinedResult`] in
//!    responses; elsewhere the node's default replaces it, if there is one.
//! 3. [`cast`](Convertible::cast) coerces the value (lenient modes only).
//! 4. [`check_type`](Convertible::check_type) rejects values of the wrong
//!    JSON type.
//! 5. [`convert_value`](Convertible::convert_value) produces the result,
//!    recursing into child nodes through the [`Context`].
//! 6. Every validator runs against the result and the cast input. All failing
//!    validators are reported together.
//!
//! Nodes that only forward to another node ([`LazyType`],
//! [`ReferenceType`]) override `convert` itself.

pub mod complex;
pub mod formats;
pub mod misc;
pub mod object;
pub mod polymorphic;
pub mod primitive;
pub mod reference;


pub use complex::{ArrayType, MapType};
pub use formats::{
    ByteType, DateTimeType, DateType, FormatCheck, FormatValidator, RegexType, UuidType,
};
pub use misc::{AnyType, LazyType};
pub use object::{AdditionalProperties, ObjectType, ObjectTypeBuilder};
pub use polymorphic::{AllOfType, AnyOfType, DiscriminatedType, NotType, OneOfType};
pub use primitive::{BooleanType, IntegerType, NumberType, NumericBounds, StringType};
pub use reference::{ReferenceType, Registry, ResultState};

use crate::error::{ConvertError, ConvertResult, Error, ErrorKind, SchemaError};
use crate::graph::{Context, ConvertMode, Entity, NodeId};
use crate::messages::{MessageKey, Messages, comma_delimited};
use crate::path::Path;
use crate::value::{Input, Value, json_eq, render};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A single failed check, before it is attached to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ErrorKind,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build a violation from a message table entry.
    pub fn from_key(messages: &Messages, key: MessageKey, args: &[&dyn fmt::Display]) -> Self {
        Self::new(key.kind(), messages.format(key, args))
    }

    pub fn at(self, path: &Path) -> Error {
        Error::new(path.clone(), self.kind, self.message)
    }
}

/// An extra check attached to a node.
///
/// `value` is the converted result, `original` the input after casting.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value, original: &JsonValue, mode: ConvertMode)
    -> Option<Violation>;
}

impl<F> Validator for F
where
    F: Fn(&Value, &JsonValue, ConvertMode) -> Option<Violation> + Send + Sync,
{
    fn validate(
        &self,
        value: &Value,
        original: &JsonValue,
        mode: ConvertMode,
    ) -> Option<Violation> {
        self(value, original, mode)
    }
}

/// Value substituted for an absent input.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(JsonValue),
    /// Evaluated every time a default is needed.
    Computed(Arc<dyn Fn() -> JsonValue + Send + Sync>),
}

impl DefaultValue {
    pub fn get(&self) -> JsonValue {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Attributes shared by every typed node.
#[derive(Clone, Default)]
pub struct Common {
    pub messages: Messages,
    pub default: Option<DefaultValue>,
    pub nullable: bool,
    /// Closed set of legal values, compared against the cast input.
    pub enumeration: Option<Vec<JsonValue>>,
    pub validators: Vec<Arc<dyn Validator>>,
}

impl Common {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_default(mut self, value: JsonValue) -> Self {
        self.default = Some(DefaultValue::Literal(value));
        self
    }

    pub fn with_computed_default<F>(mut self, f: F) -> Self
    where
        F: Fn() -> JsonValue + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Computed(Arc::new(f)));
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_enum(mut self, values: Vec<JsonValue>) -> Self {
        self.enumeration = Some(values);
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn default_value(&self) -> Option<JsonValue> {
        self.default.as_ref().map(DefaultValue::get)
    }

    /// An error at `path` built from this node's message table.
    pub fn error(&self, path: &Path, key: MessageKey, args: &[&dyn fmt::Display]) -> Error {
        Violation::from_key(&self.messages, key, args).at(path)
    }

    /// Same as [`error`](Self::error), ready to be returned from a conversion.
    pub fn fail(&self, path: &Path, key: MessageKey, args: &[&dyn fmt::Display]) -> ConvertError {
        ConvertError::Schema(SchemaError::new(self.error(path, key, args)))
    }

    fn validate_enum(&self, original: &JsonValue) -> Option<Violation> {
        let values = self.enumeration.as_ref()?;
        if values.is_empty() || values.iter().any(|allowed| json_eq(allowed, original)) {
            return None;
        }
        let allowed = comma_delimited(values.iter().map(render));
        Some(Violation::from_key(
            &self.messages,
            MessageKey::Enum,
            &[&allowed],
        ))
    }
}

impl fmt::Debug for Common {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Common")
            .field("default", &self.default)
            .field("nullable", &self.nullable)
            .field("enumeration", &self.enumeration)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// A node of the conversion graph.
pub trait Convertible: fmt::Debug + Send + Sync {
    fn common(&self) -> &Common;

    /// Message reported when [`check_type`](Self::check_type) fails.
    fn type_message(&self) -> MessageKey {
        MessageKey::UnexpectedType
    }

    /// Nodes this node converts through. Used to validate a graph when it is
    /// built.
    fn children(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn cast<'v>(
        &self,
        value: Cow<'v, JsonValue>,
        _path: &Path,
        _mode: ConvertMode,
    ) -> ConvertResult<Cow<'v, JsonValue>> {
        Ok(value)
    }

    fn check_type(&self, _value: &JsonValue, _mode: ConvertMode) -> bool {
        true
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        _path: &Path,
        _ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        Ok(Value::from_json(value))
    }

    /// Node specific checks, run after conversion.
    fn validate(
        &self,
        _result: &Value,
        _original: &JsonValue,
        _mode: ConvertMode,
        _violations: &mut Vec<Violation>,
    ) {
    }

    fn convert(&self, input: Input<'_>, path: &Path, ctx: &mut Context<'_>) -> ConvertResult<Value> {
        let common = self.common();
        let mode = ctx.mode();

        let value: Cow<'_, JsonValue> = match input {
            Input::Value(value) => Cow::Borrowed(value),
            Input::Undefined => {
                // Nothing is ever defaulted into a response
                if mode.entity == Entity::Response {
                    return Err(ConvertError::UndefinedResult);
                }
                match common.default_value() {
                    Some(default) => Cow::Owned(default),
                    None => return Err(ConvertError::UndefinedResult),
                }
            }
        };

        if value.is_null() {
            if common.nullable {
                return Ok(Value::Null);
            }
            return Err(common.fail(path, MessageKey::Nullable, &[]));
        }

        let value = self.cast(value, path, mode)?;

        if !self.check_type(&value, mode) {
            return Err(common.fail(path, self.type_message(), &[]));
        }

        let result = self.convert_value(&value, path, ctx)?;

        let mut violations = Vec::new();
        violations.extend(common.validate_enum(&value));
        self.validate(&result, &value, mode, &mut violations);
        violations.extend(
            common
                .validators
                .iter()
                .filter_map(|validator| validator.validate(&result, &value, mode)),
        );

        let errors = violations.into_iter().map(|v| v.at(path)).collect();
        SchemaError::check(errors)?;

        Ok(result)
    }
}
