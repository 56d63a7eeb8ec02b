//! `format` aware nodes.
//!
//! The wrappers delegate to an inner [`StringType`] for the string checks and
//! then parse the text. Responses are rendered, never parsed, so in
//! [`Entity::Response`] they return the plain string.
//!
//! Formats that only restrict the text or the number range are expressed as
//! a [`FormatValidator`] attached to a plain string or integer node.

use super::primitive::matches_from_start;
use super::{Common, Convertible, StringType, Validator, Violation};
use crate::error::ConvertResult;
use crate::graph::{Context, ConvertMode, Entity, NodeId};
use crate::messages::{MessageKey, Messages};
use crate::path::Path;
use crate::value::{Input, Value};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;
use uuid::Uuid;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").ok());

static UUID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-f0-9]{8}-[a-f0-9]{4}-[1345][a-f0-9]{3}-[a-f0-9]{4}-[a-f0-9]{12}$").ok()
});

fn is_match(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    pattern
        .as_ref()
        .is_some_and(|regex| matches_from_start(regex, text))
}

macro_rules! string_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            inner: StringType,
        }

        impl $name {
            pub fn new(inner: StringType) -> Self {
                Self { inner }
            }

            pub fn inner(&self) -> &StringType {
                &self.inner
            }
        }
    };
}

string_wrapper!(
    /// `format: date`. Parses RFC 3339 full-dates.
    DateType
);
string_wrapper!(
    /// `format: date-time`. Parses RFC 3339 timestamps, keeping the offset.
    DateTimeType
);
string_wrapper!(
    /// `format: regex`. The text must compile as a regular expression.
    RegexType
);
string_wrapper!(
    /// `format: uuid`. Parses hyphenated lowercase UUIDs.
    UuidType
);
string_wrapper!(
    /// `format: byte`. Base64 text: decoded in requests, encoded in
    /// responses.
    ByteType
);

impl DateType {
    fn parse(&self, text: &str, path: &Path) -> ConvertResult<Value> {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| self.inner.common().fail(path, MessageKey::DateFormat, &[]))
    }
}

impl DateTimeType {
    fn parse(&self, text: &str, path: &Path) -> ConvertResult<Value> {
        DateTime::parse_from_rfc3339(text)
            .map(Value::DateTime)
            .map_err(|_| self.inner.common().fail(path, MessageKey::DateTimeFormat, &[]))
    }
}

impl RegexType {
    fn parse(&self, text: &str, path: &Path) -> ConvertResult<Value> {
        Regex::new(text)
            .map(|_| Value::String(text.to_string()))
            .map_err(|_| self.inner.common().fail(path, MessageKey::RegexFormat, &[]))
    }
}

/// Parse the converted string unless the conversion renders a response.
macro_rules! parse_after_string {
    ($name:ident) => {
        impl Convertible for $name {
            fn common(&self) -> &Common {
                self.inner.common()
            }

            fn children(&self) -> Vec<NodeId> {
                self.inner.children()
            }

            fn convert(
                &self,
                input: Input<'_>,
                path: &Path,
                ctx: &mut Context<'_>,
            ) -> ConvertResult<Value> {
                let result = self.inner.convert(input, path, ctx)?;
                if ctx.entity() == Entity::Response {
                    return Ok(result);
                }
                match result.as_str() {
                    Some(text) => self.parse(text, path),
                    None => Ok(result),
                }
            }
        }
    };
}

parse_after_string!(DateType);
parse_after_string!(DateTimeType);
parse_after_string!(RegexType);

impl Convertible for UuidType {
    fn common(&self) -> &Common {
        self.inner.common()
    }

    fn convert(&self, input: Input<'_>, path: &Path, ctx: &mut Context<'_>) -> ConvertResult<Value> {
        let result = self.inner.convert(input, path, ctx)?;
        let Some(text) = result.as_str() else {
            return Ok(result);
        };

        let parsed = is_match(&UUID_PATTERN, text)
            .then(|| Uuid::try_parse(text).ok())
            .flatten();
        match parsed {
            None => Err(self.inner.common().fail(path, MessageKey::UuidFormat, &[])),
            Some(_) if ctx.entity() == Entity::Response => Ok(result),
            Some(uuid) => Ok(Value::Uuid(uuid)),
        }
    }
}

impl Convertible for ByteType {
    fn common(&self) -> &Common {
        self.inner.common()
    }

    fn convert(&self, input: Input<'_>, path: &Path, ctx: &mut Context<'_>) -> ConvertResult<Value> {
        match ctx.entity() {
            Entity::Response => {
                let encoded = match input.value() {
                    Some(JsonValue::String(raw)) => {
                        Some(JsonValue::String(STANDARD.encode(raw.as_bytes())))
                    }
                    _ => None,
                };
                match &encoded {
                    Some(encoded) => self.inner.convert(Input::Value(encoded), path, ctx),
                    None => self.inner.convert(input, path, ctx),
                }
            }
            Entity::Request => {
                let result = self.inner.convert(input, path, ctx)?;
                match result.as_str() {
                    Some(text) => STANDARD
                        .decode(text)
                        .map(Value::Bytes)
                        .map_err(|_| self.inner.common().fail(path, MessageKey::ByteFormat, &[])),
                    None => Ok(result),
                }
            }
            Entity::Specification => self.inner.convert(input, path, ctx),
        }
    }
}

/// Restrictions a `format` places on an otherwise plain string or integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCheck {
    Email,
    Uri,
    Int32,
    Int64,
}

impl FormatCheck {
    fn message_key(self) -> MessageKey {
        match self {
            FormatCheck::Email => MessageKey::EmailFormat,
            FormatCheck::Uri => MessageKey::UriFormat,
            FormatCheck::Int32 => MessageKey::Int32Format,
            FormatCheck::Int64 => MessageKey::Int64Format,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (FormatCheck::Email, Value::String(text)) => is_match(&EMAIL_PATTERN, text),
            (FormatCheck::Uri, Value::String(text)) => url::Url::parse(text).is_ok(),
            (FormatCheck::Int32, Value::Integer(i)) => i32::try_from(*i).is_ok(),
            (FormatCheck::Int64, Value::Number(_)) => false,
            _ => true,
        }
    }
}

/// A [`FormatCheck`] with the messages of the node it is attached to.
#[derive(Debug, Clone)]
pub struct FormatValidator {
    check: FormatCheck,
    messages: Messages,
}

impl FormatValidator {
    pub fn new(check: FormatCheck, messages: Messages) -> Self {
        Self { check, messages }
    }
}

impl Validator for FormatValidator {
    fn validate(&self, value: &Value, _original: &JsonValue, _mode: ConvertMode) -> Option<Violation> {
        if self.check.accepts(value) {
            None
        } else {
            Some(Violation::from_key(
                &self.messages,
                self.check.message_key(),
                &[],
            ))
        }
    }
}
