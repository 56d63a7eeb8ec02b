//! String, number, integer and boolean leaves.

use super::{Common, Convertible, Violation};
use crate::error::ConvertResult;
use crate::graph::{Context, ConvertMode};
use crate::messages::{MessageKey, Messages};
use crate::path::Path;
use crate::value::Value;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::borrow::Cow;

/// `true` if `regex` matches at the very beginning of `text`.
pub(crate) fn matches_from_start(regex: &Regex, text: &str) -> bool {
    regex.find(text).is_some_and(|m| m.start() == 0)
}

#[derive(Debug, Clone)]
pub struct StringType {
    common: Common,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
}

impl StringType {
    pub fn new(common: Common) -> Self {
        Self {
            common,
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub(crate) fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }
}

impl Convertible for StringType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn type_message(&self) -> MessageKey {
        MessageKey::StringType
    }

    fn cast<'v>(
        &self,
        value: Cow<'v, JsonValue>,
        path: &Path,
        mode: ConvertMode,
    ) -> ConvertResult<Cow<'v, JsonValue>> {
        if value.is_string() || mode.strict {
            return Ok(value);
        }
        match value.as_ref() {
            JsonValue::Number(n) => Ok(Cow::Owned(JsonValue::String(n.to_string()))),
            JsonValue::Bool(b) => Ok(Cow::Owned(JsonValue::String(b.to_string()))),
            _ => Err(self.common.fail(path, MessageKey::StringCast, &[])),
        }
    }

    fn check_type(&self, value: &JsonValue, _mode: ConvertMode) -> bool {
        value.is_string()
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        _path: &Path,
        _ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        Ok(Value::String(value.as_str().unwrap_or_default().to_string()))
    }

    fn validate(
        &self,
        result: &Value,
        _original: &JsonValue,
        _mode: ConvertMode,
        violations: &mut Vec<Violation>,
    ) {
        let Some(text) = result.as_str() else {
            return;
        };
        let messages = &self.common.messages;
        let length = text.chars().count();

        if let Some(min) = self.min_length.filter(|min| length < *min) {
            violations.push(Violation::from_key(messages, MessageKey::MinLength, &[&min]));
        } else if let Some(max) = self.max_length.filter(|max| length > *max) {
            violations.push(Violation::from_key(messages, MessageKey::MaxLength, &[&max]));
        }

        if let Some(pattern) = &self.pattern {
            if !matches_from_start(pattern, text) {
                violations.push(Violation::from_key(messages, MessageKey::Pattern, &[]));
            }
        }
    }
}

/// Range and divisibility constraints shared by numbers and integers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericBounds {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,
}

impl NumericBounds {
    fn validate(&self, value: &Value, messages: &Messages, violations: &mut Vec<Violation>) {
        let Some(number) = value.as_f64() else {
            return;
        };

        if let Some(minimum) = self.minimum {
            if self.exclusive_minimum && number <= minimum {
                violations.push(Violation::from_key(
                    messages,
                    MessageKey::ExclusiveMinimum,
                    &[&minimum],
                ));
            } else if !self.exclusive_minimum && number < minimum {
                violations.push(Violation::from_key(messages, MessageKey::Minimum, &[&minimum]));
            }
        }

        if let Some(maximum) = self.maximum {
            if self.exclusive_maximum && number >= maximum {
                violations.push(Violation::from_key(
                    messages,
                    MessageKey::ExclusiveMaximum,
                    &[&maximum],
                ));
            } else if !self.exclusive_maximum && number > maximum {
                violations.push(Violation::from_key(messages, MessageKey::Maximum, &[&maximum]));
            }
        }

        if let Some(multiple_of) = self.multiple_of.filter(|m| *m != 0.0) {
            let divisor = Some(multiple_of)
                .filter(|m| m.fract() == 0.0 && m.abs() < i64::MAX as f64)
                .map(|m| m as i64);
            let failed = match (value.as_i64(), divisor) {
                // Only `i64::MIN % -1` overflows, and it divides evenly
                (Some(integer), Some(divisor)) => {
                    integer.checked_rem(divisor).is_some_and(|rest| rest != 0)
                }
                _ => (number / multiple_of).fract() != 0.0,
            };
            if failed {
                violations.push(Violation::from_key(
                    messages,
                    MessageKey::MultipleOf,
                    &[&multiple_of],
                ));
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NumberType {
    common: Common,
    pub bounds: NumericBounds,
}

impl NumberType {
    pub fn new(common: Common) -> Self {
        Self {
            common,
            bounds: NumericBounds::default(),
        }
    }

    pub fn with_bounds(mut self, bounds: NumericBounds) -> Self {
        self.bounds = bounds;
        self
    }
}

impl Convertible for NumberType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn type_message(&self) -> MessageKey {
        MessageKey::NumberType
    }

    fn cast<'v>(
        &self,
        value: Cow<'v, JsonValue>,
        path: &Path,
        mode: ConvertMode,
    ) -> ConvertResult<Cow<'v, JsonValue>> {
        // Booleans are left to the type check
        if value.is_number() || value.is_boolean() || mode.strict {
            return Ok(value);
        }
        match value.as_ref() {
            JsonValue::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(|n| Cow::Owned(JsonValue::Number(n)))
                .ok_or_else(|| self.common.fail(path, MessageKey::NumberCast, &[])),
            _ => Err(self.common.fail(path, MessageKey::NumberCast, &[])),
        }
    }

    fn check_type(&self, value: &JsonValue, _mode: ConvertMode) -> bool {
        value.is_number()
    }

    fn validate(
        &self,
        result: &Value,
        _original: &JsonValue,
        _mode: ConvertMode,
        violations: &mut Vec<Violation>,
    ) {
        self.bounds
            .validate(result, &self.common.messages, violations);
    }
}

#[derive(Debug, Clone)]
pub struct IntegerType {
    common: Common,
    pub bounds: NumericBounds,
}

impl IntegerType {
    pub fn new(common: Common) -> Self {
        Self {
            common,
            bounds: NumericBounds::default(),
        }
    }

    pub fn with_bounds(mut self, bounds: NumericBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub(crate) fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }
}

impl Convertible for IntegerType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn type_message(&self) -> MessageKey {
        MessageKey::IntegerType
    }

    fn cast<'v>(
        &self,
        value: Cow<'v, JsonValue>,
        path: &Path,
        mode: ConvertMode,
    ) -> ConvertResult<Cow<'v, JsonValue>> {
        if value.is_i64() || value.is_u64() || value.is_boolean() || mode.strict {
            return Ok(value);
        }
        let cast = match value.as_ref() {
            JsonValue::String(s) => s.trim().parse::<i64>().ok(),
            // Truncates towards zero
            JsonValue::Number(n) => n
                .as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64),
            _ => None,
        };
        cast.map(|i| Cow::Owned(JsonValue::from(i)))
            .ok_or_else(|| self.common.fail(path, MessageKey::IntegerCast, &[]))
    }

    fn check_type(&self, value: &JsonValue, _mode: ConvertMode) -> bool {
        value.is_i64() || value.is_u64()
    }

    fn convert_value(
        &self,
        value: &JsonValue,
        path: &Path,
        _ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        value
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| self.common.fail(path, MessageKey::Int64Format, &[]))
    }

    fn validate(
        &self,
        result: &Value,
        _original: &JsonValue,
        _mode: ConvertMode,
        violations: &mut Vec<Violation>,
    ) {
        self.bounds
            .validate(result, &self.common.messages, violations);
    }
}

#[derive(Debug, Clone)]
pub struct BooleanType {
    common: Common,
}

impl BooleanType {
    pub fn new(common: Common) -> Self {
        Self { common }
    }
}

/// Interpret common spellings of truth values.
fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl Convertible for BooleanType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn type_message(&self) -> MessageKey {
        MessageKey::BooleanType
    }

    fn cast<'v>(
        &self,
        value: Cow<'v, JsonValue>,
        path: &Path,
        mode: ConvertMode,
    ) -> ConvertResult<Cow<'v, JsonValue>> {
        if value.is_boolean() || mode.strict {
            return Ok(value);
        }
        let cast = match value.as_ref() {
            JsonValue::String(s) => parse_bool(s),
            JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        };
        cast.map(|b| Cow::Owned(JsonValue::Bool(b)))
            .ok_or_else(|| self.common.fail(path, MessageKey::BooleanCast, &[]))
    }

    fn check_type(&self, value: &JsonValue, _mode: ConvertMode) -> bool {
        value.is_boolean()
    }
}
