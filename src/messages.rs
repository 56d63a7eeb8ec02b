//! Error message tables.
//!
//! Every node owns a [`Messages`] table. It falls back to the built-in text of
//! each [`MessageKey`] unless the text was overridden, either per node or for
//! a whole compilation through
//! [`CompilerConfig::message_overrides`](crate::config::CompilerConfig).
//! Texts may contain positional placeholders `{0}` and `{1}`.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

/// Identifies one overridable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    // Shared by every typed node
    UnexpectedType,
    Nullable,
    Enum,

    // Strings
    StringType,
    StringCast,
    MinLength,
    MaxLength,
    Pattern,

    // Numbers
    NumberType,
    NumberCast,
    IntegerType,
    IntegerCast,
    Minimum,
    ExclusiveMinimum,
    Maximum,
    ExclusiveMaximum,
    MultipleOf,

    BooleanType,
    BooleanCast,

    // Arrays and maps
    ArrayType,
    MinItems,
    MaxItems,
    UniqueItems,
    UniqueItemProperties,
    MappingType,
    MinValues,
    MaxValues,

    // Objects
    Required,
    AdditionalProperties,
    ReadOnly,
    WriteOnly,
    MinProperties,
    MaxProperties,

    // Combinators
    DiscriminatorNotPresent,
    DiscriminatorNotMatch,
    NotAll,
    NotAny,
    NoOne,
    Ambiguous,
    NotAcceptable,

    // References
    BadReference,
    RecursiveReference,
    UnresolvableReference,

    // Formats
    DateFormat,
    DateTimeFormat,
    RegexFormat,
    UriFormat,
    EmailFormat,
    Int32Format,
    Int64Format,
    UuidFormat,
    ByteFormat,

    // Schema authoring
    AmbiguousType,
    UnknownType,
    UnknownFormat,
    InvalidKeyword,
    FormatOnNonPrimitive,
    ItemsRequired,
    ImproperDiscriminator,
    InvalidTypeForMinimum,
    InvalidTypeForMaximum,
    MaximumBelowMinimum,
    ExclusiveMinimumWithoutMinimum,
    ExclusiveMaximumWithoutMaximum,
    InvalidTypeForMultipleOf,
    NonPositiveMultipleOf,
    InvalidTypeForMinLength,
    InvalidTypeForMaxLength,
    MaxLengthBelowMinLength,
    InvalidTypeForMinItems,
    InvalidTypeForMaxItems,
    MaxItemsBelowMinItems,
    InvalidTypeForUniqueItems,
    InvalidTypeForProperties,
    InvalidTypeForAdditionalProperties,
    InvalidTypeForRequired,
    InvalidTypeForMinProperties,
    InvalidTypeForMaxProperties,
    MaxPropertiesBelowMinProperties,
    ReadOnlyAndWriteOnly,
}

impl MessageKey {
    /// Built-in text.
    pub fn default_text(self) -> &'static str {
        use MessageKey::*;
        match self {
            UnexpectedType => "Unexpected type",
            Nullable => "Null values not allowed",
            Enum => "Must be equal to one of the following values: {0}",

            StringType => "Must be a string",
            StringCast => "Couldn't cast to a string",
            MinLength => "Must be no less than {0} characters in length",
            MaxLength => "Must be no greater than {0} characters in length",
            Pattern => "Does not match the pattern",

            NumberType => "Must be a number",
            NumberCast => "Couldn't cast to a number",
            IntegerType => "Must be an integer",
            IntegerCast => "Couldn't cast to an integer",
            Minimum => "Is less than the minimum of {0}",
            ExclusiveMinimum => "Is less than or equal to the minimum of {0}",
            Maximum => "Is greater than the maximum of {0}",
            ExclusiveMaximum => "Is greater than or equal to the maximum of {0}",
            MultipleOf => "Is not a multiple of {0}",

            BooleanType => "Must be a boolean",
            BooleanCast => "Couldn't cast to a boolean",

            ArrayType => "Must be an array",
            MinItems => "Array must have at least {0} items. It had only {1} items",
            MaxItems => "Array must have no more than {0} items. It had {1} items",
            UniqueItems => "Has non-unique items",
            UniqueItemProperties => "All items must be a mapping",
            MappingType => "Must be a mapping",
            MinValues => "Map must have at least {0} values. It had only {1} values",
            MaxValues => "Map must have no more than {0} values. It had {1} values",

            Required => "Required property '{0}' is missing",
            AdditionalProperties => {
                "No unspecified properties are allowed. The following unspecified properties were found: {0}"
            }
            ReadOnly => "The following properties are read only: {0}",
            WriteOnly => "The following properties are write only: {0}",
            MinProperties => "Object must have at least {0} properties. It had only {1} properties",
            MaxProperties => "Object must have no more than {0} properties. It had {1} properties",

            DiscriminatorNotPresent => "A property with name '{0}' must be present",
            DiscriminatorNotMatch => {
                "The discriminator value must be equal to one of the following values: {0}"
            }
            NotAll => "Does not match all schemas from `allOf`. Invalid schema indexes: {0}",
            NotAny => "Does not match any schemas from `anyOf`",
            NoOne => "Is valid against no schemas from `oneOf`",
            Ambiguous => {
                "Is valid against more than one schema from `oneOf`. Valid schema indexes: {0}"
            }
            NotAcceptable => "Not acceptable data",

            BadReference => "$refs must reference a valid location in the document",
            RecursiveReference => "Recursive reference was found",
            UnresolvableReference => "Couldn't resolve reference",

            DateFormat => "Is not a valid RFC3339 full-date",
            DateTimeFormat => "Is not a valid RFC3339 date-time",
            RegexFormat => "Is not a valid regular expression",
            UriFormat => "Is not a valid URI according to RFC3987",
            EmailFormat => "Is not a valid email address according to RFC5322",
            Int32Format => "Is not a valid Int32",
            Int64Format => "Is not a valid Int64",
            UuidFormat => "Is not a valid UUID",
            ByteFormat => "Is not base64 encoded",

            AmbiguousType => "The schema type is ambiguous",
            UnknownType => "Unknown schema type '{0}'",
            UnknownFormat => "Unknown format '{0}' for type '{1}'",
            InvalidKeyword => "The value of `{0}` is invalid",
            FormatOnNonPrimitive => "Format is applicable only for primitive types",
            ItemsRequired => "`items` must be specified for array type",
            ImproperDiscriminator => {
                "The `discriminator` can only be used with the keywords `anyOf` or `oneOf`"
            }
            InvalidTypeForMinimum => "`minimum` can only be used for number types",
            InvalidTypeForMaximum => "`maximum` can only be used for number types",
            MaximumBelowMinimum => {
                "The value of `maximum` must be greater than or equal to the value of `minimum`"
            }
            ExclusiveMinimumWithoutMinimum => "When `exclusiveMinimum` is set, `minimum` is required",
            ExclusiveMaximumWithoutMaximum => "When `exclusiveMaximum` is set, `maximum` is required",
            InvalidTypeForMultipleOf => "`multipleOf` can only be used for number types",
            NonPositiveMultipleOf => "The value of `multipleOf` must be greater than 0",
            InvalidTypeForMinLength => "`minLength` can only be used for string types",
            InvalidTypeForMaxLength => "`maxLength` can only be used for string types",
            MaxLengthBelowMinLength => {
                "The value of `maxLength` must be greater than or equal to the `minLength` value"
            }
            InvalidTypeForMinItems => "`minItems` can only be used for array types",
            InvalidTypeForMaxItems => "`maxItems` can only be used for array types",
            MaxItemsBelowMinItems => {
                "The value of `maxItems` must be greater than or equal to the value of `minItems`"
            }
            InvalidTypeForUniqueItems => "`uniqueItems` can only be used for array types",
            InvalidTypeForProperties => "`properties` can only be used for object types",
            InvalidTypeForAdditionalProperties => {
                "`additionalProperties` can only be used for object types"
            }
            InvalidTypeForRequired => "`required` can only be used for object types",
            InvalidTypeForMinProperties => "`minProperties` can only be used for object types",
            InvalidTypeForMaxProperties => "`maxProperties` can only be used for object types",
            MaxPropertiesBelowMinProperties => {
                "The value of `maxProperties` must be greater than or equal to `minProperties`"
            }
            ReadOnlyAndWriteOnly => {
                "`readOnly` and `writeOnly` are mutually exclusive and cannot be set simultaneously"
            }
        }
    }

    /// The error classification reported together with this message.
    pub fn kind(self) -> ErrorKind {
        use MessageKey::*;
        match self {
            UnexpectedType | StringType | NumberType | IntegerType | BooleanType | ArrayType
            | MappingType => ErrorKind::TypeMismatch,
            StringCast | NumberCast | IntegerCast | BooleanCast => ErrorKind::CastFailure,
            Nullable => ErrorKind::NullNotAllowed,
            Enum => ErrorKind::EnumMismatch,
            MinLength | MaxLength | MinItems | MaxItems | MinValues | MaxValues | MinProperties
            | MaxProperties => ErrorKind::BoundsViolation,
            Minimum | ExclusiveMinimum | Maximum | ExclusiveMaximum | MultipleOf => {
                ErrorKind::NumericBoundsViolation
            }
            Pattern => ErrorKind::PatternMismatch,
            UniqueItems | UniqueItemProperties => ErrorKind::UniquenessViolation,
            Required => ErrorKind::RequiredMissing,
            AdditionalProperties => ErrorKind::UnexpectedAdditionalProperty,
            ReadOnly => ErrorKind::ReadOnlyViolation,
            WriteOnly => ErrorKind::WriteOnlyViolation,
            DiscriminatorNotPresent => ErrorKind::DiscriminatorMissing,
            DiscriminatorNotMatch => ErrorKind::DiscriminatorUnmatched,
            NotAll => ErrorKind::AllOfPartialFailure,
            NotAny => ErrorKind::AnyOfNoMatch,
            NoOne => ErrorKind::OneOfNoMatch,
            Ambiguous => ErrorKind::OneOfAmbiguous,
            NotAcceptable => ErrorKind::NotAcceptable,
            BadReference => ErrorKind::ReferenceBad,
            RecursiveReference => ErrorKind::ReferenceRecursive,
            UnresolvableReference => ErrorKind::ReferenceUnresolvable,
            DateFormat | DateTimeFormat | RegexFormat | UriFormat | EmailFormat | Int32Format
            | Int64Format | UuidFormat | ByteFormat => ErrorKind::FormatViolation,
            AmbiguousType => ErrorKind::AmbiguousSchemaType,
            UnknownType
            | UnknownFormat
            | InvalidKeyword
            | FormatOnNonPrimitive
            | ItemsRequired
            | ImproperDiscriminator
            | InvalidTypeForMinimum
            | InvalidTypeForMaximum
            | MaximumBelowMinimum
            | ExclusiveMinimumWithoutMinimum
            | ExclusiveMaximumWithoutMaximum
            | InvalidTypeForMultipleOf
            | NonPositiveMultipleOf
            | InvalidTypeForMinLength
            | InvalidTypeForMaxLength
            | MaxLengthBelowMinLength
            | InvalidTypeForMinItems
            | InvalidTypeForMaxItems
            | MaxItemsBelowMinItems
            | InvalidTypeForUniqueItems
            | InvalidTypeForProperties
            | InvalidTypeForAdditionalProperties
            | InvalidTypeForRequired
            | InvalidTypeForMinProperties
            | InvalidTypeForMaxProperties
            | MaxPropertiesBelowMinProperties
            | ReadOnlyAndWriteOnly => ErrorKind::InvalidSchema,
        }
    }
}

/// A message table with optional overrides.
///
/// Cloning is cheap; the overrides are shared.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    overrides: Arc<HashMap<MessageKey, String>>,
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_overrides(overrides: HashMap<MessageKey, String>) -> Self {
        Self {
            overrides: Arc::new(overrides),
        }
    }

    /// Replace the text of one message.
    pub fn with(mut self, key: MessageKey, text: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.overrides).insert(key, text.into());
        self
    }

    /// Layer `other`'s overrides on top of these.
    pub fn merged(mut self, other: &Messages) -> Self {
        if !other.overrides.is_empty() {
            let overrides = Arc::make_mut(&mut self.overrides);
            for (key, text) in other.overrides.iter() {
                overrides.insert(*key, text.clone());
            }
        }
        self
    }

    pub fn get(&self, key: MessageKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text())
    }

    /// Render a message, substituting `{0}`, `{1}`, ... with `args`.
    ///
    /// The template is scanned once, so placeholders inside arguments stay
    /// as they are. Placeholders without an argument are kept too.
    pub fn format(&self, key: MessageKey, args: &[&dyn Display]) -> String {
        let mut rest = self.get(key);
        let mut text = String::with_capacity(rest.len());

        while let Some(start) = rest.find('{') {
            text.push_str(&rest[..start]);
            let tail = &rest[start + 1..];
            let argument = tail.find('}').and_then(|end| {
                let index = &tail[..end];
                if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let arg = args.get(index.parse::<usize>().ok()?)?;
                Some((arg, end + 1))
            });
            match argument {
                Some((arg, consumed)) => {
                    text.push_str(&arg.to_string());
                    rest = &tail[consumed..];
                }
                None => {
                    text.push('{');
                    rest = tail;
                }
            }
        }
        text.push_str(rest);
        text
    }
}

/// Join already rendered items with `", "` in lexicographic order.
pub fn comma_delimited<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut items: Vec<String> = items.into_iter().map(Into::into).collect();
    items.sort();
    items.join(", ")
}

/// Join indexes with `", "` in numeric order.
pub fn comma_delimited_indexes(indexes: &[usize]) -> String {
    let mut indexes = indexes.to_vec();
    indexes.sort_unstable();
    indexes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
