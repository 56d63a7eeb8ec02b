//! Error types for schema compilation and payload conversion.
//!
//! Conversion never stops at the first problem: every node collects its own
//! failures together with the failures bubbled up from its children and
//! raises them as one [`SchemaError`]. The top-level caller therefore sees the
//! flat union of every independent violation found in a single pass.

use crate::path::Path;
use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

/// Classification of a single [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    TypeMismatch,
    CastFailure,
    NullNotAllowed,
    EnumMismatch,
    /// String length, array item count, map value count or object property
    /// count out of bounds.
    BoundsViolation,
    NumericBoundsViolation,
    PatternMismatch,
    /// A `format` specific check failed (date, uuid, base64, ...).
    FormatViolation,
    UniquenessViolation,
    RequiredMissing,
    UnexpectedAdditionalProperty,
    ReadOnlyViolation,
    WriteOnlyViolation,
    DiscriminatorMissing,
    DiscriminatorUnmatched,
    AllOfPartialFailure,
    AnyOfNoMatch,
    OneOfNoMatch,
    OneOfAmbiguous,
    NotAcceptable,
    ReferenceUnresolvable,
    ReferenceBad,
    ReferenceRecursive,
    AmbiguousSchemaType,
    /// A schema authoring mistake other than an ambiguous type.
    InvalidSchema,
    /// Raised by a caller supplied validator.
    Custom,
}

/// One violation found at one location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    pub path: Path,
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(path: Path, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Error", 2)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

/// An ordered, never empty collection of [`Error`]s.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct SchemaError {
    errors: Vec<Error>,
}

impl SchemaError {
    /// A schema error holding exactly one error.
    pub fn new(error: Error) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// Shorthand for a single error built in place.
    pub fn single(path: &Path, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(Error::new(path.clone(), kind, message))
    }

    /// Wrap collected errors, or `None` if nothing was collected.
    pub fn from_errors(errors: Vec<Error>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    /// Turn a collection of errors into `Err` if it is not empty.
    pub fn check(errors: Vec<Error>) -> SchemaResult<()> {
        match Self::from_errors(errors) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Put `error` in front of the collected errors.
    pub fn with_leading(mut self, error: Error) -> Self {
        self.errors.insert(0, error);
        self
    }

    /// Append `errors` after the collected ones.
    pub fn extended(mut self, errors: impl IntoIterator<Item = Error>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`; present for API symmetry with [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.errors.iter().map(|error| error.kind).collect()
    }

    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|error| error.kind == kind)
    }

    /// `(path, message)` pairs ready to hand to an API consumer.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.errors
            .iter()
            .map(|error| (error.path.to_string(), error.message.clone()))
            .collect()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl From<Error> for SchemaError {
    fn from(error: Error) -> Self {
        Self::new(error)
    }
}

impl IntoIterator for SchemaError {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl Serialize for SchemaError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.errors.len()))?;
        for error in &self.errors {
            seq.serialize_element(error)?;
        }
        seq.end()
    }
}

/// Outcome of a node conversion that did not produce a value.
///
/// Only [`ConvertError::Schema`] is a user-facing failure. The other two
/// variants are control signals consumed inside the graph walk.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConvertError {
    /// The payload violates the schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The value is absent and nothing may be substituted for it; the
    /// enclosing object must omit the property.
    #[error("no value produced")]
    UndefinedResult,

    /// A `$ref` chain came back to a target that is still being resolved.
    #[error("recursive reference")]
    RecursiveReference,
}

impl ConvertError {
    /// Collect the schema errors of a failed conversion into `errors`.
    ///
    /// Control signals are handed back unchanged for the caller to handle.
    pub(crate) fn collect_into(self, errors: &mut Vec<Error>) -> Result<(), ConvertError> {
        match self {
            ConvertError::Schema(error) => {
                errors.extend(error);
                Ok(())
            }
            other => Err(other),
        }
    }
}

/// Failures of the reference resolver.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The pointer does not address anything in the document.
    #[error("Unresolvable JSON pointer: '{pointer}'")]
    Unresolvable { pointer: String },

    /// No handler exists for the URI scheme.
    #[error("No handler for URI scheme '{scheme}' (uri: {uri})")]
    UnsupportedScheme { scheme: String, uri: String },

    /// A handler failed to retrieve the document.
    #[error("Failed to fetch '{uri}': {message}")]
    Fetch { uri: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The retrieved document is neither YAML nor JSON.
    #[error("Unknown document format at '{uri}'. Expected YAML or JSON")]
    Parse { uri: String },

    /// `pop_scope` was called more times than `push_scope`.
    #[error(
        "Failed to pop the scope from an empty stack. `pop_scope()` should only be called once for every `push_scope()`"
    )]
    EmptyScopeStack,
}

impl ResolveError {
    pub fn fetch(uri: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            uri: uri.into(),
            message: message.to_string(),
        }
    }
}

/// Mistakes made while assembling a graph by hand.
///
/// These are programming errors and are reported when the graph is built,
/// never during conversion.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A reserved node was never defined.
    #[error("Node {0} was reserved but never defined")]
    PendingNode(usize),

    /// A node id was defined twice.
    #[error("Node {0} is already defined")]
    AlreadyDefined(usize),

    /// A node id does not belong to this graph.
    #[error("Node {0} does not exist")]
    UnknownNode(usize),

    /// A property is listed as both read-only and write-only.
    #[error(
        "Properties must not be listed in both `read_only` and `write_only` simultaneously: {0}"
    )]
    ReadWriteOverlap(String),

    /// A read-only or write-only name is not a declared property.
    #[error("All read-only and write-only properties must be present in the properties: {0}")]
    UnknownProperty(String),

    /// A pattern is not a valid regular expression.
    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
pub type ConvertResult<T> = Result<T, ConvertError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
pub type BuildResult<T> = Result<T, BuildError>;
