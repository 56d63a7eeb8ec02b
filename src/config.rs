//! Compiler and conversion settings.

use crate::graph::{ConvertMode, Entity};
use crate::messages::{MessageKey, Messages};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Settings of one [`Compiler`](crate::compiler::Compiler).
///
/// Deserializable, so it can live in an application's configuration file.
/// Every field has a default:
///
/// ```rust
/// use openapi_convert::CompilerConfig;
///
/// let config: CompilerConfig = serde_json::from_str(r#"{"strict_formats": true}"#).unwrap();
/// assert!(config.strict_formats);
/// assert!(config.cache_remote);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// URI of the document being compiled. Relative `$ref`s resolve against
    /// it, and it prefixes every reported path.
    pub base_uri: String,

    /// Keep fetched remote documents.
    pub cache_remote: bool,

    /// Capacity of the URI join cache.
    pub join_cache_size: usize,

    /// Capacity of the remote document cache.
    pub remote_cache_size: usize,

    /// Report an unknown `format` as an error instead of a warning.
    pub strict_formats: bool,

    /// Check every schema against the Schema Object model before compiling
    /// it.
    pub check_schemas: bool,

    /// Compile objects with a `discriminator` to a discriminated union of
    /// the schemas extending them.
    pub allow_polymorphism: bool,

    /// Replacement texts, applied to every compiled node.
    pub message_overrides: HashMap<MessageKey, String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            base_uri: String::new(),
            cache_remote: true,
            join_cache_size: 1024,
            remote_cache_size: 1024,
            strict_formats: false,
            check_schemas: true,
            allow_polymorphism: true,
            message_overrides: HashMap::new(),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    pub fn with_cache_remote(mut self, cache_remote: bool) -> Self {
        self.cache_remote = cache_remote;
        self
    }

    pub fn with_cache_sizes(mut self, join_cache_size: usize, remote_cache_size: usize) -> Self {
        self.join_cache_size = join_cache_size;
        self.remote_cache_size = remote_cache_size;
        self
    }

    pub fn with_strict_formats(mut self, strict_formats: bool) -> Self {
        self.strict_formats = strict_formats;
        self
    }

    pub fn with_check_schemas(mut self, check_schemas: bool) -> Self {
        self.check_schemas = check_schemas;
        self
    }

    pub fn with_polymorphism(mut self, allow_polymorphism: bool) -> Self {
        self.allow_polymorphism = allow_polymorphism;
        self
    }

    pub fn with_message(mut self, key: MessageKey, text: impl Into<String>) -> Self {
        self.message_overrides.insert(key, text.into());
        self
    }

    /// The overrides as a message table.
    pub fn messages(&self) -> Messages {
        Messages::from_overrides(self.message_overrides.clone())
    }
}

/// Options of a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    pub entity: Entity,
    /// Falls back to [`Entity::default_strict`] when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl ConvertOptions {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            strict: None,
        }
    }

    pub fn request() -> Self {
        Self::new(Entity::Request)
    }

    pub fn response() -> Self {
        Self::new(Entity::Response)
    }

    pub fn specification() -> Self {
        Self::new(Entity::Specification)
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// The mode handed to every node of the conversion.
    pub fn mode(&self) -> ConvertMode {
        ConvertMode::new(
            self.entity,
            self.strict.unwrap_or_else(|| self.entity.default_strict()),
        )
    }
}
