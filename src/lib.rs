//! OpenAPI 3.0 Schema Objects compiled into converter graphs.
//!
//! A schema document is compiled once into a [`Graph`] of conversion nodes.
//! Converting a payload walks that graph, casting loosely typed request
//! values, validating every keyword and collecting every error found
//! instead of stopping at the first one.
//!
//! # Core Components
//!
//! - [`Compiler`] - Turns schema locations into graph nodes, following `$ref`s
//! - [`Converter`] - A compiled graph together with its entry node
//! - [`RefResolver`] - Resolves `$ref`s against local and remote documents
//! - [`SchemaError`] - Every conversion error, each with its path and kind
//!
//! # Quick Start
//!
//! ```rust
//! use openapi_convert::compile;
//! use serde_json::json;
//!
//! let document = json!({
//!     "components": {"schemas": {"Pet": {
//!         "type": "object",
//!         "required": ["name"],
//!         "properties": {
//!             "name": {"type": "string"},
//!             "age": {"type": "integer", "minimum": 0}
//!         }
//!     }}}
//! });
//!
//! let pet = compile(document, "#/components/schemas/Pet").unwrap();
//! let converted = pet.request(&json!({"name": "Rex", "age": "3"})).unwrap();
//! assert_eq!(converted.value.to_json(), json!({"name": "Rex", "age": 3}));
//!
//! let error = pet.response(&json!({"age": -1})).unwrap_err();
//! assert_eq!(error.len(), 2);
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod messages;
pub mod meta;
pub mod path;
pub mod resolver;
pub mod types;
pub mod value;

// Re-export commonly used types for convenience
pub use compiler::{Compiler, FormatRegistry, PlainNode, SchemaType};
pub use config::{CompilerConfig, ConvertOptions};
pub use error::{
    BuildError, BuildResult, Error, ErrorKind, ResolveError, ResolveResult, SchemaError,
    SchemaResult,
};
pub use graph::{Context, ConvertMode, Converted, Converter, Entity, Graph, GraphBuilder, NodeId};
pub use messages::{MessageKey, Messages};
pub use path::Path;
pub use resolver::RefResolver;
pub use resolver::handlers::parse_document;
pub use types::{Convertible, Validator, Violation};
pub use value::{Input, Value};

/// Compile the schema at `pointer` inside `document` with the default
/// configuration.
pub fn compile(document: serde_json::Value, pointer: &str) -> SchemaResult<Converter> {
    compile_with(document, pointer, CompilerConfig::default())
}

/// Compile the schema at `pointer` inside `document`.
pub fn compile_with(
    document: serde_json::Value,
    pointer: &str,
    config: CompilerConfig,
) -> SchemaResult<Converter> {
    let mut compiler = Compiler::new(document, config);
    let root = compiler.compile(pointer)?;
    compiler.into_converter(root).map_err(|e| {
        SchemaError::single(&Path::from_uri(pointer), ErrorKind::InvalidSchema, e.to_string())
    })
}
