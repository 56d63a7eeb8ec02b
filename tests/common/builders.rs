//! Builders for schema documents.
//!
//! Schemas are collected under `components/schemas` so tests can reference
//! each other by name, the way real OpenAPI documents do.

use openapi_convert::{Compiler, CompilerConfig, Converter, SchemaResult};
use serde_json::{Map, Value, json};

/// The pointer of a named component schema
pub fn pointer(name: &str) -> String {
    format!("#/components/schemas/{}", name)
}

/// Builder for OpenAPI documents with a set of component schemas
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    schemas: Map<String, Value>,
    config: CompilerConfig,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a component schema
    pub fn schema(mut self, name: &str, schema: Value) -> Self {
        self.schemas.insert(name.to_string(), schema);
        self
    }

    pub fn config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(&self) -> Value {
        json!({
            "openapi": "3.0.3",
            "components": {"schemas": Value::Object(self.schemas.clone())}
        })
    }

    pub fn compiler(&self) -> Compiler {
        Compiler::new(self.build(), self.config.clone())
    }

    /// Compile one named schema into a converter
    pub fn compile(&self, name: &str) -> SchemaResult<Converter> {
        openapi_convert::compile_with(self.build(), &pointer(name), self.config.clone())
    }
}
