//! Test fixtures for loading schema documents from disk.
//!
//! Documents under `tests/fixtures/` are parsed once and cached. Their
//! `file:` URIs serve as base URIs, so relative `$ref`s between fixtures
//! resolve through the file handler.

use openapi_convert::{Compiler, CompilerConfig, parse_document};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use url::Url;

/// Cache for loaded fixtures to avoid repeated file I/O
static FIXTURE_CACHE: OnceLock<Mutex<HashMap<String, Value>>> = OnceLock::new();

/// Absolute path of a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// `file:` URI of a fixture file
pub fn fixture_uri(name: &str) -> String {
    Url::from_file_path(fixture_path(name))
        .unwrap_or_else(|_| panic!("Fixture path is not absolute: {}", name))
        .to_string()
}

/// Load a fixture from the fixtures directory with caching
pub fn load_fixture(name: &str) -> Value {
    let cache = FIXTURE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = cache.lock().unwrap();

    if let Some(cached) = cache.get(name) {
        return cached.clone();
    }

    let path = fixture_path(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", path.display()));
    let document = parse_document(name, &content)
        .unwrap_or_else(|_| panic!("Failed to parse fixture: {}", path.display()));

    cache.insert(name.to_string(), document.clone());
    document
}

/// A compiler for a fixture, with the fixture's URI as base URI
pub fn fixture_compiler(name: &str, config: CompilerConfig) -> Compiler {
    Compiler::new(load_fixture(name), config.with_base_uri(fixture_uri(name)))
}

/// Inline documents used across test modules
pub mod samples {
    use serde_json::{Value, json};

    /// An object that contains itself
    pub fn tree() -> Value {
        json!({
            "type": "object",
            "properties": {
                "label": {"type": "string"},
                "child": {"$ref": "#"}
            }
        })
    }

    /// Cat and Dog selected by `petType`
    pub fn pets() -> Value {
        json!({"components": {"schemas": {
            "Cat": {
                "type": "object",
                "required": ["petType"],
                "properties": {
                    "petType": {"type": "string"},
                    "lives": {"type": "integer", "maximum": 9}
                }
            },
            "Dog": {
                "type": "object",
                "required": ["petType"],
                "properties": {
                    "petType": {"type": "string"},
                    "goodBoy": {"type": "boolean"}
                }
            },
            "Pet": {
                "oneOf": [
                    {"$ref": "#/components/schemas/Cat"},
                    {"$ref": "#/components/schemas/Dog"}
                ],
                "discriminator": {"propertyName": "petType"}
            }
        }}})
    }
}
