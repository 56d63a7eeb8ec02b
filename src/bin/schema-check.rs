//! # Schema Check
//!
//! A command-line utility that compiles an OpenAPI schema document and,
//! optionally, converts a payload against one of its schemas.
//!
//! ## Usage
//!
//! ### Check a Schema
//!
//! ```bash
//! cargo run --bin schema-check openapi.yaml '#/components/schemas/Pet'
//! ```
//!
//! ### Convert a Payload
//!
//! ```bash
//! cargo run --bin schema-check openapi.yaml '#/components/schemas/Pet' pet.json request
//! ```
//!
//! The entity defaults to `request`. The pointer defaults to `#`, the whole
//! document.
//!
//! ## Output Examples
//!
//! ### Successful Conversion
//!
//! ```text
//! Compiling openapi.yaml#/components/schemas/Pet
//! ✓ Schema compiled (12 nodes)
//! Converting pet.json as request
//! ✓ Payload converted:
//! {
//!   "age": 3,
//!   "name": "Rex"
//! }
//! ```
//!
//! ### Error Output
//!
//! Every error is listed, one `path: message` per line:
//!
//! ```text
//! Converting pet.json as request
//! ❌ 2 errors:
//!   #: Required property 'name' is missing
//!   #/age: Is less than the minimum of 0
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: The schema compiled and the payload, if given, converted
//! - `1`: Any error, including unreadable files

use openapi_convert::{
    Compiler, CompilerConfig, ConvertOptions, Entity, SchemaError, parse_document,
};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use url::Url;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 5 {
        eprintln!(
            "Usage: {} <schema-file> [pointer] [payload-file] [request|response]",
            args[0]
        );
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} openapi.yaml", args[0]);
        eprintln!("  {} openapi.yaml '#/components/schemas/Pet' pet.json", args[0]);
        process::exit(1);
    }

    let schema_file = Path::new(&args[1]);
    let pointer = args.get(2).map(String::as_str).unwrap_or("#");
    let entity = match args.get(4).map(String::as_str) {
        None | Some("request") => Entity::Request,
        Some("response") => Entity::Response,
        Some(other) => {
            eprintln!("Error: unknown entity '{}', expected request or response", other);
            process::exit(1);
        }
    };

    let mut compiler = match load_compiler(schema_file) {
        Ok(compiler) => compiler,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", schema_file.display(), e);
            process::exit(1);
        }
    };

    println!("Compiling {}{}", schema_file.display(), pointer);
    let root = match compiler.compile(pointer) {
        Ok(root) => root,
        Err(errors) => {
            print_errors(&errors);
            process::exit(1);
        }
    };
    println!("✓ Schema compiled ({} nodes)", compiler.len());

    let Some(payload_file) = args.get(3) else {
        return;
    };

    let converter = match compiler.into_converter(root) {
        Ok(converter) => converter,
        Err(e) => {
            eprintln!("❌ Failed to build converter: {}", e);
            process::exit(1);
        }
    };
    let payload = match read_document(Path::new(payload_file)) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", payload_file, e);
            process::exit(1);
        }
    };

    println!("Converting {} as {}", payload_file, entity);
    match converter.convert(&payload, &ConvertOptions::new(entity)) {
        Ok(converted) => {
            println!("✓ Payload converted:");
            match serde_json::to_string_pretty(&converted.value.to_json()) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("❌ Failed to render result: {}", e);
                    process::exit(1);
                }
            }
        }
        Err(errors) => {
            print_errors(&errors);
            process::exit(1);
        }
    }
}

fn load_compiler(schema_file: &Path) -> Result<Compiler, Box<dyn std::error::Error>> {
    let document = read_document(schema_file)?;
    let absolute = fs::canonicalize(schema_file)?;
    let base_uri = Url::from_file_path(&absolute)
        .map_err(|_| format!("'{}' is not an absolute path", absolute.display()))?;

    let config = CompilerConfig::new().with_base_uri(base_uri.to_string());
    Ok(Compiler::new(document, config))
}

fn read_document(file_path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path)?;
    Ok(parse_document(&file_path.display().to_string(), &content)?)
}

fn print_errors(errors: &SchemaError) {
    eprintln!("❌ {} errors:", errors.len());
    for error in errors.errors() {
        eprintln!("  {}", error);
    }
}
