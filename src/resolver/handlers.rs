//! Retrieval of referenced documents, one handler per URI scheme.

use super::Handler;
use crate::error::{ResolveError, ResolveResult};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

/// Parse a document as YAML, falling back to JSON.
pub fn parse_document(uri: &str, text: &str) -> ResolveResult<JsonValue> {
    serde_yaml::from_str::<JsonValue>(text)
        .or_else(|_| serde_json::from_str::<JsonValue>(text))
        .map_err(|_| ResolveError::Parse {
            uri: uri.to_string(),
        })
}

fn file_path(uri: &str) -> ResolveResult<PathBuf> {
    if !uri.starts_with("file:") {
        return Ok(PathBuf::from(uri));
    }
    Url::parse(uri)
        .ok()
        .and_then(|url| url.to_file_path().ok())
        .ok_or_else(|| ResolveError::fetch(uri, "not a local file path"))
}

/// Read a `file:` URI, or a plain path, from disk.
pub fn file_handler(uri: &str) -> ResolveResult<JsonValue> {
    let path = file_path(uri)?;
    let text = std::fs::read_to_string(&path)?;
    parse_document(uri, &text)
}

/// Fetch an `http:` or `https:` URI.
#[cfg(feature = "http")]
pub fn http_handler(uri: &str) -> ResolveResult<JsonValue> {
    let response = ureq::get(uri)
        .call()
        .map_err(|e| ResolveError::fetch(uri, e))?;
    let text = response.into_string()?;
    parse_document(uri, &text)
}

/// Handlers installed in every new resolver. A URI without a scheme is
/// looked up under `""` and read from disk.
pub fn default_handlers() -> HashMap<String, Handler> {
    let mut handlers: HashMap<String, Handler> = HashMap::new();
    handlers.insert(String::new(), Box::new(file_handler));
    handlers.insert("file".to_string(), Box::new(file_handler));
    #[cfg(feature = "http")]
    {
        handlers.insert("http".to_string(), Box::new(http_handler));
        handlers.insert("https".to_string(), Box::new(http_handler));
    }
    handlers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = parse_document("a.yaml", "type: string\nminLength: 2\n").unwrap();
        assert_eq!(yaml, serde_json::json!({"type": "string", "minLength": 2}));

        let json = parse_document("a.json", r#"{"type": "integer"}"#).unwrap();
        assert_eq!(json, serde_json::json!({"type": "integer"}));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_document("a.yaml", "{ unbalanced: ["),
            Err(ResolveError::Parse { .. })
        ));
    }

    #[test]
    fn test_file_handler_reads_plain_paths_and_file_uris() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Pet:\n  type: object").unwrap();
        let path = file.path().to_path_buf();

        let document = file_handler(path.to_str().unwrap()).unwrap();
        assert_eq!(document["Pet"]["type"], "object");

        let uri = Url::from_file_path(&path).unwrap();
        let document = file_handler(uri.as_str()).unwrap();
        assert_eq!(document["Pet"]["type"], "object");
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            file_handler(missing.to_str().unwrap()),
            Err(ResolveError::Io(_))
        ));
    }
}
