//! URI joining and fragment decoding.
//!
//! `$ref`s and resolution scopes are often relative (`#/components/...`,
//! `pets.yaml#/Pet`) and have no base the `url` crate can parse. Relative
//! inputs are joined against a placeholder base and stripped of it again, so
//! relative scopes stay relative.

use crate::path::{split_fragment, unescape};
use percent_encoding::percent_decode_str;
use url::Url;

const DUMMY_BASE: &str = "http://resolver.invalid/";

/// Resolve `reference` against `base`.
pub fn join(base: &str, reference: &str) -> String {
    if reference.is_empty() {
        return base.to_string();
    }
    if let Ok(url) = Url::parse(reference) {
        return url.to_string();
    }
    if let Ok(base_url) = Url::parse(base) {
        return base_url
            .join(reference)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| reference.to_string());
    }

    if let Some(fragment) = reference.strip_prefix('#') {
        let (document, _) = split_fragment(base);
        return format!("{}#{}", document, fragment);
    }

    let Ok(dummy) = Url::parse(DUMMY_BASE) else {
        return reference.to_string();
    };
    match dummy.join(base).and_then(|base_url| base_url.join(reference)) {
        Ok(joined) => {
            // Keep a leading slash of an absolute path
            let prefix = if base.starts_with('/') || reference.starts_with('/') {
                DUMMY_BASE.trim_end_matches('/')
            } else {
                DUMMY_BASE
            };
            joined
                .as_str()
                .strip_prefix(prefix)
                .map(str::to_string)
                .unwrap_or_else(|| joined.to_string())
        }
        Err(_) => reference.to_string(),
    }
}

/// Split off the fragment: `(document, fragment)`.
pub fn defrag(uri: &str) -> (&str, &str) {
    split_fragment(uri)
}

/// The scheme of an absolute URI.
pub fn scheme(uri: &str) -> Option<String> {
    Url::parse(uri).ok().map(|url| url.scheme().to_string())
}

/// The decoded segments of a JSON pointer fragment.
pub fn pointer_segments(fragment: &str) -> Vec<String> {
    let fragment = fragment.trim_start_matches('/');
    if fragment.is_empty() {
        return Vec::new();
    }
    percent_decode_str(fragment)
        .decode_utf8_lossy()
        .split('/')
        .map(unescape)
        .collect()
}
