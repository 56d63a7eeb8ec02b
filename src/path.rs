//! JSON-pointer-style addresses.
//!
//! A [`Path`] names a location inside a document: the document URI plus the
//! ordered pointer segments below it. Every [`Error`](crate::error::Error)
//! is tagged with one, and both the conversion registry and the compiler
//! registry use them as keys.

use percent_encoding::percent_decode_str;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// An immutable document location.
///
/// Paths are cheap to clone: the base URI is shared and child derivation
/// copies only the segment list.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Path {
    base_uri: Arc<str>,
    parts: Vec<String>,
}

impl Path {
    /// The root of the anonymous document, rendered as `#`.
    pub fn root() -> Self {
        Self {
            base_uri: Arc::from(""),
            parts: Vec::new(),
        }
    }

    /// Parse a URI with an optional pointer fragment, e.g.
    /// `openapi.yaml#/components/schemas/Pet`.
    ///
    /// Percent-encoded and escaped segments (`~0`, `~1`) are decoded, so a
    /// fragment produced by URI joining names the same location as the
    /// pointer it was joined from.
    pub fn from_uri(uri: &str) -> Self {
        let (base, fragment) = split_fragment(uri);
        let parts = fragment
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| unescape(&percent_decode_str(part).decode_utf8_lossy()))
            .collect();

        Self {
            base_uri: Arc::from(base),
            parts,
        }
    }

    /// Derive the path of a child location.
    pub fn child(&self, part: impl ToString) -> Self {
        let mut parts = Vec::with_capacity(self.parts.len() + 1);
        parts.extend(self.parts.iter().cloned());
        parts.push(part.to_string());

        Self {
            base_uri: Arc::clone(&self.base_uri),
            parts,
        }
    }

    /// The enclosing location. The root is its own parent.
    pub fn parent(&self) -> Self {
        if self.parts.is_empty() {
            return self.clone();
        }

        Self {
            base_uri: Arc::clone(&self.base_uri),
            parts: self.parts[..self.parts.len() - 1].to_vec(),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return if self.base_uri.is_empty() {
                f.write_str("#")
            } else {
                f.write_str(&self.base_uri)
            };
        }

        write!(f, "{}#", self.base_uri)?;
        for part in &self.parts {
            write!(f, "/{}", escape(part))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.to_string())
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        self.to_string()
            .cmp(&other.to_string())
            .then_with(|| self.parts.cmp(&other.parts))
            .then_with(|| self.base_uri.cmp(&other.base_uri))
    }
}

impl PartialEq<str> for Path {
    fn eq(&self, other: &str) -> bool {
        self.to_string() == other
    }
}

impl PartialEq<&str> for Path {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl From<&str> for Path {
    fn from(uri: &str) -> Self {
        Self::from_uri(uri)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Split `uri` at the first `#`.
pub(crate) fn split_fragment(uri: &str) -> (&str, &str) {
    match uri.split_once('#') {
        Some((base, fragment)) => (base, fragment),
        None => (uri, ""),
    }
}

/// Escape a pointer segment (`~` → `~0`, `/` → `~1`).
pub fn escape(part: &str) -> String {
    part.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape`].
pub fn unescape(part: &str) -> String {
    part.replace("~1", "/").replace("~0", "~")
}
