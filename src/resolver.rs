//! `$ref` resolution.
//!
//! A [`RefResolver`] keeps a stack of resolution scopes. Following a `$ref`
//! pushes the joined URI of the reference, so `$ref`s inside the target
//! resolve relative to it; leaving the target pops it again. Documents are
//! looked up in the store first and fetched through a scheme handler
//! otherwise. Fetched documents stay in the store when `cache_remote` is
//! set, and both URI joins and resolved references are memoized in bounded
//! LRU caches.

pub mod handlers;
pub mod uri;

use crate::config::CompilerConfig;
use crate::error::{ResolveError, ResolveResult};
use log::{debug, trace};
use lru::LruCache;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Retrieves the document behind a URI.
pub type Handler = Box<dyn Fn(&str) -> ResolveResult<JsonValue> + Send + Sync>;

const DEFAULT_CACHE_SIZE: usize = 1024;

fn capacity(size: usize) -> NonZeroUsize {
    NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN)
}

pub struct RefResolver {
    scopes: Vec<String>,
    store: HashMap<String, Arc<JsonValue>>,
    handlers: HashMap<String, Handler>,
    cache_remote: bool,
    join_cache: LruCache<(String, String), String>,
    remote_cache: LruCache<String, JsonValue>,
}

impl RefResolver {
    /// A resolver for `referrer`, the document found at `base_uri`.
    pub fn new(base_uri: impl Into<String>, referrer: JsonValue) -> Self {
        Self::with_capacity(base_uri, referrer, DEFAULT_CACHE_SIZE, DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(
        base_uri: impl Into<String>,
        referrer: JsonValue,
        join_cache_size: usize,
        remote_cache_size: usize,
    ) -> Self {
        let base_uri = base_uri.into();
        let mut store = HashMap::new();
        store.insert(uri::defrag(&base_uri).0.to_string(), Arc::new(referrer));

        Self {
            scopes: vec![base_uri],
            store,
            handlers: handlers::default_handlers(),
            cache_remote: true,
            join_cache: LruCache::new(capacity(join_cache_size)),
            remote_cache: LruCache::new(capacity(remote_cache_size)),
        }
    }

    pub fn from_config(referrer: JsonValue, config: &CompilerConfig) -> Self {
        let mut resolver = Self::with_capacity(
            config.base_uri.clone(),
            referrer,
            config.join_cache_size,
            config.remote_cache_size,
        );
        resolver.cache_remote = config.cache_remote;
        resolver
    }

    /// Install or replace the handler of a URI scheme.
    pub fn with_handler<F>(mut self, scheme: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str) -> ResolveResult<JsonValue> + Send + Sync + 'static,
    {
        self.handlers.insert(scheme.into(), Box::new(handler));
        self
    }

    pub fn with_cache_remote(mut self, cache_remote: bool) -> Self {
        self.cache_remote = cache_remote;
        self
    }

    /// Make a document available without fetching it.
    pub fn add_document(&mut self, uri: impl AsRef<str>, document: JsonValue) {
        let (uri, _) = uri::defrag(uri.as_ref());
        self.store.insert(uri.to_string(), Arc::new(document));
    }

    /// The document stored for `uri`, if any.
    pub fn document(&self, uri: &str) -> Option<&JsonValue> {
        self.store.get(uri::defrag(uri).0).map(AsRef::as_ref)
    }

    pub fn push_scope(&mut self, scope: &str) {
        let joined = self.join(self.resolution_scope().to_string(), scope);
        trace!("Entering resolution scope {}", joined);
        self.scopes.push(joined);
    }

    /// Leave the innermost scope. The base scope is never popped.
    pub fn pop_scope(&mut self) -> ResolveResult<()> {
        if self.scopes.len() <= 1 {
            return Err(ResolveError::EmptyScopeStack);
        }
        if let Some(scope) = self.scopes.pop() {
            trace!("Leaving resolution scope {}", scope);
        }
        Ok(())
    }

    /// The URI relative references currently resolve against.
    pub fn resolution_scope(&self) -> &str {
        self.scopes.last().map(String::as_str).unwrap_or_default()
    }

    /// The resolution scope without its fragment.
    pub fn base_uri(&self) -> &str {
        uri::defrag(self.resolution_scope()).0
    }

    fn join(&mut self, base: String, reference: &str) -> String {
        let key = (base, reference.to_string());
        if let Some(joined) = self.join_cache.get(&key) {
            return joined.clone();
        }
        let joined = uri::join(&key.0, reference);
        self.join_cache.put(key, joined.clone());
        joined
    }

    /// Resolve `reference` in the current scope.
    ///
    /// Returns the absolute URI of the target, to be pushed as the scope of
    /// the target, and a copy of the target.
    pub fn resolve(&mut self, reference: &str) -> ResolveResult<(String, JsonValue)> {
        let url = self.join(self.resolution_scope().to_string(), reference);
        if let Some(resolved) = self.remote_cache.get(&url) {
            trace!("Resolved {} from cache", url);
            return Ok((url, resolved.clone()));
        }
        let resolved = self.resolve_from_url(&url)?;
        self.remote_cache.put(url.clone(), resolved.clone());
        Ok((url, resolved))
    }

    pub fn resolve_from_url(&mut self, url: &str) -> ResolveResult<JsonValue> {
        let (document_uri, fragment) = uri::defrag(url);
        let document = match self.store.get(document_uri) {
            Some(document) => Arc::clone(document),
            None => self.resolve_remote(document_uri)?,
        };
        Self::resolve_fragment(&document, fragment).cloned()
    }

    /// Walk a JSON pointer fragment down `document`.
    pub fn resolve_fragment<'d>(
        document: &'d JsonValue,
        fragment: &str,
    ) -> ResolveResult<&'d JsonValue> {
        let mut current = document;
        for part in uri::pointer_segments(fragment) {
            let next = match current {
                JsonValue::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                JsonValue::Object(map) => map.get(&part),
                _ => None,
            };
            current = next.ok_or_else(|| ResolveError::Unresolvable {
                pointer: fragment.to_string(),
            })?;
        }
        Ok(current)
    }

    /// Fetch a document through the handler of its scheme, bypassing the
    /// store.
    pub fn resolve_remote(&mut self, uri: &str) -> ResolveResult<Arc<JsonValue>> {
        let scheme = uri::scheme(uri).unwrap_or_default();
        let handler = self
            .handlers
            .get(&scheme)
            .ok_or_else(|| ResolveError::UnsupportedScheme {
                scheme: scheme.clone(),
                uri: uri.to_string(),
            })?;

        debug!("Fetching referenced document {}", uri);
        let document = Arc::new(handler(uri)?);
        if self.cache_remote {
            self.store.insert(uri.to_string(), Arc::clone(&document));
        }
        Ok(document)
    }
}

impl fmt::Debug for RefResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<&String> = self.handlers.keys().collect();
        schemes.sort();
        f.debug_struct("RefResolver")
            .field("scopes", &self.scopes)
            .field("documents", &self.store.len())
            .field("schemes", &schemes)
            .field("cache_remote", &self.cache_remote)
            .finish()
    }
}
