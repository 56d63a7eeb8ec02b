//! `$ref`s found in the payload itself.
//!
//! Specification documents may point from one part of the document to
//! another. [`ReferenceType`] follows such pointers with the
//! [`RefResolver`](crate::resolver::RefResolver) of the conversion and
//! memoizes every converted location in the [`Registry`] of the
//! [`Context`]. A location that is referenced again while it is still
//! being converted yields a [`Value::Link`] instead of recursing forever.

use super::{Common, Convertible};
use crate::error::{ConvertError, ConvertResult, SchemaError};
use crate::graph::{Context, NodeId};
use crate::messages::MessageKey;
use crate::path::Path;
use crate::value::{Input, Value};
use log::{debug, trace, warn};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Conversion state of one document location.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultState {
    /// Conversion has started and not finished yet.
    Pending,
    /// Conversion failed; references to it are bad.
    Poisoned,
    Done(Value),
}

/// Per-conversion memo of converted locations.
#[derive(Debug, Default)]
pub struct Registry {
    states: HashMap<Path, ResultState>,
    linked: BTreeSet<Path>,
}

impl Registry {
    pub fn state(&self, path: &Path) -> Option<&ResultState> {
        self.states.get(path)
    }

    pub fn begin(&mut self, path: Path) {
        self.states.insert(path, ResultState::Pending);
    }

    pub fn finish(&mut self, path: Path, value: Value) {
        self.states.insert(path, ResultState::Done(value));
    }

    pub fn poison(&mut self, path: Path) {
        self.states.insert(path, ResultState::Poisoned);
    }

    pub fn remove(&mut self, path: &Path) {
        self.states.remove(path);
    }

    /// A placeholder for a location that is still pending. The final value
    /// shows up in [`into_links`](Self::into_links).
    pub fn link(&mut self, path: &Path) -> Value {
        self.linked.insert(path.clone());
        Value::Link(path.clone())
    }

    /// Final values of every location handed out as a link.
    pub fn into_links(mut self) -> BTreeMap<Path, Value> {
        self.linked
            .into_iter()
            .filter_map(|path| match self.states.remove(&path) {
                Some(ResultState::Done(value)) => Some((path, value)),
                _ => None,
            })
            .collect()
    }
}

/// Follows `{"$ref": ...}` values and converts everything else with its
/// target node.
#[derive(Debug, Clone)]
pub struct ReferenceType {
    common: Common,
    pub target: NodeId,
}

impl ReferenceType {
    pub fn new(common: Common, target: NodeId) -> Self {
        Self { common, target }
    }

    fn reference_of(value: &JsonValue) -> Option<&JsonValue> {
        value.as_object()?.get("$ref")
    }

    /// Convert through the target node without the `$ref` chain of the
    /// caller. Only consecutive `$ref`s form a chain.
    fn convert_target(
        &self,
        input: Input<'_>,
        path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        let chain = std::mem::take(ctx.visited_refs());
        let result = ctx.convert(self.target, input, path);
        *ctx.visited_refs() = chain;
        result
    }

    fn entry(&self, input: Input<'_>, path: &Path, ctx: &mut Context<'_>) -> ConvertResult<Value> {
        match ctx.registry().state(path).cloned() {
            Some(ResultState::Done(value)) => return Ok(value),
            Some(ResultState::Pending) => return Ok(ctx.registry_mut().link(path)),
            Some(ResultState::Poisoned) | None => {}
        }

        ctx.registry_mut().begin(path.clone());
        let result = self.convert_target(input, path, ctx);
        match &result {
            Ok(value) => ctx.registry_mut().finish(path.clone(), value.clone()),
            Err(ConvertError::Schema(_)) => ctx.registry_mut().poison(path.clone()),
            Err(_) => ctx.registry_mut().remove(path),
        }
        result
    }

    fn dive(&self, reference: &JsonValue, path: &Path, ctx: &mut Context<'_>) -> ConvertResult<Value> {
        let unresolvable = || self.common.fail(path, MessageKey::UnresolvableReference, &[]);

        let Some(reference) = reference.as_str() else {
            return Err(unresolvable());
        };
        let Some(resolver) = ctx.resolver_mut() else {
            debug!("No resolver available for '{}' at {}", reference, path);
            return Err(unresolvable());
        };
        let (url, target) = match resolver.resolve(reference) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("Failed to resolve '{}' at {}: {}", reference, path, e);
                return Err(unresolvable());
            }
        };

        resolver.push_scope(&url);
        let result = self.dive_into(&url, &target, path, ctx);
        if let Some(Err(e)) = ctx.resolver_mut().map(|resolver| resolver.pop_scope()) {
            warn!("Unbalanced resolution scope after '{}': {}", url, e);
        }
        result
    }

    fn dive_into(
        &self,
        url: &str,
        target: &JsonValue,
        path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        let target_path = Path::from_uri(url);
        trace!("Following $ref at {} to {}", path, target_path);

        if ctx.visited_refs().contains(&target_path) {
            return Err(ConvertError::RecursiveReference);
        }

        match ctx.registry().state(&target_path).cloned() {
            Some(ResultState::Poisoned) => {
                return Err(self.common.fail(path, MessageKey::BadReference, &[]));
            }
            Some(ResultState::Done(value)) => return Ok(value),
            Some(ResultState::Pending) => return Ok(ctx.registry_mut().link(&target_path)),
            None => {}
        }

        ctx.registry_mut().begin(target_path.clone());
        ctx.visited_refs().insert(target_path.clone());
        let result = self.deeper(target, &target_path, ctx);
        ctx.visited_refs().remove(&target_path);

        match result {
            Ok(value) => {
                ctx.registry_mut().finish(target_path, value.clone());
                Ok(value)
            }
            Err(ConvertError::Schema(error)) => {
                ctx.registry_mut().poison(target_path);
                let bad = self.common.error(path, MessageKey::BadReference, &[]);
                Err(SchemaError::new(bad).extended(error).into())
            }
            Err(ConvertError::RecursiveReference) => {
                ctx.registry_mut().poison(target_path);
                Err(self.common.fail(path, MessageKey::RecursiveReference, &[]))
            }
            Err(ConvertError::UndefinedResult) => {
                ctx.registry_mut().remove(&target_path);
                Err(ConvertError::UndefinedResult)
            }
        }
    }

    /// The target of a `$ref` may itself be a `$ref`.
    fn deeper(
        &self,
        target: &JsonValue,
        target_path: &Path,
        ctx: &mut Context<'_>,
    ) -> ConvertResult<Value> {
        match Self::reference_of(target) {
            Some(reference) => self.dive(reference, target_path, ctx),
            None => self.convert_target(Input::Value(target), target_path, ctx),
        }
    }
}

impl Convertible for ReferenceType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn children(&self) -> Vec<NodeId> {
        vec![self.target]
    }

    fn convert(&self, input: Input<'_>, path: &Path, ctx: &mut Context<'_>) -> ConvertResult<Value> {
        match input.value().and_then(Self::reference_of) {
            Some(reference) => self.dive(reference, path, ctx),
            None => self.entry(input, path, ctx),
        }
    }
}
