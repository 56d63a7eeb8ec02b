//! The conversion graph.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`], so a
//! recursive schema is simply a graph with a cycle in it. A
//! [`GraphBuilder`] hands out ids before the node behind them exists
//! ([`reserve`](GraphBuilder::reserve)) and fills them in later
//! ([`define`](GraphBuilder::define)); [`build`](GraphBuilder::build) checks
//! that every reserved id was defined and every edge points into the arena.
//!
//! A built [`Graph`] is immutable. Conversions borrow it and keep their own
//! per-call state in a [`Context`].

use crate::config::ConvertOptions;
use crate::error::{
    BuildError, BuildResult, ConvertError, ConvertResult, ErrorKind, SchemaError, SchemaResult,
};
use crate::messages::MessageKey;
use crate::path::Path;
use crate::resolver::RefResolver;
use crate::types::{Convertible, Registry};
use crate::value::{Input, Value};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Handle of a node inside one [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What is being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    /// A schema or specification document.
    Specification,
    /// An inbound payload. Read-only properties are rejected.
    Request,
    /// An outbound payload. Write-only properties are rejected and nothing
    /// is defaulted.
    Response,
}

impl Entity {
    /// Casting is lenient for requests only.
    pub fn default_strict(self) -> bool {
        !matches!(self, Entity::Request)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Specification => f.write_str("specification"),
            Entity::Request => f.write_str("request"),
            Entity::Response => f.write_str("response"),
        }
    }
}

/// Entity and casting policy of a conversion. Passed unchanged to every
/// nested conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConvertMode {
    pub entity: Entity,
    /// When `false`, primitives coerce mismatching values before the type
    /// check.
    pub strict: bool,
}

impl ConvertMode {
    pub fn new(entity: Entity, strict: bool) -> Self {
        Self { entity, strict }
    }
}

/// Assembles a [`Graph`].
#[derive(Default)]
pub struct GraphBuilder {
    slots: Vec<Option<Box<dyn Convertible>>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id to be [`define`](Self::define)d later.
    pub fn reserve(&mut self) -> NodeId {
        self.slots.push(None);
        NodeId(self.slots.len() - 1)
    }

    /// Fill a reserved id.
    pub fn define(&mut self, id: NodeId, node: impl Convertible + 'static) -> BuildResult<()> {
        self.define_boxed(id, Box::new(node))
    }

    pub fn define_boxed(&mut self, id: NodeId, node: Box<dyn Convertible>) -> BuildResult<()> {
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or(BuildError::UnknownNode(id.0))?;
        if slot.is_some() {
            return Err(BuildError::AlreadyDefined(id.0));
        }
        *slot = Some(node);
        Ok(())
    }

    /// Reserve and define in one step.
    pub fn add(&mut self, node: impl Convertible + 'static) -> NodeId {
        self.add_boxed(Box::new(node))
    }

    pub fn add_boxed(&mut self, node: Box<dyn Convertible>) -> NodeId {
        self.slots.push(Some(node));
        NodeId(self.slots.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_defined(&self, id: NodeId) -> bool {
        self.slots.get(id.0).is_some_and(Option::is_some)
    }

    /// Drop every node from `len` on. Used to roll back a failed compilation.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }

    pub fn build(self) -> BuildResult<Graph> {
        let len = self.slots.len();
        let mut nodes = Vec::with_capacity(len);
        for (index, slot) in self.slots.into_iter().enumerate() {
            let node = slot.ok_or(BuildError::PendingNode(index))?;
            if let Some(child) = node.children().into_iter().find(|child| child.0 >= len) {
                return Err(BuildError::UnknownNode(child.0));
            }
            nodes.push(node);
        }
        debug!("Built conversion graph with {} nodes", nodes.len());
        Ok(Graph { nodes })
    }
}

impl fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("slots", &self.slots.len())
            .finish()
    }
}

/// An immutable arena of conversion nodes.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Box<dyn Convertible>>,
}

impl Graph {
    /// The node behind `id`.
    ///
    /// Ids are handed out by the builder of this graph, which also checked
    /// every edge, so indexing cannot fail for them.
    pub fn node(&self, id: NodeId) -> &dyn Convertible {
        self.nodes[id.0].as_ref()
    }

    pub fn get(&self, id: NodeId) -> Option<&dyn Convertible> {
        self.nodes.get(id.0).map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Convert `value` starting at `root`, reporting errors under `#`.
    pub fn convert(
        &self,
        root: NodeId,
        value: &JsonValue,
        options: &ConvertOptions,
    ) -> SchemaResult<Converted> {
        self.convert_at(root, Input::Value(value), &Path::root(), options, None)
            .map(|converted| converted.unwrap_or_else(Converted::null))
    }

    /// Convert with full control over the input, the root path and the
    /// resolver used for `$ref`s found in the payload.
    ///
    /// Returns `None` when an absent input produced no value.
    pub fn convert_at(
        &self,
        root: NodeId,
        input: Input<'_>,
        path: &Path,
        options: &ConvertOptions,
        resolver: Option<&mut RefResolver>,
    ) -> SchemaResult<Option<Converted>> {
        let mut ctx = Context::new(self, options.mode(), resolver);
        match ctx.convert(root, input, path) {
            Ok(value) => Ok(Some(Converted {
                links: ctx.into_links(),
                value,
            })),
            Err(ConvertError::Schema(error)) => Err(error),
            Err(ConvertError::UndefinedResult) => Ok(None),
            Err(ConvertError::RecursiveReference) => Err(SchemaError::single(
                path,
                ErrorKind::ReferenceRecursive,
                MessageKey::RecursiveReference.default_text(),
            )),
        }
    }
}

/// A shared graph together with the node conversions start at.
///
/// Cloning is cheap, and a converter can be used from many threads at once.
#[derive(Debug, Clone)]
pub struct Converter {
    graph: Arc<Graph>,
    root: NodeId,
}

impl Converter {
    pub fn new(graph: Arc<Graph>, root: NodeId) -> Self {
        Self { graph, root }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The same graph, entered at another node.
    pub fn with_root(&self, root: NodeId) -> Self {
        Self::new(Arc::clone(&self.graph), root)
    }

    pub fn convert(&self, value: &JsonValue, options: &ConvertOptions) -> SchemaResult<Converted> {
        self.graph.convert(self.root, value, options)
    }

    pub fn request(&self, value: &JsonValue) -> SchemaResult<Converted> {
        self.convert(value, &ConvertOptions::request())
    }

    pub fn response(&self, value: &JsonValue) -> SchemaResult<Converted> {
        self.convert(value, &ConvertOptions::response())
    }

    pub fn convert_at(
        &self,
        input: Input<'_>,
        path: &Path,
        options: &ConvertOptions,
        resolver: Option<&mut RefResolver>,
    ) -> SchemaResult<Option<Converted>> {
        self.graph.convert_at(self.root, input, path, options, resolver)
    }
}

/// The outcome of a successful top-level conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Converted {
    pub value: Value,
    /// Values of every path that appears as a [`Value::Link`] inside
    /// `value`, keyed by that path.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<Path, Value>,
}

impl Converted {
    fn null() -> Self {
        Self {
            value: Value::Null,
            links: BTreeMap::new(),
        }
    }

    /// Follow a link, or return the value itself.
    pub fn resolve<'a>(&'a self, value: &'a Value) -> &'a Value {
        match value {
            Value::Link(path) => self.links.get(path).unwrap_or(value),
            other => other,
        }
    }
}

/// Per-call conversion state.
pub struct Context<'a> {
    graph: &'a Graph,
    mode: ConvertMode,
    registry: Registry,
    resolver: Option<&'a mut RefResolver>,
    visited_refs: HashSet<Path>,
}

impl<'a> Context<'a> {
    pub fn new(graph: &'a Graph, mode: ConvertMode, resolver: Option<&'a mut RefResolver>) -> Self {
        Self {
            graph,
            mode,
            registry: Registry::default(),
            resolver,
            visited_refs: HashSet::new(),
        }
    }

    /// Convert `input` with the node `id`.
    pub fn convert(&mut self, id: NodeId, input: Input<'_>, path: &Path) -> ConvertResult<Value> {
        let graph = self.graph;
        graph.node(id).convert(input, path, self)
    }

    pub fn mode(&self) -> ConvertMode {
        self.mode
    }

    pub fn entity(&self) -> Entity {
        self.mode.entity
    }

    pub fn is_strict(&self) -> bool {
        self.mode.strict
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn resolver_mut(&mut self) -> Option<&mut RefResolver> {
        self.resolver.as_deref_mut()
    }

    pub fn visited_refs(&mut self) -> &mut HashSet<Path> {
        &mut self.visited_refs
    }

    fn into_links(self) -> BTreeMap<Path, Value> {
        let links = self.registry.into_links();
        if !links.is_empty() {
            trace!("Conversion produced {} linked values", links.len());
        }
        links
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("mode", &self.mode)
            .field("registry", &self.registry)
            .field("visited_refs", &self.visited_refs)
            .finish()
    }
}
