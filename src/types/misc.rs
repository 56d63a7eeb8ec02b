use super::{Common, Convertible};
use crate::error::ConvertResult;
use crate::graph::{Context, NodeId};
use crate::path::Path;
use crate::value::{Input, Value};

/// Accepts any value and takes it over unchanged.
#[derive(Debug, Clone, Default)]
pub struct AnyType {
    common: Common,
}

impl AnyType {
    pub fn new(common: Common) -> Self {
        Self { common }
    }
}

impl Convertible for AnyType {
    fn common(&self) -> &Common {
        &self.common
    }
}

/// Forwards to another node of the graph.
///
/// The target may be defined after this node, which is how hand-built graphs
/// express recursion.
#[derive(Debug, Clone)]
pub struct LazyType {
    common: Common,
    pub target: NodeId,
}

impl LazyType {
    pub fn new(target: NodeId) -> Self {
        Self {
            common: Common::new(),
            target,
        }
    }
}

impl Convertible for LazyType {
    fn common(&self) -> &Common {
        &self.common
    }

    fn children(&self) -> Vec<NodeId> {
        vec![self.target]
    }

    fn convert(&self, input: Input<'_>, path: &Path, ctx: &mut Context<'_>) -> ConvertResult<Value> {
        ctx.convert(self.target, input, path)
    }
}
