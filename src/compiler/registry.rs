//! Compile-time memo of schema nodes.
//!
//! Every schema location compiles at most once per polymorphism flag. A
//! structural schema is reserved before its children are compiled, so a
//! child that refers back to it gets the reserved id and closes the cycle.

use crate::graph::NodeId;
use crate::path::Path;
use log::trace;
use std::collections::HashMap;

/// Key of a compiled schema: its location and whether model-level
/// polymorphism was allowed when compiling it.
pub type CompileKey = (Path, bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Being compiled; the id is valid but not yet defined.
    Reserved(NodeId),
    Defined(NodeId),
    /// Compilation failed. Later references report a bad reference instead
    /// of compiling the schema again.
    Poisoned,
}

#[derive(Debug, Default)]
pub struct CompileRegistry {
    entries: HashMap<CompileKey, Entry>,
}

impl CompileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CompileKey) -> Option<Entry> {
        self.entries.get(key).copied()
    }

    pub fn reserve(&mut self, key: CompileKey, id: NodeId) {
        self.entries.insert(key, Entry::Reserved(id));
    }

    pub fn define(&mut self, key: CompileKey, id: NodeId) {
        self.entries.insert(key, Entry::Defined(id));
    }

    pub fn poison(&mut self, key: CompileKey) {
        trace!("Poisoning {} (polymorphic: {})", key.0, key.1);
        self.entries.insert(key, Entry::Poisoned);
    }

    /// Forget every entry pointing at a node at or after `len`. Used when
    /// the builder is rolled back to `len`.
    pub fn forget_from(&mut self, len: usize) {
        self.entries.retain(|_, entry| match entry {
            Entry::Reserved(id) | Entry::Defined(id) => id.index() < len,
            Entry::Poisoned => true,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
