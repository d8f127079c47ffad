//! Edge labels
//!
//! A label is a grammar symbol plus an index. The index distinguishes
//! parametric instances of a variant symbol (field offset, call site);
//! it is always 0 for non-variant symbols.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Graph node identifier
pub type NodeId = u32;

/// Grammar symbol identifier (0 is reserved for the fault sentinel)
pub type SymbolId = u32;

/// The "no such edge" symbol. Never stored.
pub const FAULT: SymbolId = 0;

/// `(symbol, index)` pair carried by every derived edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    pub symbol: SymbolId,
    pub index: u32,
}

impl Label {
    #[inline]
    pub const fn new(symbol: SymbolId, index: u32) -> Self {
        Self { symbol, index }
    }

    /// Label of a non-variant symbol
    #[inline]
    pub const fn plain(symbol: SymbolId) -> Self {
        Self { symbol, index: 0 }
    }

    #[inline]
    pub const fn fault() -> Self {
        Self::plain(FAULT)
    }

    #[inline]
    pub const fn is_fault(&self) -> bool {
        self.symbol == FAULT
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.symbol, self.index)
    }
}

/// A derived or seed edge `src -label-> dst`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabeledEdge {
    pub src: NodeId,
    pub dst: NodeId,
    pub label: Label,
}

impl LabeledEdge {
    #[inline]
    pub const fn new(src: NodeId, dst: NodeId, label: Label) -> Self {
        Self { src, dst, label }
    }
}

/// Solver input: terminal edges plus the node universe
///
/// Every node in `nodes` receives the empty-rule self edges. `reflexive`
/// labels are stored on every node as well but never queued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedGraph {
    pub nodes: BTreeSet<NodeId>,
    pub edges: Vec<LabeledEdge>,
    pub reflexive: Vec<Label>,
}

impl SeedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.nodes.insert(node);
    }

    /// Add an edge, registering both endpoints
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, label: Label) {
        self.nodes.insert(src);
        self.nodes.insert(dst);
        self.edges.push(LabeledEdge::new(src, dst, label));
    }

    pub fn with_reflexive(mut self, label: Label) -> Self {
        self.reflexive.push(label);
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}

impl FromIterator<LabeledEdge> for SeedGraph {
    fn from_iter<I: IntoIterator<Item = LabeledEdge>>(iter: I) -> Self {
        let mut seeds = SeedGraph::new();
        for edge in iter {
            seeds.add_edge(edge.src, edge.dst, edge.label);
        }
        seeds
    }
}
