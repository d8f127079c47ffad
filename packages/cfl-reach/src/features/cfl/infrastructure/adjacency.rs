//! Adjacency dataset
//!
//! The solver's shared mutable state: every derived edge `src -L-> dst` is
//! stored twice, as `succ[src][L] ∋ dst` and `pred[dst][L] ∋ src`.
//! `check_and_add` is the only way in and the only dedup point; its
//! idempotence is what makes the fixpoint terminate.

use super::node_set::NodeSet;
use crate::features::cfl::domain::label::{Label, LabeledEdge, NodeId, SymbolId};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

type LabelIndex = FxHashMap<NodeId, FxHashMap<Label, NodeSet>>;

/// Forward and backward label-indexed adjacency over node sets
#[derive(Debug, Clone, Default)]
pub struct AdjacencyDataset {
    succ: LabelIndex,
    pred: LabelIndex,
    edge_count: usize,
}

impl AdjacencyDataset {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Insertion
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert `src -label-> dst`; true iff the edge was absent.
    /// Fault labels are rejected without mutation.
    pub fn check_and_add(&mut self, src: NodeId, dst: NodeId, label: Label) -> bool {
        if label.is_fault() {
            return false;
        }
        let inserted = self
            .succ
            .entry(src)
            .or_default()
            .entry(label)
            .or_default()
            .insert(dst);
        if inserted {
            self.pred
                .entry(dst)
                .or_default()
                .entry(label)
                .or_default()
                .insert(src);
            self.edge_count += 1;
        }
        inserted
    }

    /// Insert `src -label-> d` for every `d` in `dsts`; returns the newly inserted targets
    pub fn check_and_add_targets(&mut self, src: NodeId, dsts: &NodeSet, label: Label) -> NodeSet {
        if label.is_fault() || dsts.is_empty() {
            return NodeSet::new();
        }
        let added = self
            .succ
            .entry(src)
            .or_default()
            .entry(label)
            .or_default()
            .union_new(dsts);
        for dst in added.iter() {
            self.pred
                .entry(dst)
                .or_default()
                .entry(label)
                .or_default()
                .insert(src);
        }
        self.edge_count += added.len();
        added
    }

    /// Insert `s -label-> dst` for every `s` in `srcs`; returns the newly inserted sources
    pub fn check_and_add_sources(&mut self, srcs: &NodeSet, dst: NodeId, label: Label) -> NodeSet {
        if label.is_fault() || srcs.is_empty() {
            return NodeSet::new();
        }
        let added = self
            .pred
            .entry(dst)
            .or_default()
            .entry(label)
            .or_default()
            .union_new(srcs);
        for src in added.iter() {
            self.succ
                .entry(src)
                .or_default()
                .entry(label)
                .or_default()
                .insert(dst);
        }
        self.edge_count += added.len();
        added
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn has_edge(&self, src: NodeId, dst: NodeId, label: Label) -> bool {
        self.succ(src, label).map_or(false, |s| s.contains(dst))
    }

    pub fn succ(&self, node: NodeId, label: Label) -> Option<&NodeSet> {
        self.succ.get(&node).and_then(|m| m.get(&label))
    }

    pub fn pred(&self, node: NodeId, label: Label) -> Option<&NodeSet> {
        self.pred.get(&node).and_then(|m| m.get(&label))
    }

    /// Outgoing `(label, targets)` at `node`
    pub fn out_labels(&self, node: NodeId) -> impl Iterator<Item = (Label, &NodeSet)> + '_ {
        self.succ
            .get(&node)
            .into_iter()
            .flat_map(|m| m.iter().map(|(&l, s)| (l, s)))
    }

    /// Incoming `(label, sources)` at `node`
    pub fn in_labels(&self, node: NodeId) -> impl Iterator<Item = (Label, &NodeSet)> + '_ {
        self.pred
            .get(&node)
            .into_iter()
            .flat_map(|m| m.iter().map(|(&l, s)| (l, s)))
    }

    /// Total stored edges
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// Edges per symbol (all indices summed)
    pub fn symbol_counts(&self) -> BTreeMap<SymbolId, usize> {
        let mut counts = BTreeMap::new();
        for labels in self.succ.values() {
            for (label, targets) in labels {
                *counts.entry(label.symbol).or_insert(0) += targets.len();
            }
        }
        counts
    }

    /// Sorted `(src, dst)` pairs carrying `symbol` under any index
    pub fn pairs(&self, symbol: SymbolId) -> Vec<(NodeId, NodeId)> {
        let mut pairs: Vec<(NodeId, NodeId)> = self
            .succ
            .iter()
            .flat_map(|(&src, labels)| {
                labels
                    .iter()
                    .filter(move |(l, _)| l.symbol == symbol)
                    .flat_map(move |(_, targets)| targets.iter().map(move |dst| (src, dst)))
            })
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    /// Every stored edge, sorted
    pub fn edges(&self) -> Vec<LabeledEdge> {
        let mut edges: Vec<LabeledEdge> = self
            .succ
            .iter()
            .flat_map(|(&src, labels)| {
                labels.iter().flat_map(move |(&label, targets)| {
                    targets.iter().map(move |dst| LabeledEdge::new(src, dst, label))
                })
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Add every edge of `other`; returns how many were new
    pub fn absorb(&mut self, other: &AdjacencyDataset) -> usize {
        let mut added = 0;
        for (&src, labels) in &other.succ {
            for (&label, targets) in labels {
                added += self.check_and_add_targets(src, targets, label).len();
            }
        }
        added
    }
}
