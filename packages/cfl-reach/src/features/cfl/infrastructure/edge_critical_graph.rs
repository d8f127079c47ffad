//! Edge-critical graph (ECG)
//!
//! Online transitive closure for one transitive symbol. The structure keeps
//! an explicit reachability table plus a sparse edge set whose reachability
//! equals the table:
//!
//! - A new edge `i -> j` is tagged **forward** unless `j` already reaches `i`,
//!   in which case it closes a cycle and is tagged **back**.
//! - Forward insertion walks back from `i` over predecessors that cannot reach
//!   `j` yet, marks each of them reachable to everything `j` reaches, and drops
//!   their out-edges that the new edge makes redundant.
//! - Back insertion marks the same way, then compacts the cycle: along a
//!   shortest `j ~> i` path every non-consecutive edge between path members is
//!   removed, so re-entering an SCC does not keep adding edges.
//!
//! Insertion cost is proportional to the number of new reachable pairs.
//! `(n, n)` is implicit and never stored.

use super::node_set::NodeSet;
use crate::features::cfl::domain::label::NodeId;
use crate::features::cfl::ports::TransitiveClosure;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeTag {
    Forward,
    Back,
}

#[derive(Debug, Clone, Default)]
struct EcgNode {
    succ: FxHashMap<NodeId, EdgeTag>,
    pred: FxHashSet<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct EdgeCriticalGraph {
    nodes: FxHashMap<NodeId, EcgNode>,
    reachable: FxHashMap<NodeId, NodeSet>,
    pairs: usize,
    checks: u64,
    /// Edges dropped as redundant (forward pruning and cycle compaction)
    removed_edges: usize,
}

impl EdgeCriticalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reachability table
    // ═══════════════════════════════════════════════════════════════════════

    /// Counted query used by the searches
    fn reach(&mut self, src: NodeId, dst: NodeId) -> bool {
        self.checks += 1;
        src == dst || self.reachable.get(&src).map_or(false, |set| set.contains(dst))
    }

    fn set_reachable(&mut self, src: NodeId, dst: NodeId, delta: &mut Vec<(NodeId, NodeId)>) {
        if self.reachable.entry(src).or_default().insert(dst) {
            self.pairs += 1;
            delta.push((src, dst));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Edges
    // ═══════════════════════════════════════════════════════════════════════

    fn add_edge(&mut self, src: NodeId, dst: NodeId, tag: EdgeTag) {
        self.nodes.entry(src).or_default().succ.insert(dst, tag);
        self.nodes.entry(dst).or_default().pred.insert(src);
    }

    fn remove_edge(&mut self, src: NodeId, dst: NodeId) {
        let removed = self
            .nodes
            .get_mut(&src)
            .map_or(false, |n| n.succ.remove(&dst).is_some());
        if removed {
            if let Some(n) = self.nodes.get_mut(&dst) {
                n.pred.remove(&src);
            }
            self.removed_edges += 1;
        }
    }

    /// Sorted successor snapshot
    pub fn successors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .nodes
            .get(&node)
            .map(|n| n.succ.keys().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Sorted predecessor snapshot
    pub fn predecessors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .nodes
            .get(&node)
            .map(|n| n.pred.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    pub fn edge_tag(&self, src: NodeId, dst: NodeId) -> Option<EdgeTag> {
        self.nodes.get(&src).and_then(|n| n.succ.get(&dst)).copied()
    }

    pub fn num_edges(&self) -> usize {
        self.nodes.values().map(|n| n.succ.len()).sum()
    }

    pub fn back_edges(&self) -> usize {
        self.nodes
            .values()
            .flat_map(|n| n.succ.values())
            .filter(|&&tag| tag == EdgeTag::Back)
            .count()
    }

    pub fn removed_edges(&self) -> usize {
        self.removed_edges
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Insertion
    // ═══════════════════════════════════════════════════════════════════════

    fn insert_forward(&mut self, i: NodeId, j: NodeId, delta: &mut Vec<(NodeId, NodeId)>) {
        self.search_backward(i, j, true, delta);
        self.add_edge(i, j, EdgeTag::Forward);
    }

    fn insert_back(&mut self, i: NodeId, j: NodeId, delta: &mut Vec<(NodeId, NodeId)>) {
        self.search_backward(i, j, false, delta);
        self.compact_cycle(i, j);
        self.add_edge(i, j, EdgeTag::Back);
    }

    /// Mark `vi ~> y` for every `y` reachable from `vj` (inclusive)
    fn search_forward(&mut self, vi: NodeId, vj: NodeId, delta: &mut Vec<(NodeId, NodeId)>) {
        let mut stack = vec![vj];
        while let Some(x) = stack.pop() {
            if self.reach(vi, x) {
                continue;
            }
            self.set_reachable(vi, x, delta);
            for s in self.successors(x) {
                if !self.reach(vi, s) {
                    stack.push(s);
                }
            }
        }
    }

    /// Propagate `i -> j` to `i` and every ancestor of `i` not reaching `j`
    ///
    /// With `prune`, out-edges `vi -> s` that `j` already covers are dropped.
    fn search_backward(&mut self, i: NodeId, j: NodeId, prune: bool, delta: &mut Vec<(NodeId, NodeId)>) {
        let mut stack = vec![i];
        while let Some(vi) = stack.pop() {
            if self.reach(vi, j) {
                continue;
            }
            if prune {
                let redundant: Vec<NodeId> = self
                    .successors(vi)
                    .into_iter()
                    .filter(|&s| s != j && self.reach(j, s))
                    .collect();
                for s in redundant {
                    self.remove_edge(vi, s);
                }
            }
            self.search_forward(vi, j, delta);
            for p in self.predecessors(vi) {
                if !self.reach(p, j) {
                    stack.push(p);
                }
            }
        }
    }

    /// Before adding the back edge `i -> j`, keep only a shortest `j ~> i`
    /// path among the edges between its members
    fn compact_cycle(&mut self, i: NodeId, j: NodeId) {
        let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut queue = VecDeque::from([j]);
        let mut found = false;
        while let Some(x) = queue.pop_front() {
            if x == i {
                found = true;
                break;
            }
            for s in self.successors(x) {
                if s != j && !parent.contains_key(&s) && self.reach(s, i) {
                    parent.insert(s, x);
                    queue.push_back(s);
                }
            }
        }
        if !found {
            return;
        }

        let mut path = vec![i];
        let mut cur = i;
        while cur != j {
            match parent.get(&cur) {
                Some(&p) => {
                    path.push(p);
                    cur = p;
                }
                None => return,
            }
        }
        path.reverse();

        let on_path: FxHashSet<NodeId> = path.iter().copied().collect();
        for (pos, &u) in path.iter().enumerate() {
            let next = path.get(pos + 1).copied();
            let chords: Vec<NodeId> = self
                .successors(u)
                .into_iter()
                .filter(|w| on_path.contains(w) && Some(*w) != next)
                .collect();
            for w in chords {
                self.remove_edge(u, w);
            }
        }
    }

    fn walk(&self, from: NodeId, forward: bool, visit: &mut dyn FnMut(NodeId) -> bool) {
        let mut seen: FxHashSet<NodeId> = FxHashSet::default();
        seen.insert(from);
        let mut stack = vec![from];
        while let Some(x) = stack.pop() {
            let next = if forward {
                self.successors(x)
            } else {
                self.predecessors(x)
            };
            for y in next {
                if seen.insert(y) && visit(y) {
                    stack.push(y);
                }
            }
        }
    }
}

impl TransitiveClosure for EdgeCriticalGraph {
    fn name(&self) -> &'static str {
        "edge-critical-graph"
    }

    fn insert_edge(&mut self, src: NodeId, dst: NodeId, delta: &mut Vec<(NodeId, NodeId)>) {
        if self.reach(src, dst) {
            return;
        }
        if self.reach(dst, src) {
            self.insert_back(src, dst, delta);
        } else {
            self.insert_forward(src, dst, delta);
        }
    }

    fn is_reachable(&mut self, src: NodeId, dst: NodeId) -> bool {
        self.reach(src, dst)
    }

    fn walk_descendants(&self, from: NodeId, visit: &mut dyn FnMut(NodeId) -> bool) {
        self.walk(from, true, visit);
    }

    fn walk_ancestors(&self, to: NodeId, visit: &mut dyn FnMut(NodeId) -> bool) {
        self.walk(to, false, visit);
    }

    fn checks(&self) -> u64 {
        self.checks
    }

    fn reachable_pairs(&self) -> usize {
        self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(edges: &[(NodeId, NodeId)]) -> (EdgeCriticalGraph, Vec<(NodeId, NodeId)>) {
        let mut ecg = EdgeCriticalGraph::new();
        let mut delta = Vec::new();
        for &(s, d) in edges {
            ecg.insert_edge(s, d, &mut delta);
        }
        delta.sort_unstable();
        (ecg, delta)
    }

    #[test]
    fn test_forward_chain() {
        let (ecg, pairs) = build(&[(1, 2), (2, 3)]);
        assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 3)]);
        assert_eq!(ecg.edge_tag(1, 2), Some(EdgeTag::Forward));
        assert_eq!(ecg.back_edges(), 0);
    }

    #[test]
    fn test_reachability_queries_are_counted() {
        let (mut ecg, _) = build(&[(1, 2)]);
        let before = ecg.checks();
        assert!(ecg.is_reachable(1, 2));
        assert!(!ecg.is_reachable(2, 1));
        assert_eq!(ecg.checks(), before + 2);
    }

    #[test]
    fn test_implied_edge_not_stored() {
        let (ecg, _) = build(&[(1, 2), (2, 3), (1, 3)]);
        assert_eq!(ecg.num_edges(), 2);
        assert_eq!(ecg.edge_tag(1, 3), None);
    }

    #[test]
    fn test_forward_prunes_redundant_edge() {
        // 1 -> 3 becomes implied once 1 -> 2 -> 3 exists
        let (ecg, pairs) = build(&[(2, 3), (1, 3), (1, 2)]);
        assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 3)]);
        assert_eq!(ecg.num_edges(), 2);
        assert_eq!(ecg.successors(1), vec![2]);
        assert_eq!(ecg.removed_edges(), 1);
    }

    #[test]
    fn test_back_edge_closes_cycle() {
        let (mut ecg, pairs) = build(&[(1, 2), (2, 3), (3, 1)]);
        assert_eq!(pairs.len(), 6);
        assert_eq!(ecg.edge_tag(3, 1), Some(EdgeTag::Back));
        assert!(ecg.is_reachable(2, 1));
        assert_eq!(ecg.reachable_pairs(), 6);
    }

    #[test]
    fn test_cycle_compaction_drops_chord() {
        let (ecg, pairs) = build(&[(1, 2), (2, 3), (3, 2), (3, 1)]);
        assert_eq!(pairs.len(), 6);
        assert_eq!(ecg.edge_tag(3, 2), None);
        assert_eq!(ecg.num_edges(), 3);
        assert_eq!(ecg.back_edges(), 1);
    }

    #[test]
    fn test_walk_descendants_covers_closure() {
        let (ecg, _) = build(&[(2, 3), (1, 3), (1, 2), (3, 4)]);
        let mut seen = Vec::new();
        ecg.walk_descendants(1, &mut |n| {
            seen.push(n);
            true
        });
        seen.sort_unstable();
        assert_eq!(seen, vec![2, 3, 4]);

        let mut ancestors = Vec::new();
        ecg.walk_ancestors(4, &mut |n| {
            ancestors.push(n);
            true
        });
        ancestors.sort_unstable();
        assert_eq!(ancestors, vec![1, 2, 3]);
    }
}
