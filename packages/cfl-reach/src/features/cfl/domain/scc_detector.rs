//! Strongly Connected Component Detection
//!
//! Iterative Tarjan over an edge list. Used for direct-edge cycle merging
//! before solving and for unary-rule cycle checks on grammars.
//!
//! Nodes are visited in ascending id order and every component is reported
//! sorted, so results are deterministic for a given edge set.
//!
//! # References
//! - Tarjan, R. "Depth-First Search and Linear Graph Algorithms" (1972)

use super::label::NodeId;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// Result of SCC detection
#[derive(Debug, Clone, Default)]
pub struct SCCResult {
    /// Member -> representative (minimum id), for components with >1 member
    pub node_to_rep: FxHashMap<NodeId, NodeId>,

    /// Components with more than one member, each sorted ascending
    pub sccs: Vec<Vec<NodeId>>,

    /// Singleton components closed by a self-loop edge
    pub self_loops: Vec<NodeId>,

    pub stats: SCCStats,
}

#[derive(Debug, Clone, Default)]
pub struct SCCStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub scc_count: usize,
    pub largest_scc: usize,
    pub collapsed_nodes: usize,
}

/// Tarjan's SCC algorithm
///
/// Time: O(V + E), no recursion.
pub fn tarjan_scc(edges: &[(NodeId, NodeId)]) -> SCCResult {
    let mut adj: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for &(src, dst) in edges {
        adj.entry(src).or_default().push(dst);
        adj.entry(dst).or_default();
    }
    for targets in adj.values_mut() {
        targets.sort_unstable();
        targets.dedup();
    }

    let mut state = TarjanState::default();
    for &root in adj.keys() {
        if !state.index.contains_key(&root) {
            state.visit(root, &adj);
        }
    }

    let self_loops: FxHashSet<NodeId> = edges
        .iter()
        .filter(|(s, d)| s == d)
        .map(|&(s, _)| s)
        .collect();

    let mut result = SCCResult::default();
    for mut scc in state.sccs {
        scc.sort_unstable();
        result.stats.largest_scc = result.stats.largest_scc.max(scc.len());
        if scc.len() > 1 {
            let rep = scc[0];
            for &member in &scc {
                result.node_to_rep.insert(member, rep);
            }
            result.stats.collapsed_nodes += scc.len() - 1;
            result.sccs.push(scc);
        } else if self_loops.contains(&scc[0]) {
            result.self_loops.push(scc[0]);
        }
    }
    result.sccs.sort();
    result.self_loops.sort_unstable();
    result.stats.total_nodes = adj.len();
    result.stats.total_edges = edges.len();
    result.stats.scc_count = result.sccs.len();
    result
}

#[derive(Default)]
struct TarjanState {
    index: FxHashMap<NodeId, usize>,
    lowlink: FxHashMap<NodeId, usize>,
    on_stack: FxHashSet<NodeId>,
    stack: Vec<NodeId>,
    next_index: usize,
    sccs: Vec<Vec<NodeId>>,
}

impl TarjanState {
    fn open(&mut self, v: NodeId) {
        self.index.insert(v, self.next_index);
        self.lowlink.insert(v, self.next_index);
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);
    }

    fn low(&self, v: NodeId) -> usize {
        self.lowlink.get(&v).copied().unwrap_or(usize::MAX)
    }

    fn visit(&mut self, root: NodeId, adj: &BTreeMap<NodeId, Vec<NodeId>>) {
        // (node, next successor position)
        let mut frames: Vec<(NodeId, usize)> = vec![(root, 0)];
        self.open(root);

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            let succs = adj.get(&v).map_or(&[][..], Vec::as_slice);
            if let Some(&w) = succs.get(frame.1) {
                frame.1 += 1;
                if !self.index.contains_key(&w) {
                    self.open(w);
                    frames.push((w, 0));
                } else if self.on_stack.contains(&w) {
                    let low = self.low(v).min(self.index[&w]);
                    self.lowlink.insert(v, low);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                let low = self.low(parent).min(self.low(v));
                self.lowlink.insert(parent, low);
            }
            if self.lowlink.get(&v) == self.index.get(&v) {
                let mut scc = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack.remove(&w);
                    scc.push(w);
                    if w == v {
                        break;
                    }
                }
                self.sccs.push(scc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_cycle() {
        let result = tarjan_scc(&[(1, 2), (2, 3), (3, 1)]);
        assert_eq!(result.stats.scc_count, 1);
        assert_eq!(result.sccs[0], vec![1, 2, 3]);
        assert_eq!(result.stats.collapsed_nodes, 2);
    }

    #[test]
    fn test_no_cycle() {
        let result = tarjan_scc(&[(1, 2), (2, 3)]);
        assert_eq!(result.stats.scc_count, 0);
        assert!(result.node_to_rep.is_empty());
        assert!(result.self_loops.is_empty());
    }

    #[test]
    fn test_multiple_sccs() {
        let result = tarjan_scc(&[(1, 2), (2, 3), (3, 1), (4, 5), (5, 4), (3, 4)]);
        assert_eq!(result.sccs, vec![vec![1, 2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_self_loop() {
        let result = tarjan_scc(&[(1, 1), (1, 2)]);
        assert_eq!(result.stats.scc_count, 0);
        assert_eq!(result.self_loops, vec![1]);
    }

    #[test]
    fn test_scc_representative() {
        let result = tarjan_scc(&[(5, 3), (3, 7), (7, 5)]);
        assert_eq!(result.node_to_rep.get(&5), Some(&3));
        assert_eq!(result.node_to_rep.get(&7), Some(&3));
        assert_eq!(result.node_to_rep.get(&3), Some(&3));
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let mut edges: Vec<(NodeId, NodeId)> = (0..200_000).map(|i| (i, i + 1)).collect();
        edges.push((200_000, 0));
        let result = tarjan_scc(&edges);
        assert_eq!(result.sccs.len(), 1);
        assert_eq!(result.sccs[0].len(), 200_001);
    }
}
