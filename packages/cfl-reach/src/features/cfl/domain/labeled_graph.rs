//! Labeled multigraph with representative merging
//!
//! Nodes and edges live in arenas addressed by integer id. Merging a node into
//! a representative retargets its edges and records it as a sub of the
//! representative; nothing ever holds a reference to a node across a merge.
//!
//! Edge `kind` is an analysis-specific family (assignment, dereference, call,
//! ...); the generic instance uses grammar symbol ids directly.

use super::label::NodeId;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Arena slot of an edge
pub type EdgeId = usize;

/// Structural edge family
pub type EdgeKind = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub src: NodeId,
    pub dst: NodeId,
    pub kind: EdgeKind,
    pub index: u32,
    /// Set by bracket pruning on edges that can take part in a matched pair
    pub bracket_contributing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GraphNode {
    pub id: NodeId,
    /// Analysis source (value-flow): never folded away
    pub is_source: bool,
    in_edges: BTreeMap<EdgeKind, BTreeSet<EdgeId>>,
    out_edges: BTreeMap<EdgeKind, BTreeSet<EdgeId>>,
}

impl GraphNode {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn in_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.in_edges.values().flatten().copied()
    }

    pub fn out_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.out_edges.values().flatten().copied()
    }

    pub fn in_edges_of(&self, kind: EdgeKind) -> impl Iterator<Item = EdgeId> + '_ {
        self.in_edges.get(&kind).into_iter().flatten().copied()
    }

    pub fn out_edges_of(&self, kind: EdgeKind) -> impl Iterator<Item = EdgeId> + '_ {
        self.out_edges.get(&kind).into_iter().flatten().copied()
    }

    pub fn in_degree(&self) -> usize {
        self.in_edges.values().map(BTreeSet::len).sum()
    }

    pub fn out_degree(&self) -> usize {
        self.out_edges.values().map(BTreeSet::len).sum()
    }
}

/// Directed multigraph with rep/sub bookkeeping
#[derive(Debug, Clone, Default)]
pub struct LabeledGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
    edges: Vec<Option<GraphEdge>>,
    edge_index: FxHashMap<(NodeId, NodeId, EdgeKind, u32), EdgeId>,
    /// merged node -> representative
    reps: FxHashMap<NodeId, NodeId>,
    /// representative -> every node merged into it
    subs: FxHashMap<NodeId, Vec<NodeId>>,
    direct_kinds: BTreeSet<EdgeKind>,
    live_edges: usize,
}

impl LabeledGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph whose `kinds` count as direct (assignment-like) edges
    pub fn with_direct_kinds(kinds: impl IntoIterator<Item = EdgeKind>) -> Self {
        Self {
            direct_kinds: kinds.into_iter().collect(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_direct(&self, kind: EdgeKind) -> bool {
        self.direct_kinds.contains(&kind)
    }

    pub fn direct_kinds(&self) -> impl Iterator<Item = EdgeKind> + '_ {
        self.direct_kinds.iter().copied()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Nodes
    // ═══════════════════════════════════════════════════════════════════════

    /// Ensure a live node exists (a merged id resolves to its representative)
    pub fn add_node(&mut self, id: NodeId) -> NodeId {
        let id = self.rep_of(id);
        self.nodes.entry(id).or_insert_with(|| GraphNode::new(id));
        id
    }

    pub fn mark_source(&mut self, id: NodeId) {
        let id = self.add_node(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.is_source = true;
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Live node ids, ascending
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.nodes.values()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Edges
    // ═══════════════════════════════════════════════════════════════════════

    /// Add `src -kind[index]-> dst` between representatives.
    ///
    /// Returns `None` for duplicates and for direct self-loops (which carry no
    /// information for any grammar that treats direct edges as identity).
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, kind: EdgeKind, index: u32) -> Option<EdgeId> {
        let src = self.add_node(src);
        let dst = self.add_node(dst);
        if src == dst && self.is_direct(kind) {
            return None;
        }
        let key = (src, dst, kind, index);
        if self.edge_index.contains_key(&key) {
            return None;
        }

        let id = self.edges.len();
        self.edges.push(Some(GraphEdge {
            src,
            dst,
            kind,
            index,
            bracket_contributing: false,
        }));
        self.edge_index.insert(key, id);
        if let Some(node) = self.nodes.get_mut(&src) {
            node.out_edges.entry(kind).or_default().insert(id);
        }
        if let Some(node) = self.nodes.get_mut(&dst) {
            node.in_edges.entry(kind).or_default().insert(id);
        }
        self.live_edges += 1;
        Some(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<GraphEdge> {
        let edge = self.edges.get_mut(id)?.take()?;
        self.edge_index
            .remove(&(edge.src, edge.dst, edge.kind, edge.index));
        if let Some(node) = self.nodes.get_mut(&edge.src) {
            remove_slot(&mut node.out_edges, edge.kind, id);
        }
        if let Some(node) = self.nodes.get_mut(&edge.dst) {
            remove_slot(&mut node.in_edges, edge.kind, id);
        }
        self.live_edges -= 1;
        Some(edge)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.edges.get(id).and_then(Option::as_ref)
    }

    pub fn set_bracket_contributing(&mut self, id: EdgeId, value: bool) {
        if let Some(Some(edge)) = self.edges.get_mut(id) {
            edge.bracket_contributing = value;
        }
    }

    pub fn has_edge(&self, src: NodeId, dst: NodeId, kind: EdgeKind, index: u32) -> bool {
        self.edge_index.contains_key(&(src, dst, kind, index))
    }

    /// Live edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &GraphEdge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(id, e)| e.as_ref().map(|e| (id, e)))
    }

    pub fn num_edges(&self) -> usize {
        self.live_edges
    }

    /// `(src, dst)` of every direct edge
    pub fn direct_pairs(&self) -> Vec<(NodeId, NodeId)> {
        self.edges()
            .filter(|(_, e)| self.is_direct(e.kind))
            .map(|(_, e)| (e.src, e.dst))
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Merging
    // ═══════════════════════════════════════════════════════════════════════

    /// Representative of `id` (itself when never merged)
    pub fn rep_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(&next) = self.reps.get(&cur) {
            if next == cur {
                break;
            }
            cur = next;
        }
        cur
    }

    /// Nodes merged into `rep`
    pub fn subs(&self, rep: NodeId) -> &[NodeId] {
        self.subs.get(&rep).map_or(&[], Vec::as_slice)
    }

    /// Fold `node` into `rep`: every edge touching `node` is retargeted onto
    /// `rep` (duplicates and direct self-loops collapse), `node` and its own
    /// subs become subs of `rep`, and `node` leaves the graph.
    ///
    /// Returns false when there is nothing to do (same class, or `node` is
    /// not live).
    pub fn merge_node_to_rep(&mut self, node: NodeId, rep: NodeId) -> bool {
        let rep = self.rep_of(rep);
        if node == rep || !self.nodes.contains_key(&node) {
            return false;
        }
        self.nodes.entry(rep).or_insert_with(|| GraphNode::new(rep));

        let Some(old) = self.nodes.get(&node) else {
            return false;
        };
        let is_source = old.is_source;
        let touching: BTreeSet<EdgeId> = old.in_edges().chain(old.out_edges()).collect();

        let mut moved = Vec::with_capacity(touching.len());
        for id in touching {
            if let Some(edge) = self.remove_edge(id) {
                moved.push(edge);
            }
        }

        self.nodes.remove(&node);
        self.reps.insert(node, rep);
        let mut absorbed = self.subs.remove(&node).unwrap_or_default();
        for &sub in &absorbed {
            self.reps.insert(sub, rep);
        }
        absorbed.push(node);
        self.subs.entry(rep).or_default().extend(absorbed);

        if let Some(rep_node) = self.nodes.get_mut(&rep) {
            rep_node.is_source |= is_source;
        }
        for edge in moved {
            let src = if edge.src == node { rep } else { edge.src };
            let dst = if edge.dst == node { rep } else { edge.dst };
            if let Some(id) = self.add_edge(src, dst, edge.kind, edge.index) {
                self.set_bracket_contributing(id, edge.bracket_contributing);
            }
        }
        true
    }
}

fn remove_slot(map: &mut BTreeMap<EdgeKind, BTreeSet<EdgeId>>, kind: EdgeKind, id: EdgeId) {
    if let Some(set) = map.get_mut(&kind) {
        set.remove(&id);
        if set.is_empty() {
            map.remove(&kind);
        }
    }
}
