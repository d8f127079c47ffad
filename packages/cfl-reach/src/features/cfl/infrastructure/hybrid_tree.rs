//! Spanning-tree closure for transitive symbols
//!
//! Every node `r` owns a tree whose members are exactly the nodes related to
//! `r`. A member `v` of tree(r) lives in one arena slot, found through
//! `ind[v][r]`, and is never shared with another tree.
//!
//! Two accelerators are built on the same arena:
//! - [`HybridClosureTree`]: dual forests (ancestor trees and descendant trees).
//!   Inserting `x -> y` walks the descendant tree of `y` and, for each visited
//!   node, the ancestor tree of `x`, pruning subtrees whose pairs are already
//!   known.
//! - [`HybridForest`]: descendant trees only. `add_arc(x, y)` grafts y's tree
//!   under `x` in every tree that already contains `x` (`meld`).
//!
//! Both do work proportional to the pairs they create, and both treat
//! `(n, n)` as implicitly present (every node is the root of its own tree).
//!
//! # References
//! - Lei et al. "Taming Transitive Redundancy for Context-Free Language
//!   Reachability" (OOPSLA 2022)

use crate::features::cfl::domain::label::NodeId;
use crate::features::cfl::ports::TransitiveClosure;
use rustc_hash::FxHashMap;

type TreeIdx = usize;

#[derive(Debug, Clone)]
struct TreeNode {
    id: NodeId,
    children: Vec<TreeIdx>,
}

/// Arena of tree nodes indexed by `(root, member)`
#[derive(Debug, Clone, Default)]
pub struct TreeArena {
    nodes: Vec<TreeNode>,
    /// member -> (root -> slot)
    ind: FxHashMap<NodeId, FxHashMap<NodeId, TreeIdx>>,
    /// non-root members across all trees
    pairs: usize,
}

impl TreeArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, id: NodeId) -> TreeIdx {
        self.nodes.push(TreeNode {
            id,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Root slot of tree(r), created on first use
    pub fn root(&mut self, r: NodeId) -> TreeIdx {
        if let Some(&idx) = self.ind.get(&r).and_then(|m| m.get(&r)) {
            return idx;
        }
        let idx = self.alloc(r);
        self.ind.entry(r).or_default().insert(r, idx);
        idx
    }

    /// Add `id` to tree(root); `None` when it is already there
    pub fn add_ind(&mut self, root: NodeId, id: NodeId) -> Option<TreeIdx> {
        self.root(root);
        if self.has_ind(root, id) {
            return None;
        }
        let idx = self.alloc(id);
        self.ind.entry(id).or_default().insert(root, idx);
        self.pairs += 1;
        Some(idx)
    }

    /// Whether tree(root) contains `id` (always true for `id == root`)
    #[inline]
    pub fn has_ind(&self, root: NodeId, id: NodeId) -> bool {
        root == id || self.ind.get(&id).map_or(false, |m| m.contains_key(&root))
    }

    /// Slot of `id` inside tree(root)
    pub fn node(&self, root: NodeId, id: NodeId) -> Option<TreeIdx> {
        self.ind.get(&id).and_then(|m| m.get(&root)).copied()
    }

    #[inline]
    pub fn id(&self, idx: TreeIdx) -> NodeId {
        self.nodes[idx].id
    }

    pub fn insert_child(&mut self, parent: TreeIdx, child: TreeIdx) {
        self.nodes[parent].children.push(child);
    }

    /// Snapshot of a slot's children
    pub fn children(&self, idx: TreeIdx) -> Vec<TreeIdx> {
        self.nodes[idx].children.clone()
    }

    /// Roots whose tree contains `id`, excluding `id` itself
    pub fn holders(&self, id: NodeId) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .ind
            .get(&id)
            .map(|m| m.keys().copied().filter(|&r| r != id).collect())
            .unwrap_or_default();
        roots.sort_unstable();
        roots
    }

    /// Depth-first walk below the root of tree(from); `visit` decides whether
    /// to descend into each child
    pub fn walk(&self, from: NodeId, visit: &mut dyn FnMut(NodeId) -> bool) {
        let Some(root) = self.node(from, from) else {
            return;
        };
        let mut stack: Vec<TreeIdx> = self.nodes[root].children.clone();
        while let Some(idx) = stack.pop() {
            if visit(self.nodes[idx].id) {
                stack.extend_from_slice(&self.nodes[idx].children);
            }
        }
    }

    /// Non-root memberships
    pub fn pairs(&self) -> usize {
        self.pairs
    }

    /// Sorted members of tree(root), root excluded
    pub fn members(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(root, &mut |id| {
            out.push(id);
            true
        });
        out.sort_unstable();
        out.dedup();
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Dual forests
// ═══════════════════════════════════════════════════════════════════════════

/// Ancestor trees plus descendant trees for one transitive symbol
#[derive(Debug, Clone, Default)]
pub struct HybridClosureTree {
    /// tree(v) holds every node that reaches v
    ancestors: TreeArena,
    /// tree(u) holds every node u reaches
    descendants: TreeArena,
    checks: u64,
}

enum Step {
    /// Walk the descendant side at `sy`, then its children
    Desc {
        px: NodeId,
        py: TreeIdx,
        sx: NodeId,
        sy: TreeIdx,
        guarded: bool,
    },
    /// Record `py -> sy`, then walk the ancestor side below `py`
    Anc {
        px: NodeId,
        py: TreeIdx,
        sx: NodeId,
        sy: TreeIdx,
        guarded: bool,
    },
}

impl HybridClosureTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `py` into anc(sy) under `px` and `sy` into desc(py) under `sx`
    fn update(&mut self, px: NodeId, py: TreeIdx, sx: NodeId, sy: TreeIdx, delta: &mut Vec<(NodeId, NodeId)>) {
        self.checks += 1;
        let py_id = self.ancestors.id(py);
        let sy_id = self.descendants.id(sy);

        let Some(new_py) = self.ancestors.add_ind(sy_id, py_id) else {
            return;
        };
        let anc_parent = self
            .ancestors
            .node(sy_id, px)
            .unwrap_or_else(|| self.ancestors.root(sy_id));
        self.ancestors.insert_child(anc_parent, new_py);

        if let Some(new_sy) = self.descendants.add_ind(py_id, sy_id) {
            let desc_parent = self
                .descendants
                .node(py_id, sx)
                .unwrap_or_else(|| self.descendants.root(py_id));
            self.descendants.insert_child(desc_parent, new_sy);
        }
        delta.push((py_id, sy_id));
    }

    fn traverse(&mut self, first: Step, delta: &mut Vec<(NodeId, NodeId)>) {
        let mut stack = vec![first];
        while let Some(step) = stack.pop() {
            match step {
                Step::Desc {
                    px,
                    py,
                    sx,
                    sy,
                    guarded,
                } => {
                    let py_id = self.ancestors.id(py);
                    let sy_id = self.descendants.id(sy);
                    self.checks += 1;
                    if guarded && self.descendants.has_ind(py_id, sy_id) {
                        continue;
                    }
                    for sz in self.descendants.children(sy).into_iter().rev() {
                        stack.push(Step::Desc {
                            px,
                            py,
                            sx: sy_id,
                            sy: sz,
                            guarded: true,
                        });
                    }
                    stack.push(Step::Anc {
                        px,
                        py,
                        sx,
                        sy,
                        guarded: false,
                    });
                }
                Step::Anc {
                    px,
                    py,
                    sx,
                    sy,
                    guarded,
                } => {
                    let py_id = self.ancestors.id(py);
                    let sy_id = self.descendants.id(sy);
                    self.checks += 1;
                    if guarded && self.ancestors.has_ind(sy_id, py_id) {
                        continue;
                    }
                    self.update(px, py, sx, sy, delta);
                    for pz in self.ancestors.children(py).into_iter().rev() {
                        stack.push(Step::Anc {
                            px: py_id,
                            py: pz,
                            sx,
                            sy,
                            guarded: true,
                        });
                    }
                }
            }
        }
    }

    pub fn ancestors(&self) -> &TreeArena {
        &self.ancestors
    }

    pub fn descendants(&self) -> &TreeArena {
        &self.descendants
    }
}

impl TransitiveClosure for HybridClosureTree {
    fn name(&self) -> &'static str {
        "hybrid-tree"
    }

    fn insert_edge(&mut self, src: NodeId, dst: NodeId, delta: &mut Vec<(NodeId, NodeId)>) {
        if self.descendants.has_ind(src, dst) {
            return;
        }
        let py = self.ancestors.root(src);
        let sy = self.descendants.root(dst);
        self.traverse(
            Step::Desc {
                px: dst,
                py,
                sx: src,
                sy,
                guarded: false,
            },
            delta,
        );
    }

    fn is_reachable(&mut self, src: NodeId, dst: NodeId) -> bool {
        self.checks += 1;
        self.descendants.has_ind(src, dst)
    }

    fn walk_descendants(&self, from: NodeId, visit: &mut dyn FnMut(NodeId) -> bool) {
        self.descendants.walk(from, visit);
    }

    fn walk_ancestors(&self, from: NodeId, visit: &mut dyn FnMut(NodeId) -> bool) {
        self.ancestors.walk(from, visit);
    }

    fn checks(&self) -> u64 {
        self.checks
    }

    fn reachable_pairs(&self) -> usize {
        self.descendants.pairs()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Single forest
// ═══════════════════════════════════════════════════════════════════════════

/// Descendant trees only, grown by `add_arc`/`meld`
#[derive(Debug, Clone, Default)]
pub struct HybridForest {
    trees: TreeArena,
    checks: u64,
}

impl HybridForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the arc `src -> dst`: in every tree that contains `src` (its own
    /// included), graft tree(dst) below `src`
    pub fn add_arc(&mut self, src: NodeId, dst: NodeId, delta: &mut Vec<(NodeId, NodeId)>) {
        self.checks += 1;
        if self.trees.has_ind(src, dst) {
            return;
        }
        let v_root = self.trees.root(dst);
        let mut roots = self.trees.holders(src);
        roots.push(src);
        for x in roots {
            let u_node = if x == src {
                Some(self.trees.root(src))
            } else {
                self.trees.node(x, src)
            };
            if let Some(u_node) = u_node {
                self.meld(x, u_node, v_root, delta);
            }
        }
    }

    /// Copy the subtree at `v_node` into tree(x) below `u_node`, stopping at
    /// members tree(x) already has
    fn meld(&mut self, x: NodeId, u_node: TreeIdx, v_node: TreeIdx, delta: &mut Vec<(NodeId, NodeId)>) {
        let mut stack = vec![(u_node, v_node)];
        while let Some((parent, v)) = stack.pop() {
            self.checks += 1;
            let v_id = self.trees.id(v);
            let Some(new_node) = self.trees.add_ind(x, v_id) else {
                continue;
            };
            self.trees.insert_child(parent, new_node);
            delta.push((x, v_id));
            for child in self.trees.children(v).into_iter().rev() {
                stack.push((new_node, child));
            }
        }
    }

    pub fn trees(&self) -> &TreeArena {
        &self.trees
    }
}

impl TransitiveClosure for HybridForest {
    fn name(&self) -> &'static str {
        "hybrid-forest"
    }

    fn insert_edge(&mut self, src: NodeId, dst: NodeId, delta: &mut Vec<(NodeId, NodeId)>) {
        if src != dst {
            self.add_arc(src, dst, delta);
        }
    }

    fn is_reachable(&mut self, src: NodeId, dst: NodeId) -> bool {
        self.checks += 1;
        self.trees.has_ind(src, dst)
    }

    fn walk_descendants(&self, from: NodeId, visit: &mut dyn FnMut(NodeId) -> bool) {
        self.trees.walk(from, visit);
    }

    /// Ancestors are read off the membership index, so every one is visited
    fn walk_ancestors(&self, from: NodeId, visit: &mut dyn FnMut(NodeId) -> bool) {
        for root in self.trees.holders(from) {
            visit(root);
        }
    }

    fn checks(&self) -> u64 {
        self.checks
    }

    fn reachable_pairs(&self) -> usize {
        self.trees.pairs()
    }
}
