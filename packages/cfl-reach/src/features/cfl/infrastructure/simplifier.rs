//! Graph simplification before solving
//!
//! Three passes, each independently toggled by `SimplifyConfig` and all
//! funnelled through `LabeledGraph::merge_node_to_rep`:
//!
//! 1. **SCC elimination**: cycles over direct edges collapse to their minimum id.
//! 2. **Chain folding**: a node whose only incoming edge is one direct edge
//!    folds into that edge's source (sources of the analysis are kept).
//! 3. **Bracket pruning**: on a working copy with direct edges contracted,
//!    nodes with two or more outgoing bracket edges of the same
//!    `(kind, index)` are anchors; their targets are merged to a fixpoint.
//!    Bracket edges of the real graph that never sit on an anchor cannot
//!    take part in a matched pair and are removed.
//!
//! Passes run in that order when several are enabled.

use crate::config::SimplifyConfig;
use crate::features::cfl::domain::label::NodeId;
use crate::features::cfl::domain::labeled_graph::{EdgeKind, LabeledGraph};
use crate::features::cfl::domain::scc_detector::tarjan_scc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Instant;
use tracing::{debug, info};

/// Which edge kinds the bracket pass may prune, and how the working copy
/// orients them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketProfile {
    /// Kinds subject to pruning (direct kinds never are)
    pub bracket_kinds: BTreeSet<EdgeKind>,
    /// `from -> to`: in the working copy an edge `u -from[i]-> v` becomes `v -to[i]-> u`
    pub flips: BTreeMap<EdgeKind, EdgeKind>,
}

impl BracketProfile {
    pub fn new(bracket_kinds: impl IntoIterator<Item = EdgeKind>) -> Self {
        Self {
            bracket_kinds: bracket_kinds.into_iter().collect(),
            flips: BTreeMap::new(),
        }
    }

    /// Builder: reverse `from` edges into `to` edges in the working copy
    pub fn flip(mut self, from: EdgeKind, to: EdgeKind) -> Self {
        self.flips.insert(from, to);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bracket_kinds.is_empty()
    }
}

/// Counters for one simplification run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimplifyStats {
    pub nodes_before: usize,
    pub edges_before: usize,
    pub nodes_after: usize,
    pub edges_after: usize,
    pub scc_merged: usize,
    pub folded: usize,
    pub anchors: usize,
    pub pruned_edges: usize,
    pub duration_ms: f64,
}

pub struct GraphSimplifier<'a> {
    config: &'a SimplifyConfig,
    profile: BracketProfile,
}

impl<'a> GraphSimplifier<'a> {
    pub fn new(config: &'a SimplifyConfig, profile: BracketProfile) -> Self {
        Self { config, profile }
    }

    /// Run every enabled pass in order
    pub fn simplify(&self, graph: &mut LabeledGraph) -> SimplifyStats {
        let start = Instant::now();
        let mut stats = SimplifyStats {
            nodes_before: graph.num_nodes(),
            edges_before: graph.num_edges(),
            ..Default::default()
        };

        if self.config.scc {
            stats.scc_merged = merge_direct_sccs(graph);
            debug!(merged = stats.scc_merged, "scc elimination done");
        }
        if self.config.fold {
            stats.folded = fold_direct_chains(graph);
            debug!(folded = stats.folded, "chain folding done");
        }
        if self.config.inter_dyck {
            if self.profile.is_empty() {
                debug!("no bracket kinds configured, pruning skipped");
            } else {
                let (anchors, pruned) = prune_unmatched_brackets(graph, &self.profile);
                stats.anchors = anchors;
                stats.pruned_edges = pruned;
                debug!(anchors, pruned, "bracket pruning done");
            }
        }

        stats.nodes_after = graph.num_nodes();
        stats.edges_after = graph.num_edges();
        stats.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            nodes = stats.nodes_after,
            edges = stats.edges_after,
            elapsed_ms = stats.duration_ms,
            "graph simplified"
        );
        stats
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Passes
// ═══════════════════════════════════════════════════════════════════════════

/// Merge every direct-edge SCC into its minimum id; returns merged node count
pub fn merge_direct_sccs(graph: &mut LabeledGraph) -> usize {
    let result = tarjan_scc(&graph.direct_pairs());
    let mut merged = 0;
    for scc in &result.sccs {
        let rep = scc[0];
        for &member in &scc[1..] {
            if graph.merge_node_to_rep(graph.rep_of(member), rep) {
                merged += 1;
            }
        }
    }
    merged
}

/// Fold single-entry direct edges into their source; returns folded node count
pub fn fold_direct_chains(graph: &mut LabeledGraph) -> usize {
    let mut foldable: Vec<(NodeId, NodeId)> = Vec::new();
    for (_, edge) in graph.edges() {
        if !graph.is_direct(edge.kind) {
            continue;
        }
        let Some(dst) = graph.node(edge.dst) else {
            continue;
        };
        if dst.in_degree() == 1 && !dst.is_source {
            foldable.push((edge.src, edge.dst));
        }
    }

    let mut folded = 0;
    while let Some((src, dst)) = foldable.pop() {
        let src = graph.rep_of(src);
        let dst = graph.rep_of(dst);
        if src != dst && graph.merge_node_to_rep(dst, src) {
            folded += 1;
        }
    }
    folded
}

/// Bracket pruning; returns `(anchor count, pruned edge count)`
pub fn prune_unmatched_brackets(graph: &mut LabeledGraph, profile: &BracketProfile) -> (usize, usize) {
    let mut work = graph.clone();

    for (src, dst) in work.direct_pairs() {
        let (s, d) = (work.rep_of(src), work.rep_of(dst));
        work.merge_node_to_rep(d, s);
    }

    let flipped: Vec<_> = work
        .edges()
        .filter(|(_, e)| profile.flips.contains_key(&e.kind))
        .map(|(id, e)| (id, *e))
        .collect();
    for (id, edge) in flipped {
        work.remove_edge(id);
        if let Some(&to) = profile.flips.get(&edge.kind) {
            work.add_edge(edge.dst, edge.src, to, edge.index);
        }
    }

    let anchors = collapse_fan_out(&mut work, profile);

    // mark
    let mut contributing = BTreeSet::new();
    for (&anchor, labels) in &anchors {
        let rep = work.rep_of(anchor);
        let members = std::iter::once(rep).chain(work.subs(rep).iter().copied());
        for member in members {
            let Some(node) = graph.node(member) else {
                continue;
            };
            for id in node.out_edges() {
                if let Some(e) = graph.edge(id) {
                    if !profile.flips.contains_key(&e.kind) && labels.contains(&(e.kind, e.index)) {
                        contributing.insert(id);
                    }
                }
            }
            for id in node.in_edges() {
                if let Some(e) = graph.edge(id) {
                    if let Some(&to) = profile.flips.get(&e.kind) {
                        if labels.contains(&(to, e.index)) {
                            contributing.insert(id);
                        }
                    }
                }
            }
        }
    }

    // sweep
    let doomed: Vec<_> = graph
        .edges()
        .filter(|(id, e)| {
            !graph.is_direct(e.kind)
                && profile.bracket_kinds.contains(&e.kind)
                && !contributing.contains(id)
        })
        .map(|(id, _)| id)
        .collect();
    for &id in &contributing {
        graph.set_bracket_contributing(id, true);
    }
    for &id in &doomed {
        graph.remove_edge(id);
    }

    let anchor_count = anchors.values().map(BTreeSet::len).sum();
    (anchor_count, doomed.len())
}

/// Merge fan-out targets sharing `(kind, index)` to a fixpoint; returns the
/// anchor labels seen at each examined node
fn collapse_fan_out(
    work: &mut LabeledGraph,
    profile: &BracketProfile,
) -> BTreeMap<NodeId, BTreeSet<(EdgeKind, u32)>> {
    let mut anchors: BTreeMap<NodeId, BTreeSet<(EdgeKind, u32)>> = BTreeMap::new();
    let mut queue: VecDeque<NodeId> = work.node_ids().into_iter().collect();
    let bracket = |kind: EdgeKind| {
        profile.bracket_kinds.contains(&kind) || profile.flips.values().any(|&to| to == kind)
    };

    while let Some(id) = queue.pop_front() {
        let id = work.rep_of(id);
        let Some(node) = work.node(id) else {
            continue;
        };

        let mut groups: BTreeMap<(EdgeKind, u32), BTreeSet<NodeId>> = BTreeMap::new();
        for eid in node.out_edges() {
            if let Some(e) = work.edge(eid) {
                if bracket(e.kind) {
                    groups.entry((e.kind, e.index)).or_default().insert(e.dst);
                }
            }
        }

        let mut changed = false;
        for (label, targets) in groups {
            if targets.len() < 2 {
                continue;
            }
            anchors.entry(id).or_default().insert(label);
            let members: Vec<NodeId> = targets.into_iter().map(|t| work.rep_of(t)).collect();
            let Some((&first, rest)) = members.split_first() else {
                continue;
            };
            for &member in rest {
                let rep = work.rep_of(first);
                let member = work.rep_of(member);
                if member != rep {
                    work.merge_node_to_rep(member, rep);
                    changed = true;
                }
            }
            queue.push_back(work.rep_of(first));
        }
        if changed {
            queue.push_back(work.rep_of(id));
        }
    }
    anchors
}
