//! Common test utilities for cfl-reach
//!
//! Seed builders, a one-call solve helper, and a petgraph reachability
//! oracle shared by the integration tests.

#![allow(dead_code)]

use cfl_reach::config::{SolverConfig, SolverVariant};
use cfl_reach::features::cfl::domain::{Grammar, Label, LabeledEdge, NodeId, SeedGraph};
use cfl_reach::features::cfl::infrastructure::{FixpointSolver, SolveResult};
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use std::collections::BTreeSet;

/// Seeds from `(src, dst, label, index)` tuples; indices of plain symbols are dropped
pub fn seeds(grammar: &Grammar, edges: &[(NodeId, NodeId, &str, u32)]) -> SeedGraph {
    edges
        .iter()
        .map(|&(s, d, name, idx)| {
            let sym = grammar.symbol_id(name).expect("label in grammar");
            LabeledEdge::new(s, d, grammar.label(sym, idx))
        })
        .collect()
}

pub fn plain_seeds(grammar: &Grammar, label: &str, pairs: &[(NodeId, NodeId)]) -> SeedGraph {
    let sym = grammar.symbol_id(label).expect("label in grammar");
    pairs
        .iter()
        .map(|&(s, d)| LabeledEdge::new(s, d, Label::plain(sym)))
        .collect()
}

pub fn solve(grammar: &Grammar, seeds: &SeedGraph, variant: SolverVariant) -> SolveResult {
    let config = SolverConfig::default().variant(variant);
    FixpointSolver::new(grammar, &config)
        .expect("solver")
        .solve(seeds)
        .expect("solve")
}

/// Every derived edge, sorted
pub fn edge_set(result: &SolveResult) -> Vec<LabeledEdge> {
    let mut edges = result.dataset.edges();
    edges.sort_unstable();
    edges
}

/// Pairs `(u, v)` joined by a path of length >= 1
pub fn closure_oracle(pairs: &[(NodeId, NodeId)]) -> BTreeSet<(NodeId, NodeId)> {
    let graph: DiGraphMap<NodeId, ()> = DiGraphMap::from_edges(pairs.iter().copied());
    let mut out = BTreeSet::new();
    for u in graph.nodes() {
        for v in graph.nodes() {
            let reachable = if u == v {
                graph
                    .neighbors(u)
                    .any(|w| has_path_connecting(&graph, w, u, None))
            } else {
                has_path_connecting(&graph, u, v, None)
            };
            if reachable {
                out.insert((u, v));
            }
        }
    }
    out
}
