//! Batch semi-naive evaluation (Graspan-style)
//!
//! Instead of one worklist item at a time, each generation joins the edges
//! discovered in the previous generation (`delta`) against everything known
//! (`full`). Candidates not already in `full` become the next delta. Two
//! separately owned datasets, swapped at generation boundaries.
//!
//! Candidate generation is read-only over `full` and runs on rayon's pool
//! when the `parallel` feature is on.

use super::adjacency::AdjacencyDataset;
use super::deadline::Deadline;
use crate::errors::Result;
use crate::features::cfl::domain::grammar::Grammar;
use crate::features::cfl::domain::label::{Label, LabeledEdge, SeedGraph};
use tracing::debug;

/// Counters from one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub generations: usize,
    /// Candidate edges produced across all generations
    pub candidates: u64,
    pub largest_delta: usize,
}

/// Run generations until no new edge appears
pub fn solve_generations(
    grammar: &Grammar,
    seeds: &SeedGraph,
    deadline: &Deadline,
) -> Result<(AdjacencyDataset, GenerationStats)> {
    let mut full = AdjacencyDataset::new();
    let mut delta = AdjacencyDataset::new();
    let mut stats = GenerationStats::default();

    for edge in &seeds.edges {
        if full.check_and_add(edge.src, edge.dst, edge.label) {
            delta.check_and_add(edge.src, edge.dst, edge.label);
        }
    }
    let empty: Vec<Label> = grammar.empty_rules().map(Label::plain).collect();
    for &node in &seeds.nodes {
        for &label in &empty {
            if full.check_and_add(node, node, label) {
                delta.check_and_add(node, node, label);
            }
        }
        for &label in &seeds.reflexive {
            full.check_and_add(node, node, label);
        }
    }

    let mut reanalyze = !delta.is_empty();
    while reanalyze {
        deadline.check()?;
        stats.generations += 1;
        stats.largest_delta = stats.largest_delta.max(delta.edge_count());

        let frontier = delta.edges();
        let candidates = derive_all(grammar, &full, &frontier);
        stats.candidates += candidates.len() as u64;

        let mut next = AdjacencyDataset::new();
        for edge in candidates {
            if !full.has_edge(edge.src, edge.dst, edge.label) {
                next.check_and_add(edge.src, edge.dst, edge.label);
            }
        }
        full.absorb(&next);
        debug!(
            generation = stats.generations,
            frontier = frontier.len(),
            new_edges = next.edge_count(),
            "generation done"
        );

        delta = next;
        reanalyze = !delta.is_empty();
    }

    Ok((full, stats))
}

#[cfg(feature = "parallel")]
fn derive_all(grammar: &Grammar, full: &AdjacencyDataset, frontier: &[LabeledEdge]) -> Vec<LabeledEdge> {
    use rayon::prelude::*;

    frontier
        .par_iter()
        .flat_map_iter(|edge| derive(grammar, full, edge))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn derive_all(grammar: &Grammar, full: &AdjacencyDataset, frontier: &[LabeledEdge]) -> Vec<LabeledEdge> {
    frontier.iter().flat_map(|edge| derive(grammar, full, edge)).collect()
}

/// Everything one new edge derives against `full` (which contains it)
fn derive(grammar: &Grammar, full: &AdjacencyDataset, edge: &LabeledEdge) -> Vec<LabeledEdge> {
    let mut out = Vec::new();

    for new in grammar.unary_summ(edge.label) {
        out.push(LabeledEdge::new(edge.src, edge.dst, new));
    }

    for (rty, targets) in full.out_labels(edge.dst) {
        for new in grammar.binary_summ(edge.label, rty) {
            out.extend(targets.iter().map(|d| LabeledEdge::new(edge.src, d, new)));
        }
    }

    for (lty, sources) in full.in_labels(edge.src) {
        for new in grammar.binary_summ(lty, edge.label) {
            out.extend(sources.iter().map(|s| LabeledEdge::new(s, edge.dst, new)));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_seeds(grammar: &Grammar, label: &str, n: u32) -> SeedGraph {
        let sym = grammar.symbol_id(label).unwrap();
        (1..n)
            .map(|i| LabeledEdge::new(i, i + 1, Label::plain(sym)))
            .collect()
    }

    #[test]
    fn test_generations_close_chain() {
        let grammar = Grammar::parse("a\ta\ta\n").unwrap();
        let seeds = chain_seeds(&grammar, "a", 5);
        let (full, stats) = solve_generations(&grammar, &seeds, &Deadline::unlimited()).unwrap();
        let a = grammar.symbol_id("a").unwrap();
        assert_eq!(full.pairs(a).len(), 10);
        // path doubling: lengths 1, 2, 3-4, then an empty round
        assert!(stats.generations >= 3);
        assert!(stats.candidates > 0);
    }

    #[test]
    fn test_empty_rule_seeds_every_node() {
        let grammar = Grammar::parse("V\nV\tV\ta\n").unwrap();
        let seeds = chain_seeds(&grammar, "a", 3);
        let (full, _) = solve_generations(&grammar, &seeds, &Deadline::unlimited()).unwrap();
        let v = grammar.symbol_id("V").unwrap();
        assert_eq!(full.pairs(v), vec![(1, 1), (1, 2), (1, 3), (2, 2), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_no_seeds_no_generations() {
        let grammar = Grammar::parse("a\ta\ta\n").unwrap();
        let (full, stats) = solve_generations(&grammar, &SeedGraph::new(), &Deadline::unlimited()).unwrap();
        assert!(full.is_empty());
        assert_eq!(stats.generations, 0);
    }
}
