//! Property-based tests for the fixpoint solver and its data structures
//!
//! Invariants checked over random graphs:
//! - Equivalence: every solver variant reaches the same fixpoint
//! - Oracle: a transitive symbol's pairs equal graph reachability
//! - Monotonicity: `check_and_add` never shrinks the dataset
//! - Idempotence: solving twice, or re-solving the output, changes nothing
//! - Merge: `merge_node_to_rep` retargets every edge
//! - Round-trip: grammar text survives parse/serialize/parse

mod common;

use cfl_reach::config::SolverVariant;
use cfl_reach::features::cfl::domain::{Grammar, Label, LabeledGraph, NodeId, SeedGraph};
use cfl_reach::features::cfl::infrastructure::AdjacencyDataset;
use common::{closure_oracle, edge_set, plain_seeds, seeds, solve};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

const NODES: NodeId = 8;

fn pairs_strategy(max: usize) -> impl Strategy<Value = Vec<(NodeId, NodeId)>> {
    vec((0..NODES, 0..NODES), 0..max)
}

/// `S ::= S S | a | ε | call_i S ret_i` (balanced calls inside a transitive symbol)
const CALL_GRAMMAR: &str = "S\nS\tS\tS\nS\ta\nS\tcall_i\tR_i\nR_i\tS\tret_i\n";

fn call_edges() -> impl Strategy<Value = Vec<(NodeId, NodeId, u8, u32)>> {
    vec((0..NODES, 0..NODES, 0u8..3, 0u32..2), 0..24)
}

fn call_seeds(grammar: &Grammar, raw: &[(NodeId, NodeId, u8, u32)]) -> SeedGraph {
    let edges: Vec<(NodeId, NodeId, &str, u32)> = raw
        .iter()
        .map(|&(s, d, kind, idx)| {
            let name = match kind {
                0 => "a",
                1 => "call_i",
                _ => "ret_i",
            };
            (s, d, name, idx)
        })
        .collect();
    seeds(grammar, &edges)
}

/// Mixed grammar: two transitive symbols feeding each other through joins
const MIXED_GRAMMAR: &str = "A\tA\tA\nA\ta\nB\tB\tB\nB\tb\nA\tB\ta\nC\tA\tB\nB\tC\tb\n";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_transitive_symbol_matches_reachability(pairs in pairs_strategy(20)) {
        let grammar = Grammar::parse("a\ta\ta\n").unwrap();
        let a = grammar.symbol_id("a").unwrap();
        let input = plain_seeds(&grammar, "a", &pairs);
        let expected: Vec<(NodeId, NodeId)> = closure_oracle(&pairs).into_iter().collect();

        for variant in SolverVariant::ALL {
            let result = solve(&grammar, &input, variant);
            prop_assert_eq!(result.pairs(a), expected.clone(), "{}", variant.as_str());
        }
    }

    #[test]
    fn prop_variants_agree_on_call_grammar(raw in call_edges()) {
        let grammar = Grammar::parse(CALL_GRAMMAR).unwrap();
        let input = call_seeds(&grammar, &raw);
        let baseline = edge_set(&solve(&grammar, &input, SolverVariant::Standard));

        for variant in SolverVariant::ALL {
            let result = solve(&grammar, &input, variant);
            prop_assert_eq!(edge_set(&result), baseline.clone(), "{}", variant.as_str());
        }
    }

    #[test]
    fn prop_variants_agree_on_mixed_grammar(
        a_pairs in pairs_strategy(12),
        b_pairs in pairs_strategy(12),
    ) {
        let grammar = Grammar::parse(MIXED_GRAMMAR).unwrap();
        let tagged: Vec<(NodeId, NodeId, &str, u32)> = a_pairs
            .iter()
            .map(|&(s, d)| (s, d, "a", 0))
            .chain(b_pairs.iter().map(|&(s, d)| (s, d, "b", 0)))
            .collect();
        let input = seeds(&grammar, &tagged);
        let baseline = edge_set(&solve(&grammar, &input, SolverVariant::Standard));

        for variant in SolverVariant::ALL {
            let result = solve(&grammar, &input, variant);
            prop_assert_eq!(edge_set(&result), baseline.clone(), "{}", variant.as_str());
        }
    }

    #[test]
    fn prop_check_and_add_is_monotone(ops in vec((0..NODES, 0..NODES, 1u32..4), 0..64)) {
        let mut dataset = AdjacencyDataset::new();
        let mut seen = BTreeSet::new();
        let mut last = 0;

        for (src, dst, sym) in ops {
            let label = Label::plain(sym);
            let fresh = dataset.check_and_add(src, dst, label);
            prop_assert_eq!(fresh, seen.insert((src, dst, sym)));
            prop_assert!(dataset.edge_count() >= last);
            last = dataset.edge_count();

            prop_assert!(!dataset.check_and_add(src, dst, label));
            prop_assert_eq!(dataset.edge_count(), last);
        }
        prop_assert_eq!(dataset.edge_count(), seen.len());
    }

    #[test]
    fn prop_fixpoint_is_idempotent(raw in call_edges()) {
        let grammar = Grammar::parse(CALL_GRAMMAR).unwrap();
        let input = call_seeds(&grammar, &raw);

        for variant in [SolverVariant::Standard, SolverVariant::Focr] {
            let first = solve(&grammar, &input, variant);
            let second = solve(&grammar, &input, variant);
            prop_assert_eq!(edge_set(&first), edge_set(&second));

            // re-seed from the solved dataset
            let mut again: SeedGraph = first.dataset.edges().into_iter().collect();
            again.nodes.extend(input.nodes.iter().copied());
            let resolved = solve(&grammar, &again, variant);
            prop_assert_eq!(resolved.dataset.edge_count(), first.dataset.edge_count());
        }
    }

    #[test]
    fn prop_merge_retargets_every_edge(
        edges in vec((0..NODES, 0..NODES, 1u32..3, 0u32..2), 1..24),
        node in 0..NODES,
        rep in 0..NODES,
    ) {
        let mut graph = LabeledGraph::new();
        for &(s, d, kind, idx) in &edges {
            graph.add_edge(s, d, kind, idx);
        }
        prop_assume!(node != rep && graph.has_node(node));
        let before: Vec<_> = graph.edges().map(|(_, e)| *e).collect();

        prop_assert!(graph.merge_node_to_rep(node, rep));
        prop_assert_eq!(graph.rep_of(node), rep);
        prop_assert_eq!(graph.rep_of(rep), rep);
        prop_assert!(!graph.has_node(node));
        prop_assert!(graph.subs(rep).contains(&node));

        for (_, e) in graph.edges() {
            prop_assert!(e.src != node && e.dst != node);
        }
        let map = |n: NodeId| if n == node { rep } else { n };
        for e in before {
            prop_assert!(graph.has_edge(map(e.src), map(e.dst), e.kind, e.index));
        }
    }

    #[test]
    fn prop_grammar_round_trip(
        empty in vec(0usize..5, 0..3),
        unary in vec((0usize..5, 0usize..5), 0..5),
        binary in vec((0usize..5, 0usize..5, 0usize..5), 0..8),
    ) {
        const NAMES: [&str; 5] = ["S", "A", "a", "f_i", "M_i"];
        let mut text = String::new();
        for l in &empty {
            text.push_str(&format!("{}\n", NAMES[*l]));
        }
        for (l, r) in &unary {
            text.push_str(&format!("{}\t{}\n", NAMES[*l], NAMES[*r]));
        }
        for (l, r1, r2) in &binary {
            text.push_str(&format!("{}\t{}\t{}\n", NAMES[*l], NAMES[*r1], NAMES[*r2]));
        }

        let first = Grammar::parse(&text).unwrap();
        let second = Grammar::parse(&first.to_text()).unwrap();
        prop_assert_eq!(first.to_text(), second.to_text());
        prop_assert_eq!(described(&first), described(&second));
    }
}

/// Name-based view of a grammar
fn described(g: &Grammar) -> (BTreeSet<String>, BTreeSet<String>, BTreeSet<String>) {
    let name = |id| g.symbol_name(id).unwrap_or("<fault>").to_string();
    let symbols = g.symbols().map(|(_, n)| n.to_string()).collect();
    let unary = g
        .unary_rule_list()
        .into_iter()
        .map(|(l, r)| format!("{} {}", name(l), name(r)))
        .collect();
    let binary = g
        .binary_rule_list()
        .into_iter()
        .map(|(l, r1, r2)| format!("{} {} {}", name(l), name(r1), name(r2)))
        .chain(g.empty_rules().map(|l| format!("{} ε", name(l))))
        .collect();
    (symbols, unary, binary)
}
