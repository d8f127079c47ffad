//! Performance benchmarks for the fixpoint solver
//!
//! Compares every solver variant on:
//! - Chains (worst case for the plain worklist: quadratic closure)
//! - Sparse random graphs under the balanced-call grammar
//! - Alias analysis over a synthetic PEG, with and without simplification

use cfl_reach::config::{SolverConfig, SolverVariant};
use cfl_reach::features::cfl::application::{run_analysis, AliasAnalysis};
use cfl_reach::features::cfl::domain::{Grammar, Label, LabeledEdge, NodeId, SeedGraph};
use cfl_reach::features::cfl::infrastructure::FixpointSolver;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const CALL_GRAMMAR: &str = "S\nS\tS\tS\nS\ta\nS\tcall_i\tR_i\nR_i\tS\tret_i\n";

/// Deterministic xorshift so every run sees the same graphs
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u32) -> u32 {
        (self.next() % u64::from(n)) as u32
    }
}

fn chain_seeds(grammar: &Grammar, len: NodeId) -> SeedGraph {
    let a = grammar.symbol_id("a").unwrap();
    (0..len)
        .map(|n| LabeledEdge::new(n, n + 1, Label::plain(a)))
        .collect()
}

fn random_call_seeds(grammar: &Grammar, nodes: u32, edges: usize) -> SeedGraph {
    let a = grammar.symbol_id("a").unwrap();
    let call = grammar.symbol_id("call_i").unwrap();
    let ret = grammar.symbol_id("ret_i").unwrap();
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);

    (0..edges)
        .map(|_| {
            let src = rng.below(nodes);
            let dst = rng.below(nodes);
            let label = match rng.below(10) {
                0 => grammar.label(call, rng.below(8)),
                1 => grammar.label(ret, rng.below(8)),
                _ => Label::plain(a),
            };
            LabeledEdge::new(src, dst, label)
        })
        .collect()
}

fn random_peg(nodes: u32, edges: usize) -> String {
    let mut rng = XorShift(0xD1B5_4A32_D192_ED03);
    let mut text = String::new();
    for _ in 0..edges {
        let src = rng.below(nodes);
        let dst = rng.below(nodes);
        match rng.below(10) {
            0..=5 => text.push_str(&format!("{src}\t{dst}\ta\n")),
            6..=8 => text.push_str(&format!("{src}\t{dst}\td\n")),
            _ => text.push_str(&format!("{src}\t{dst}\tf_i\t{}\n", rng.below(4))),
        }
    }
    text
}

// ============================================================================
// Closure-heavy inputs
// ============================================================================

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    let grammar = Grammar::parse("a\ta\ta\n").unwrap();

    for len in [64u32, 256] {
        let seeds = chain_seeds(&grammar, len);
        group.throughput(Throughput::Elements(u64::from(len) * u64::from(len + 1) / 2));

        for variant in SolverVariant::ALL {
            let config = SolverConfig::default().variant(variant).timeout_secs(0);
            group.bench_with_input(BenchmarkId::new(variant.as_str(), len), &seeds, |b, seeds| {
                b.iter(|| {
                    let result = FixpointSolver::new(&grammar, &config).unwrap().solve(seeds).unwrap();
                    black_box(result.stats.total_edges)
                });
            });
        }
    }

    group.finish();
}

fn bench_random_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_calls");
    group.sample_size(20);
    let grammar = Grammar::parse(CALL_GRAMMAR).unwrap();
    let seeds = random_call_seeds(&grammar, 300, 600);

    for variant in SolverVariant::ALL {
        let config = SolverConfig::default().variant(variant).timeout_secs(0);
        group.bench_function(variant.as_str(), |b| {
            b.iter(|| {
                let result = FixpointSolver::new(&grammar, &config).unwrap().solve(&seeds).unwrap();
                black_box(result.stats.checks)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Alias analysis end to end
// ============================================================================

fn bench_alias(c: &mut Criterion) {
    let mut group = c.benchmark_group("alias");
    group.sample_size(10);
    let peg = random_peg(400, 700);

    let configs = [
        ("standard", SolverConfig::default()),
        ("focr", SolverConfig::default().variant(SolverVariant::Focr)),
        (
            "focr+simplify",
            SolverConfig::default()
                .variant(SolverVariant::Focr)
                .scc(true)
                .fold(true)
                .inter_dyck(true),
        ),
    ];

    for (name, config) in configs {
        let config = config.timeout_secs(0);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut analysis = AliasAnalysis::from_peg_str(&peg).unwrap();
                let run = run_analysis(&mut analysis, &config).unwrap();
                black_box(run.count_pairs().len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chain, bench_random_calls, bench_alias);
criterion_main!(benches);
