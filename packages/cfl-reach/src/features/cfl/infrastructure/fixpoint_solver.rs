//! Worklist fixpoint solver for CFL-reachability
//!
//! One solver, one loop. The variant picked in `SolverConfig` only changes
//! how transitive symbols (`X ::= X X`) are handled:
//!
//! | Variant               | Transitive symbols                                  |
//! |-----------------------|-----------------------------------------------------|
//! | `Standard`            | self-rule joins in the base loop                    |
//! | `Pocr`                | `HybridClosureTree` per symbol                      |
//! | `HierarchicalPocr`    | `HybridForest` per symbol, primary items deferred   |
//! | `Focr`                | `EdgeCriticalGraph` per symbol                      |
//! | `TransitiveReduction` | self-rule results kept in a secondary dataset       |
//! | `BatchSemiNaive`      | generation-at-a-time evaluation (`semi_naive`)      |
//!
//! With an accelerator installed the symbol's self-rule is removed from the
//! grammar. Primary items of the symbol go into the closure; every pair the
//! closure reports comes back as a secondary item and is joined like any other
//! edge. `X ::= X A` / `X ::= A X` extensions over an accelerated `A` walk the
//! closure instead of bulk-inserting the whole successor set.
//!
//! Accelerators keep `(n, n)` implicit; when a new pair closes a cycle both
//! endpoints get their self edge so the result equals the plain fixpoint.
//!
//! # References
//! - Reps "Program Analysis via Graph Reachability" (1998)
//! - Lei et al. "Taming Transitive Redundancy for Context-Free Language
//!   Reachability" (OOPSLA 2022)
//! - Wang et al. "Graspan: A Single-machine Disk-based Graph System for
//!   Interprocedural Static Analyses" (ASPLOS 2017)

use super::adjacency::AdjacencyDataset;
use super::deadline::Deadline;
use super::node_set::NodeSet;
use super::semi_naive::solve_generations;
use crate::config::{SolverConfig, SolverVariant};
use crate::errors::{CflError, Result};
use crate::features::cfl::domain::grammar::{BracketRule, Grammar};
use crate::features::cfl::domain::label::{Label, NodeId, SeedGraph, SymbolId};
use crate::features::cfl::domain::worklist::{Worklist, WorklistItem};
use crate::features::cfl::ports::{ClosureFactory, TransitiveClosure};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
#[cfg(feature = "trace")]
use tracing::trace;
use tracing::{debug, info, warn};

/// Counters for one solve
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolverStats {
    pub variant: String,
    pub nodes: usize,
    pub seed_edges: usize,
    /// Worklist pops (generations in batch mode)
    pub iterations: u64,
    /// Dedup checks in the base loop
    pub checks: u64,
    /// Membership checks inside accelerators
    pub accelerator_checks: u64,
    /// Live non-reflexive pairs held by accelerators
    pub reachable_pairs: usize,
    pub total_edges: usize,
    /// Edges labeled with a nonterminal
    pub summary_edges: usize,
    pub symbol_counts: BTreeMap<String, usize>,
    pub count_symbol: Option<String>,
    /// Non-reflexive pairs of `count_symbol`
    pub count_pairs: usize,
    pub solve_ms: f64,
}

/// Final dataset plus counters
#[derive(Debug)]
pub struct SolveResult {
    pub dataset: AdjacencyDataset,
    pub stats: SolverStats,
    /// Symbol behind `stats.count_pairs`
    pub count_symbol: Option<SymbolId>,
}

impl SolveResult {
    pub fn has_edge(&self, src: NodeId, dst: NodeId, label: Label) -> bool {
        self.dataset.has_edge(src, dst, label)
    }

    /// Sorted pairs of `symbol` under any index
    pub fn pairs(&self, symbol: SymbolId) -> Vec<(NodeId, NodeId)> {
        self.dataset.pairs(symbol)
    }
}

pub struct FixpointSolver<'a> {
    config: &'a SolverConfig,
    /// Private copy: accelerated self-rules are removed from it
    grammar: Grammar,
    closures: BTreeMap<SymbolId, Box<dyn TransitiveClosure>>,
    bracket_rules: Vec<BracketRule>,
    /// Inner symbols without a closure: their shortcuts fire per popped item
    item_brackets: FxHashSet<SymbolId>,
    /// Symbols whose primary items wait in the deferred queue
    deferred: FxHashSet<SymbolId>,
    count_symbol: Option<SymbolId>,
    dataset: AdjacencyDataset,
    /// Self-rule derivations (transitive reduction only)
    secondary: AdjacencyDataset,
    worklist: Worklist,
    checks: u64,
    iterations: u64,
}

impl<'a> FixpointSolver<'a> {
    /// Prepare a solver; fails on unknown `count_symbol` and, with
    /// `strict_grammar`, on unary-rule cycles
    pub fn new(grammar: &Grammar, config: &'a SolverConfig) -> Result<Self> {
        let cycles = grammar.unary_cycles();
        if !cycles.is_empty() {
            let described: Vec<String> = cycles
                .iter()
                .map(|cycle| {
                    cycle
                        .iter()
                        .map(|&s| grammar.symbol_name(s).unwrap_or("<fault>"))
                        .collect::<Vec<_>>()
                        .join(" -> ")
                })
                .collect();
            if config.strict_grammar {
                return Err(CflError::parse(
                    0,
                    format!("unary rule cycle: {}", described.join("; ")),
                ));
            }
            warn!(cycles = ?described, "grammar has unary rule cycles");
        }

        let count_symbol = match &config.count_symbol {
            Some(name) => Some(grammar.symbol_id(name)?),
            None => grammar.start_symbol(),
        };

        let mut grammar = grammar.clone();
        let mut closures: BTreeMap<SymbolId, Box<dyn TransitiveClosure>> = BTreeMap::new();
        if config.variant.uses_accelerator() {
            for sym in grammar.transitive_symbols() {
                if grammar.is_variant(sym) {
                    debug!(symbol = grammar.symbol_name(sym), "variant transitive symbol keeps its self-rule");
                    continue;
                }
                if let Some(closure) = ClosureFactory::create(config.variant) {
                    grammar.remove_transitive_self_rule(sym);
                    closures.insert(sym, closure);
                }
            }
        }
        let deferred = if config.variant == SolverVariant::HierarchicalPocr {
            closures.keys().copied().collect()
        } else {
            FxHashSet::default()
        };

        Ok(Self {
            config,
            grammar,
            closures,
            bracket_rules: Vec::new(),
            item_brackets: FxHashSet::default(),
            deferred,
            count_symbol,
            dataset: AdjacencyDataset::new(),
            secondary: AdjacencyDataset::new(),
            worklist: Worklist::new(),
            checks: 0,
            iterations: 0,
        })
    }

    /// Builder: register `result ::= open inner close` shortcuts
    ///
    /// Only accelerated variants use them. An inner symbol with a closure
    /// fires on closure deltas, any other inner symbol on each new item.
    pub fn with_bracket_rules(mut self, rules: Vec<BracketRule>) -> Self {
        self.item_brackets = if self.config.variant.uses_accelerator() {
            rules
                .iter()
                .map(|r| r.inner)
                .filter(|inner| !self.closures.contains_key(inner))
                .collect()
        } else {
            FxHashSet::default()
        };
        self.bracket_rules = rules;
        self
    }

    /// Builder: override the reported symbol
    pub fn with_count_symbol(mut self, symbol: Option<SymbolId>) -> Self {
        self.count_symbol = symbol;
        self
    }

    /// Symbols handled by an accelerator
    pub fn accelerated_symbols(&self) -> Vec<SymbolId> {
        self.closures.keys().copied().collect()
    }

    /// Solve under the configured deadline
    pub fn solve(self, seeds: &SeedGraph) -> Result<SolveResult> {
        let deadline = Deadline::new(self.config.timeout());
        self.solve_with_deadline(seeds, deadline)
    }

    pub fn solve_with_deadline(mut self, seeds: &SeedGraph, deadline: Deadline) -> Result<SolveResult> {
        let start = Instant::now();
        info!(
            variant = self.config.variant.as_str(),
            nodes = seeds.num_nodes(),
            seeds = seeds.edges.len(),
            accelerated = self.closures.len(),
            "solving"
        );

        if self.config.variant == SolverVariant::BatchSemiNaive {
            let (dataset, generations) = solve_generations(&self.grammar, seeds, &deadline)?;
            self.dataset = dataset;
            self.iterations = generations.generations as u64;
            self.checks = generations.candidates;
        } else {
            self.seed(seeds);
            self.run(&deadline)?;
        }

        if self.is_transitive_reduction() {
            let secondary = std::mem::take(&mut self.secondary);
            self.dataset.absorb(&secondary);
        }

        let stats = self.collect_stats(seeds, start);
        info!(
            iterations = stats.iterations,
            checks = stats.checks,
            edges = stats.total_edges,
            count_pairs = stats.count_pairs,
            elapsed_ms = stats.solve_ms,
            "solved"
        );
        Ok(SolveResult {
            dataset: self.dataset,
            stats,
            count_symbol: self.count_symbol,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Main loop
    // ═══════════════════════════════════════════════════════════════════════

    fn seed(&mut self, seeds: &SeedGraph) {
        for edge in &seeds.edges {
            if self.dataset.check_and_add(edge.src, edge.dst, edge.label) {
                self.enqueue(edge.src, edge.dst, edge.label);
            }
        }
        let empty: Vec<SymbolId> = self.grammar.empty_rules().collect();
        for &node in &seeds.nodes {
            for &lhs in &empty {
                let label = Label::plain(lhs);
                if self.dataset.check_and_add(node, node, label) {
                    self.enqueue(node, node, label);
                }
            }
            for &label in &seeds.reflexive {
                self.dataset.check_and_add(node, node, label);
            }
        }
    }

    fn run(&mut self, deadline: &Deadline) -> Result<()> {
        while let Some(item) = self.worklist.pop() {
            deadline.check_every(self.iterations)?;
            self.iterations += 1;

            #[cfg(feature = "trace")]
            trace!(
                src = item.src,
                dst = item.dst,
                label = %item.label,
                primary = item.is_primary,
                "pop"
            );

            if item.is_primary && item.src != item.dst && self.closures.contains_key(&item.label.symbol) {
                self.process_primary(item);
            } else {
                if self.item_brackets.contains(&item.label.symbol) {
                    self.fire_bracket_rules(item.label.symbol, &[(item.src, item.dst)]);
                }
                self.process_item(item);
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, src: NodeId, dst: NodeId, label: Label) {
        let item = WorklistItem::primary(src, dst, label);
        if src != dst && self.deferred.contains(&label.symbol) {
            self.worklist.defer(item);
        } else {
            self.worklist.push(item);
        }
    }

    /// Hand a transitive edge to its closure and announce what it implies
    fn process_primary(&mut self, item: WorklistItem) {
        let label = item.label;
        let mut delta = Vec::new();
        let mut on_cycle = Vec::new();
        if let Some(closure) = self.closures.get_mut(&label.symbol) {
            closure.insert_edge(item.src, item.dst, &mut delta);
            for &(u, v) in &delta {
                if closure.is_reachable(v, u) {
                    on_cycle.push(u);
                    on_cycle.push(v);
                }
            }
        }

        for &(u, v) in &delta {
            self.dataset.check_and_add(u, v, label);
            self.worklist.push(WorklistItem::secondary(u, v, label));
        }

        on_cycle.sort_unstable();
        on_cycle.dedup();
        for w in on_cycle {
            if self.dataset.check_and_add(w, w, label) {
                self.worklist.push(WorklistItem::secondary(w, w, label));
            }
        }

        self.fire_bracket_rules(label.symbol, &delta);
    }

    /// `result ::= open[i] inner close[i]` for every new `inner` pair
    fn fire_bracket_rules(&mut self, inner: SymbolId, delta: &[(NodeId, NodeId)]) {
        if delta.is_empty() {
            return;
        }
        let rules: Vec<BracketRule> = self
            .bracket_rules
            .iter()
            .filter(|r| r.inner == inner)
            .copied()
            .collect();

        for rule in rules {
            let result = Label::plain(rule.result);
            for &(u, v) in delta {
                let opens: Vec<(Label, Vec<NodeId>)> = self
                    .dataset
                    .in_labels(u)
                    .filter(|(l, _)| l.symbol == rule.open)
                    .map(|(l, srcs)| (l, srcs.to_vec()))
                    .collect();
                for (open, parents) in opens {
                    let close = self.grammar.label(rule.close, open.index);
                    let Some(children) = self.dataset.succ(v, close).map(NodeSet::to_vec) else {
                        continue;
                    };
                    for &p in &parents {
                        for &c in &children {
                            self.checks += 1;
                            if self.dataset.check_and_add(p, c, result) {
                                self.enqueue(p, c, result);
                            }
                        }
                    }
                }
            }
        }
    }

    fn process_item(&mut self, item: WorklistItem) {
        let WorklistItem { src, dst, label, .. } = item;

        let unary: Vec<Label> = self.grammar.unary_summ(label).collect();
        for new in unary {
            if self.insert_one(src, dst, new) {
                self.enqueue(src, dst, new);
            }
        }

        // item . succ(dst)
        for rty in self.out_labels(dst) {
            let derived: Vec<Label> = self.grammar.binary_summ(label, rty).collect();
            for new in derived {
                if new == label && self.closures.contains_key(&rty.symbol) {
                    self.extend_right_by_closure(src, dst, new, rty.symbol);
                    continue;
                }
                let self_rule = self.is_reduced_self_rule(label, rty, new);
                let targets = self.operand_succ(dst, rty, self_rule);
                self.checks += targets.len() as u64;
                let added = self.insert_targets(src, &targets, new, self_rule);
                for d in added.iter() {
                    self.enqueue(src, d, new);
                }
            }
        }

        // pred(src) . item
        for lty in self.in_labels(src) {
            let derived: Vec<Label> = self.grammar.binary_summ(lty, label).collect();
            for new in derived {
                if new == label && self.closures.contains_key(&lty.symbol) {
                    self.extend_left_by_closure(src, dst, new, lty.symbol);
                    continue;
                }
                let self_rule = self.is_reduced_self_rule(lty, label, new);
                let sources = self.operand_pred(src, lty, self_rule);
                self.checks += sources.len() as u64;
                let added = self.insert_sources(&sources, dst, new, self_rule);
                for s in added.iter() {
                    self.enqueue(s, dst, new);
                }
            }
        }
    }

    /// `src -new-> d` for every `d` the closure of `sym` reaches from `dst`
    fn extend_right_by_closure(&mut self, src: NodeId, dst: NodeId, new: Label, sym: SymbolId) {
        let mut added = Vec::new();
        if let Some(closure) = self.closures.get(&sym) {
            let dataset = &mut self.dataset;
            let checks = &mut self.checks;
            closure.walk_descendants(dst, &mut |d| {
                *checks += 1;
                if dataset.check_and_add(src, d, new) {
                    added.push(d);
                    true
                } else {
                    false
                }
            });
        }
        for d in added {
            self.enqueue(src, d, new);
        }
    }

    /// `a -new-> dst` for every `a` reaching `src` in the closure of `sym`
    fn extend_left_by_closure(&mut self, src: NodeId, dst: NodeId, new: Label, sym: SymbolId) {
        let mut added = Vec::new();
        if let Some(closure) = self.closures.get(&sym) {
            let dataset = &mut self.dataset;
            let checks = &mut self.checks;
            closure.walk_ancestors(src, &mut |a| {
                *checks += 1;
                if dataset.check_and_add(a, dst, new) {
                    added.push(a);
                    true
                } else {
                    false
                }
            });
        }
        for a in added {
            self.enqueue(a, dst, new);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Dataset access (primary, plus secondary under transitive reduction)
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    fn is_transitive_reduction(&self) -> bool {
        self.config.variant == SolverVariant::TransitiveReduction
    }

    /// `X ::= X X` applied to two `X` operands, whose result goes to the
    /// secondary dataset and whose operands come from the primary one only
    fn is_reduced_self_rule(&self, left: Label, right: Label, new: Label) -> bool {
        self.is_transitive_reduction()
            && new.symbol == left.symbol
            && new.symbol == right.symbol
            && self.grammar.is_transitive(new.symbol)
    }

    fn out_labels(&self, node: NodeId) -> Vec<Label> {
        let mut labels: Vec<Label> = self.dataset.out_labels(node).map(|(l, _)| l).collect();
        if self.is_transitive_reduction() {
            labels.extend(self.secondary.out_labels(node).map(|(l, _)| l));
            labels.sort_unstable();
            labels.dedup();
        }
        labels
    }

    fn in_labels(&self, node: NodeId) -> Vec<Label> {
        let mut labels: Vec<Label> = self.dataset.in_labels(node).map(|(l, _)| l).collect();
        if self.is_transitive_reduction() {
            labels.extend(self.secondary.in_labels(node).map(|(l, _)| l));
            labels.sort_unstable();
            labels.dedup();
        }
        labels
    }

    fn operand_succ(&self, node: NodeId, label: Label, primary_only: bool) -> NodeSet {
        let mut set = self.dataset.succ(node, label).cloned().unwrap_or_default();
        if self.is_transitive_reduction() && !primary_only {
            if let Some(extra) = self.secondary.succ(node, label) {
                set.union_with(extra);
            }
        }
        set
    }

    fn operand_pred(&self, node: NodeId, label: Label, primary_only: bool) -> NodeSet {
        let mut set = self.dataset.pred(node, label).cloned().unwrap_or_default();
        if self.is_transitive_reduction() && !primary_only {
            if let Some(extra) = self.secondary.pred(node, label) {
                set.union_with(extra);
            }
        }
        set
    }

    fn insert_one(&mut self, src: NodeId, dst: NodeId, label: Label) -> bool {
        if self.is_transitive_reduction() && self.secondary.has_edge(src, dst, label) {
            return false;
        }
        self.dataset.check_and_add(src, dst, label)
    }

    fn insert_targets(&mut self, src: NodeId, dsts: &NodeSet, label: Label, to_secondary: bool) -> NodeSet {
        if !self.is_transitive_reduction() {
            return self.dataset.check_and_add_targets(src, dsts, label);
        }
        let mut fresh = dsts.clone();
        if let Some(known) = self.dataset.succ(src, label) {
            fresh = fresh.difference(known);
        }
        if let Some(known) = self.secondary.succ(src, label) {
            fresh = fresh.difference(known);
        }
        let target = if to_secondary {
            &mut self.secondary
        } else {
            &mut self.dataset
        };
        target.check_and_add_targets(src, &fresh, label)
    }

    fn insert_sources(&mut self, srcs: &NodeSet, dst: NodeId, label: Label, to_secondary: bool) -> NodeSet {
        if !self.is_transitive_reduction() {
            return self.dataset.check_and_add_sources(srcs, dst, label);
        }
        let mut fresh = srcs.clone();
        if let Some(known) = self.dataset.pred(dst, label) {
            fresh = fresh.difference(known);
        }
        if let Some(known) = self.secondary.pred(dst, label) {
            fresh = fresh.difference(known);
        }
        let target = if to_secondary {
            &mut self.secondary
        } else {
            &mut self.dataset
        };
        target.check_and_add_sources(&fresh, dst, label)
    }

    fn collect_stats(&self, seeds: &SeedGraph, start: Instant) -> SolverStats {
        let nonterminals = self.grammar.nonterminals();
        let counts = self.dataset.symbol_counts();
        let name = |sym: SymbolId| self.grammar.symbol_name(sym).unwrap_or("<fault>").to_string();

        SolverStats {
            variant: self.config.variant.as_str().to_string(),
            nodes: seeds.num_nodes(),
            seed_edges: seeds.edges.len(),
            iterations: self.iterations,
            checks: self.checks,
            accelerator_checks: self.closures.values().map(|c| c.checks()).sum(),
            reachable_pairs: self.closures.values().map(|c| c.reachable_pairs()).sum(),
            total_edges: self.dataset.edge_count(),
            summary_edges: counts
                .iter()
                .filter(|(sym, _)| nonterminals.contains(*sym))
                .map(|(_, &n)| n)
                .sum(),
            symbol_counts: counts.iter().map(|(&sym, &n)| (name(sym), n)).collect(),
            count_symbol: self.count_symbol.map(name),
            count_pairs: self.count_symbol.map_or(0, |sym| {
                self.dataset
                    .pairs(sym)
                    .into_iter()
                    .filter(|(u, v)| u != v)
                    .count()
            }),
            solve_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}
