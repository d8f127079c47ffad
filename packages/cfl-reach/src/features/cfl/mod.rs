//! # CFL-Reachability
//!
//! All-pairs CFL-reachability over labeled graphs: given a context-free
//! grammar in normal form and a graph whose edges carry terminal labels,
//! derive every `(src, dst, nonterminal)` summary edge.
//!
//! Transitive symbols (`X ::= X X`) dominate the cost of the plain worklist
//! algorithm; the solver variants replace their self-rule with an
//! incrementally maintained closure.
//!
//! ## Academic References
//! - Reps, T. "Program Analysis via Graph Reachability" (IST 1998)
//! - Zheng & Rugina "Demand-driven Alias Analysis for C" (POPL 2008)
//! - Lei et al. "Taming Transitive Redundancy for Context-Free Language
//!   Reachability" (OOPSLA 2022)
//! - Li et al. "Fast Graph Simplification for Interleaved Dyck-Reachability"
//!   (PLDI 2020)
//!
//! ## Usage
//! ```text
//! use cfl_reach::features::cfl::{FixpointSolver, Grammar, SeedGraph};
//!
//! let grammar = Grammar::parse("a\ta\ta\n")?;
//! let config = SolverConfig::default().variant(SolverVariant::Focr);
//! let result = FixpointSolver::new(&grammar, &config)?.solve(&seeds)?;
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// Re-exports for public API
pub use application::{run_analysis, AliasAnalysis, AnalysisReport, GenericCfl, ValueFlowAnalysis};
pub use domain::{Grammar, Label, LabeledEdge, LabeledGraph, SeedGraph};
pub use infrastructure::{FixpointSolver, GraphSimplifier, SolveResult, SolverStats};
pub use ports::{CflAnalysis, TransitiveClosure};
