//! Analysis pipeline
//!
//! One run over a `CflAnalysis` instance:
//!
//! ```text
//! graph ──simplify──▶ graph' ──seeds──▶ FixpointSolver ──▶ SolveResult
//!                        │                                     │
//!                        └──────────── AnalysisReport ◀────────┘
//! ```
//!
//! Simplification mutates the instance's graph in place so the caller can
//! write the simplified graph back out afterwards.

use crate::config::SolverConfig;
use crate::errors::Result;
use crate::features::cfl::domain::label::NodeId;
use crate::features::cfl::infrastructure::fixpoint_solver::{FixpointSolver, SolveResult, SolverStats};
use crate::features::cfl::infrastructure::simplifier::{GraphSimplifier, SimplifyStats};
use crate::features::cfl::ports::{CflAnalysis, StatsSink};
use serde::Serialize;
use tracing::info;

/// Everything a stats sink gets to see about one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub analysis: String,
    pub variant: String,
    /// Graph size handed to the solver
    pub nodes: usize,
    pub edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simplify: Option<SimplifyStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverStats>,
}

/// Report plus the solved dataset (absent with `solve = false`)
#[derive(Debug)]
pub struct AnalysisRun {
    pub report: AnalysisReport,
    pub result: Option<SolveResult>,
}

impl AnalysisRun {
    /// Non-reflexive pairs of the reported symbol
    pub fn count_pairs(&self) -> Vec<(NodeId, NodeId)> {
        let Some(result) = &self.result else {
            return Vec::new();
        };
        let Some(symbol) = result.count_symbol else {
            return Vec::new();
        };
        result
            .pairs(symbol)
            .into_iter()
            .filter(|(u, v)| u != v)
            .collect()
    }
}

/// Simplify, seed and solve `analysis` under `config`
pub fn run_analysis(analysis: &mut dyn CflAnalysis, config: &SolverConfig) -> Result<AnalysisRun> {
    config.validate()?;
    let mut report = AnalysisReport {
        analysis: analysis.name().to_string(),
        variant: config.variant.as_str().to_string(),
        ..Default::default()
    };

    if config.simplify.any() {
        let simplifier = GraphSimplifier::new(&config.simplify, analysis.bracket_profile());
        report.simplify = Some(simplifier.simplify(analysis.graph_mut()));
    }
    report.nodes = analysis.graph().num_nodes();
    report.edges = analysis.graph().num_edges();

    if !config.solve {
        info!(analysis = %report.analysis, "solving disabled");
        return Ok(AnalysisRun { report, result: None });
    }

    let seeds = analysis.seeds();
    let mut solver = FixpointSolver::new(analysis.grammar(), config)?.with_bracket_rules(analysis.bracket_rules());
    if config.count_symbol.is_none() {
        solver = solver.with_count_symbol(analysis.count_symbol());
    }
    let result = solver.solve(&seeds)?;
    report.solver = Some(result.stats.clone());

    Ok(AnalysisRun {
        report,
        result: Some(result),
    })
}

/// `run_analysis`, then hand the report to `sink`
pub fn run_and_report(
    analysis: &mut dyn CflAnalysis,
    config: &SolverConfig,
    sink: &mut dyn StatsSink,
) -> Result<AnalysisRun> {
    let run = run_analysis(analysis, config)?;
    sink.report(&run.report)?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverVariant;
    use crate::features::cfl::application::generic::GenericCfl;
    use crate::features::cfl::domain::grammar::Grammar;

    struct Collect(Vec<AnalysisReport>);

    impl StatsSink for Collect {
        fn report(&mut self, report: &AnalysisReport) -> Result<()> {
            self.0.push(report.clone());
            Ok(())
        }
    }

    fn chain() -> GenericCfl {
        let grammar = Grammar::parse("a\ta\ta\n").unwrap();
        GenericCfl::from_edge_list(grammar, "1\t2\ta\n2\t3\ta\n3\t4\ta\n", &[]).unwrap()
    }

    #[test]
    fn test_run_reports_solver_stats() {
        let mut analysis = chain();
        let config = SolverConfig::default().variant(SolverVariant::Focr);
        let mut sink = Collect(Vec::new());
        let run = run_and_report(&mut analysis, &config, &mut sink).unwrap();

        assert_eq!(sink.0.len(), 1);
        let stats = sink.0[0].solver.as_ref().unwrap();
        assert_eq!(stats.count_pairs, 6);
        assert_eq!(run.count_pairs().len(), 6);
        assert_eq!(sink.0[0].nodes, 4);
        assert!(sink.0[0].simplify.is_none());
    }

    #[test]
    fn test_no_solve_skips_solver() {
        let mut analysis = chain();
        let config = SolverConfig::default().solve(false).scc(true);
        let run = run_analysis(&mut analysis, &config).unwrap();
        assert!(run.result.is_none());
        assert!(run.report.solver.is_none());
        assert!(run.report.simplify.is_some());
        assert!(run.count_pairs().is_empty());
    }

    #[test]
    fn test_config_count_symbol_wins() {
        let grammar = Grammar::parse("S\tS\ta\nS\ta\n").unwrap();
        let mut analysis = GenericCfl::from_edge_list(grammar, "1\t2\ta\n2\t3\ta\n", &[]).unwrap();
        let config = SolverConfig::default().count_symbol(Some("a".to_string()));
        let run = run_analysis(&mut analysis, &config).unwrap();
        let stats = run.report.solver.unwrap();
        assert_eq!(stats.count_symbol.as_deref(), Some("a"));
        assert_eq!(stats.count_pairs, 2);
    }
}
