//! Ports (Interfaces) for CFL-reachability
//!
//! The solver and the analysis pipeline only talk to these traits:
//! - [`TransitiveClosure`]: incremental closure of one transitive symbol
//!   (hybrid trees, edge-critical graph)
//! - [`GrammarProvider`] / [`GraphProvider`]: where inputs come from
//! - [`CflAnalysis`]: one analysis instance (grammar, graph, seeding policy)
//! - [`StatsSink`]: where the run report goes
//!
//! # Example (Generic - Zero-cost)
//! ```ignore
//! fn closure_size<C: TransitiveClosure>(closure: &mut C, edges: &[(u32, u32)]) -> usize {
//!     let mut delta = Vec::new();
//!     for &(s, d) in edges {
//!         closure.insert_edge(s, d, &mut delta);
//!     }
//!     closure.reachable_pairs()
//! }
//! ```

use crate::config::SolverVariant;
use crate::errors::Result;
use crate::features::cfl::application::pipeline::AnalysisReport;
use crate::features::cfl::domain::grammar::{BracketRule, Grammar};
use crate::features::cfl::domain::label::{NodeId, SeedGraph, SymbolId};
use crate::features::cfl::domain::labeled_graph::LabeledGraph;
use crate::features::cfl::infrastructure::edge_critical_graph::EdgeCriticalGraph;
use crate::features::cfl::infrastructure::hybrid_tree::{HybridClosureTree, HybridForest};
use crate::features::cfl::infrastructure::simplifier::BracketProfile;

// ============================================================================
// Accelerator capability
// ============================================================================

/// Incrementally maintained closure `X ::= X X` for one symbol
///
/// `(n, n)` is implicitly reachable and never reported.
pub trait TransitiveClosure: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Insert `src -> dst`, appending every pair that became reachable
    fn insert_edge(&mut self, src: NodeId, dst: NodeId, delta: &mut Vec<(NodeId, NodeId)>);

    /// Reachability query (reflexive); counted in `checks`
    fn is_reachable(&mut self, src: NodeId, dst: NodeId) -> bool;

    /// Visit nodes reachable from `from`; the callback returns whether to
    /// continue below the visited node
    fn walk_descendants(&self, from: NodeId, visit: &mut dyn FnMut(NodeId) -> bool);

    /// Visit nodes reaching `to`, same pruning contract
    fn walk_ancestors(&self, to: NodeId, visit: &mut dyn FnMut(NodeId) -> bool);

    /// Internal membership checks performed so far
    fn checks(&self) -> u64;

    /// Live non-reflexive pairs
    fn reachable_pairs(&self) -> usize;
}

/// Accelerator factory
pub struct ClosureFactory;

impl ClosureFactory {
    /// Closure structure for `variant`, `None` when the variant uses the
    /// plain self-rule
    pub fn create(variant: SolverVariant) -> Option<Box<dyn TransitiveClosure>> {
        match variant {
            SolverVariant::Pocr => Some(Box::new(HybridClosureTree::new())),
            SolverVariant::HierarchicalPocr => Some(Box::new(HybridForest::new())),
            SolverVariant::Focr => Some(Box::new(EdgeCriticalGraph::new())),
            SolverVariant::Standard | SolverVariant::TransitiveReduction | SolverVariant::BatchSemiNaive => None,
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

pub trait GrammarProvider {
    fn load_grammar(&self) -> Result<Grammar>;
}

/// Builds the structural graph; labels resolve through `grammar`
pub trait GraphProvider {
    fn load_graph(&self, grammar: &Grammar) -> Result<LabeledGraph>;
}

// ============================================================================
// Analysis instance
// ============================================================================

/// One CFL-reachability problem: grammar, simplifiable graph, and the rule
/// for turning the (simplified) graph into solver seeds
pub trait CflAnalysis {
    fn name(&self) -> &'static str;

    fn grammar(&self) -> &Grammar;

    fn graph(&self) -> &LabeledGraph;

    fn graph_mut(&mut self) -> &mut LabeledGraph;

    /// Bracket kinds for the pruning pass
    fn bracket_profile(&self) -> BracketProfile {
        BracketProfile::default()
    }

    fn bracket_rules(&self) -> Vec<BracketRule> {
        Vec::new()
    }

    /// Seed edges derived from the current graph
    fn seeds(&self) -> SeedGraph;

    /// Symbol whose pairs are reported as the analysis result
    fn count_symbol(&self) -> Option<SymbolId> {
        self.grammar().start_symbol()
    }

    /// Serialize the current graph in the instance's input format
    fn graph_text(&self) -> String;
}

// ============================================================================
// Output
// ============================================================================

pub trait StatsSink {
    fn report(&mut self, report: &AnalysisReport) -> Result<()>;
}
