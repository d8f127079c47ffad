//! Context-sensitive value-flow analysis over an interprocedural value-flow
//! graph (IVFG)
//!
//! Edge kinds: `a` (intraprocedural flow, direct), `call_i` and `ret_i`
//! (call site `i`). A value flows along `A` when every return matches the
//! call it came through:
//!
//! ```text
//! A    ::= A A | a | Cl_i ret_i | ε
//! Cl_i ::= call_i A
//! ```
//!
//! Lines `n \t n \t src` mark `n` as an analysis source; sources survive
//! chain folding.

use crate::errors::Result;
use crate::features::cfl::domain::grammar::{BracketRule, Grammar};
use crate::features::cfl::domain::label::{NodeId, SeedGraph, SymbolId};
use crate::features::cfl::domain::labeled_graph::LabeledGraph;
use crate::features::cfl::infrastructure::simplifier::BracketProfile;
use crate::features::cfl::infrastructure::text_format::{write_edge_list, EdgeListReader};
use crate::features::cfl::ports::CflAnalysis;
use std::path::Path;

/// IVFG labels accepted from input files
pub const IVFG_LABELS: [&str; 3] = ["a", "call_i", "ret_i"];

/// Marker label for source nodes
pub const SOURCE_MARKER: &str = "src";

/// Structural value-flow grammar
pub fn value_flow_grammar() -> Grammar {
    let mut g = Grammar::new();
    g.add_rule("A", &["A", "A"]);
    g.add_rule("Cl_i", &["call_i", "A"]);
    g.add_rule("A", &["Cl_i", "ret_i"]);
    g.add_rule("A", &["a"]);
    g.add_rule("A", &[]);
    g
}

#[derive(Debug, Clone)]
pub struct ValueFlowAnalysis {
    grammar: Grammar,
    graph: LabeledGraph,
    direct: SymbolId,
    call: SymbolId,
    ret: SymbolId,
    flow: SymbolId,
}

impl ValueFlowAnalysis {
    /// Empty IVFG
    pub fn new() -> Result<Self> {
        let grammar = value_flow_grammar();
        let direct = grammar.symbol_id("a")?;
        Ok(Self {
            call: grammar.symbol_id("call_i")?,
            ret: grammar.symbol_id("ret_i")?,
            flow: grammar.symbol_id("A")?,
            graph: LabeledGraph::with_direct_kinds([direct]),
            direct,
            grammar,
        })
    }

    fn reader() -> EdgeListReader {
        EdgeListReader::new()
            .with_accepted_labels(IVFG_LABELS)
            .with_direct_labels(["a"])
            .with_source_marker(SOURCE_MARKER)
    }

    pub fn from_ivfg_str(text: &str) -> Result<Self> {
        let mut analysis = Self::new()?;
        analysis.graph = Self::reader().read_str(text, &analysis.grammar)?;
        Ok(analysis)
    }

    pub fn from_ivfg_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ivfg_str(&text)
    }

    pub fn add_flow(&mut self, src: NodeId, dst: NodeId) {
        self.graph.add_edge(src, dst, self.direct, 0);
    }

    pub fn add_call(&mut self, src: NodeId, dst: NodeId, site: u32) {
        self.graph.add_edge(src, dst, self.call, site);
    }

    pub fn add_ret(&mut self, src: NodeId, dst: NodeId, site: u32) {
        self.graph.add_edge(src, dst, self.ret, site);
    }

    pub fn mark_source(&mut self, node: NodeId) {
        self.graph.mark_source(node);
    }

    /// Current source nodes, ascending
    pub fn sources(&self) -> Vec<NodeId> {
        self.graph
            .nodes()
            .filter(|n| n.is_source)
            .map(|n| n.id)
            .collect()
    }

    pub fn flow_symbol(&self) -> SymbolId {
        self.flow
    }
}

impl CflAnalysis for ValueFlowAnalysis {
    fn name(&self) -> &'static str {
        "vfa"
    }

    fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    fn graph(&self) -> &LabeledGraph {
        &self.graph
    }

    fn graph_mut(&mut self) -> &mut LabeledGraph {
        &mut self.graph
    }

    /// Call edges turn into reversed returns in the pruning copy, so a
    /// call site fanning in and a return fanning out meet at one anchor
    fn bracket_profile(&self) -> BracketProfile {
        BracketProfile::new([self.call, self.ret]).flip(self.call, self.ret)
    }

    fn bracket_rules(&self) -> Vec<BracketRule> {
        vec![BracketRule {
            open: self.call,
            inner: self.flow,
            close: self.ret,
            result: self.flow,
        }]
    }

    fn seeds(&self) -> SeedGraph {
        let mut seeds = SeedGraph::new();
        for id in self.graph.node_ids() {
            seeds.add_node(id);
        }
        for (_, edge) in self.graph.edges() {
            seeds.add_edge(edge.src, edge.dst, self.grammar.label(edge.kind, edge.index));
        }
        seeds
    }

    fn count_symbol(&self) -> Option<SymbolId> {
        Some(self.flow)
    }

    fn graph_text(&self) -> String {
        write_edge_list(&self.graph, &self.grammar, Some(SOURCE_MARKER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SolverConfig, SolverVariant};
    use crate::features::cfl::application::pipeline::run_analysis;
    use pretty_assertions::assert_eq;

    // 1 -a-> 2 -call[5]-> 3 -a-> 4 -ret[5]-> 5
    //                            4 -ret[6]-> 6
    const CALL_GRAPH: &str = "1\t1\tsrc\n1\t2\ta\n2\t3\tcall_i\t5\n3\t4\ta\n4\t5\tret_i\t5\n4\t6\tret_i\t6\n";

    fn flows(config: &SolverConfig) -> Vec<(NodeId, NodeId)> {
        let mut analysis = ValueFlowAnalysis::from_ivfg_str(CALL_GRAPH).unwrap();
        let run = run_analysis(&mut analysis, config).unwrap();
        run.count_pairs()
    }

    #[test]
    fn test_matched_return_only() {
        let pairs = flows(&SolverConfig::default());
        assert_eq!(pairs, vec![(1, 2), (1, 5), (2, 5), (3, 4)]);
    }

    #[test]
    fn test_every_variant_agrees() {
        let expected = flows(&SolverConfig::default());
        for variant in SolverVariant::ALL {
            let config = SolverConfig::default().variant(variant);
            assert_eq!(flows(&config), expected, "{}", variant.as_str());
        }
    }

    #[test]
    fn test_sources_parsed_and_written() {
        let analysis = ValueFlowAnalysis::from_ivfg_str(CALL_GRAPH).unwrap();
        assert_eq!(analysis.sources(), vec![1]);
        assert!(analysis.graph_text().starts_with("1\t1\tsrc\n"));
    }

    #[test]
    fn test_fold_keeps_sources() {
        let mut analysis = ValueFlowAnalysis::new().unwrap();
        analysis.mark_source(2);
        analysis.add_flow(1, 2);
        analysis.add_flow(2, 3);
        let config = SolverConfig::default().fold(true).solve(false);
        run_analysis(&mut analysis, &config).unwrap();
        assert!(analysis.graph().has_node(2));
        assert!(analysis.sources().contains(&2));
    }

    #[test]
    fn test_bracket_rule_symbols() {
        let analysis = ValueFlowAnalysis::new().unwrap();
        let rules = analysis.bracket_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].inner, analysis.flow_symbol());
        assert_eq!(analysis.grammar().start_symbol(), Some(analysis.flow_symbol()));
    }
}
