//! Field-sensitive alias analysis over a program expression graph (PEG)
//!
//! PEG edges come in three kinds:
//! - `a`: assignment (`dst = src`), the direct kind
//! - `d`: dereference (`dst = *src`)
//! - `f_i`: field access at offset `i` (`dst = &src->f_i`)
//!
//! Every edge is seeded twice, forward under its own label and reversed
//! under the barred label. The result symbol is `V` (may-alias).
//!
//! Accelerated runs also register the matched-parenthesis shortcuts
//! `M ::= dbar V d` and `V ::= fbar_i V f_i`, fired on each new `V` pair.
//!
//! ```text
//! V    ::= ε | M | Abar V | V A | FV_i f_i
//! M    ::= DV d
//! DV   ::= dbar V
//! FV_i ::= fbar_i V
//! A    ::= A A | a | a M
//! Abar ::= Abar Abar | abar | M abar
//! ```

use crate::errors::Result;
use crate::features::cfl::domain::grammar::{BracketRule, Grammar};
use crate::features::cfl::domain::label::{Label, SeedGraph, SymbolId};
use crate::features::cfl::domain::labeled_graph::{EdgeKind, LabeledGraph};
use crate::features::cfl::infrastructure::simplifier::BracketProfile;
use crate::features::cfl::infrastructure::text_format::{write_edge_list, EdgeListReader};
use crate::features::cfl::ports::CflAnalysis;
use std::path::Path;
use tracing::debug;

/// PEG labels accepted from input files
pub const PEG_LABELS: [&str; 3] = ["a", "d", "f_i"];

/// Structural alias grammar
pub fn alias_grammar() -> Grammar {
    let mut g = Grammar::new();
    g.add_rule("V", &[]);
    g.add_rule("V", &["M"]);
    g.add_rule("V", &["Abar", "V"]);
    g.add_rule("V", &["V", "A"]);
    g.add_rule("V", &["FV_i", "f_i"]);
    g.add_rule("M", &["DV", "d"]);
    g.add_rule("DV", &["dbar", "V"]);
    g.add_rule("FV_i", &["fbar_i", "V"]);
    g.add_rule("A", &["A", "A"]);
    g.add_rule("A", &["a"]);
    g.add_rule("A", &["a", "M"]);
    g.add_rule("Abar", &["Abar", "Abar"]);
    g.add_rule("Abar", &["abar"]);
    g.add_rule("Abar", &["M", "abar"]);
    g
}

/// Terminal and result symbol ids
#[derive(Debug, Clone, Copy)]
struct AliasSymbols {
    asgn: SymbolId,
    asgn_bar: SymbolId,
    deref: SymbolId,
    deref_bar: SymbolId,
    gep: SymbolId,
    gep_bar: SymbolId,
    assigned: SymbolId,
    assigned_bar: SymbolId,
    matched: SymbolId,
    alias: SymbolId,
}

impl AliasSymbols {
    fn resolve(g: &Grammar) -> Result<Self> {
        Ok(Self {
            asgn: g.symbol_id("a")?,
            asgn_bar: g.symbol_id("abar")?,
            deref: g.symbol_id("d")?,
            deref_bar: g.symbol_id("dbar")?,
            gep: g.symbol_id("f_i")?,
            gep_bar: g.symbol_id("fbar_i")?,
            assigned: g.symbol_id("A")?,
            assigned_bar: g.symbol_id("Abar")?,
            matched: g.symbol_id("M")?,
            alias: g.symbol_id("V")?,
        })
    }

    fn bar(&self, kind: EdgeKind) -> Option<SymbolId> {
        match kind {
            k if k == self.asgn => Some(self.asgn_bar),
            k if k == self.deref => Some(self.deref_bar),
            k if k == self.gep => Some(self.gep_bar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AliasAnalysis {
    grammar: Grammar,
    graph: LabeledGraph,
    symbols: AliasSymbols,
}

impl AliasAnalysis {
    /// Empty PEG
    pub fn new() -> Result<Self> {
        let grammar = alias_grammar();
        let symbols = AliasSymbols::resolve(&grammar)?;
        let graph = LabeledGraph::with_direct_kinds([symbols.asgn]);
        Ok(Self {
            grammar,
            graph,
            symbols,
        })
    }

    fn reader() -> EdgeListReader {
        EdgeListReader::new()
            .with_accepted_labels(PEG_LABELS)
            .with_direct_labels(["a"])
    }

    pub fn from_peg_str(text: &str) -> Result<Self> {
        let mut analysis = Self::new()?;
        analysis.graph = Self::reader().read_str(text, &analysis.grammar)?;
        debug!(
            nodes = analysis.graph.num_nodes(),
            edges = analysis.graph.num_edges(),
            "peg loaded"
        );
        Ok(analysis)
    }

    pub fn from_peg_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_peg_str(&text)
    }

    /// `dst = src`; self-assignments are dropped
    pub fn add_assign(&mut self, src: u32, dst: u32) {
        self.graph.add_edge(src, dst, self.symbols.asgn, 0);
    }

    /// `dst = *src`
    pub fn add_deref(&mut self, src: u32, dst: u32) {
        self.graph.add_edge(src, dst, self.symbols.deref, 0);
    }

    /// `dst = &src->field`
    pub fn add_gep(&mut self, src: u32, dst: u32, field: u32) {
        self.graph.add_edge(src, dst, self.symbols.gep, field);
    }

    pub fn alias_symbol(&self) -> SymbolId {
        self.symbols.alias
    }
}

impl CflAnalysis for AliasAnalysis {
    fn name(&self) -> &'static str {
        "alias"
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

    fn bracket_profile(&self) -> BracketProfile {
        BracketProfile::new([self.symbols.deref, self.symbols.gep])
    }

    fn bracket_rules(&self) -> Vec<BracketRule> {
        let s = &self.symbols;
        vec![
            BracketRule {
                open: s.deref_bar,
                inner: s.alias,
                close: s.deref,
                result: s.matched,
            },
            BracketRule {
                open: s.gep_bar,
                inner: s.alias,
                close: s.gep,
                result: s.alias,
            },
        ]
    }

    fn seeds(&self) -> SeedGraph {
        let mut seeds = SeedGraph::new()
            .with_reflexive(Label::plain(self.symbols.assigned))
            .with_reflexive(Label::plain(self.symbols.assigned_bar));
        for id in self.graph.node_ids() {
            seeds.add_node(id);
        }
        for (_, edge) in self.graph.edges() {
            let Some(bar) = self.symbols.bar(edge.kind) else {
                continue;
            };
            seeds.add_edge(edge.src, edge.dst, self.grammar.label(edge.kind, edge.index));
            seeds.add_edge(edge.dst, edge.src, self.grammar.label(bar, edge.index));
        }
        seeds
    }

    fn count_symbol(&self) -> Option<SymbolId> {
        Some(self.symbols.alias)
    }

    fn graph_text(&self) -> String {
        write_edge_list(&self.graph, &self.grammar, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SolverConfig, SolverVariant};
    use crate::features::cfl::application::pipeline::run_analysis;
    use pretty_assertions::assert_eq;

    fn non_reflexive(pairs: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
        pairs.into_iter().filter(|(u, v)| u != v).collect()
    }

    #[test]
    fn test_grammar_shape() {
        let g = alias_grammar();
        assert_eq!(g.start_symbol(), g.symbol_id("V").ok());
        assert!(g.is_transitive(g.symbol_id("A").unwrap()));
        assert!(g.is_transitive(g.symbol_id("Abar").unwrap()));
        assert!(g.is_variant(g.symbol_id("FV_i").unwrap()));
        assert!(g.unary_cycles().is_empty());
    }

    #[test]
    fn test_seeds_mirror_bar_edges() {
        let mut analysis = AliasAnalysis::new().unwrap();
        analysis.add_assign(1, 2);
        analysis.add_assign(3, 3);
        analysis.add_gep(2, 4, 8);
        let seeds = analysis.seeds();
        let fbar = analysis.grammar().symbol_id("fbar_i").unwrap();

        assert_eq!(seeds.edges.len(), 4);
        assert!(seeds.edges.iter().any(|e| (e.src, e.dst, e.label) == (4, 2, Label::new(fbar, 8))));
        assert_eq!(seeds.reflexive.len(), 2);
    }

    #[test]
    fn test_pointer_copies_alias() {
        // 2 = 1; 3 = *1; 4 = *2
        let mut analysis = AliasAnalysis::from_peg_str("1\t2\ta\n1\t3\td\n2\t4\td\n").unwrap();
        let v = analysis.alias_symbol();
        let run = run_analysis(&mut analysis, &SolverConfig::default()).unwrap();
        let result = run.result.unwrap();
        assert_eq!(non_reflexive(result.pairs(v)), vec![(1, 2), (2, 1), (3, 4), (4, 3)]);
        assert_eq!(run.report.solver.unwrap().count_pairs, 4);
    }

    #[test]
    fn test_every_variant_agrees() {
        let text = "1\t2\ta\n2\t3\ta\n1\t4\td\n3\t5\td\n5\t6\tf_i\t1\n4\t7\tf_i\t1\n4\t8\tf_i\t2\n";
        let baseline = {
            let mut analysis = AliasAnalysis::from_peg_str(text).unwrap();
            let v = analysis.alias_symbol();
            run_analysis(&mut analysis, &SolverConfig::default()).unwrap().result.unwrap().pairs(v)
        };
        assert!(baseline.contains(&(6, 7)));
        assert!(!baseline.contains(&(6, 8)));

        for variant in SolverVariant::ALL {
            let mut analysis = AliasAnalysis::from_peg_str(text).unwrap();
            let v = analysis.alias_symbol();
            let config = SolverConfig::default().variant(variant);
            let pairs = run_analysis(&mut analysis, &config).unwrap().result.unwrap().pairs(v);
            assert_eq!(pairs, baseline, "{}", variant.as_str());
        }
    }

    #[test]
    fn test_matching_rules_registered() {
        let analysis = AliasAnalysis::new().unwrap();
        let g = analysis.grammar();
        let rules = analysis.bracket_rules();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.inner == analysis.alias_symbol()));
        assert_eq!(rules[0].result, g.symbol_id("M").unwrap());
        assert_eq!(rules[1].open, g.symbol_id("fbar_i").unwrap());
    }

    #[test]
    fn test_accelerated_matching_agrees_on_fields() {
        // 2 = &1->f1; 3 = &1->f1; 4 = &1->f2; 5 = *2; 6 = *3
        let text = "1\t2\tf_i\t1\n1\t3\tf_i\t1\n1\t4\tf_i\t2\n2\t5\td\n3\t6\td\n";
        let run = |variant: SolverVariant| {
            let mut analysis = AliasAnalysis::from_peg_str(text).unwrap();
            let v = analysis.alias_symbol();
            let config = SolverConfig::default().variant(variant);
            run_analysis(&mut analysis, &config).unwrap().result.unwrap().pairs(v)
        };
        let baseline = run(SolverVariant::Standard);
        assert!(baseline.contains(&(2, 3)));
        assert!(baseline.contains(&(5, 6)));
        assert!(!baseline.contains(&(2, 4)));
        for variant in [SolverVariant::Pocr, SolverVariant::Focr] {
            assert_eq!(run(variant), baseline, "{}", variant.as_str());
        }
    }

    #[test]
    fn test_unknown_peg_labels_skipped() {
        let analysis = AliasAnalysis::from_peg_str("1\t2\tabar\n1\t2\tV\n1\t2\ta\n").unwrap();
        assert_eq!(analysis.graph().num_edges(), 1);
    }

    #[test]
    fn test_graph_text_round_trip() {
        // within a node, edges are written in symbol declaration order (d before a)
        let text = "1\t3\td\n1\t2\ta\n2\t4\tf_i\t3\n";
        let analysis = AliasAnalysis::from_peg_str(text).unwrap();
        assert_eq!(analysis.graph_text(), text);
    }
}
