//! Generic CFL-reachability: grammar file + labeled edge list
//!
//! Edge kinds are grammar symbol ids, so every graph edge seeds the solver
//! with its own label. No bracket profile: which kinds pair up is unknown
//! for an arbitrary grammar, so bracket pruning is a no-op here.

use crate::errors::Result;
use crate::features::cfl::domain::grammar::Grammar;
use crate::features::cfl::domain::label::SeedGraph;
use crate::features::cfl::domain::labeled_graph::LabeledGraph;
use crate::features::cfl::infrastructure::text_format::{write_edge_list, EdgeListReader};
use crate::features::cfl::ports::{CflAnalysis, GrammarProvider, GraphProvider};

#[derive(Debug, Clone)]
pub struct GenericCfl {
    grammar: Grammar,
    graph: LabeledGraph,
}

impl GenericCfl {
    pub fn new(grammar: Grammar, graph: LabeledGraph) -> Self {
        Self { grammar, graph }
    }

    pub fn load(grammar: &dyn GrammarProvider, graph: &dyn GraphProvider) -> Result<Self> {
        let grammar = grammar.load_grammar()?;
        let graph = graph.load_graph(&grammar)?;
        Ok(Self::new(grammar, graph))
    }

    /// Parse `text` against `grammar`; `direct_labels` become direct kinds
    pub fn from_edge_list(grammar: Grammar, text: &str, direct_labels: &[String]) -> Result<Self> {
        let graph = EdgeListReader::new()
            .with_direct_labels(direct_labels.iter().cloned())
            .read_str(text, &grammar)?;
        Ok(Self::new(grammar, graph))
    }
}

impl CflAnalysis for GenericCfl {
    fn name(&self) -> &'static str {
        "cfl"
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

    fn graph_text(&self) -> String {
        write_edge_list(&self.graph, &self.grammar, None)
    }
}
