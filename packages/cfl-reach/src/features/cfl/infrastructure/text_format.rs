//! Text formats: grammar files, tab-separated edge lists, pair dumps
//!
//! Edge list lines are `src \t dst \t label [\t index]`. Labels resolve
//! through the grammar; lines with labels the grammar does not know are
//! skipped (counted and reported once). A configurable marker label
//! (`src` for value-flow graphs) flags the line's first node as a source
//! instead of adding an edge.

use crate::errors::{CflError, Result};
use crate::features::cfl::domain::grammar::Grammar;
use crate::features::cfl::domain::label::NodeId;
use crate::features::cfl::domain::labeled_graph::{EdgeKind, LabeledGraph};
use crate::features::cfl::ports::{GrammarProvider, GraphProvider};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ═══════════════════════════════════════════════════════════════════════════
// Grammar files
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct GrammarFile {
    path: PathBuf,
}

impl GrammarFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GrammarProvider for GrammarFile {
    fn load_grammar(&self) -> Result<Grammar> {
        let text = fs::read_to_string(&self.path)?;
        Grammar::parse(&text)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Edge lists
// ═══════════════════════════════════════════════════════════════════════════

/// Edge-list parser settings
#[derive(Debug, Clone, Default)]
pub struct EdgeListReader {
    /// Labels whose edges are direct (assignment-like)
    direct_labels: Vec<String>,
    /// Only these labels become edges; `None` accepts every grammar symbol
    accepted_labels: Option<BTreeSet<String>>,
    source_marker: Option<String>,
}

impl EdgeListReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_direct_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.direct_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_accepted_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.accepted_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_source_marker(mut self, marker: impl Into<String>) -> Self {
        self.source_marker = Some(marker.into());
        self
    }

    pub fn source_marker(&self) -> Option<&str> {
        self.source_marker.as_deref()
    }

    /// Build a graph from edge-list text
    pub fn read_str(&self, text: &str, grammar: &Grammar) -> Result<LabeledGraph> {
        let direct: Vec<EdgeKind> = self
            .direct_labels
            .iter()
            .map(|l| grammar.symbol_id(l))
            .collect::<Result<_>>()?;
        let mut graph = LabeledGraph::with_direct_kinds(direct);
        let mut skipped = 0usize;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < 3 {
                return Err(CflError::parse(lineno + 1, "expected src, dst and label"));
            }
            let src = parse_node(fields[0], lineno)?;
            let dst = parse_node(fields[1], lineno)?;
            let label = fields[2];

            if self.source_marker.as_deref() == Some(label) {
                graph.mark_source(src);
                continue;
            }
            let accepted = self
                .accepted_labels
                .as_ref()
                .map_or(true, |set| set.contains(label));
            if !accepted || !grammar.has_symbol(label) {
                skipped += 1;
                continue;
            }
            let kind = grammar.symbol_id(label)?;
            let index = match fields.get(3) {
                Some(raw) if grammar.is_variant(kind) => raw
                    .parse::<u32>()
                    .map_err(|_| CflError::parse(lineno + 1, format!("bad index '{}'", raw)))?,
                _ => 0,
            };
            graph.add_node(src);
            graph.add_node(dst);
            graph.add_edge(src, dst, kind, index);
        }

        if skipped > 0 {
            warn!(skipped, "edge lines with unknown labels skipped");
        }
        debug!(
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            "graph read"
        );
        Ok(graph)
    }

    pub fn read_file(&self, path: &Path, grammar: &Grammar) -> Result<LabeledGraph> {
        let text = fs::read_to_string(path)?;
        self.read_str(&text, grammar)
    }
}

fn parse_node(field: &str, lineno: usize) -> Result<NodeId> {
    field
        .parse::<NodeId>()
        .map_err(|_| CflError::parse(lineno + 1, format!("bad node id '{}'", field)))
}

/// File-backed graph provider
#[derive(Debug, Clone)]
pub struct GraphFile {
    path: PathBuf,
    reader: EdgeListReader,
}

impl GraphFile {
    pub fn new(path: impl Into<PathBuf>, reader: EdgeListReader) -> Self {
        Self {
            path: path.into(),
            reader,
        }
    }
}

impl GraphProvider for GraphFile {
    fn load_graph(&self, grammar: &Grammar) -> Result<LabeledGraph> {
        self.reader.read_file(&self.path, grammar)
    }
}

/// Serialize `graph` as an edge list, grouped by ascending source node
///
/// Source nodes are written as `n \t n \t marker` lines when a marker is given.
pub fn write_edge_list(graph: &LabeledGraph, grammar: &Grammar, source_marker: Option<&str>) -> String {
    let mut out = String::new();
    for id in graph.node_ids() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if let (Some(marker), true) = (source_marker, node.is_source) {
            let _ = writeln!(out, "{}\t{}\t{}", id, id, marker);
        }
        let mut edges: Vec<(EdgeKind, NodeId, u32)> = node
            .out_edges()
            .filter_map(|eid| graph.edge(eid))
            .map(|e| (e.kind, e.dst, e.index))
            .collect();
        edges.sort_unstable();
        for (kind, dst, index) in edges {
            let name = grammar.symbol_name(kind).unwrap_or("<fault>");
            if grammar.is_variant(kind) {
                let _ = writeln!(out, "{}\t{}\t{}\t{}", id, dst, name, index);
            } else {
                let _ = writeln!(out, "{}\t{}\t{}", id, dst, name);
            }
        }
    }
    out
}

/// `src \t dst` per pair
pub fn write_pairs(pairs: &[(NodeId, NodeId)]) -> String {
    let mut out = String::with_capacity(pairs.len() * 12);
    for (src, dst) in pairs {
        let _ = writeln!(out, "{}\t{}", src, dst);
    }
    out
}
