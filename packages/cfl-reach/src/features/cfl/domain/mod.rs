//! Domain models for CFL-reachability
//!
//! - Label: grammar symbol plus index
//! - Grammar: symbols and normalized rule tables
//! - LabeledGraph: structural input graph with rep/sub merging
//! - SCC detection: iterative Tarjan shared by grammar checks and simplification
//! - Worklist: FIFO of edges awaiting summarization

pub mod grammar;
pub mod label;
pub mod labeled_graph;
pub mod scc_detector;
pub mod worklist;

pub use grammar::{BracketRule, Grammar, GrammarStats};
pub use label::{Label, LabeledEdge, NodeId, SeedGraph, SymbolId, FAULT};
pub use labeled_graph::{EdgeKind, GraphEdge, GraphNode, LabeledGraph};
pub use worklist::{Worklist, WorklistItem};
