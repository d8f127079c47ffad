//! Infrastructure layer for CFL-reachability
//!
//! Data structures and algorithms behind the ports:
//! - **NodeSet**: sorted sparse set for successor/predecessor targets
//! - **AdjacencyDataset**: per-label derived-edge store with `check_and_add`
//! - **GraphSimplifier**: SCC elimination, chain folding, bracket pruning
//! - **HybridClosureTree / HybridForest**: spanning-tree closures (POCR)
//! - **EdgeCriticalGraph**: forward/back-edge closure with cycle compaction (FOCR)
//! - **FixpointSolver**: the worklist loop, one per run
//! - **semi_naive**: generation-at-a-time evaluation
//! - **text_format**: grammar files, edge lists, pair dumps

pub mod adjacency;
pub mod deadline;
pub mod edge_critical_graph;
pub mod fixpoint_solver;
pub mod hybrid_tree;
pub mod node_set;
pub mod semi_naive;
pub mod simplifier;
pub mod stats_sink;
pub mod text_format;

pub use adjacency::AdjacencyDataset;
pub use deadline::Deadline;
pub use edge_critical_graph::EdgeCriticalGraph;
pub use fixpoint_solver::{FixpointSolver, SolveResult, SolverStats};
pub use hybrid_tree::{HybridClosureTree, HybridForest};
pub use node_set::NodeSet;
pub use simplifier::{BracketProfile, GraphSimplifier, SimplifyStats};
pub use stats_sink::{ReportFormat, TerminalStatsSink};
pub use text_format::{write_edge_list, write_pairs, EdgeListReader, GrammarFile, GraphFile};
