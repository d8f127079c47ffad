//! Application layer: analysis instances and the run pipeline
//!
//! - **GenericCfl**: grammar file + edge list
//! - **AliasAnalysis**: field-sensitive alias analysis over a PEG
//! - **ValueFlowAnalysis**: call/return-matched value flow over an IVFG

pub mod alias_analysis;
pub mod generic;
pub mod pipeline;
pub mod value_flow;

pub use alias_analysis::AliasAnalysis;
pub use generic::GenericCfl;
pub use pipeline::{run_analysis, run_and_report, AnalysisReport, AnalysisRun};
pub use value_flow::ValueFlowAnalysis;
