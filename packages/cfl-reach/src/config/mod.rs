//! Solver Configuration
//!
//! Three ways to obtain a `SolverConfig`:
//! - Level 1: Preset - `SolverConfig::from_preset(Preset::Balanced)`
//! - Level 2: Builder - `SolverConfig::default().variant(SolverVariant::Focr).scc(true)`
//! - Level 3: YAML - `SolverConfig::from_yaml_file("run.yaml")?`
//!
//! # Examples
//!
//! ```rust,ignore
//! use cfl_reach::config::{Preset, SolverConfig, SolverVariant};
//!
//! let config = SolverConfig::from_preset(Preset::Balanced)
//!     .variant(SolverVariant::HierarchicalPocr)
//!     .timeout_secs(600);
//! config.validate()?;
//! ```

pub mod error;
pub mod io;
pub mod preset;
pub mod solver_config;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigExportV1, ConfigOverrides, SimplifyOverrides};
pub use preset::Preset;
pub use solver_config::{SimplifyConfig, SolverConfig, SolverVariant};
