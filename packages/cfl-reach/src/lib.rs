/*
 * cfl-reach - CFL-Reachability Engine
 *
 * Feature-First Hexagonal Architecture:
 * - config/      : Solver configuration (presets, builder, YAML)
 * - features/    : Vertical slices (grammar → graph → simplify → solve)
 * - errors       : Crate-wide error type
 *
 * Performance:
 * - Incremental closures for transitive symbols (POCR, FOCR)
 * - Rayon work-stealing for batch semi-naive generations
 */

// Crate-level lint configuration
#![allow(clippy::type_complexity)] // Closure maps keyed by symbol
#![allow(clippy::new_without_default)] // Fallible constructors for analysis instances
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{Preset, SimplifyConfig, SolverConfig, SolverVariant};
pub use errors::{CflError, Result};
pub use features::cfl::{
    run_analysis, AliasAnalysis, AnalysisReport, CflAnalysis, FixpointSolver, GenericCfl, Grammar,
    LabeledGraph, SeedGraph, SolveResult, ValueFlowAnalysis,
};
