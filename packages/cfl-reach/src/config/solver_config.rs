//! Solver and simplifier configuration
//!
//! One `SolverConfig` is built per run (preset, builder, or YAML) and passed by
//! reference into `GraphSimplifier` and `FixpointSolver`. Nothing in the
//! algorithms reads global state.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Upper bound accepted for `timeout_secs` (one week)
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 3600;

/// Default deadline (24 hours)
pub const DEFAULT_TIMEOUT_SECS: u64 = 24 * 3600;

/// Fixpoint strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverVariant {
    /// Plain worklist over the adjacency dataset
    Standard,
    /// Dual ancestor/descendant forests per transitive symbol
    Pocr,
    /// Single descendant forest (`add_arc`/`meld`), transitive items deferred
    HierarchicalPocr,
    /// Edge-critical graph per transitive symbol
    Focr,
    /// Self-rule derivations kept apart from join inputs
    TransitiveReduction,
    /// Generation-at-a-time semi-naive evaluation
    BatchSemiNaive,
}

impl SolverVariant {
    pub const ALL: [SolverVariant; 6] = [
        SolverVariant::Standard,
        SolverVariant::Pocr,
        SolverVariant::HierarchicalPocr,
        SolverVariant::Focr,
        SolverVariant::TransitiveReduction,
        SolverVariant::BatchSemiNaive,
    ];

    /// Whether the variant installs a closure accelerator for transitive symbols
    pub fn uses_accelerator(&self) -> bool {
        matches!(
            self,
            SolverVariant::Pocr | SolverVariant::HierarchicalPocr | SolverVariant::Focr
        )
    }

    /// Short name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverVariant::Standard => "standard",
            SolverVariant::Pocr => "pocr",
            SolverVariant::HierarchicalPocr => "hpocr",
            SolverVariant::Focr => "focr",
            SolverVariant::TransitiveReduction => "tr",
            SolverVariant::BatchSemiNaive => "semi-naive",
        }
    }
}

impl FromStr for SolverVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "std" => Ok(SolverVariant::Standard),
            "pocr" => Ok(SolverVariant::Pocr),
            "hpocr" | "hierarchical-pocr" => Ok(SolverVariant::HierarchicalPocr),
            "focr" => Ok(SolverVariant::Focr),
            "tr" | "transitive-reduction" => Ok(SolverVariant::TransitiveReduction),
            "semi-naive" | "gspan" | "batch-semi-naive" => Ok(SolverVariant::BatchSemiNaive),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

impl std::fmt::Display for SolverVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graph simplification passes (each independently toggleable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimplifyConfig {
    /// Merge strongly connected components over direct edges
    pub scc: bool,
    /// Fold single-entry direct chains into their predecessor
    pub fold: bool,
    /// Remove bracket edges that can never be matched
    pub inter_dyck: bool,
}

impl SimplifyConfig {
    pub fn any(&self) -> bool {
        self.scc || self.fold || self.inter_dyck
    }

    pub fn all() -> Self {
        Self {
            scc: true,
            fold: true,
            inter_dyck: true,
        }
    }
}

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Fixpoint strategy
    pub variant: SolverVariant,

    /// Simplification passes run before solving
    pub simplify: SimplifyConfig,

    /// Deadline in seconds (0 = none)
    pub timeout_secs: u64,

    /// Run the fixpoint at all (false = simplify and report only)
    pub solve: bool,

    /// Reject grammars whose unary rules form a cycle
    pub strict_grammar: bool,

    /// Symbol whose pairs are reported as count edges (default: first declared)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_symbol: Option<String>,

    /// Labels treated as direct edges by the generic instance
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub direct_labels: Vec<String>,
}

impl SolverConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::range_with_hint(
                "timeout_secs",
                self.timeout_secs,
                0,
                MAX_TIMEOUT_SECS,
                "Use 0 to disable the deadline",
            ));
        }

        if let Some(symbol) = &self.count_symbol {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "count_symbol must not be empty".to_string(),
                ));
            }
        }

        if self.direct_labels.iter().any(|l| l.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "direct_labels must not contain empty names".to_string(),
            ));
        }

        Ok(())
    }

    /// Deadline as a duration, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    /// Builder: Set variant
    pub fn variant(mut self, v: SolverVariant) -> Self {
        self.variant = v;
        self
    }

    /// Builder: Set simplify
    pub fn simplify(mut self, v: SimplifyConfig) -> Self {
        self.simplify = v;
        self
    }

    /// Builder: Set scc
    pub fn scc(mut self, v: bool) -> Self {
        self.simplify.scc = v;
        self
    }

    /// Builder: Set fold
    pub fn fold(mut self, v: bool) -> Self {
        self.simplify.fold = v;
        self
    }

    /// Builder: Set inter_dyck
    pub fn inter_dyck(mut self, v: bool) -> Self {
        self.simplify.inter_dyck = v;
        self
    }

    /// Builder: Set timeout_secs
    pub fn timeout_secs(mut self, v: u64) -> Self {
        self.timeout_secs = v;
        self
    }

    /// Builder: Set solve
    pub fn solve(mut self, v: bool) -> Self {
        self.solve = v;
        self
    }

    /// Builder: Set strict_grammar
    pub fn strict_grammar(mut self, v: bool) -> Self {
        self.strict_grammar = v;
        self
    }

    /// Builder: Set count_symbol
    pub fn count_symbol(mut self, v: Option<String>) -> Self {
        self.count_symbol = v;
        self
    }

    /// Builder: Set direct_labels
    pub fn direct_labels(mut self, v: Vec<String>) -> Self {
        self.direct_labels = v;
        self
    }

    /// Get preset configuration
    pub fn from_preset(preset: Preset) -> Self {
        let base = Self {
            variant: SolverVariant::Standard,
            simplify: SimplifyConfig::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            solve: true,
            strict_grammar: false,
            count_symbol: None,
            direct_labels: Vec::new(),
        };
        match preset {
            Preset::Baseline => base,
            Preset::Balanced => Self {
                variant: SolverVariant::Pocr,
                simplify: SimplifyConfig {
                    scc: true,
                    fold: true,
                    inter_dyck: false,
                },
                ..base
            },
            Preset::Aggressive => Self {
                variant: SolverVariant::Focr,
                simplify: SimplifyConfig::all(),
                ..base
            },
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SolverConfig::default().validate().is_ok());
        for preset in Preset::ALL {
            assert!(SolverConfig::from_preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_timeout_range() {
        let config = SolverConfig::default().timeout_secs(MAX_TIMEOUT_SECS + 1);
        assert!(matches!(config.validate(), Err(ConfigError::Range { .. })));

        let config = SolverConfig::default().timeout_secs(0);
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_builder_chain() {
        let config = SolverConfig::default()
            .variant(SolverVariant::Focr)
            .scc(true)
            .inter_dyck(true)
            .count_symbol(Some("S".into()));
        assert_eq!(config.variant, SolverVariant::Focr);
        assert!(config.simplify.scc);
        assert!(!config.simplify.fold);
        assert!(config.simplify.inter_dyck);
        assert_eq!(config.count_symbol.as_deref(), Some("S"));
    }

    #[test]
    fn test_empty_count_symbol_rejected() {
        let config = SolverConfig::default().count_symbol(Some("  ".into()));
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_variant_names() {
        for variant in SolverVariant::ALL {
            assert_eq!(variant.as_str().parse::<SolverVariant>().unwrap(), variant);
        }
        assert!("bogus".parse::<SolverVariant>().is_err());
    }
}
