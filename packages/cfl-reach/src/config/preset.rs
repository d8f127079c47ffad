//! Solver presets

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Reference behaviour: standard worklist, no simplification
    ///
    /// Use this when checking accelerator output against the plain fixpoint.
    Baseline,

    /// Default: hybrid-tree accelerator with SCC merging and chain folding
    Balanced,

    /// Large graphs: edge-critical graph accelerator, every simplification pass
    Aggressive,
}

impl Preset {
    /// All presets, in increasing order of work spent before solving
    pub const ALL: [Preset; 3] = [Preset::Baseline, Preset::Balanced, Preset::Aggressive];
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baseline" => Ok(Preset::Baseline),
            "balanced" => Ok(Preset::Balanced),
            "aggressive" => Ok(Preset::Aggressive),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Balanced".parse::<Preset>().unwrap(), Preset::Balanced);
        assert!(matches!(
            "thorough".parse::<Preset>(),
            Err(ConfigError::UnknownPreset(_))
        ));
    }
}
