//! Configuration I/O (YAML loading)
//!
//! Schema v1:
//!
//! ```yaml
//! version: 1
//! preset: balanced
//! overrides:
//!   variant: focr
//!   simplify: { inter_dyck: true }
//!   timeout_secs: 600
//! ```
//!
//! Overrides are layered field by field on top of the preset; anything not
//! named keeps the preset's value.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::solver_config::{SimplifyConfig, SolverConfig, SolverVariant};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported schema versions
pub const SUPPORTED_VERSIONS: [u32; 1] = [1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Base preset
    #[serde(default = "default_preset")]
    pub preset: Preset,

    /// Fine-grained overrides applied on top of the preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ConfigOverrides>,
}

/// Configuration overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<SolverVariant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplify: Option<SimplifyOverrides>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solve: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_grammar: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_symbol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_labels: Option<Vec<String>>,
}

/// Per-pass simplification overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimplifyOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scc: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fold: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inter_dyck: Option<bool>,
}

impl SimplifyOverrides {
    fn apply(self, base: SimplifyConfig) -> SimplifyConfig {
        SimplifyConfig {
            scc: self.scc.unwrap_or(base.scc),
            fold: self.fold.unwrap_or(base.fold),
            inter_dyck: self.inter_dyck.unwrap_or(base.inter_dyck),
        }
    }
}

impl ConfigOverrides {
    /// Every field of `config`, so applying onto any preset reproduces it
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            variant: Some(config.variant),
            simplify: Some(SimplifyOverrides {
                scc: Some(config.simplify.scc),
                fold: Some(config.simplify.fold),
                inter_dyck: Some(config.simplify.inter_dyck),
            }),
            timeout_secs: Some(config.timeout_secs),
            solve: Some(config.solve),
            strict_grammar: Some(config.strict_grammar),
            count_symbol: config.count_symbol.clone(),
            direct_labels: Some(config.direct_labels.clone()).filter(|l| !l.is_empty()),
        }
    }

    /// Layer the set fields over `base`
    pub fn apply(self, base: SolverConfig) -> SolverConfig {
        SolverConfig {
            variant: self.variant.unwrap_or(base.variant),
            simplify: self
                .simplify
                .map_or(base.simplify, |s| s.apply(base.simplify)),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
            solve: self.solve.unwrap_or(base.solve),
            strict_grammar: self.strict_grammar.unwrap_or(base.strict_grammar),
            count_symbol: self.count_symbol.or(base.count_symbol),
            direct_labels: self.direct_labels.unwrap_or(base.direct_labels),
        }
    }
}

fn default_preset() -> Preset {
    Preset::Baseline
}

impl ConfigExportV1 {
    /// Resolve to a validated solver configuration
    pub fn into_config(self) -> ConfigResult<SolverConfig> {
        match self.version {
            None => return Err(ConfigError::MissingVersion),
            Some(v) if !SUPPORTED_VERSIONS.contains(&v) => {
                return Err(ConfigError::UnsupportedVersion {
                    found: v,
                    supported: SUPPORTED_VERSIONS.to_vec(),
                })
            }
            Some(_) => {}
        }

        let base = SolverConfig::from_preset(self.preset);
        let config = match self.overrides {
            Some(overrides) => overrides.apply(base),
            None => base,
        };
        config.validate()?;
        Ok(config)
    }
}

impl SolverConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(yaml)?;
        export.into_config()
    }

    /// Load a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Serialize as a schema v1 document
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: Some(1),
            preset: Preset::Baseline,
            overrides: Some(ConfigOverrides::from_config(self)),
        };
        Ok(serde_yaml::to_string(&export)?)
    }
}
