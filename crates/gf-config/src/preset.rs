//! Configuration presets for common usage scenarios.
//!
//! Provides pre-built configurations for:
//! - Default: the documented policy constants
//! - Quick: fewer bootstrap iterations for interactive exploration
//! - Rigorous: more iterations, prediction intervals, earlier extrapolation flags

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{
    BootstrapPolicy, CorpusPolicy, EngineConfig, ExtrapolationPolicy, IntervalKind,
    SimilarityPolicy, TierPolicy,
};

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// The documented defaults
    Default,
    /// Fast interactive answers with a coarser interval
    Quick,
    /// Slower, stricter, prediction intervals
    Rigorous,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] =
        &[PresetName::Default, PresetName::Quick, PresetName::Rigorous];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Default => "default",
            PresetName::Quick => "quick",
            PresetName::Rigorous => "rigorous",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "default" | "standard" => Some(PresetName::Default),
            "quick" | "fast" | "interactive" => Some(PresetName::Quick),
            "rigorous" | "strict" | "report" => Some(PresetName::Rigorous),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Default => "1000 bootstrap iterations, 95% confidence interval, 1.5/2.0 severity",
            PresetName::Quick => "200 bootstrap iterations for interactive what-if exploration",
            PresetName::Rigorous => {
                "5000 iterations, prediction intervals, earlier extrapolation warnings"
            }
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Information about a preset, for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: PresetName,
    pub description: String,
}

/// List all available presets.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|&name| PresetInfo {
            name,
            description: name.description().to_string(),
        })
        .collect()
}

/// Get the configuration for a preset.
pub fn get_preset(name: PresetName) -> EngineConfig {
    match name {
        PresetName::Default => EngineConfig {
            description: Some("Default preset".to_string()),
            ..EngineConfig::default()
        },
        PresetName::Quick => quick_preset(),
        PresetName::Rigorous => rigorous_preset(),
    }
}

fn quick_preset() -> EngineConfig {
    EngineConfig {
        description: Some("Quick preset: interactive exploration".to_string()),
        bootstrap: BootstrapPolicy {
            iterations: 200,
            ..BootstrapPolicy::default()
        },
        ..EngineConfig::default()
    }
}

fn rigorous_preset() -> EngineConfig {
    EngineConfig {
        description: Some("Rigorous preset: reporting and calibration".to_string()),
        corpus: CorpusPolicy {
            min_observations: 20,
        },
        bootstrap: BootstrapPolicy {
            iterations: 5000,
            confidence: 0.95,
            interval: IntervalKind::Prediction,
            threads: None,
        },
        extrapolation: ExtrapolationPolicy {
            moderate_threshold: 1.25,
            severe_threshold: 1.75,
        },
        tiers: TierPolicy::default(),
        similarity: SimilarityPolicy::default(),
        ..EngineConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_engine;

    #[test]
    fn test_preset_name_parsing() {
        assert_eq!(PresetName::parse("default"), Some(PresetName::Default));
        assert_eq!(PresetName::parse("fast"), Some(PresetName::Quick));
        assert_eq!(PresetName::parse("STRICT"), Some(PresetName::Rigorous));
        assert_eq!(PresetName::parse("unknown"), None);
        assert!("nope".parse::<PresetName>().is_err());
    }

    #[test]
    fn test_presets_validate() {
        for &name in PresetName::ALL {
            validate_engine(&get_preset(name)).unwrap();
        }
    }

    #[test]
    fn test_quick_preset() {
        let cfg = get_preset(PresetName::Quick);
        assert_eq!(cfg.bootstrap.iterations, 200);
        assert_eq!(cfg.extrapolation.severe_threshold, 2.0);
    }

    #[test]
    fn test_rigorous_preset() {
        let cfg = get_preset(PresetName::Rigorous);
        assert_eq!(cfg.bootstrap.iterations, 5000);
        assert_eq!(cfg.bootstrap.interval, IntervalKind::Prediction);
        assert!(cfg.extrapolation.moderate_threshold < 1.5);
    }

    #[test]
    fn test_list_presets() {
        let presets = list_presets();
        assert_eq!(presets.len(), 3);
        assert!(presets.iter().all(|p| !p.description.is_empty()));
    }

    #[test]
    fn test_unknown_preset_lists_available() {
        let msg = PresetError::UnknownPreset("x".into()).to_string();
        assert!(msg.contains("quick") && msg.contains("rigorous"));
    }
}
