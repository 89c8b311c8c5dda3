//! Engine policy configuration types.
//!
//! Every constant here is a policy knob rather than a law: the bootstrap
//! iteration count and the extrapolation thresholds in particular should be
//! validated against held-out outcomes before a deployment relies on them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::{ValidationError, ValidationResult};

/// Complete engine configuration (engine.json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub corpus: CorpusPolicy,

    #[serde(default)]
    pub bootstrap: BootstrapPolicy,

    #[serde(default)]
    pub extrapolation: ExtrapolationPolicy,

    #[serde(default)]
    pub tiers: TierPolicy,

    #[serde(default)]
    pub similarity: SimilarityPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            corpus: CorpusPolicy::default(),
            bootstrap: BootstrapPolicy::default(),
            extrapolation: ExtrapolationPolicy::default(),
            tiers: TierPolicy::default(),
            similarity: SimilarityPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Read and parse an engine.json file. Does not validate semantics.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse engine.json content. Does not validate semantics.
    pub fn from_json(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Requirements on the training corpus before statistics are served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CorpusPolicy {
    /// Minimum number of observations for any statistical operation.
    pub min_observations: usize,
}

impl Default for CorpusPolicy {
    fn default() -> Self {
        Self {
            min_observations: 10,
        }
    }
}

/// Which interval the bootstrap reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    /// Uncertainty of the fitted mean response (coefficient resampling only).
    #[default]
    Confidence,
    /// Uncertainty of an individual outcome: each bootstrap estimate also
    /// carries one residual drawn from its resample fit.
    Prediction,
}

impl std::fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntervalKind::Confidence => write!(f, "confidence"),
            IntervalKind::Prediction => write!(f, "prediction"),
        }
    }
}

impl std::str::FromStr for IntervalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "confidence" | "ci" => Ok(IntervalKind::Confidence),
            "prediction" | "pi" => Ok(IntervalKind::Prediction),
            _ => Err(format!("unknown interval kind: {}", s)),
        }
    }
}

/// Bootstrap resampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BootstrapPolicy {
    /// Number of resample-and-refit iterations.
    pub iterations: usize,
    /// Nominal interval coverage in (0, 1).
    pub confidence: f64,
    pub interval: IntervalKind,
    /// Worker threads for the bootstrap pool. None uses the global pool.
    pub threads: Option<usize>,
}

impl Default for BootstrapPolicy {
    fn default() -> Self {
        Self {
            iterations: 1000,
            confidence: 0.95,
            interval: IntervalKind::Confidence,
            threads: None,
        }
    }
}

/// Severity thresholds (nearest-neighbor distance over typical in-sample distance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExtrapolationPolicy {
    /// Above this the query is flagged as moderately extrapolated.
    pub moderate_threshold: f64,
    /// Above this the query is severely extrapolated and the tier is downgraded.
    pub severe_threshold: f64,
}

impl Default for ExtrapolationPolicy {
    fn default() -> Self {
        Self {
            moderate_threshold: 1.5,
            severe_threshold: 2.0,
        }
    }
}

/// Confidence tier cut-offs, as multiples of the model's out-of-sample error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TierPolicy {
    pub high_width_multiple: f64,
    pub medium_width_multiple: f64,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            high_width_multiple: 2.0,
            medium_width_multiple: 4.0,
        }
    }
}

/// Similarity search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SimilarityPolicy {
    /// Decay constant k in `100 * exp(-distance / k)`.
    pub decay: f64,
    /// Matches returned when the caller does not specify top_n.
    pub default_top_n: usize,
}

impl Default for SimilarityPolicy {
    fn default() -> Self {
        Self {
            decay: 2.0,
            default_top_n: 5,
        }
    }
}
