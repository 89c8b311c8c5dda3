//! Configuration snapshots for reproducibility.
//!
//! A snapshot captures the exact configuration a computation ran under, so
//! that a reported interval or severity can be traced back to its policy
//! constants later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::{EngineConfig, IntervalKind};
use crate::resolve::ConfigPaths;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the config was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration.
    pub source: String,

    /// Preset name, when a preset was selected.
    #[serde(default)]
    pub preset: Option<String>,

    /// SHA-256 of the file content, or of the canonical JSON for presets and defaults.
    pub config_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub min_observations: usize,
    pub iterations: usize,
    pub confidence: f64,
    pub interval: IntervalKind,
    pub moderate_threshold: f64,
    pub severe_threshold: f64,
    pub similarity_decay: f64,
}

impl ConfigSummary {
    pub fn of(config: &EngineConfig) -> Self {
        ConfigSummary {
            min_observations: config.corpus.min_observations,
            iterations: config.bootstrap.iterations,
            confidence: config.bootstrap.confidence,
            interval: config.bootstrap.interval,
            moderate_threshold: config.extrapolation.moderate_threshold,
            severe_threshold: config.extrapolation.severe_threshold,
            similarity_decay: config.similarity.decay,
        }
    }
}

impl ConfigSnapshot {
    /// Create a snapshot from a loaded configuration.
    ///
    /// `raw_json` is the file content when the config came from a file.
    pub fn new(
        config: &EngineConfig,
        paths: &ConfigPaths,
        raw_json: Option<&str>,
        preset: Option<&str>,
    ) -> Self {
        let config_hash = match raw_json {
            Some(json) => hash_content(json),
            None => hash_content(&config.to_json().unwrap_or_default()),
        };

        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            path: paths.engine.as_ref().map(|p| p.display().to_string()),
            source: paths.source.to_string(),
            preset: preset.map(str::to_string),
            config_hash,
            summary: ConfigSummary::of(config),
        }
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot matches another (same config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

/// Compute SHA-256 hash of content.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
