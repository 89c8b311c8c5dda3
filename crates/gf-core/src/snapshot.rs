//! Versioned engine snapshots and their atomic publication.
//!
//! An [`EngineSnapshot`] bundles the corpus, the optional regression model,
//! the registered venues and every statistic derived from them. It is
//! immutable once built. [`SnapshotStore`] swaps whole snapshots atomically:
//! a request loads an `Arc` at entry and keeps computing against it even if a
//! newer snapshot is published mid-flight.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use gf_common::{Error, Factor, ModelUnavailableReason, Result, SnapshotVersion};
use gf_config::EngineConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::circuit_fit::{CircuitDemandProfile, CircuitFitScorer};
use crate::convert::PercentileZScoreConverter;
use crate::corpus::{CorpusDocument, TrainingCorpus};
use crate::guard::ExtrapolationGuard;
use crate::model::RegressionModel;

/// On-disk form of a snapshot: corpus, optional model, venue profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotArtifact {
    pub corpus: CorpusDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<RegressionModel>,
    #[serde(default)]
    pub circuits: Vec<CircuitDemandProfile>,
}

impl SnapshotArtifact {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read an artifact from disk. A missing or unreadable file is a
    /// snapshot error, not an I/O fault.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidSnapshot(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Statistics derived from a corpus that meets the minimum size.
#[derive(Debug, Clone)]
pub struct CorpusStatistics {
    pub converter: PercentileZScoreConverter,
    pub guard: ExtrapolationGuard,
    pub rows: Vec<[f64; Factor::COUNT]>,
    pub outcomes: Vec<f64>,
    /// Scorers keyed by venue id.
    pub circuits: BTreeMap<String, CircuitFitScorer>,
}

/// An immutable, fully validated engine state.
#[derive(Debug)]
pub struct EngineSnapshot {
    corpus: TrainingCorpus,
    model: Option<RegressionModel>,
    venues: Vec<String>,
    statistics: Option<CorpusStatistics>,
    min_observations: usize,
    loaded_at: DateTime<Utc>,
}

impl EngineSnapshot {
    /// Validate an artifact and precompute derived statistics.
    ///
    /// An undersized corpus still builds, so status can report on it, but
    /// every statistical request against it fails with
    /// `InsufficientTrainingData`.
    pub fn build(artifact: SnapshotArtifact, config: &EngineConfig) -> Result<Self> {
        let corpus = TrainingCorpus::from_document(artifact.corpus)?;
        if let Some(model) = &artifact.model {
            model.validate()?;
        }

        let mut venues = Vec::with_capacity(artifact.circuits.len());
        for profile in &artifact.circuits {
            profile.validate()?;
            if venues.contains(&profile.venue) {
                return Err(Error::InvalidSnapshot(format!(
                    "duplicate circuit venue {}",
                    profile.venue
                )));
            }
            venues.push(profile.venue.clone());
        }
        venues.sort();

        let min_observations = config.corpus.min_observations;
        let statistics = if corpus.len() >= min_observations {
            let mut circuits = BTreeMap::new();
            for profile in artifact.circuits {
                circuits.insert(
                    profile.venue.clone(),
                    CircuitFitScorer::from_corpus(&corpus, profile)?,
                );
            }
            Some(CorpusStatistics {
                converter: PercentileZScoreConverter::from_corpus(&corpus, min_observations)?,
                guard: ExtrapolationGuard::from_corpus(&corpus, &config.extrapolation)?,
                rows: corpus.score_rows(),
                outcomes: corpus.outcomes(),
                circuits,
            })
        } else {
            tracing::warn!(
                observed = corpus.len(),
                required = min_observations,
                version = %corpus.version(),
                "corpus below minimum size; statistical requests will be refused"
            );
            None
        };

        Ok(EngineSnapshot {
            corpus,
            model: artifact.model,
            venues,
            statistics,
            min_observations,
            loaded_at: Utc::now(),
        })
    }

    pub fn version(&self) -> &SnapshotVersion {
        self.corpus.version()
    }

    pub fn corpus(&self) -> &TrainingCorpus {
        &self.corpus
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn min_observations(&self) -> usize {
        self.min_observations
    }

    /// The model, as loaded, without the version check.
    pub fn raw_model(&self) -> Option<&RegressionModel> {
        self.model.as_ref()
    }

    /// The model, if present and fitted against this corpus version.
    pub fn model(&self) -> Result<&RegressionModel> {
        let model = self
            .model
            .as_ref()
            .ok_or(Error::ModelUnavailable(ModelUnavailableReason::NotLoaded))?;
        model.ensure_matches(self.corpus.version())?;
        Ok(model)
    }

    /// Derived statistics, or `InsufficientTrainingData` for an undersized corpus.
    pub fn statistics(&self) -> Result<&CorpusStatistics> {
        self.statistics
            .as_ref()
            .ok_or(Error::InsufficientTrainingData {
                observed: self.corpus.len(),
                required: self.min_observations,
            })
    }

    /// Registered venue ids, sorted.
    pub fn venues(&self) -> &[String] {
        &self.venues
    }

    pub fn circuit(&self, venue: &str) -> Result<&CircuitFitScorer> {
        let stats = self.statistics()?;
        stats.circuits.get(venue).ok_or_else(|| {
            Error::invalid_input(
                "venue",
                format!(
                    "unknown venue {:?}; registered: {}",
                    venue,
                    self.venues.join(", ")
                ),
            )
        })
    }
}

/// Holder of the current snapshot, swapped atomically on publish.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<EngineSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: EngineSnapshot) -> Self {
        let store = Self::new();
        store.publish(snapshot);
        store
    }

    /// Replace the current snapshot. Returns the one it replaced.
    pub fn publish(&self, snapshot: EngineSnapshot) -> Option<Arc<EngineSnapshot>> {
        self.current.swap(Some(Arc::new(snapshot)))
    }

    /// Capture the current snapshot for the duration of a request.
    pub fn load(&self) -> Result<Arc<EngineSnapshot>> {
        self.current
            .load_full()
            .ok_or(Error::ModelUnavailable(ModelUnavailableReason::NotLoaded))
    }

    pub fn current_version(&self) -> Option<SnapshotVersion> {
        self.current.load_full().map(|s| s.version().clone())
    }
}
