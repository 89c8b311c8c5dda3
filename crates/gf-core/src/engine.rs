//! The request-level engine facade.
//!
//! Every operation loads the current snapshot once at entry, validates its
//! inputs before any expensive work, and tags its output with the snapshot
//! version it was computed against.

use chrono::{DateTime, Utc};
use gf_common::{Error, Factor, FactorScores, Result, SnapshotVersion, SCHEMA_VERSION};
use gf_config::{validate_engine, EngineConfig};
use gf_math::std_dev;
use rand::Rng;
use rayon::ThreadPool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::allocation::{validate_budget, AllocationOptimizer, AllocationPlan, MAX_BUDGET};
use crate::cancel::CancellationToken;
use crate::circuit_fit::CircuitFitScore;
use crate::convert::QueryVector;
use crate::logging::event_names;
use crate::model::RegressionModel;
use crate::similarity::{SimilarityEngine, SimilarityMatch};
use crate::snapshot::{CorpusStatistics, EngineSnapshot, SnapshotArtifact, SnapshotStore};
use crate::uncertainty::{BootstrapOptions, PredictionResult, UncertaintyEstimator};

/// An output tagged with the snapshot it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Versioned<T> {
    pub snapshot_version: SnapshotVersion,
    pub schema_version: String,
    pub data: T,
}

impl<T> Versioned<T> {
    pub fn new(snapshot_version: &SnapshotVersion, data: T) -> Self {
        Versioned {
            snapshot_version: snapshot_version.clone(),
            schema_version: SCHEMA_VERSION.to_string(),
            data,
        }
    }
}

/// Counterfactual comparison of a profile before and after an allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WhatIfResult {
    pub plan: AllocationPlan,
    pub baseline_scores: FactorScores,
    /// Baseline plus the plan, capped at 100.
    pub adjusted_scores: FactorScores,
    pub baseline: PredictionResult,
    pub adjusted: PredictionResult,
    /// `adjusted.point_estimate - baseline.point_estimate`.
    pub delta: f64,
    /// Same difference under the loaded model alone, without resampling.
    pub model_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelStatus {
    pub loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<SnapshotVersion>,
    pub matches_corpus: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_sample_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngineStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
    pub loaded_at: DateTime<Utc>,
    pub corpus_size: usize,
    pub min_observations: usize,
    pub statistics_available: bool,
    pub model: ModelStatus,
    /// Sample standard deviation of each factor's standardized scores.
    pub factor_spread: FactorScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typical_distance: Option<f64>,
    pub venues: Vec<String>,
}

/// Snapshot store plus policy, the entry point for all requests.
pub struct Engine {
    config: EngineConfig,
    store: SnapshotStore,
    pool: Option<ThreadPool>,
}

impl Engine {
    /// Validate `config` and build the optional dedicated bootstrap pool.
    pub fn new(config: EngineConfig) -> Result<Self> {
        validate_engine(&config).map_err(|e| Error::Config(e.to_string()))?;
        let pool = match config.bootstrap.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("gf-bootstrap-{i}"))
                    .build()
                    .map_err(|e| Error::Config(format!("bootstrap pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Engine {
            config,
            store: SnapshotStore::new(),
            pool,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Bootstrap options from the configured policy, without a seed.
    pub fn default_options(&self) -> BootstrapOptions {
        BootstrapOptions::from_policy(&self.config.bootstrap)
    }

    /// Build a snapshot from an artifact and publish it.
    pub fn publish(&self, artifact: SnapshotArtifact) -> Result<SnapshotVersion> {
        let snapshot = match EngineSnapshot::build(artifact, &self.config) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(event = event_names::SNAPSHOT_REJECTED, error = %e, "snapshot rejected");
                return Err(e);
            }
        };
        Ok(self.publish_snapshot(snapshot))
    }

    /// Publish an already-built snapshot.
    pub fn publish_snapshot(&self, snapshot: EngineSnapshot) -> SnapshotVersion {
        let version = snapshot.version().clone();
        let corpus_size = snapshot.corpus().len();
        let previous = self.store.publish(snapshot);
        tracing::info!(
            event = event_names::SNAPSHOT_PUBLISHED,
            version = %version,
            previous = ?previous.map(|p| p.version().to_string()),
            corpus_size,
            "snapshot published"
        );
        version
    }

    fn estimator<'a>(
        &'a self,
        model: &'a RegressionModel,
        stats: &'a CorpusStatistics,
    ) -> UncertaintyEstimator<'a> {
        let estimator = UncertaintyEstimator::new(
            &stats.rows,
            &stats.outcomes,
            model,
            &stats.guard,
            &self.config.tiers,
        );
        match &self.pool {
            Some(pool) => estimator.with_pool(pool),
            None => estimator,
        }
    }

    /// Predict the outcome for a normalized profile, with interval and tier.
    pub fn predict(
        &self,
        query: &QueryVector,
        options: &BootstrapOptions,
        cancel: &CancellationToken,
    ) -> Result<Versioned<PredictionResult>> {
        options.validate()?;
        let snapshot = self.store.load()?;
        let stats = snapshot.statistics()?;
        let z = stats.converter.standardize(query);
        self.predict_at(&snapshot, &z, options, cancel)
    }

    /// Predict at a point already in standardized space.
    pub fn predict_standardized(
        &self,
        standardized: &FactorScores,
        options: &BootstrapOptions,
        cancel: &CancellationToken,
    ) -> Result<Versioned<PredictionResult>> {
        options.validate()?;
        let snapshot = self.store.load()?;
        self.predict_at(&snapshot, standardized, options, cancel)
    }

    fn predict_at(
        &self,
        snapshot: &EngineSnapshot,
        standardized: &FactorScores,
        options: &BootstrapOptions,
        cancel: &CancellationToken,
    ) -> Result<Versioned<PredictionResult>> {
        let stats = snapshot.statistics()?;
        let model = snapshot.model()?;
        let result = self
            .estimator(model, stats)
            .predict_with_uncertainty(standardized, options, cancel)
            .inspect_err(|e| {
                if matches!(e, Error::Cancelled) {
                    tracing::info!(event = event_names::BOOTSTRAP_CANCELLED, "prediction cancelled");
                }
            })?;

        if result.is_extrapolating {
            tracing::warn!(
                event = event_names::PREDICT_EXTRAPOLATED,
                severity = result.severity,
                level = %result.extrapolation_level,
                "query outside the training distribution"
            );
        }
        tracing::debug!(
            event = event_names::PREDICT_FINISHED,
            version = %snapshot.version(),
            point_estimate = result.point_estimate,
            tier = %result.tier,
            "prediction finished"
        );
        Ok(Versioned::new(snapshot.version(), result))
    }

    /// Most similar corpus members. `None` uses the configured default count.
    pub fn find_similar(
        &self,
        query: &QueryVector,
        top_n: Option<usize>,
    ) -> Result<Versioned<Vec<SimilarityMatch>>> {
        let top_n = top_n.unwrap_or(self.config.similarity.default_top_n);
        if top_n == 0 {
            return Err(Error::invalid_input("top_n", "must be at least 1"));
        }
        let snapshot = self.store.load()?;
        let stats = snapshot.statistics()?;
        let model = snapshot.model()?;
        let z = stats.converter.standardize(query);
        let matches = SimilarityEngine::new(snapshot.corpus(), model, self.config.similarity.decay)
            .find_similar(&z, top_n)?;
        tracing::debug!(
            event = event_names::SIMILARITY_FINISHED,
            returned = matches.len(),
            "similarity search finished"
        );
        Ok(Versioned::new(snapshot.version(), matches))
    }

    /// Fit score for one registered venue.
    pub fn circuit_fit(&self, query: &QueryVector, venue: &str) -> Result<Versioned<CircuitFitScore>> {
        let snapshot = self.store.load()?;
        let stats = snapshot.statistics()?;
        let scorer = snapshot.circuit(venue)?;
        let score = scorer.score(&stats.converter.standardize(query));
        tracing::debug!(
            event = event_names::CIRCUIT_FIT_FINISHED,
            venue,
            fit_score = score.fit_score,
            "circuit fit scored"
        );
        Ok(Versioned::new(snapshot.version(), score))
    }

    /// Fit scores for every registered venue, sorted by venue id.
    pub fn circuit_fit_all(&self, query: &QueryVector) -> Result<Versioned<Vec<CircuitFitScore>>> {
        let snapshot = self.store.load()?;
        let stats = snapshot.statistics()?;
        let z = stats.converter.standardize(query);
        let scores: Vec<CircuitFitScore> = stats.circuits.values().map(|s| s.score(&z)).collect();
        Ok(Versioned::new(snapshot.version(), scores))
    }

    /// Distribute `budget` improvement points across factors.
    pub fn allocate(&self, current: &QueryVector, budget: u32) -> Result<Versioned<AllocationPlan>> {
        validate_budget(i64::from(budget))?;
        let snapshot = self.store.load()?;
        let model = snapshot.model()?;
        let plan = AllocationOptimizer::new(&model.coefficients).allocate(current, budget);
        tracing::debug!(
            event = event_names::ALLOCATE_FINISHED,
            budget,
            plan = ?plan.points,
            "allocation finished"
        );
        Ok(Versioned::new(snapshot.version(), plan))
    }

    /// Allocate, apply the plan, and compare predictions before and after.
    ///
    /// Both predictions share one seed so the delta reflects the profile
    /// change rather than resampling noise.
    pub fn what_if(
        &self,
        current: &QueryVector,
        budget: u32,
        options: &BootstrapOptions,
        cancel: &CancellationToken,
    ) -> Result<Versioned<WhatIfResult>> {
        options.validate()?;
        validate_budget(i64::from(budget))?;
        let snapshot = self.store.load()?;
        let stats = snapshot.statistics()?;
        let model = snapshot.model()?;

        let plan = AllocationOptimizer::new(&model.coefficients).allocate(current, budget);
        let adjusted_query = current.raised_by(&plan.as_increments());

        let seed = options.seed.unwrap_or_else(|| rand::rng().random());
        let options = options.clone().with_seed(seed);
        let z_base = stats.converter.standardize(current);
        let z_adjusted = stats.converter.standardize(&adjusted_query);

        let baseline = self.predict_at(&snapshot, &z_base, &options, cancel)?.data;
        let adjusted = self.predict_at(&snapshot, &z_adjusted, &options, cancel)?.data;

        let result = WhatIfResult {
            delta: adjusted.point_estimate - baseline.point_estimate,
            model_delta: adjusted.model_estimate - baseline.model_estimate,
            baseline_scores: *current.scores(),
            adjusted_scores: *adjusted_query.scores(),
            plan,
            baseline,
            adjusted,
        };
        tracing::debug!(
            event = event_names::WHAT_IF_FINISHED,
            budget,
            delta = result.delta,
            "what-if finished"
        );
        Ok(Versioned::new(snapshot.version(), result))
    }

    /// Describe the loaded snapshot.
    pub fn status(&self) -> Result<Versioned<EngineStatus>> {
        let snapshot = self.store.load()?;
        let corpus = snapshot.corpus();
        let raw_model = snapshot.raw_model();
        let stats = snapshot.statistics().ok();

        let status = EngineStatus {
            built_at: corpus.built_at(),
            loaded_at: snapshot.loaded_at(),
            corpus_size: corpus.len(),
            min_observations: snapshot.min_observations(),
            statistics_available: stats.is_some(),
            model: ModelStatus {
                loaded: raw_model.is_some(),
                version: raw_model.map(|m| m.version.clone()),
                matches_corpus: snapshot.model().is_ok(),
                out_of_sample_error: raw_model.map(|m| m.out_of_sample_error),
            },
            factor_spread: FactorScores::from_fn(|f: Factor| {
                if corpus.len() < 2 {
                    0.0
                } else {
                    std_dev(&corpus.factor_values(f))
                }
            }),
            typical_distance: stats.map(|s| s.guard.typical_distance()),
            venues: snapshot.venues().to_vec(),
        };
        Ok(Versioned::new(snapshot.version(), status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::synthetic_artifact;
    use gf_common::ModelUnavailableReason;

    fn engine() -> Engine {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.publish(synthetic_artifact("v1", 34, 11)).unwrap();
        engine
    }

    fn options() -> BootstrapOptions {
        BootstrapOptions::default().with_iterations(150).with_seed(9)
    }

    #[test]
    fn outputs_carry_snapshot_version() {
        let e = engine();
        let q = QueryVector::from_array([60.0, 55.0, 40.0, 70.0]).unwrap();
        let p = e.predict(&q, &options(), &CancellationToken::new()).unwrap();
        assert_eq!(p.snapshot_version.as_str(), "v1");
        assert_eq!(p.schema_version, SCHEMA_VERSION);
        assert!(p.data.lower <= p.data.point_estimate && p.data.point_estimate <= p.data.upper);

        let s = e.find_similar(&q, None).unwrap();
        assert_eq!(s.data.len(), e.config().similarity.default_top_n);
        assert_eq!(e.status().unwrap().snapshot_version.as_str(), "v1");
    }

    #[test]
    fn empty_engine_reports_model_unavailable() {
        let e = Engine::new(EngineConfig::default()).unwrap();
        let q = QueryVector::from_array([50.0; 4]).unwrap();
        assert!(matches!(
            e.predict(&q, &options(), &CancellationToken::new()),
            Err(Error::ModelUnavailable(ModelUnavailableReason::NotLoaded))
        ));
        assert!(e.status().is_err());
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.similarity.decay = 0.0;
        assert!(matches!(Engine::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn input_errors_precede_snapshot_errors() {
        let e = Engine::new(EngineConfig::default()).unwrap();
        let q = QueryVector::from_array([50.0; 4]).unwrap();
        assert!(matches!(e.find_similar(&q, Some(0)), Err(Error::InvalidInput { .. })));
        assert!(matches!(
            e.predict(&q, &options().with_iterations(0), &CancellationToken::new()),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn oversized_budget_rejected_before_allocating() {
        let e = engine();
        let q = QueryVector::from_array([50.0; 4]).unwrap();
        assert_eq!(e.allocate(&q, MAX_BUDGET).unwrap().data.total(), u64::from(MAX_BUDGET));
        assert!(matches!(
            e.allocate(&q, 4_000_000_000),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            e.what_if(&q, MAX_BUDGET + 1, &options(), &CancellationToken::new()),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn what_if_applies_plan_and_reports_delta() {
        let e = engine();
        let q = QueryVector::from_array([90.0, 50.0, 50.0, 50.0]).unwrap();
        let w = e.what_if(&q, 10, &options(), &CancellationToken::new()).unwrap().data;
        assert_eq!(w.plan.total(), 10);
        let added: f64 = (w.adjusted_scores - w.baseline_scores).total();
        assert_eq!(added, 10.0);
        assert_eq!(w.baseline.seed, w.adjusted.seed);
        assert!((w.delta - (w.adjusted.point_estimate - w.baseline.point_estimate)).abs() < 1e-12);
        // Positive coefficients: more skill never lowers the model's own estimate.
        assert!(w.model_delta >= 0.0);
    }

    #[test]
    fn circuit_fit_all_sorted_by_venue() {
        let e = engine();
        let q = QueryVector::from_array([50.0; 4]).unwrap();
        let all = e.circuit_fit_all(&q).unwrap().data;
        let venues: Vec<&str> = all.iter().map(|s| s.venue.as_str()).collect();
        let mut sorted = venues.clone();
        sorted.sort();
        assert_eq!(venues, sorted);
        assert!(all.iter().all(|s| (0.0..=100.0).contains(&s.fit_score)));
        assert!(e.circuit_fit(&q, "nowhere").is_err());
    }

    #[test]
    fn status_reports_statistics() {
        let status = engine().status().unwrap().data;
        assert_eq!(status.corpus_size, 34);
        assert!(status.statistics_available);
        assert!(status.model.loaded && status.model.matches_corpus);
        assert!(status.typical_distance.unwrap() > 0.0);
        assert!(status.factor_spread.speed > status.factor_spread.tire_management);
    }

    #[test]
    fn dedicated_pool_gives_same_answer() {
        let mut config = EngineConfig::default();
        config.bootstrap.threads = Some(2);
        let pooled = Engine::new(config).unwrap();
        pooled.publish(synthetic_artifact("v1", 34, 11)).unwrap();

        let q = QueryVector::from_array([30.0, 45.0, 80.0, 20.0]).unwrap();
        let a = pooled.predict(&q, &options(), &CancellationToken::new()).unwrap();
        let b = engine().predict(&q, &options(), &CancellationToken::new()).unwrap();
        assert_eq!(a.data, b.data);
    }
}
