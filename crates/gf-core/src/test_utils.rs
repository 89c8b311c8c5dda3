//! Synthetic corpora for tests and benchmarks.
//!
//! Members are drawn from a seeded RNG so every call with the same arguments
//! returns the same corpus. Outcomes follow [`SYNTHETIC_COEFFICIENTS`] plus
//! bounded uniform noise.

use gf_common::FactorScores;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::circuit_fit::CircuitDemandProfile;
use crate::corpus::{CorpusDocument, CorpusMember, Orientation, TrainingCorpus};
use crate::engine::Engine;
use crate::model::RegressionModel;
use crate::snapshot::SnapshotArtifact;
use gf_config::EngineConfig;

pub const SYNTHETIC_INTERCEPT: f64 = 10.0;
pub const SYNTHETIC_COEFFICIENTS: [f64; 4] = [2.0, 1.0, 0.5, 0.25];
/// Half-width of the uniform outcome noise.
pub const SYNTHETIC_NOISE: f64 = 0.5;

/// Per-factor half-range of the standardized scores: speed spreads widest.
const SPREAD: [f64; 4] = [1.5, 1.2, 0.9, 0.6];

pub fn synthetic_members(n: usize, seed: u64) -> Vec<CorpusMember> {
    let mut rng = StdRng::seed_from_u64(seed);
    let coefficients = FactorScores::from_array(SYNTHETIC_COEFFICIENTS);
    (0..n)
        .map(|i| {
            let z = FactorScores::from_fn(|f| {
                let half = SPREAD[f.index()];
                rng.random_range(-half..half)
            });
            let noise = rng.random_range(-SYNTHETIC_NOISE..SYNTHETIC_NOISE);
            let outcome = SYNTHETIC_INTERCEPT + coefficients.dot(&z) + noise;
            CorpusMember::new(format!("driver-{i:03}"), z, outcome)
        })
        .collect()
}

pub fn synthetic_corpus(version: &str, n: usize, seed: u64) -> TrainingCorpus {
    TrainingCorpus::new(version.into(), None, synthetic_members(n, seed))
        .unwrap_or_else(|e| panic!("synthetic corpus is valid: {e}"))
}

/// The generating model, tagged with `version`.
pub fn synthetic_model(version: &str) -> RegressionModel {
    RegressionModel {
        version: version.into(),
        intercept: SYNTHETIC_INTERCEPT,
        coefficients: FactorScores::from_array(SYNTHETIC_COEFFICIENTS),
        out_of_sample_error: SYNTHETIC_NOISE / 3f64.sqrt(),
    }
}

pub fn synthetic_circuits() -> Vec<CircuitDemandProfile> {
    vec![
        CircuitDemandProfile::new("monaco", FactorScores::new(0.3, 0.8, 1.2, 0.2)),
        CircuitDemandProfile::new("monza", FactorScores::new(1.5, 0.4, 0.6, 0.3)),
        CircuitDemandProfile::new("silverstone", FactorScores::splat(0.7)),
    ]
}

pub fn synthetic_artifact(version: &str, n: usize, seed: u64) -> SnapshotArtifact {
    SnapshotArtifact {
        corpus: CorpusDocument {
            version: version.into(),
            built_at: None,
            orientation: Orientation::Reflected,
            members: synthetic_members(n, seed),
        },
        model: Some(synthetic_model(version)),
        circuits: synthetic_circuits(),
    }
}

/// An engine with default policy and a published synthetic snapshot.
pub fn synthetic_engine(n: usize, seed: u64) -> Engine {
    let engine = Engine::new(EngineConfig::default())
        .unwrap_or_else(|e| panic!("default config is valid: {e}"));
    engine
        .publish(synthetic_artifact("synthetic-1", n, seed))
        .unwrap_or_else(|e| panic!("synthetic artifact is valid: {e}"));
    engine
}
