//! gridfit core library
//!
//! Predicts a competitor's outcome from four skill factors and qualifies
//! every answer with its uncertainty:
//! - Percentile-based conversion between normalized and standardized scores
//! - Bootstrap intervals and confidence tiers around the model's prediction
//! - Extrapolation detection against the training corpus
//! - Coefficient-weighted similarity search, circuit fit and budget allocation
//! - Versioned snapshots published by atomic swap
//!
//! The binary entry point is in `main.rs`.

pub mod allocation;
pub mod calibrate;
pub mod cancel;
pub mod circuit_fit;
pub mod convert;
pub mod corpus;
pub mod engine;
pub mod exit_codes;
pub mod guard;
pub mod logging;
pub mod model;
pub mod schema;
pub mod similarity;
pub mod snapshot;
pub mod uncertainty;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use allocation::{validate_budget, AllocationOptimizer, AllocationPlan, MAX_BUDGET};
pub use cancel::CancellationToken;
pub use circuit_fit::{CircuitDemandProfile, CircuitFitScore, CircuitFitScorer};
pub use convert::{PercentileZScoreConverter, QueryVector};
pub use corpus::{CorpusDocument, CorpusMember, Orientation, TrainingCorpus};
pub use engine::{Engine, EngineStatus, ModelStatus, Versioned, WhatIfResult};
pub use guard::{ExtrapolationAssessment, ExtrapolationGuard, ExtrapolationLevel, ExtrapolationWarning};
pub use model::RegressionModel;
pub use similarity::{SimilarityEngine, SimilarityMatch};
pub use snapshot::{EngineSnapshot, SnapshotArtifact, SnapshotStore};
pub use uncertainty::{BootstrapOptions, ConfidenceTier, PredictionResult, UncertaintyEstimator};
