//! JSON Schema generation for CLI output and input types.
//!
//! ```bash
//! gf-core schema --list
//! gf-core schema PredictionResult
//! gf-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::allocation::AllocationPlan;
use crate::calibrate::{CoverageReport, FitReport};
use crate::circuit_fit::CircuitFitScore;
use crate::engine::{EngineStatus, Versioned, WhatIfResult};
use crate::similarity::SimilarityMatch;
use crate::snapshot::SnapshotArtifact;
use crate::uncertainty::PredictionResult;
use gf_config::EngineConfig;

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Inputs
        ("SnapshotArtifact", "Corpus, model and circuit profiles on disk"),
        ("EngineConfig", "Engine policy configuration (engine.json)"),
        // Outputs
        ("PredictionResult", "Prediction with interval, tier and extrapolation context"),
        ("SimilarityMatches", "Ranked similar corpus members"),
        ("CircuitFitScore", "Fit of a profile to one venue"),
        ("AllocationPlan", "Improvement points per factor"),
        ("WhatIfResult", "Baseline vs adjusted prediction for an allocation"),
        ("EngineStatus", "Loaded snapshot summary"),
        ("FitReport", "Least-squares fit with cross-validation"),
        ("CoverageReport", "Held-out interval coverage"),
    ]
}

/// Generate JSON Schema for a type by name.
///
/// Outputs are wrapped in their versioned envelope. Returns None for an
/// unknown name.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "SnapshotArtifact" => schema_for!(SnapshotArtifact),
        "EngineConfig" => schema_for!(EngineConfig),
        "PredictionResult" => schema_for!(Versioned<PredictionResult>),
        "SimilarityMatches" => schema_for!(Versioned<Vec<SimilarityMatch>>),
        "CircuitFitScore" => schema_for!(Versioned<Vec<CircuitFitScore>>),
        "AllocationPlan" => schema_for!(Versioned<AllocationPlan>),
        "WhatIfResult" => schema_for!(Versioned<WhatIfResult>),
        "EngineStatus" => schema_for!(Versioned<EngineStatus>),
        "FitReport" => schema_for!(FitReport),
        "CoverageReport" => schema_for!(CoverageReport),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}

/// Generate all schemas as a map from type name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    available_schemas()
        .into_iter()
        .filter_map(|(name, _)| generate_schema(name).map(|s| (name.to_string(), s)))
        .collect()
}
