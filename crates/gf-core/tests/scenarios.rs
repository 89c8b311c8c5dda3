//! End-to-end scenarios against published snapshots.

#![cfg(feature = "test-utils")]

use gf_common::{Factor, FactorScores};
use gf_config::{EngineConfig, IntervalKind};
use gf_core::calibrate::interval_coverage;
use gf_core::test_utils::{synthetic_artifact, synthetic_engine, synthetic_members, synthetic_model};
use gf_core::{
    BootstrapOptions, CancellationToken, CorpusDocument, CorpusMember, Engine, ExtrapolationLevel,
    Orientation, QueryVector, SimilarityEngine, SnapshotArtifact,
};
use gf_math::{median, quantile_sorted, sorted_copy, std_dev};

fn options() -> BootstrapOptions {
    BootstrapOptions::default().with_iterations(200).with_seed(77)
}

fn engine_with(artifact: SnapshotArtifact) -> Engine {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine.publish(artifact).unwrap();
    engine
}

#[test]
fn percentile_conversion_not_normal_assumption() {
    let engine = synthetic_engine(34, 2024);
    let snapshot = engine.store().load().unwrap();
    let corpus = snapshot.corpus();

    let speed = corpus.factor_values(Factor::Speed);
    let tm = corpus.factor_values(Factor::TireManagement);
    assert_eq!(corpus.len(), 34);
    assert!((std_dev(&speed) - 0.86).abs() < 0.2, "speed sd {}", std_dev(&speed));
    assert!((std_dev(&tm) - 0.35).abs() < 0.1, "tm sd {}", std_dev(&tm));

    let conv = &snapshot.statistics().unwrap().converter;
    let z = conv.to_standardized(65.0, Factor::Speed).unwrap();
    let expected = quantile_sorted(&sorted_copy(&speed), 0.65);
    assert!((z - expected).abs() < 1e-12);
    assert!((z - 1.0).abs() > 0.1, "65 must not map to (65-50)/15");
}

#[test]
fn member_profile_is_in_distribution() {
    let engine = synthetic_engine(34, 2024);
    let snapshot = engine.store().load().unwrap();
    let guard = &snapshot.statistics().unwrap().guard;

    let severities: Vec<f64> = snapshot
        .corpus()
        .members()
        .iter()
        .map(|m| guard.assess(&m.scores).severity)
        .collect();
    // Each member sits at its own leave-one-out distance, so the median member is exactly typical.
    assert!((median(&severities) - 1.0).abs() < 1e-9);

    let sorted = sorted_copy(&severities);
    let typical_member = snapshot
        .corpus()
        .members()
        .iter()
        .zip(&severities)
        .find(|(_, s)| **s == sorted[16])
        .map(|(m, _)| m)
        .unwrap();
    let r = engine
        .predict_standardized(&typical_member.scores, &options(), &CancellationToken::new())
        .unwrap()
        .data;
    assert!((r.severity - sorted[16]).abs() < 1e-12);
    assert!(r.severity <= 1.0 + 1e-9);
    assert!(!r.is_extrapolating);
    assert!(r.warning_message.is_none());
}

/// Speed and consistency trade off, so no member is strong on both.
fn trade_off_artifact() -> SnapshotArtifact {
    let members = (0..34)
        .map(|i| {
            let k = i as f64;
            let t = k / 33.0 * 2.0 - 1.0;
            let z = FactorScores::new(
                t,
                -t + 0.05 * (7.0 * k).sin(),
                0.4 * (5.0 * k).cos(),
                0.25 * (11.0 * k).sin(),
            );
            let outcome = 10.0 + 2.0 * z.speed + z.consistency + 0.5 * z.racecraft
                + 0.25 * z.tire_management
                + 0.1 * (3.0 * k).sin();
            CorpusMember::new(format!("d{i:02}"), z, outcome)
        })
        .collect();
    SnapshotArtifact {
        corpus: CorpusDocument {
            version: "tradeoff-1".into(),
            built_at: None,
            orientation: Orientation::Reflected,
            members,
        },
        model: Some(synthetic_model("tradeoff-1")),
        circuits: Vec::new(),
    }
}

#[test]
fn extreme_profile_is_flagged() {
    let engine = engine_with(trade_off_artifact());
    let query = QueryVector::from_array([100.0; 4]).unwrap();
    let r = engine
        .predict(&query, &options(), &CancellationToken::new())
        .unwrap()
        .data;
    assert!(r.severity > 2.0, "severity {}", r.severity);
    assert_eq!(r.extrapolation_level, ExtrapolationLevel::Severe);
    assert!(r.is_extrapolating);
    let warning = r.warning_message.unwrap();
    assert!(warning.starts_with("Severe extrapolation"));
}

#[test]
fn allocation_discounts_near_ceiling_factor() {
    let mut artifact = synthetic_artifact("equal-1", 34, 5);
    if let Some(model) = artifact.model.as_mut() {
        model.coefficients = FactorScores::splat(1.0);
    }
    let engine = engine_with(artifact);
    let current = QueryVector::from_array([90.0, 50.0, 50.0, 50.0]).unwrap();
    let plan = engine.allocate(&current, 5).unwrap();

    assert_eq!(plan.snapshot_version.as_str(), "equal-1");
    assert_eq!(plan.data.total(), 5);
    assert!(plan.data.get(Factor::Speed) < plan.data.get(Factor::Consistency));
}

#[test]
fn weighted_similarity_separates_swapped_profiles() {
    let mut members = synthetic_members(30, 8);
    members.push(CorpusMember::new("racer", FactorScores::new(0.2, 0.1, 0.8, 0.3), 11.0));
    members.push(CorpusMember::new("manager", FactorScores::new(0.2, 0.1, 0.3, 0.8), 11.0));
    let mut artifact = synthetic_artifact("swap-1", 0, 0);
    artifact.corpus.members = members;
    let engine = engine_with(artifact);

    let snapshot = engine.store().load().unwrap();
    let model = snapshot.model().unwrap();
    let similarity = SimilarityEngine::new(snapshot.corpus(), model, 2.0);

    // Equidistant from both without weights; matches "racer" on racecraft.
    let query = FactorScores::new(0.2, 0.1, 0.8, 0.8);
    let matches = similarity.find_similar(&query, 32).unwrap();
    let find = |id: &str| matches.iter().find(|m| m.competitor.as_str() == id).unwrap();
    let racer = find("racer");
    let manager = find("manager");

    assert!(racer.similarity > manager.similarity);
    assert!(racer.rank < manager.rank);
    assert!((racer.distance - 0.125).abs() < 1e-12);
    assert!((manager.distance - 0.25).abs() < 1e-12);
}

#[test]
fn prediction_interval_coverage_near_nominal() {
    let engine = synthetic_engine(200, 1);
    let held_out = synthetic_members(400, 2);
    let options = BootstrapOptions::default()
        .with_iterations(400)
        .with_interval(IntervalKind::Prediction)
        .with_seed(11);
    let report =
        interval_coverage(&engine, &held_out, &options, &CancellationToken::new()).unwrap();
    assert!(
        report.coverage >= 0.92 && report.coverage <= 0.98,
        "coverage {} vs nominal {}",
        report.coverage,
        report.nominal
    );
}

#[test]
fn in_flight_request_keeps_its_snapshot() {
    let engine = synthetic_engine(34, 1);
    let captured = engine.store().load().unwrap();
    engine.publish(synthetic_artifact("synthetic-2", 40, 2)).unwrap();

    assert_eq!(captured.version().as_str(), "synthetic-1");
    assert_eq!(captured.corpus().len(), 34);
    let status = engine.status().unwrap();
    assert_eq!(status.snapshot_version.as_str(), "synthetic-2");
    assert_eq!(status.data.corpus_size, 40);
}

#[test]
fn stale_model_is_refused() {
    let mut artifact = synthetic_artifact("v2", 34, 1);
    artifact.model = Some(synthetic_model("v1"));
    let engine = engine_with(artifact);
    let query = QueryVector::from_array([50.0; 4]).unwrap();
    assert!(matches!(
        engine.predict(&query, &options(), &CancellationToken::new()),
        Err(gf_common::Error::ModelUnavailable(_))
    ));
    // Allocation needs the model too; status still reports.
    assert!(engine.allocate(&query, 3).is_err());
    let status = engine.status().unwrap().data;
    assert!(status.model.loaded);
    assert!(!status.model.matches_corpus);
}
