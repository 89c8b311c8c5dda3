//! Structured event vocabulary for logging.
//!
//! Every event carries the run id, the snapshot version it was computed
//! against (once one is loaded), and the processing stage.

use serde::{Deserialize, Serialize};

/// Processing stages of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Snapshot loading and publication.
    Load,
    /// Point prediction and bootstrap.
    Predict,
    Similarity,
    CircuitFit,
    Allocate,
    /// Model fitting and coverage checks.
    Calibrate,
    /// Writing results.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Predict => "predict",
            Stage::Similarity => "similarity",
            Stage::CircuitFit => "circuit_fit",
            Stage::Allocate => "allocate",
            Stage::Calibrate => "calibrate",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";

    // Snapshots
    pub const SNAPSHOT_LOADED: &str = "snapshot.loaded";
    pub const SNAPSHOT_PUBLISHED: &str = "snapshot.published";
    pub const SNAPSHOT_REJECTED: &str = "snapshot.rejected";

    // Requests
    pub const PREDICT_FINISHED: &str = "predict.finished";
    pub const PREDICT_EXTRAPOLATED: &str = "predict.extrapolated";
    pub const BOOTSTRAP_CANCELLED: &str = "bootstrap.cancelled";
    pub const SIMILARITY_FINISHED: &str = "similarity.finished";
    pub const CIRCUIT_FIT_FINISHED: &str = "circuit_fit.finished";
    pub const ALLOCATE_FINISHED: &str = "allocate.finished";
    pub const WHAT_IF_FINISHED: &str = "what_if.finished";
    pub const CALIBRATE_FINISHED: &str = "calibrate.finished";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation fields stamped on every event of a run.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    /// Snapshot version once one is loaded.
    pub snapshot_version: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            snapshot_version: None,
        }
    }

    pub fn with_snapshot_version(mut self, version: impl Into<String>) -> Self {
        self.snapshot_version = Some(version.into());
        self
    }
}
