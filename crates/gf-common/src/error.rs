//! Error types for gridfit.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! Structural errors (invalid input, missing model, insufficient data) are
//! fatal and never come with a partial result. Extrapolation is not an error:
//! it is reported on the prediction itself.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 30,
//!   "category": "data",
//!   "message": "insufficient training data: 6 observations, 10 required",
//!   "recoverable": true,
//!   "suggested_action": "reload_snapshot",
//!   "context": { "observed": 6, "required": 10 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Result type alias for gridfit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Caller-supplied request values.
    Input,
    /// Training corpus content or size.
    Data,
    /// Regression model availability and numerics.
    Model,
    /// Request lifecycle (cancellation).
    Runtime,
    /// Engine configuration.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Runtime => write!(f, "runtime"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for agents to take in response to errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Correct the request and resubmit.
    FixInput,
    /// Load or publish a different snapshot.
    ReloadSnapshot,
    /// Refit the regression model against the loaded corpus.
    RefitModel,
    /// Run the validation command.
    RunCheck,
    /// Retry the operation.
    Retry,
    /// Manual intervention required.
    ManualIntervention,
}

impl fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::ReloadSnapshot => write!(f, "reload_snapshot"),
            SuggestedAction::RefitModel => write!(f, "refit_model"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Why no usable regression model is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum ModelUnavailableReason {
    /// The snapshot was published without a model.
    NotLoaded,
    /// The model was fit against a different corpus version.
    VersionMismatch { model: String, corpus: String },
}

impl fmt::Display for ModelUnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelUnavailableReason::NotLoaded => write!(f, "no regression model loaded"),
            ModelUnavailableReason::VersionMismatch { model, corpus } => write!(
                f,
                "model version {} does not match corpus version {}",
                model, corpus
            ),
        }
    }
}

/// Unified error type for gridfit.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    // Data and model errors (30-39)
    #[error("insufficient training data: {observed} observations, {required} required")]
    InsufficientTrainingData { observed: usize, required: usize },

    #[error("model unavailable: {0}")]
    ModelUnavailable(ModelUnavailableReason),

    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    // Runtime (40-49)
    #[error("computation cancelled")]
    Cancelled,

    // Configuration (50-59)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an input validation failure.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Input and snapshot shape errors
    /// - 30-39: Data and model errors
    /// - 40-49: Runtime errors
    /// - 50-59: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidInput { .. } => 10,
            Error::InvalidSnapshot(_) => 11,
            Error::InsufficientTrainingData { .. } => 30,
            Error::ModelUnavailable(_) => 31,
            Error::NumericalInstability(_) => 32,
            Error::Cancelled => 40,
            Error::Config(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidInput { .. } => ErrorCategory::Input,
            Error::InvalidSnapshot(_) | Error::InsufficientTrainingData { .. } => {
                ErrorCategory::Data
            }
            Error::ModelUnavailable(_) | Error::NumericalInstability(_) => ErrorCategory::Model,
            Error::Cancelled => ErrorCategory::Runtime,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable by the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::InvalidInput { .. } => true,
            Error::InvalidSnapshot(_) => true,
            Error::InsufficientTrainingData { .. } => true,
            Error::ModelUnavailable(_) => true,
            Error::NumericalInstability(_) => false,
            Error::Cancelled => true,
            Error::Config(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns the suggested action for agents.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::InvalidInput { .. } => SuggestedAction::FixInput,
            Error::InvalidSnapshot(_) | Error::InsufficientTrainingData { .. } => {
                SuggestedAction::ReloadSnapshot
            }
            Error::ModelUnavailable(_) => SuggestedAction::RefitModel,
            Error::NumericalInstability(_) => SuggestedAction::ManualIntervention,
            Error::Cancelled => SuggestedAction::Retry,
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::InvalidInput { .. } => {
                "Normalized scores must lie in [0, 100]; budgets must be non-negative integers; top-n must be at least 1."
            }
            Error::InvalidSnapshot(_) => {
                "Regenerate the snapshot artifact. Scores must be finite, competitor ids unique, and the version non-empty."
            }
            Error::InsufficientTrainingData { .. } => {
                "Publish a snapshot whose corpus meets the configured minimum observation count."
            }
            Error::ModelUnavailable(_) => {
                "Load a regression model fitted against the current corpus version, or run 'gf-core calibrate'."
            }
            Error::NumericalInstability(_) => {
                "The corpus factors are collinear. Inspect the snapshot with 'gf-core status'."
            }
            Error::Cancelled => "The request was abandoned before completion. Resubmit if still needed.",
            Error::Config(_) => "Run 'gf-core check' to validate engine.json.",
            Error::Io(_) => "Check that the file exists and is readable. Retry the operation.",
            Error::Json(_) => "Invalid JSON in file. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InvalidInput { .. } => "Invalid Input",
            Error::InvalidSnapshot(_) => "Invalid Snapshot",
            Error::InsufficientTrainingData { .. } => "Insufficient Training Data",
            Error::ModelUnavailable(_) => "Model Unavailable",
            Error::NumericalInstability(_) => "Numerical Instability",
            Error::Cancelled => "Cancelled",
            Error::Config(_) => "Configuration Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for agents.
    pub suggested_action: SuggestedAction,

    /// Additional structured context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidInput { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::InsufficientTrainingData { observed, required } => {
                context.insert("observed".to_string(), serde_json::json!(observed));
                context.insert("required".to_string(), serde_json::json!(required));
            }
            Error::ModelUnavailable(reason) => {
                if let Ok(v) = serde_json::to_value(reason) {
                    context.insert("model".to_string(), v);
                }
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        let cases = [
            (Error::invalid_input("scores.speed", "out of range"), 10, ErrorCategory::Input),
            (
                Error::InsufficientTrainingData {
                    observed: 3,
                    required: 10,
                },
                30,
                ErrorCategory::Data,
            ),
            (
                Error::ModelUnavailable(ModelUnavailableReason::NotLoaded),
                31,
                ErrorCategory::Model,
            ),
            (Error::Cancelled, 40, ErrorCategory::Runtime),
            (Error::Config("bad".into()), 50, ErrorCategory::Config),
        ];
        for (err, code, category) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.category(), category);
        }
    }

    #[test]
    fn version_mismatch_message_names_both_versions() {
        let err = Error::ModelUnavailable(ModelUnavailableReason::VersionMismatch {
            model: "v1".into(),
            corpus: "v2".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("v1") && msg.contains("v2"), "{msg}");
    }

    #[test]
    fn structured_error_carries_context() {
        let err = Error::InsufficientTrainingData {
            observed: 4,
            required: 10,
        };
        let s = StructuredError::from(&err);
        assert_eq!(s.code, 30);
        assert_eq!(s.suggested_action, SuggestedAction::ReloadSnapshot);
        assert_eq!(s.context["observed"], serde_json::json!(4));

        let json = s.to_json();
        assert!(json.contains("\"category\":\"data\""), "{json}");
    }

    #[test]
    fn every_error_has_headline_and_remediation() {
        let errors = [
            Error::invalid_input("top_n", "must be >= 1"),
            Error::InvalidSnapshot("dup".into()),
            Error::NumericalInstability("singular".into()),
            Error::Cancelled,
            Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
        ];
        for err in errors {
            assert!(!err.headline().is_empty());
            assert!(!err.remediation().is_empty());
        }
    }
}
