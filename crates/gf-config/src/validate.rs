//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::engine::EngineConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 51,
            ValidationError::ParseError(_) => 52,
            ValidationError::InvalidValue { .. } => 53,
            ValidationError::VersionMismatch { .. } => 54,
        }
    }
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

/// Validate an engine configuration semantically.
pub fn validate_engine(config: &EngineConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    // Fewer than 3 observations cannot produce a nearest-neighbor median.
    if config.corpus.min_observations < 3 {
        return Err(invalid(
            "corpus.min_observations",
            format!("Must be at least 3, got {}", config.corpus.min_observations),
        ));
    }

    let b = &config.bootstrap;
    if b.iterations == 0 {
        return Err(invalid("bootstrap.iterations", "Must be at least 1".to_string()));
    }
    if !(b.confidence > 0.0 && b.confidence < 1.0) {
        return Err(invalid(
            "bootstrap.confidence",
            format!("Must be in (0, 1), got {}", b.confidence),
        ));
    }
    if b.threads == Some(0) {
        return Err(invalid("bootstrap.threads", "Must be at least 1 when set".to_string()));
    }

    let e = &config.extrapolation;
    if !(e.moderate_threshold.is_finite() && e.moderate_threshold > 0.0) {
        return Err(invalid(
            "extrapolation.moderate_threshold",
            format!("Must be positive, got {}", e.moderate_threshold),
        ));
    }
    if !(e.severe_threshold.is_finite() && e.severe_threshold > e.moderate_threshold) {
        return Err(invalid(
            "extrapolation.severe_threshold",
            format!(
                "Must exceed moderate_threshold ({}), got {}",
                e.moderate_threshold, e.severe_threshold
            ),
        ));
    }

    let t = &config.tiers;
    if !(t.high_width_multiple.is_finite() && t.high_width_multiple > 0.0) {
        return Err(invalid(
            "tiers.high_width_multiple",
            format!("Must be positive, got {}", t.high_width_multiple),
        ));
    }
    if !(t.medium_width_multiple.is_finite() && t.medium_width_multiple >= t.high_width_multiple)
    {
        return Err(invalid(
            "tiers.medium_width_multiple",
            format!(
                "Must be at least high_width_multiple ({}), got {}",
                t.high_width_multiple, t.medium_width_multiple
            ),
        ));
    }

    let s = &config.similarity;
    if !(s.decay.is_finite() && s.decay > 0.0) {
        return Err(invalid(
            "similarity.decay",
            format!("Must be positive, got {}", s.decay),
        ));
    }
    if s.default_top_n == 0 {
        return Err(invalid("similarity.default_top_n", "Must be at least 1".to_string()));
    }

    Ok(())
}
