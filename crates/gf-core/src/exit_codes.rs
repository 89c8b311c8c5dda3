//! Exit codes for the gf-core CLI.
//!
//! Exit code ranges:
//! - 0-1: Success outcomes (1 means the answer carries an extrapolation warning)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use gf_common::Error;

/// Exit codes for gf-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Success (0-1)
    // ========================================================================
    /// Success
    Ok = 0,

    /// Success, but at least one answer was extrapolated
    OkWithWarning = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or query values
    ArgsError = 10,

    /// Engine configuration missing or invalid
    ConfigError = 11,

    /// Snapshot artifact missing or malformed
    SnapshotError = 12,

    /// Corpus below the minimum size
    InsufficientData = 13,

    /// No model, or model fitted against another corpus version
    ModelUnavailable = 14,

    /// Request cancelled
    Cancelled = 15,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        (self as i32) < 10
    }

    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Map an engine error onto its exit code.
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::InvalidInput { .. } => ExitCode::ArgsError,
            Error::Config(_) => ExitCode::ConfigError,
            Error::InvalidSnapshot(_) | Error::Json(_) => ExitCode::SnapshotError,
            Error::InsufficientTrainingData { .. } => ExitCode::InsufficientData,
            Error::ModelUnavailable(_) => ExitCode::ModelUnavailable,
            Error::Cancelled => ExitCode::Cancelled,
            Error::NumericalInstability(_) => ExitCode::InternalError,
            Error::Io(_) => ExitCode::IoError,
        }
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::OkWithWarning => "OK_EXTRAPOLATED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::SnapshotError => "ERR_SNAPSHOT",
            ExitCode::InsufficientData => "ERR_INSUFFICIENT_DATA",
            ExitCode::ModelUnavailable => "ERR_MODEL_UNAVAILABLE",
            ExitCode::Cancelled => "ERR_CANCELLED",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_common::ModelUnavailableReason;

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Ok.is_success());
        assert!(ExitCode::OkWithWarning.is_success());
        assert!(ExitCode::ArgsError.is_user_error());
        assert!(ExitCode::Cancelled.is_user_error());
        assert!(ExitCode::IoError.is_internal_error());
        assert!(!ExitCode::InternalError.is_user_error());
    }

    #[test]
    fn test_from_error() {
        assert_eq!(
            ExitCode::from_error(&Error::invalid_input("budget", "negative")),
            ExitCode::ArgsError
        );
        assert_eq!(
            ExitCode::from_error(&Error::InsufficientTrainingData { observed: 3, required: 10 }),
            ExitCode::InsufficientData
        );
        assert_eq!(
            ExitCode::from_error(&Error::ModelUnavailable(ModelUnavailableReason::NotLoaded)),
            ExitCode::ModelUnavailable
        );
        assert_eq!(ExitCode::from_error(&Error::Cancelled).as_i32(), 15);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::SnapshotError.to_string(), "ERR_SNAPSHOT (12)");
    }
}
