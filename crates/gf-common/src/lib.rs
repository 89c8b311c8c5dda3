//! gridfit common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the gridfit crates:
//! - The closed four-variant `Factor` type and fixed-size `FactorScores`
//! - Competitor and snapshot identifiers
//! - The unified error taxonomy with stable codes
//! - Output formats for command payloads

pub mod error;
pub mod factor;
pub mod id;
pub mod output;

pub use error::{Error, ErrorCategory, ModelUnavailableReason, Result, StructuredError};
pub use factor::{Factor, FactorScores};
pub use id::{CompetitorId, SnapshotVersion};
pub use output::OutputFormat;

/// Schema version stamped on every serialized engine output.
pub const SCHEMA_VERSION: &str = "1.0.0";
