//! gridfit engine configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for engine.json (the tunable policy constants)
//! - Named presets
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - Config snapshots so outputs can be audited

pub mod engine;
pub mod load;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use engine::{
    BootstrapPolicy, CorpusPolicy, EngineConfig, ExtrapolationPolicy, IntervalKind,
    SimilarityPolicy, TierPolicy,
};
pub use load::{load_config, ConfigOptions, LoadedConfig};
pub use preset::{get_preset, list_presets, PresetError, PresetInfo, PresetName};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_engine, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
