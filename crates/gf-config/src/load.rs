//! One-call configuration loading: resolve, read, parse, validate, snapshot.

use std::path::PathBuf;

use crate::engine::EngineConfig;
use crate::preset::{get_preset, PresetName};
use crate::resolve::{resolve_config, ConfigPaths, ConfigSource};
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_engine, ValidationError, ValidationResult};

/// Options controlling where configuration is loaded from.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Explicit engine.json path. Must exist when given.
    pub path: Option<PathBuf>,
    /// Preset to use when no explicit path is given.
    pub preset: Option<PresetName>,
}

/// A validated configuration and the snapshot describing where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EngineConfig,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

/// Load and validate the engine configuration.
///
/// Precedence: explicit path, then preset, then the environment/XDG/system
/// search, then built-in defaults.
pub fn load_config(options: &ConfigOptions) -> ValidationResult<LoadedConfig> {
    if let Some(path) = &options.path {
        if !path.exists() {
            return Err(ValidationError::IoError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
    }

    if options.path.is_none() {
        if let Some(preset) = options.preset {
            let config = get_preset(preset);
            validate_engine(&config)?;
            let paths = ConfigPaths {
                engine: None,
                source: ConfigSource::Preset,
            };
            let snapshot = ConfigSnapshot::new(&config, &paths, None, Some(preset.as_str()));
            return Ok(LoadedConfig {
                config,
                paths,
                snapshot,
            });
        }
    }

    let paths = resolve_config(options.path.as_deref());
    let (config, raw) = match &paths.engine {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
            (EngineConfig::from_json(&raw)?, Some(raw))
        }
        None => (EngineConfig::default(), None),
    };
    validate_engine(&config)?;
    let snapshot = ConfigSnapshot::new(&config, &paths, raw.as_deref(), None);
    Ok(LoadedConfig {
        config,
        paths,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_path_is_error() {
        let options = ConfigOptions {
            path: Some(PathBuf::from("/definitely/not/here/engine.json")),
            preset: None,
        };
        assert!(matches!(
            load_config(&options),
            Err(ValidationError::IoError(_))
        ));
    }

    #[test]
    fn preset_used_without_path() {
        let options = ConfigOptions {
            path: None,
            preset: Some(PresetName::Quick),
        };
        let loaded = load_config(&options).unwrap();
        assert_eq!(loaded.config.bootstrap.iterations, 200);
        assert_eq!(loaded.paths.source, ConfigSource::Preset);
        assert_eq!(loaded.snapshot.preset.as_deref(), Some("quick"));
    }

    #[test]
    fn explicit_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(
            &path,
            r#"{"schema_version":"1.0.0","similarity":{"decay":-1.0}}"#,
        )
        .unwrap();
        let options = ConfigOptions {
            path: Some(path),
            preset: Some(PresetName::Rigorous),
        };
        assert!(matches!(
            load_config(&options),
            Err(ValidationError::InvalidValue { .. })
        ));
    }
}
