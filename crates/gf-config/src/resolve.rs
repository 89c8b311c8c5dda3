//! Where engine.json is looked for.
//!
//! Candidates are tried in order and the first existing file wins:
//! `--config`, `GRIDFIT_CONFIG`, `GRIDFIT_CONFIG_DIR/engine.json`,
//! `$XDG_CONFIG_HOME/gridfit/engine.json`, `/etc/gridfit/engine.json`.
//! With none present the built-in defaults apply.

use std::path::{Path, PathBuf};

/// Direct path to engine.json.
pub const ENV_CONFIG_PATH: &str = "GRIDFIT_CONFIG";
/// Directory holding engine.json.
pub const ENV_CONFIG_DIR: &str = "GRIDFIT_CONFIG_DIR";

pub const ENGINE_FILENAME: &str = "engine.json";

const APP_DIR: &str = "gridfit";

/// The resolved engine.json location, if any.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub engine: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Where a configuration came from, reported in `config show` and snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument,
    Environment,
    XdgConfig,
    SystemConfig,
    Preset,
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConfigSource::CliArgument => "CLI argument",
            ConfigSource::Environment => "environment variable",
            ConfigSource::XdgConfig => "XDG config",
            ConfigSource::SystemConfig => "system config",
            ConfigSource::Preset => "preset",
            ConfigSource::BuiltinDefault => "builtin default",
        })
    }
}

/// Ordered search list for engine.json.
pub fn candidates(cli_path: Option<&Path>) -> Vec<(PathBuf, ConfigSource)> {
    let mut out = Vec::with_capacity(5);
    if let Some(path) = cli_path {
        out.push((path.to_path_buf(), ConfigSource::CliArgument));
    }
    if let Some(path) = std::env::var_os(ENV_CONFIG_PATH) {
        out.push((PathBuf::from(path), ConfigSource::Environment));
    }
    if let Some(dir) = std::env::var_os(ENV_CONFIG_DIR) {
        out.push((PathBuf::from(dir).join(ENGINE_FILENAME), ConfigSource::Environment));
    }
    if let Some(dir) = dirs::config_dir() {
        out.push((dir.join(APP_DIR).join(ENGINE_FILENAME), ConfigSource::XdgConfig));
    }
    out.push((system_config_path(), ConfigSource::SystemConfig));
    out
}

/// First existing candidate, or built-in defaults.
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPaths {
    candidates(cli_path)
        .into_iter()
        .find(|(path, _)| path.is_file())
        .map(|(path, source)| ConfigPaths {
            engine: Some(path),
            source,
        })
        .unwrap_or_default()
}

pub fn system_config_path() -> PathBuf {
    Path::new("/etc").join(APP_DIR).join(ENGINE_FILENAME)
}
