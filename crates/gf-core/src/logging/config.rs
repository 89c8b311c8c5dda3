//! Logging configuration from CLI flags and the environment.
//!
//! Precedence, highest first: `-q`/`-v` and `--log-format`, then `GF_LOG`
//! and `GF_LOG_FORMAT`, then the defaults (warn, human). `RUST_LOG`
//! directives are applied separately by the filter in [`super::init_logging`].

use serde::{Deserialize, Serialize};

/// Log level override.
pub const ENV_LOG_LEVEL: &str = "GF_LOG";
/// Log format override (human, jsonl).
pub const ENV_LOG_FORMAT: &str = "GF_LOG_FORMAT";

/// Output format for stderr logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line, for pipelines and agents.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format {other:?} (expected human or jsonl)")),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        })
    }
}

/// Minimum level emitted, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    const ORDER: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Off,
    ];

    /// Move `steps` levels towards Trace, stopping there.
    pub fn more_verbose(self, steps: u8) -> Self {
        let idx = Self::ORDER.iter().position(|&l| l == self).unwrap_or(0);
        Self::ORDER[idx.saturating_sub(usize::from(steps))]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "warning" {
            return Ok(LogLevel::Warn);
        }
        Self::ORDER
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| format!("unknown log level {s:?}"))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Timestamps on human output. JSON lines always carry one.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Warn,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment plus CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// Resolve with an explicit variable lookup. Unparseable values are ignored.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let defaults = LogConfig::default();
        let level = cli_level
            .or_else(|| lookup(ENV_LOG_LEVEL).and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.level);
        let format = cli_format
            .or_else(|| lookup(ENV_LOG_FORMAT).and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.format);
        LogConfig {
            format,
            level,
            ..defaults
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn parse_formats_and_levels() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" Debug ".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn verbosity_steps_saturate_at_trace() {
        assert_eq!(LogLevel::Warn.more_verbose(1), LogLevel::Info);
        assert_eq!(LogLevel::Warn.more_verbose(2), LogLevel::Debug);
        assert_eq!(LogLevel::Warn.more_verbose(9), LogLevel::Trace);
        assert_eq!(LogLevel::Off.more_verbose(0), LogLevel::Off);
    }

    #[test]
    fn defaults_without_environment() {
        assert_eq!(LogConfig::resolve(env(&[]), None, None), LogConfig::default());
    }

    #[test]
    fn environment_then_cli_precedence() {
        let vars = env(&[(ENV_LOG_LEVEL, "debug"), (ENV_LOG_FORMAT, "jsonl")]);
        let from_env = LogConfig::resolve(&vars, None, None);
        assert_eq!(from_env.level, LogLevel::Debug);
        assert_eq!(from_env.format, LogFormat::Jsonl);

        let cli = LogConfig::resolve(&vars, Some(LogLevel::Error), Some(LogFormat::Human));
        assert_eq!(cli.level, LogLevel::Error);
        assert_eq!(cli.format, LogFormat::Human);
    }

    #[test]
    fn garbage_environment_is_ignored() {
        let cfg = LogConfig::resolve(env(&[(ENV_LOG_LEVEL, "chatty")]), None, None);
        assert_eq!(cfg.level, LogLevel::Warn);
    }
}
