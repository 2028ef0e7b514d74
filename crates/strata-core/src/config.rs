//! Composition engine configuration
//!
//! Configuration is layered: defaults, then an optional JSON or TOML file, then
//! `STRATA_*` environment variables. The result is validated before use.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "STRATA_";

/// Error type for configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed
    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// An environment override had a value of the wrong shape
    #[error("invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },

    /// The configuration is internally inconsistent
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Settings that govern how chains are assembled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Memoize injection resolution per (layer, delegate type, extra types)
    pub resolution_cache: bool,
    /// Emit a trace event for every call forwarded by a synthesized pass-through
    pub trace_calls: bool,
    /// Upper bound on the number of declared layers, if any
    pub max_layers: Option<usize>,
    /// Reject partial layers that leave a contract member unresolvable at build time
    pub strict_members: bool,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            resolution_cache: true,
            trace_calls: false,
            max_layers: None,
            strict_members: true,
        }
    }
}

impl ComposeConfig {
    /// Load configuration from a `.json` or `.toml` file
    ///
    /// Missing keys take their default values.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| e.to_string()),
            _ => serde_json::from_str(&content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Apply `STRATA_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `STRATA_*` overrides from an explicit set of variables
    ///
    /// Recognised keys: `STRATA_RESOLUTION_CACHE`, `STRATA_TRACE_CALLS`,
    /// `STRATA_MAX_LAYERS` (`none` clears the limit), `STRATA_STRICT_MEMBERS`.
    /// Unrecognised `STRATA_*` keys are ignored.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "RESOLUTION_CACHE" => self.resolution_cache = parse_flag(key, value)?,
                "TRACE_CALLS" => self.trace_calls = parse_flag(key, value)?,
                "STRICT_MEMBERS" => self.strict_members = parse_flag(key, value)?,
                "MAX_LAYERS" => {
                    self.max_layers = if value.eq_ignore_ascii_case("none") {
                        None
                    } else {
                        Some(value.parse().map_err(|_| invalid_override(key, value))?)
                    };
                }
                other => tracing::debug!(key = other, "ignoring unknown configuration override"),
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_layers == Some(0) {
            return Err(ConfigError::Invalid {
                message: "max_layers must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }

    /// Defaults, then `path` if given, then environment overrides, then validation
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_override(key, value)),
    }
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    }
}
