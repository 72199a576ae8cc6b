//! Configuration file handling for clipgen.
//!
//! Loads configuration from `~/.config/clipgen/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::ModelCandidate;

/// Configuration file structure for clipgen.
/// Loaded from ~/.config/clipgen/config.toml (or custom path via --config).
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub managed: ManagedConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Paid provider (standard tier) settings.
#[derive(Debug, Deserialize, Default)]
pub struct ProviderConfig {
    /// Overrides the SEGMIND_API_KEY environment variable.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Keyless image synthesis provider settings.
#[derive(Debug, Deserialize, Default)]
pub struct SynthesisConfig {
    pub base_url: Option<String>,
}

/// Managed provider (pro tier) settings.
#[derive(Debug, Deserialize, Default)]
pub struct ManagedConfig {
    /// Overrides the GEMINI_API_KEY environment variable.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Animation fallback chain settings.
///
/// When `models` is present it replaces the built-in candidate list; an
/// explicit empty list disables animation entirely so every standard
/// generation degrades to a still image.
#[derive(Debug, Deserialize, Default)]
pub struct AnimationConfig {
    #[serde(default)]
    pub models: Option<Vec<ModelCandidate>>,
}

/// Job poller tuning for the standard tier.
#[derive(Debug, Deserialize, Default)]
pub struct PollingConfig {
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clipgen")
        .join("config.toml")
}
