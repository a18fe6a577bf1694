//! Engine configuration.
//!
//! All knobs of the summarization pipeline live here with their defaults, so
//! deployments can tune selection aggressiveness and generation parameters
//! from a TOML file without touching code.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default fraction of a session's messages targeted for summarization.
pub const DEFAULT_TARGET_FRACTION: f64 = 0.5;
/// Default minimum number of recent messages that always survive selection.
pub const DEFAULT_MIN_KEEP: usize = 4;
/// Default generation budget for a summary.
pub const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 256;
/// Default sampling temperature for summary generation.
pub const DEFAULT_SUMMARY_TEMPERATURE: f32 = 0.7;
/// Assumed summary length (in tokens) used by the progress heuristic.
///
/// Not derived from measured model behavior; kept tunable rather than fixed.
pub const DEFAULT_PROGRESS_TOKEN_ESTIMATE: u32 = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for selection, generation, and progress reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fraction of messages to summarize, in `(0, 1]`.
    pub target_fraction: f64,
    /// Floor of recent messages kept out of every summary.
    pub min_keep: usize,
    /// Token budget handed to the generation adapter.
    pub max_tokens: u32,
    /// Sampling temperature handed to the generation adapter.
    pub temperature: f32,
    /// Assumed total token count for the progress estimate.
    pub progress_token_estimate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fraction: DEFAULT_TARGET_FRACTION,
            min_keep: DEFAULT_MIN_KEEP,
            max_tokens: DEFAULT_SUMMARY_MAX_TOKENS,
            temperature: DEFAULT_SUMMARY_TEMPERATURE,
            progress_token_estimate: DEFAULT_PROGRESS_TOKEN_ESTIMATE,
        }
    }
}

impl EngineConfig {
    /// Conventional config location: `~/.ember/config.toml`.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ember").join("config.toml"))
    }

    /// Load from the conventional location, falling back to defaults when no
    /// file exists there.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_fraction.is_finite()
            || self.target_fraction <= 0.0
            || self.target_fraction > 1.0
        {
            return Err(ConfigError::Invalid(format!(
                "target_fraction must be in (0, 1], got {}",
                self.target_fraction
            )));
        }
        if self.min_keep == 0 {
            return Err(ConfigError::Invalid(
                "min_keep must be at least 1".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "max_tokens must be at least 1".to_string(),
            ));
        }
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be in [0, 2], got {}",
                self.temperature
            )));
        }
        if self.progress_token_estimate == 0 {
            return Err(ConfigError::Invalid(
                "progress_token_estimate must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
