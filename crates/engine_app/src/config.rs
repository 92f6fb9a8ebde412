//! Engine configuration.
//!
//! Loaded from an optional JSON file, then overridden by command-line flags.
//! Every field has a default, so `{}` is a valid file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`EngineConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A rate is zero, negative or not finite.
    #[error("{name} must be a positive number, got {value}")]
    InvalidRate {
        /// The offending field.
        name: &'static str,
        /// Its value.
        value: f64,
    },
}

/// Frame driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Frames per second.
    pub tick_rate: f64,
    /// Fixed-update steps per second.
    pub fixed_rate: f64,
    /// Stop after this many frames (0 = run until interrupted).
    pub max_ticks: u64,
    /// Number of entities the demo scene spawns.
    pub demo_entities: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            fixed_rate: 50.0,
            max_ticks: 0,
            demo_entities: 16,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that both rates are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("tick_rate", self.tick_rate), ("fixed_rate", self.fixed_rate)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }

    /// Override the frame rate.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Override the fixed-update rate.
    #[must_use]
    pub fn with_fixed_rate(mut self, fixed_rate: f64) -> Self {
        self.fixed_rate = fixed_rate;
        self
    }

    /// Override the frame limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Override the demo population.
    #[must_use]
    pub fn with_demo_entities(mut self, demo_entities: usize) -> Self {
        self.demo_entities = demo_entities;
        self
    }

    /// Seconds per frame.
    #[must_use]
    pub fn frame_dt(&self) -> f64 {
        1.0 / self.tick_rate
    }

    /// Seconds per fixed-update step.
    #[must_use]
    pub fn fixed_dt(&self) -> f64 {
        1.0 / self.fixed_rate
    }
}
