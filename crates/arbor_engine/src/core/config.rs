//! Configuration system
//!
//! File-backed configuration with TOML and RON support, plus the engine's
//! own settings structure.

pub use serde::{Deserialize, Serialize};

use crate::foundation::time::DEFAULT_FIXED_STEP;

/// Configuration trait
///
/// Types implementing this can round-trip through TOML or RON files; the
/// format is picked from the path suffix.
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// # Engine Configuration
///
/// Settings that govern the frame loop: the fixed-update period and the cap
/// on how many fixed ticks a single frame may replay when the simulation
/// falls behind wall time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Application name, used for logging and window titles
    pub app_name: String,
    /// Seconds of simulated time per fixed update
    pub fixed_time_step: f32,
    /// Maximum fixed updates replayed per frame before rendering anyway
    pub max_frame_skip: u32,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            fixed_time_step: DEFAULT_FIXED_STEP,
            max_frame_skip: 5,
        }
    }

    /// Set the fixed-update period in seconds
    #[must_use]
    pub fn with_fixed_time_step(mut self, seconds: f32) -> Self {
        self.fixed_time_step = seconds;
        self
    }

    /// Set the per-frame cap on replayed fixed updates
    #[must_use]
    pub fn with_max_frame_skip(mut self, ticks: u32) -> Self {
        self.max_frame_skip = ticks;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }
        if self.fixed_time_step <= 0.0 {
            return Err("Fixed time step must be positive".to_string());
        }
        if self.max_frame_skip == 0 {
            return Err("Max frame skip must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("Arbor Application")
    }
}

impl Config for EngineConfig {}
