//! Directory core configuration.
//!
//! # Responsibility
//! - Hold the activity depth bound and the default search radius.
//! - Load overrides from process environment for embedding binaries.
//!
//! # Invariants
//! - Configuration is passed by value into services at construction time;
//!   there is no process-wide mutable configuration.
//! - `max_activity_level >= 1` and `default_search_radius_m` is finite and
//!   strictly positive once `validate()` succeeds.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default number of hierarchy levels (levels `0..=3` are valid).
pub const DEFAULT_MAX_ACTIVITY_LEVEL: u32 = 4;
/// Default radius for proximity search, in meters.
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 1000.0;

/// Environment variable overriding [`DirectoryConfig::max_activity_level`].
pub const ENV_MAX_ACTIVITY_LEVEL: &str = "ORGDIR_MAX_ACTIVITY_LEVEL";
/// Environment variable overriding [`DirectoryConfig::default_search_radius_m`].
pub const ENV_DEFAULT_SEARCH_RADIUS: &str = "ORGDIR_DEFAULT_SEARCH_RADIUS";

/// Errors from configuration loading and validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Environment value could not be parsed.
    InvalidValue { key: &'static str, value: String },
    /// Depth bound must allow at least root activities.
    MaxLevelTooSmall(u32),
    /// Search radius must be finite and positive.
    InvalidRadius(f64),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
            Self::MaxLevelTooSmall(value) => {
                write!(f, "max activity level must be at least 1, got {value}")
            }
            Self::InvalidRadius(value) => {
                write!(f, "default search radius must be finite and > 0, got {value}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Runtime configuration threaded into hierarchy and geo components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Number of allowed hierarchy levels; valid levels are `0..max_activity_level`.
    pub max_activity_level: u32,
    /// Radius used by proximity search when the caller leaves it unspecified.
    pub default_search_radius_m: f64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            max_activity_level: DEFAULT_MAX_ACTIVITY_LEVEL,
            default_search_radius_m: DEFAULT_SEARCH_RADIUS_M,
        }
    }
}

impl DirectoryConfig {
    /// Loads configuration from process environment.
    ///
    /// Missing variables keep their defaults. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_ACTIVITY_LEVEL) {
            config.max_activity_level =
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_MAX_ACTIVITY_LEVEL,
                        value: raw.clone(),
                    })?;
        }
        if let Some(raw) = lookup(ENV_DEFAULT_SEARCH_RADIUS) {
            config.default_search_radius_m =
                raw.trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_DEFAULT_SEARCH_RADIUS,
                        value: raw.clone(),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the configured bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_activity_level < 1 {
            return Err(ConfigError::MaxLevelTooSmall(self.max_activity_level));
        }
        if !self.default_search_radius_m.is_finite() || self.default_search_radius_m <= 0.0 {
            return Err(ConfigError::InvalidRadius(self.default_search_radius_m));
        }
        Ok(())
    }
}
