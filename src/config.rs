//! # Configuration
//!
//! Environment-aware configuration loading for the runtime core.
//!
//! ## Overview
//!
//! Typed configuration with safe defaults, merged from an optional YAML file
//! per environment plus `FLOWGATE__*` environment-variable overrides.
//! Environment detection follows `FLOWGATE_ENV`, then `APP_ENV`, defaulting
//! to `development`. Loading validates the merged result before handing it
//! out; an invalid configuration never escapes the loader.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::error::CoreError;

/// Bounds for one message source's worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadingProfileConfig {
    /// Maximum phase units in flight at once on this pool.
    pub max_concurrent_units: usize,
}

impl Default for ThreadingProfileConfig {
    fn default() -> Self {
        Self {
            max_concurrent_units: 16,
        }
    }
}

/// Connector notification publishing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Capacity of the broadcast channel behind the publisher.
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Top-level runtime core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub threading: ThreadingProfileConfig,
    pub notifications: NotificationConfig,
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.threading.max_concurrent_units == 0 {
            return Err(ConfigurationError::invalid_value(
                "threading.max_concurrent_units",
                "must be at least 1",
            ));
        }
        if self.notifications.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "notifications.channel_capacity",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Configuration loading and validation failures.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Cannot load configuration: {reason}")]
    LoadFailed { reason: String },
}

impl ConfigurationError {
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn load_failed(reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            reason: reason.into(),
        }
    }
}

impl From<ConfigurationError> for CoreError {
    fn from(err: ConfigurationError) -> Self {
        CoreError::ConfigurationError(err.to_string())
    }
}

/// Loads and owns the merged configuration for one process.
#[derive(Debug)]
pub struct ConfigManager {
    config: CoreConfig,
    environment: String,
}

impl ConfigManager {
    /// Load with environment auto-detection and no config directory.
    pub fn load() -> Result<Arc<ConfigManager>, ConfigurationError> {
        Self::load_from_directory(None)
    }

    /// Load from an optional config directory with auto-detected
    /// environment.
    pub fn load_from_directory(
        config_dir: Option<PathBuf>,
    ) -> Result<Arc<ConfigManager>, ConfigurationError> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load from an optional config directory with an explicit environment.
    ///
    /// Useful in tests that must not mutate process environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>, ConfigurationError> {
        let defaults = Config::try_from(&CoreConfig::default())
            .map_err(|err| ConfigurationError::load_failed(err.to_string()))?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(dir) = &config_dir {
            builder = builder
                .add_source(File::from(dir.join("flowgate.yaml")).required(false))
                .add_source(
                    File::from(dir.join(format!("flowgate.{environment}.yaml"))).required(false),
                );
        }
        builder = builder.add_source(Environment::with_prefix("FLOWGATE").separator("__"));

        let config: CoreConfig = builder
            .build()
            .map_err(|err| ConfigurationError::load_failed(err.to_string()))?
            .try_deserialize()
            .map_err(|err| ConfigurationError::load_failed(err.to_string()))?;

        config.validate()?;

        debug!(
            environment = environment,
            max_concurrent_units = config.threading.max_concurrent_units,
            "Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
        }))
    }

    fn detect_environment() -> String {
        std::env::var("FLOWGATE_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.threading.max_concurrent_units, 16);
        assert_eq!(config.notifications.channel_capacity, 256);
    }

    #[test]
    fn test_zero_pool_bound_is_rejected() {
        let config = CoreConfig {
            threading: ThreadingProfileConfig {
                max_concurrent_units: 0,
            },
            ..CoreConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrent_units"));
    }

    #[test]
    fn test_load_without_directory_uses_defaults() {
        let manager = ConfigManager::load_from_directory_with_env(None, "test").unwrap();
        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config(), &CoreConfig::default());
    }

    #[test]
    fn test_environment_file_overrides_base_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("flowgate.yaml"),
            "threading:\n  max_concurrent_units: 4\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("flowgate.test.yaml"),
            "threading:\n  max_concurrent_units: 2\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();
        assert_eq!(manager.config().threading.max_concurrent_units, 2);
        // Untouched sections keep their defaults.
        assert_eq!(manager.config().notifications.channel_capacity, 256);
    }

    #[test]
    fn test_invalid_file_value_fails_validation() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("flowgate.yaml"),
            "threading:\n  max_concurrent_units: 0\n",
        )
        .unwrap();

        let err =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
