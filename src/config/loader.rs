//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the
//! `config` crate: built-in defaults, then an optional file, then
//! `ARCANA__SECTION__KEY` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::ArcanaConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming a configuration file for [`ConfigManager::load`]
pub const CONFIG_PATH_ENV: &str = "ARCANA_CONFIG_PATH";

/// Prefix for per-key environment overrides
pub const ENV_PREFIX: &str = "ARCANA";

/// Separator between the prefix, section and key of an override
pub const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ArcanaConfig,
    environment: String,
    source_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection.
    ///
    /// Reads the file named by `ARCANA_CONFIG_PATH` when set, otherwise only
    /// defaults and environment overrides apply.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let path = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_layered(path.as_deref())
    }

    /// Load configuration from a specific file (TOML, YAML or JSON by extension)
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::load_layered(Some(path))
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(config: ArcanaConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            source_path: None,
        }))
    }

    fn load_layered(path: Option<&Path>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();

        debug!(
            environment = %environment,
            path = ?path,
            "Loading configuration"
        );

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let source_name = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let config: ArcanaConfig = builder
            .build()
            .map_err(|e| ConfigurationError::load_error(&source_name, e))?
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_error(&source_name, e))?;

        config.validate()?;

        info!(
            environment = %environment,
            source = %source_name,
            max_concurrent_tasks = config.coordinator.max_concurrent_tasks,
            task_history_size = config.coordinator.task_history_size,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source_path: path.map(Path::to_path_buf),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ArcanaConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("ARCANA_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}
