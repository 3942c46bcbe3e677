//! # Arcana Configuration System
//!
//! Layered configuration for the coordination core. Every section carries the
//! system defaults, so an empty source yields a working configuration; a file
//! (TOML, YAML or JSON) and `ARCANA__SECTION__KEY` environment variables are
//! layered on top by [`ConfigManager`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arcana_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_file("config/arcana.toml")?;
//!
//! let concurrency = manager.config().coordinator.max_concurrent_tasks;
//! let history = manager.config().coordinator.task_history_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::cache::EvictionStrategy;
use crate::constants::system;
use crate::error_handling::{ErrorCategory, RecoveryStrategy};
use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArcanaConfig {
    /// Task coordinator limits and completed-task history
    pub coordinator: CoordinatorConfig,

    /// Defaults for general-purpose caches built from configuration
    pub cache: CacheConfig,

    /// Circuit breaker thresholds
    pub circuit_breakers: CircuitBreakerSettings,

    /// Error classification and recovery routing
    pub error_handling: ErrorHandlingConfig,

    /// Feedback event channel
    pub events: EventsConfig,
}

impl ArcanaConfig {
    /// Validate every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.coordinator.validate()?;
        self.cache.validate("cache")?;
        self.circuit_breakers.validate()?;

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                0,
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Task coordinator configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Semaphore bound on concurrently executing work
    pub max_concurrent_tasks: usize,

    /// Maximum number of terminal tasks kept in history
    pub task_history_size: usize,

    /// How long a terminal task stays queryable
    pub task_history_ttl_seconds: u64,

    /// Eviction policy for the history when it is full
    pub task_history_strategy: EvictionStrategy,

    /// Sweep interval for expired history entries
    pub history_cleanup_interval_seconds: u64,

    /// Applied when a submitted task carries no timeout of its own
    pub default_task_timeout_seconds: Option<f64>,
}

impl CoordinatorConfig {
    pub fn default_task_timeout(&self) -> Option<Duration> {
        self.default_task_timeout_seconds
            .filter(|seconds| *seconds > 0.0)
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    }

    /// Cache configuration for the completed-task history
    pub fn history_cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_size: self.task_history_size,
            strategy: self.task_history_strategy,
            default_ttl_seconds: Some(self.task_history_ttl_seconds),
            cleanup_interval_seconds: self.history_cleanup_interval_seconds,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent_tasks == 0 {
            return Err(ConfigurationError::invalid_value(
                "coordinator.max_concurrent_tasks",
                self.max_concurrent_tasks,
                "must be greater than 0",
            ));
        }

        if self.task_history_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "coordinator.task_history_size",
                self.task_history_size,
                "must be greater than 0",
            ));
        }

        if let Some(timeout) = self.default_task_timeout_seconds {
            if Duration::try_from_secs_f64(timeout).is_err() {
                return Err(ConfigurationError::invalid_value(
                    "coordinator.default_task_timeout_seconds",
                    timeout,
                    "must be a non-negative number of seconds",
                ));
            }
        }

        self.history_cache_config().validate("coordinator")
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: system::DEFAULT_MAX_CONCURRENT_TASKS,
            task_history_size: system::DEFAULT_TASK_HISTORY_SIZE,
            task_history_ttl_seconds: system::DEFAULT_TASK_HISTORY_TTL_SECONDS,
            task_history_strategy: EvictionStrategy::Lru,
            history_cleanup_interval_seconds: system::DEFAULT_CACHE_CLEANUP_INTERVAL_SECONDS,
            default_task_timeout_seconds: None,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size: usize,

    pub strategy: EvictionStrategy,

    /// `None` means entries never expire unless given an explicit TTL
    pub default_ttl_seconds: Option<u64>,

    pub cleanup_interval_seconds: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_seconds
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }

    fn validate(&self, section: &str) -> ConfigResult<()> {
        if self.cleanup_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                format!("{section}.cleanup_interval_seconds"),
                self.cleanup_interval_seconds,
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: system::DEFAULT_CACHE_MAX_SIZE,
            strategy: EvictionStrategy::Lru,
            default_ttl_seconds: Some(system::DEFAULT_CACHE_TTL_SECONDS),
            cleanup_interval_seconds: system::DEFAULT_CACHE_CLEANUP_INTERVAL_SECONDS,
        }
    }
}

/// Circuit breaker thresholds for one component, in file-friendly units
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerComponentConfig {
    pub failure_threshold: u32,
    pub reset_timeout_seconds: f64,
    pub half_open_timeout_seconds: f64,
}

impl CircuitBreakerComponentConfig {
    /// Convert to the runtime breaker configuration
    pub fn to_resilience_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: seconds_to_duration(self.reset_timeout_seconds),
            half_open_timeout: seconds_to_duration(self.half_open_timeout_seconds),
        }
    }
}

impl Default for CircuitBreakerComponentConfig {
    fn default() -> Self {
        Self {
            failure_threshold: system::DEFAULT_FAILURE_THRESHOLD,
            reset_timeout_seconds: system::DEFAULT_RESET_TIMEOUT_SECONDS,
            half_open_timeout_seconds: system::DEFAULT_HALF_OPEN_TIMEOUT_SECONDS,
        }
    }
}

fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

/// Circuit breaker settings: a default plus per-component overrides
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub default_config: CircuitBreakerComponentConfig,
    pub component_configs: HashMap<String, CircuitBreakerComponentConfig>,
}

impl CircuitBreakerSettings {
    /// Settings where every component uses `config`
    pub fn from_default(config: &CircuitBreakerConfig) -> Self {
        Self {
            default_config: CircuitBreakerComponentConfig {
                failure_threshold: config.failure_threshold,
                reset_timeout_seconds: config.reset_timeout.as_secs_f64(),
                half_open_timeout_seconds: config.half_open_timeout.as_secs_f64(),
            },
            component_configs: HashMap::new(),
        }
    }

    /// Resolve the runtime configuration for one component
    pub fn config_for_component(&self, component_name: &str) -> CircuitBreakerConfig {
        self.component_configs
            .get(component_name)
            .unwrap_or(&self.default_config)
            .to_resilience_config()
    }

    fn validate(&self) -> ConfigResult<()> {
        self.default_config
            .to_resilience_config()
            .validate()
            .map_err(|reason| {
                ConfigurationError::invalid_value(
                    "circuit_breakers.default_config",
                    format!("{:?}", self.default_config),
                    reason,
                )
            })
    }
}

/// Error handling configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorHandlingConfig {
    /// Bound on the handled-error history
    pub max_history: usize,

    /// Overrides for the category → recovery strategy map
    pub recovery_strategies: HashMap<ErrorCategory, RecoveryStrategy>,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            max_history: system::DEFAULT_ERROR_HISTORY_SIZE,
            recovery_strategies: HashMap::new(),
        }
    }
}

/// Feedback event configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: system::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}
