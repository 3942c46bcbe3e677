//! # Circuit Breaker Configuration
//!
//! Runtime configuration for a single circuit breaker.
//!
//! **Note**: For file/environment driven configuration use
//! `crate::config::CircuitBreakerSettings`, which resolves per-component
//! overrides and converts into this struct.

use crate::constants::system;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening circuit
    pub failure_threshold: u32,

    /// Time since the last failure before a half-open trial is allowed
    pub reset_timeout: Duration,

    /// Upper bound on the duration of a half-open trial call
    pub half_open_timeout: Duration,
}

impl CircuitBreakerConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.reset_timeout.is_zero() {
            return Err("reset_timeout must be greater than 0".to_string());
        }

        if self.half_open_timeout.is_zero() {
            return Err("half_open_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: system::DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: Duration::from_secs_f64(system::DEFAULT_RESET_TIMEOUT_SECONDS),
            half_open_timeout: Duration::from_secs_f64(system::DEFAULT_HALF_OPEN_TIMEOUT_SECONDS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_config_validation() {
        let valid_config = CircuitBreakerConfig::default();
        assert!(valid_config.validate().is_ok());

        let mut invalid_config = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            reset_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            half_open_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_defaults_match_system_constants() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.reset_timeout, Duration::from_secs(60));
        assert_eq!(config.half_open_timeout, Duration::from_secs(5));
    }
}
