//! # Circuit Breaker Manager
//!
//! Registry of circuit breakers keyed by resource name. Breakers are created
//! on first use from the default configuration (or a per-component override)
//! and are never removed, so state survives for the owner's lifetime.

use crate::config::CircuitBreakerSettings;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, SystemCircuitBreakerMetrics};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Manager for circuit breakers across named resources
#[derive(Debug, Clone)]
pub struct CircuitBreakerManager {
    circuit_breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,

    settings: CircuitBreakerSettings,
}

impl CircuitBreakerManager {
    /// Create a manager where every breaker uses the same configuration
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self::from_settings(&CircuitBreakerSettings::from_default(&default_config))
    }

    /// Create a manager from file/environment settings
    pub fn from_settings(settings: &CircuitBreakerSettings) -> Self {
        info!(
            default_failure_threshold = settings.default_config.failure_threshold,
            component_overrides = settings.component_configs.len(),
            "Initializing circuit breaker manager"
        );

        Self {
            circuit_breakers: Arc::new(DashMap::new()),
            settings: settings.clone(),
        }
    }

    /// Get or create circuit breaker for a resource
    pub fn get_circuit_breaker(&self, component_name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.circuit_breakers.get(component_name) {
            return Arc::clone(breaker.value());
        }

        let entry = self
            .circuit_breakers
            .entry(component_name.to_string())
            .or_insert_with(|| {
                let config = self.settings.config_for_component(component_name);
                if let Err(reason) = config.validate() {
                    warn!(
                        component = component_name,
                        reason = %reason,
                        "Invalid circuit breaker configuration, using defaults"
                    );
                    return Arc::new(CircuitBreaker::new(
                        component_name.to_string(),
                        CircuitBreakerConfig::default(),
                    ));
                }
                debug!(component = component_name, "Creating circuit breaker");
                Arc::new(CircuitBreaker::new(component_name.to_string(), config))
            });

        Arc::clone(entry.value())
    }

    /// Names of all breakers created so far
    pub fn list_components(&self) -> Vec<String> {
        self.circuit_breakers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Aggregate metrics across every breaker
    pub fn get_system_metrics(&self) -> SystemCircuitBreakerMetrics {
        SystemCircuitBreakerMetrics::collect(
            self.circuit_breakers
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().metrics())),
        )
    }

    /// Fraction of healthy breakers (1.0 when none exist)
    pub fn system_health_score(&self) -> f64 {
        self.get_system_metrics().health_score()
    }
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::from_settings(&CircuitBreakerSettings::default())
    }
}
