//! Breaker call accounting snapshots and the registry-wide health view.

use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Failure rate above which a closed breaker is reported unhealthy
const UNHEALTHY_FAILURE_RATE: f64 = 0.1;

/// Point-in-time view of one breaker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    /// Calls that reached the wrapped operation
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    /// Calls short-circuited while open
    pub rejections: u64,
    /// Failure count currently driving the open decision
    pub consecutive_failures: u32,
    pub average_duration: Duration,
}

impl CircuitBreakerMetrics {
    pub fn failure_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.failures as f64 / self.calls as f64
        }
    }

    /// Open breakers are unhealthy; a half-open one is given the benefit of
    /// its pending trial.
    pub fn is_healthy(&self) -> bool {
        match self.state {
            CircuitState::Closed => self.failure_rate() < UNHEALTHY_FAILURE_RATE,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        }
    }
}

/// Snapshot of every breaker in a registry
#[derive(Debug, Clone, Serialize)]
pub struct SystemCircuitBreakerMetrics {
    pub breakers: BTreeMap<String, CircuitBreakerMetrics>,
    pub collected_at: DateTime<Utc>,
}

impl SystemCircuitBreakerMetrics {
    pub fn collect(breakers: impl IntoIterator<Item = (String, CircuitBreakerMetrics)>) -> Self {
        Self {
            breakers: breakers.into_iter().collect(),
            collected_at: Utc::now(),
        }
    }

    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();
        for metrics in self.breakers.values() {
            *counts.entry(metrics.state).or_insert(0) += 1;
        }
        counts
    }

    /// Names of breakers currently rejecting calls, sorted
    pub fn open_components(&self) -> Vec<&str> {
        self.breakers
            .iter()
            .filter(|(_, metrics)| metrics.state == CircuitState::Open)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Fraction of healthy breakers, 1.0 for an empty registry
    pub fn health_score(&self) -> f64 {
        if self.breakers.is_empty() {
            return 1.0;
        }
        let healthy = self.breakers.values().filter(|m| m.is_healthy()).count();
        healthy as f64 / self.breakers.len() as f64
    }
}
