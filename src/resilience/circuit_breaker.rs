//! # Circuit Breaker Implementation
//!
//! Per-resource failure gate with three states: Closed (normal operation),
//! Open (failing fast) and an implicit Half-Open (one trial call after the
//! reset timeout has elapsed since the last failure).
//!
//! The breaker never alters the wrapped operation's own outcome. The only
//! synthetic errors it produces are [`CircuitBreakerError::CircuitOpen`] for a
//! short-circuited call and [`CircuitBreakerError::TrialTimedOut`] when a
//! half-open trial exceeds its bound.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lock-free counters for call accounting, kept outside the state mutex.
#[derive(Debug)]
struct AtomicCircuitBreakerMetrics {
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    rejected_count: AtomicU64,
    total_duration_nanos: AtomicU64,
}

impl AtomicCircuitBreakerMetrics {
    fn new() -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            total_duration_nanos: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_success(&self, duration: Duration) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.total_duration_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    #[inline]
    fn record_failure(&self, duration: Duration) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.total_duration_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    #[inline]
    fn record_rejection(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, state: CircuitState, consecutive_failures: u32) -> CircuitBreakerMetrics {
        let total_calls = self.total_calls.load(Ordering::Relaxed);
        let success_count = self.success_count.load(Ordering::Relaxed);
        let failure_count = self.failure_count.load(Ordering::Relaxed);
        let total_duration_nanos = self.total_duration_nanos.load(Ordering::Relaxed);

        let average_duration = total_duration_nanos
            .checked_div(total_calls)
            .map_or(Duration::ZERO, Duration::from_nanos);

        CircuitBreakerMetrics {
            state,
            calls: total_calls,
            successes: success_count,
            failures: failure_count,
            rejections: self.rejected_count.load(Ordering::Relaxed),
            consecutive_failures,
            average_duration,
        }
    }
}

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Reset timeout elapsed (or a trial is in flight) - one call decides recovery
    HalfOpen,
}

/// Errors surfaced by [`CircuitBreaker::execute`]
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, the operation was not invoked
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Half-open trial exceeded its time bound and was abandoned
    #[error("Half-open trial for {component} timed out after {timeout:?}")]
    TrialTimedOut { component: String, timeout: Duration },

    /// The wrapped operation's own error
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    /// True only for the synthetic open-circuit rejection
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }
}

#[derive(Debug)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
    is_open: bool,
    trial_in_flight: bool,
}

enum Admission {
    Pass,
    Trial,
}

/// Per-resource circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Resource name for logging and metrics
    name: String,

    config: CircuitBreakerConfig,

    /// Mutated only inside short, non-suspending critical sections
    state: Mutex<BreakerState>,

    metrics: AtomicCircuitBreakerMetrics,
}

/// Clears the in-flight trial flag if the trial future is dropped mid-flight.
struct TrialGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.state.lock().trial_in_flight = false;
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            reset_timeout_ms = config.reset_timeout.as_millis() as u64,
            half_open_timeout_ms = config.half_open_timeout.as_millis() as u64,
            "Circuit breaker initialized"
        );

        Self {
            name,
            config,
            state: Mutex::new(BreakerState {
                failure_count: 0,
                last_failure_time: None,
                is_open: false,
                trial_in_flight: false,
            }),
            metrics: AtomicCircuitBreakerMetrics::new(),
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        let state = self.state.lock();
        if !state.is_open {
            CircuitState::Closed
        } else if state.trial_in_flight || self.reset_timeout_elapsed(&state) {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().is_open
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    /// Execute an operation with circuit breaker protection
    pub async fn execute<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.admit();
        let start_time = Instant::now();

        match admission {
            None => {
                self.metrics.record_rejection();
                debug!(component = %self.name, "Call rejected, circuit open");
                Err(CircuitBreakerError::CircuitOpen {
                    component: self.name.clone(),
                })
            }
            Some(Admission::Pass) => {
                let result = operation().await;
                let duration = start_time.elapsed();
                match &result {
                    Ok(_) => self.on_success(duration),
                    Err(_) => self.on_failure(duration),
                }
                result.map_err(CircuitBreakerError::OperationFailed)
            }
            Some(Admission::Trial) => {
                let mut guard = TrialGuard {
                    breaker: self,
                    armed: true,
                };
                info!(component = %self.name, "Circuit half-open, attempting trial call");

                let outcome =
                    tokio::time::timeout(self.config.half_open_timeout, operation()).await;
                let duration = start_time.elapsed();
                guard.armed = false;

                match outcome {
                    Ok(Ok(value)) => {
                        self.on_success(duration);
                        Ok(value)
                    }
                    Ok(Err(error)) => {
                        self.on_failure(duration);
                        Err(CircuitBreakerError::OperationFailed(error))
                    }
                    Err(_) => {
                        self.on_failure(duration);
                        warn!(
                            component = %self.name,
                            timeout_ms = self.config.half_open_timeout.as_millis() as u64,
                            "Half-open trial timed out"
                        );
                        Err(CircuitBreakerError::TrialTimedOut {
                            component: self.name.clone(),
                            timeout: self.config.half_open_timeout,
                        })
                    }
                }
            }
        }
    }

    fn reset_timeout_elapsed(&self, state: &BreakerState) -> bool {
        match state.last_failure_time {
            Some(at) => at.elapsed() >= self.config.reset_timeout,
            None => true,
        }
    }

    /// Decide whether a call may proceed; `None` means short-circuit.
    fn admit(&self) -> Option<Admission> {
        let mut state = self.state.lock();
        if !state.is_open {
            return Some(Admission::Pass);
        }
        if state.trial_in_flight || !self.reset_timeout_elapsed(&state) {
            return None;
        }
        state.trial_in_flight = true;
        Some(Admission::Trial)
    }

    fn on_success(&self, duration: Duration) {
        self.metrics.record_success(duration);
        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Operation succeeded"
        );
        self.record_success();
    }

    fn on_failure(&self, duration: Duration) {
        self.metrics.record_failure(duration);
        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Operation failed"
        );
        self.record_failure();
    }

    /// Record a success observed outside `execute`; closes the circuit.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        let was_open = state.is_open;
        state.failure_count = 0;
        state.last_failure_time = None;
        state.is_open = false;
        state.trial_in_flight = false;
        drop(state);

        if was_open {
            info!(component = %self.name, "Circuit breaker closed (recovered)");
        }
    }

    /// Record a failure observed outside `execute`; may open the circuit.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_time = Some(Instant::now());
        state.trial_in_flight = false;

        if !state.is_open && state.failure_count >= self.config.failure_threshold {
            state.is_open = true;
            let failures = state.failure_count;
            drop(state);
            warn!(
                component = %self.name,
                failure_count = failures,
                failure_threshold = self.config.failure_threshold,
                "Circuit breaker opened (failing fast)"
            );
        }
    }

    /// Force circuit to open state
    pub fn force_open(&self) {
        let mut state = self.state.lock();
        state.failure_count = state.failure_count.max(self.config.failure_threshold);
        state.last_failure_time = Some(Instant::now());
        state.is_open = true;
        drop(state);
        warn!(component = %self.name, "Circuit breaker forced open");
    }

    /// Force circuit to closed state
    pub fn force_closed(&self) {
        warn!(component = %self.name, "Circuit breaker forced closed");
        self.record_success();
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let consecutive_failures = self.failure_count();
        self.metrics.snapshot(self.state(), consecutive_failures)
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::time::sleep;

    fn test_config(failure_threshold: u32, reset_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            reset_timeout: Duration::from_millis(reset_ms),
            half_open_timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn test_circuit_breaker_normal_operation() {
        let circuit = CircuitBreaker::new("test".to_string(), test_config(3, 100));

        assert_eq!(circuit.state(), CircuitState::Closed);

        let result = circuit.execute(|| async { Ok::<_, String>("success") }).await;
        assert_eq!(result.unwrap(), "success");

        let metrics = circuit.metrics();
        assert_eq!(metrics.calls, 1);
        assert_eq!(metrics.successes, 1);
        assert_eq!(metrics.failures, 0);
    }

    #[tokio::test]
    async fn test_operation_error_is_forwarded() {
        let circuit = CircuitBreaker::new("test".to_string(), test_config(3, 100));

        let result = circuit
            .execute(|| async { Err::<(), _>("boom".to_string()) })
            .await;

        match result {
            Err(CircuitBreakerError::OperationFailed(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(circuit.failure_count(), 1);
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_opens_at_threshold_and_short_circuits() {
        let circuit = CircuitBreaker::new("test".to_string(), test_config(2, 10_000));
        let invocations = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let invocations = invocations.clone();
            let _ = circuit
                .execute(|| async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("error")
                })
                .await;
        }
        assert_eq!(circuit.state(), CircuitState::Open);
        assert!(circuit.is_open());

        let counter = invocations.clone();
        let result = circuit
            .execute(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>("should not execute")
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
        assert!(result.unwrap_err().is_circuit_open());
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
        assert_eq!(circuit.metrics().rejections, 1);
    }

    #[tokio::test]
    async fn test_success_in_closed_resets_failure_count() {
        let circuit = CircuitBreaker::new("test".to_string(), test_config(3, 100));

        let _ = circuit.execute(|| async { Err::<(), _>("error") }).await;
        let _ = circuit.execute(|| async { Err::<(), _>("error") }).await;
        assert_eq!(circuit.failure_count(), 2);

        let _ = circuit.execute(|| async { Ok::<_, &str>(()) }).await;
        assert_eq!(circuit.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_trial_closes_circuit() {
        let circuit = CircuitBreaker::new("test".to_string(), test_config(1, 50));

        let _ = circuit.execute(|| async { Err::<String, _>("error") }).await;
        assert_eq!(circuit.state(), CircuitState::Open);

        sleep(Duration::from_millis(60)).await;
        assert_eq!(circuit.state(), CircuitState::HalfOpen);

        let result = circuit.execute(|| async { Ok::<_, &str>("success") }).await;
        assert!(result.is_ok());
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(circuit.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_trial_stays_open_and_refreshes_cooldown() {
        let circuit = CircuitBreaker::new("test".to_string(), test_config(1, 50));

        let _ = circuit.execute(|| async { Err::<(), _>("error") }).await;
        sleep(Duration::from_millis(60)).await;

        let result = circuit.execute(|| async { Err::<(), _>("still down") }).await;
        assert!(matches!(result, Err(CircuitBreakerError::OperationFailed(_))));
        assert_eq!(circuit.state(), CircuitState::Open);
        assert_eq!(circuit.failure_count(), 2);

        // Cooldown restarted from the failed trial
        let result = circuit.execute(|| async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_trial_timeout_is_synthetic_error() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_millis(20),
            half_open_timeout: Duration::from_millis(30),
        };
        let circuit = CircuitBreaker::new("slow".to_string(), config);

        let _ = circuit.execute(|| async { Err::<(), _>("error") }).await;
        sleep(Duration::from_millis(30)).await;

        let result = circuit
            .execute(|| async {
                sleep(Duration::from_millis(200)).await;
                Ok::<_, &str>(())
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::TrialTimedOut { .. })));
        assert!(circuit.is_open());
    }

    #[tokio::test]
    async fn test_force_operations() {
        let circuit = CircuitBreaker::new("test".to_string(), test_config(1, 1000));

        circuit.force_open();
        assert_eq!(circuit.state(), CircuitState::Open);
        assert!(circuit.failure_count() >= 1);

        circuit.force_closed();
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(circuit.failure_count(), 0);
    }
}
