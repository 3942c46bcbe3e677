//! Error routing: observers, recovery strategy dispatch, history and shutdown.

use super::classifier::{ErrorCategory, ErrorContext, ErrorKind, ErrorMetadata, ErrorSeverity, TaskError};
use super::strategy::{
    default_recovery_strategies, LoggingRecoveryHandler, RecoveryHandler, RecoveryStrategy,
};
use crate::config::{CircuitBreakerSettings, ErrorHandlingConfig};
use crate::constants::{components, metric_names, system};
use crate::logging::log_error;
use crate::metrics::{noop_sink, MetricKind, MetricsSink};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerManager};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Side-effect hook run for every handled error of a registered kind
#[async_trait]
pub trait ErrorObserver: Send + Sync {
    async fn on_error(&self, context: &ErrorContext) -> anyhow::Result<()>;
}

/// Adapter turning a synchronous closure into an [`ErrorObserver`]
pub struct FnObserver<F>(pub F);

#[async_trait]
impl<F> ErrorObserver for FnObserver<F>
where
    F: Fn(&ErrorContext) -> anyhow::Result<()> + Send + Sync,
{
    async fn on_error(&self, context: &ErrorContext) -> anyhow::Result<()> {
        (self.0)(context)
    }
}

/// Wrap a closure as a shareable observer
pub fn observer_fn<F>(f: F) -> Arc<dyn ErrorObserver>
where
    F: Fn(&ErrorContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnObserver(f))
}

/// Classifies failures and routes them to recovery.
///
/// `handle_error` never fails: observer errors and panics are logged and
/// swallowed, and the recovery outcome is an optional value.
pub struct ErrorHandler {
    observers: RwLock<HashMap<ErrorKind, Vec<Arc<dyn ErrorObserver>>>>,
    strategies: RwLock<HashMap<ErrorCategory, RecoveryStrategy>>,
    recovery: Arc<dyn RecoveryHandler>,
    circuit_breakers: CircuitBreakerManager,
    metrics: Arc<dyn MetricsSink>,
    history: Mutex<VecDeque<ErrorContext>>,
    max_history: usize,
    errors_handled: AtomicU64,
    shutdown: CancellationToken,
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("strategies", &*self.strategies.read())
            .field("recovery", &self.recovery)
            .field("circuit_breakers", &self.circuit_breakers.list_components())
            .field("max_history", &self.max_history)
            .field("errors_handled", &self.errors_handled.load(Ordering::Relaxed))
            .field("is_shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::with_parts(
            CircuitBreakerManager::new(CircuitBreakerConfig::default()),
            system::DEFAULT_ERROR_HISTORY_SIZE,
            HashMap::new(),
        )
    }

    /// Build from configuration; configured strategies override the defaults
    pub fn from_config(config: &ErrorHandlingConfig, breakers: &CircuitBreakerSettings) -> Self {
        Self::with_parts(
            CircuitBreakerManager::from_settings(breakers),
            config.max_history,
            config.recovery_strategies.clone(),
        )
    }

    fn with_parts(
        circuit_breakers: CircuitBreakerManager,
        max_history: usize,
        overrides: HashMap<ErrorCategory, RecoveryStrategy>,
    ) -> Self {
        let mut strategies = default_recovery_strategies();
        strategies.extend(overrides);

        Self {
            observers: RwLock::new(HashMap::new()),
            strategies: RwLock::new(strategies),
            recovery: Arc::new(LoggingRecoveryHandler),
            circuit_breakers,
            metrics: noop_sink(),
            history: Mutex::new(VecDeque::new()),
            max_history,
            errors_handled: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_recovery_handler(mut self, recovery: Arc<dyn RecoveryHandler>) -> Self {
        self.recovery = recovery;
        self
    }

    /// Register a side-effect observer for one error kind
    pub fn register_handler(&self, kind: ErrorKind, observer: Arc<dyn ErrorObserver>) {
        self.observers.write().entry(kind).or_default().push(observer);
        debug!(kind = %kind, "Registered error observer");
    }

    pub fn set_recovery_strategy(&self, category: ErrorCategory, strategy: RecoveryStrategy) {
        self.strategies.write().insert(category, strategy);
        debug!(category = %category, strategy = %strategy, "Recovery strategy updated");
    }

    pub fn recovery_strategy(&self, category: ErrorCategory) -> RecoveryStrategy {
        self.strategies
            .read()
            .get(&category)
            .copied()
            .unwrap_or(RecoveryStrategy::Ignore)
    }

    /// Breaker for a named resource, created on first use
    pub fn get_circuit_breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        self.circuit_breakers.get_circuit_breaker(name)
    }

    pub fn circuit_breakers(&self) -> &CircuitBreakerManager {
        &self.circuit_breakers
    }

    /// Classify, record, notify observers and apply the recovery strategy
    pub async fn handle_error(&self, error: &TaskError, metadata: ErrorMetadata) -> Option<Value> {
        let context = ErrorContext::from_error(error, metadata);
        self.errors_handled.fetch_add(1, Ordering::Relaxed);

        match context.severity {
            ErrorSeverity::Fatal | ErrorSeverity::High => {
                let operation = context
                    .metadata
                    .get("operation")
                    .and_then(Value::as_str)
                    .unwrap_or("handle_error");
                let classification =
                    format!("{}/{}/{}", context.kind, context.severity, context.category);
                log_error(
                    &context.component,
                    operation,
                    &context.message,
                    Some(classification.as_str()),
                );
            }
            ErrorSeverity::Medium | ErrorSeverity::Low => warn!(
                component = %context.component,
                kind = %context.kind,
                severity = %context.severity,
                category = %context.category,
                error = %context.message,
                "Error handled"
            ),
        }

        self.metrics.record(
            metric_names::ERRORS_TOTAL,
            1.0,
            MetricKind::Counter,
            &context.component,
            &[
                ("severity", context.severity.as_str()),
                ("category", context.category.as_str()),
                ("kind", context.kind.as_str()),
            ],
        );

        self.record_history(context.clone());
        self.notify_observers(&context).await;

        let strategy = self.recovery_strategy(context.category);
        match AssertUnwindSafe(self.apply_strategy(strategy, &context))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    component = %context.component,
                    strategy = %strategy,
                    "Recovery handler panicked"
                );
                None
            }
        }
    }

    async fn notify_observers(&self, context: &ErrorContext) {
        let observers = self
            .observers
            .read()
            .get(&context.kind)
            .cloned()
            .unwrap_or_default();

        for observer in observers {
            match AssertUnwindSafe(observer.on_error(context)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(
                    component = %context.component,
                    kind = %context.kind,
                    error = %e,
                    "Error observer failed"
                ),
                Err(_) => error!(
                    component = %context.component,
                    kind = %context.kind,
                    "Error observer panicked"
                ),
            }
        }
    }

    async fn apply_strategy(&self, strategy: RecoveryStrategy, context: &ErrorContext) -> Option<Value> {
        debug!(
            strategy = %strategy,
            component = %context.component,
            "Applying recovery strategy"
        );

        match strategy {
            RecoveryStrategy::Retry => self.recovery.retry(context).await,
            RecoveryStrategy::Backoff => self.recovery.backoff(context).await,
            RecoveryStrategy::Fallback => self.recovery.fallback(context).await,
            RecoveryStrategy::CircuitBreak => {
                let breaker = self.get_circuit_breaker(&context.component);
                breaker.record_failure();
                if breaker.is_open() {
                    self.metrics.record(
                        metric_names::CIRCUIT_BREAKER_OPENED,
                        1.0,
                        MetricKind::Counter,
                        components::ERROR_HANDLER,
                        &[("breaker", context.component.as_str())],
                    );
                }

                let system = self.circuit_breakers.get_system_metrics();
                let health = system.health_score();
                self.metrics.record(
                    metric_names::CIRCUIT_BREAKER_HEALTH,
                    health,
                    MetricKind::Gauge,
                    components::ERROR_HANDLER,
                    &[],
                );
                let open = system.open_components();
                if !open.is_empty() {
                    warn!(
                        open_breakers = ?open,
                        health_score = health,
                        "⚡ Circuit breakers rejecting calls"
                    );
                }

                self.recovery.circuit_break(context).await
            }
            RecoveryStrategy::Ignore => None,
            RecoveryStrategy::Shutdown => {
                self.shutdown();
                None
            }
        }
    }

    fn record_history(&self, context: ErrorContext) {
        if self.max_history == 0 {
            return;
        }
        let mut history = self.history.lock();
        if history.len() >= self.max_history {
            history.pop_front();
        }
        history.push_back(context);
    }

    /// Handled errors, newest first, optionally filtered
    pub fn get_error_history(
        &self,
        component: Option<&str>,
        severity: Option<ErrorSeverity>,
        limit: usize,
    ) -> Vec<ErrorContext> {
        self.history
            .lock()
            .iter()
            .rev()
            .filter(|ctx| component.map_or(true, |c| ctx.component == c))
            .filter(|ctx| severity.map_or(true, |s| ctx.severity == s))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn errors_handled(&self) -> u64 {
        self.errors_handled.load(Ordering::Relaxed)
    }

    /// Signal the owning subsystem to stop accepting work (idempotent)
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            info!("🛑 Error handler initiated shutdown");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
