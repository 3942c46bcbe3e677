//! Recovery strategies and the pluggable handler that implements them.

use super::classifier::{ErrorCategory, ErrorContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// What to do after a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Retry,
    Backoff,
    Fallback,
    CircuitBreak,
    Ignore,
    Shutdown,
}

impl RecoveryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStrategy::Retry => "retry",
            RecoveryStrategy::Backoff => "backoff",
            RecoveryStrategy::Fallback => "fallback",
            RecoveryStrategy::CircuitBreak => "circuit_break",
            RecoveryStrategy::Ignore => "ignore",
            RecoveryStrategy::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in strategy for a category
pub fn default_recovery_strategy(category: ErrorCategory) -> RecoveryStrategy {
    match category {
        ErrorCategory::Validation => RecoveryStrategy::Ignore,
        ErrorCategory::Execution => RecoveryStrategy::Retry,
        ErrorCategory::Timeout => RecoveryStrategy::Backoff,
        ErrorCategory::Resource => RecoveryStrategy::CircuitBreak,
        ErrorCategory::External => RecoveryStrategy::Fallback,
        ErrorCategory::Internal | ErrorCategory::Unknown => RecoveryStrategy::Shutdown,
        ErrorCategory::Task => RecoveryStrategy::Ignore,
    }
}

/// The full default category map
pub fn default_recovery_strategies() -> HashMap<ErrorCategory, RecoveryStrategy> {
    ErrorCategory::ALL
        .iter()
        .map(|category| (*category, default_recovery_strategy(*category)))
        .collect()
}

/// Implementation of the active recovery strategies.
///
/// The error handler only routes; retry loops, delays and fallback values
/// belong to whoever owns the failing operation. Every method defaults to
/// logging the decision and producing no value.
#[async_trait]
pub trait RecoveryHandler: Send + Sync + fmt::Debug {
    async fn retry(&self, context: &ErrorContext) -> Option<Value> {
        log_recovery(RecoveryStrategy::Retry, context);
        None
    }

    async fn backoff(&self, context: &ErrorContext) -> Option<Value> {
        log_recovery(RecoveryStrategy::Backoff, context);
        None
    }

    async fn fallback(&self, context: &ErrorContext) -> Option<Value> {
        log_recovery(RecoveryStrategy::Fallback, context);
        None
    }

    async fn circuit_break(&self, context: &ErrorContext) -> Option<Value> {
        log_recovery(RecoveryStrategy::CircuitBreak, context);
        None
    }
}

fn log_recovery(strategy: RecoveryStrategy, context: &ErrorContext) {
    info!(
        strategy = %strategy,
        component = %context.component,
        kind = %context.kind,
        "Recovery strategy selected, no recovery handler action"
    );
}

/// Recovery handler that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRecoveryHandler;

#[async_trait]
impl RecoveryHandler for LoggingRecoveryHandler {}
