//! Error taxonomy and classification.

use crate::resilience::CircuitBreakerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Closed set of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Execution,
    Timeout,
    Resource,
    ResourceExhausted,
    External,
    CircuitOpen,
    Task,
    Internal,
    Interrupted,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Execution => "execution",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Resource => "resource",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::External => "external",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::Task => "task",
            ErrorKind::Internal => "internal",
            ErrorKind::Interrupted => "interrupted",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bad a failure is; ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Fatal,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a failure came from; keys the recovery strategy map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Execution,
    Timeout,
    Resource,
    External,
    Internal,
    Task,
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 8] = [
        ErrorCategory::Validation,
        ErrorCategory::Execution,
        ErrorCategory::Timeout,
        ErrorCategory::Resource,
        ErrorCategory::External,
        ErrorCategory::Internal,
        ErrorCategory::Task,
        ErrorCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Execution => "execution",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Resource => "resource",
            ErrorCategory::External => "external",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Task => "task",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve severity and category for an error kind
pub fn classify(kind: ErrorKind) -> (ErrorSeverity, ErrorCategory) {
    match kind {
        ErrorKind::Interrupted => (ErrorSeverity::Fatal, ErrorCategory::Unknown),
        ErrorKind::ResourceExhausted => (ErrorSeverity::High, ErrorCategory::Resource),
        ErrorKind::Execution => (ErrorSeverity::High, ErrorCategory::Execution),
        ErrorKind::Internal => (ErrorSeverity::High, ErrorCategory::Internal),
        ErrorKind::Timeout => (ErrorSeverity::Medium, ErrorCategory::Timeout),
        ErrorKind::CircuitOpen => (ErrorSeverity::Medium, ErrorCategory::External),
        ErrorKind::Validation => (ErrorSeverity::Low, ErrorCategory::Validation),
        ErrorKind::Resource => (ErrorSeverity::Low, ErrorCategory::Resource),
        ErrorKind::External => (ErrorSeverity::Low, ErrorCategory::External),
        ErrorKind::Task => (ErrorSeverity::Low, ErrorCategory::Task),
        ErrorKind::Unknown => (ErrorSeverity::Low, ErrorCategory::Unknown),
    }
}

/// Failure produced by a unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct TaskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::External, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Generic work failure; the default kind for errors raised by task work
    pub fn task(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Task, message)
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("Task timed out after {:.3}s", limit.as_secs_f64()),
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        classify(self.kind).0
    }

    pub fn category(&self) -> ErrorCategory {
        classify(self.kind).1
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(error: anyhow::Error) -> Self {
        TaskError::task(format!("{error:#}"))
    }
}

impl From<CircuitBreakerError<TaskError>> for TaskError {
    fn from(error: CircuitBreakerError<TaskError>) -> Self {
        match error {
            CircuitBreakerError::CircuitOpen { .. } => {
                TaskError::new(ErrorKind::CircuitOpen, error.to_string())
            }
            CircuitBreakerError::TrialTimedOut { .. } => {
                TaskError::new(ErrorKind::Timeout, error.to_string())
            }
            CircuitBreakerError::OperationFailed(inner) => inner,
        }
    }
}

/// Caller-supplied context for one failure
#[derive(Debug, Clone, Default)]
pub struct ErrorMetadata {
    pub component: Option<String>,
    pub fields: HashMap<String, Value>,
}

impl ErrorMetadata {
    pub fn for_component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            fields: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Immutable record of one handled failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
    pub message: String,
    pub severity: ErrorSeverity,
    pub category: ErrorCategory,
    pub component: String,
    pub metadata: HashMap<String, Value>,
}

impl ErrorContext {
    pub fn from_error(error: &TaskError, metadata: ErrorMetadata) -> Self {
        let (severity, category) = classify(error.kind);
        Self {
            timestamp: Utc::now(),
            kind: error.kind,
            message: error.message.clone(),
            severity,
            category,
            component: metadata.component.unwrap_or_else(|| "unknown".to_string()),
            metadata: metadata.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitBreakerError;
    use serde_json::json;

    #[test]
    fn test_classification_table() {
        assert_eq!(
            classify(ErrorKind::Interrupted),
            (ErrorSeverity::Fatal, ErrorCategory::Unknown)
        );
        assert_eq!(
            classify(ErrorKind::ResourceExhausted),
            (ErrorSeverity::High, ErrorCategory::Resource)
        );
        assert_eq!(
            classify(ErrorKind::Timeout),
            (ErrorSeverity::Medium, ErrorCategory::Timeout)
        );
        assert_eq!(
            classify(ErrorKind::CircuitOpen),
            (ErrorSeverity::Medium, ErrorCategory::External)
        );
        assert_eq!(
            classify(ErrorKind::Validation),
            (ErrorSeverity::Low, ErrorCategory::Validation)
        );
        assert_eq!(
            classify(ErrorKind::Task),
            (ErrorSeverity::Low, ErrorCategory::Task)
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Fatal > ErrorSeverity::High);
        assert!(ErrorSeverity::Medium > ErrorSeverity::Low);
    }

    #[test]
    fn test_task_error_display_and_timeout() {
        let error = TaskError::timeout(Duration::from_millis(100));
        assert_eq!(error.kind, ErrorKind::Timeout);
        assert_eq!(error.to_string(), "timeout error: Task timed out after 0.100s");
        assert_eq!(error.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn test_breaker_errors_convert_to_distinct_kinds() {
        let open: TaskError = CircuitBreakerError::<TaskError>::CircuitOpen {
            component: "api".to_string(),
        }
        .into();
        assert_eq!(open.kind, ErrorKind::CircuitOpen);

        let passthrough: TaskError =
            CircuitBreakerError::OperationFailed(TaskError::external("boom")).into();
        assert_eq!(passthrough, TaskError::external("boom"));
    }

    #[test]
    fn test_anyhow_errors_become_task_errors() {
        let error: TaskError = anyhow::anyhow!("work failed").into();
        assert_eq!(error.kind, ErrorKind::Task);
        assert_eq!(error.message, "work failed");
    }

    #[test]
    fn test_context_defaults_component() {
        let context = ErrorContext::from_error(
            &TaskError::validation("bad input"),
            ErrorMetadata::default().with("task_id", json!("abc")),
        );
        assert_eq!(context.component, "unknown");
        assert_eq!(context.severity, ErrorSeverity::Low);
        assert_eq!(context.metadata["task_id"], json!("abc"));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::ResourceExhausted).unwrap(),
            "\"resource_exhausted\""
        );
        let category: ErrorCategory = serde_json::from_str("\"external\"").unwrap();
        assert_eq!(category, ErrorCategory::External);
    }
}
