//! # System Constants
//!
//! Core constants and enums that define the operational vocabulary of the
//! coordinator: task lifecycle states, feedback event names, metric names and
//! the defaults every configuration section falls back to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a coordinated task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Waiting on dependencies (or not yet picked up by an execution unit)
    Pending,
    /// Dependencies satisfied; queued for or holding a concurrency permit
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal states are recorded into the completed-task history
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback event names emitted at each task transition
pub mod events {
    pub const TASK_SUBMITTED: &str = "task.submitted";
    pub const TASK_STARTED: &str = "task.started";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const TASK_FAILED: &str = "task.failed";
    pub const TASK_CANCELLED: &str = "task.cancelled";
}

/// Metric names recorded through the metrics sink
pub mod metric_names {
    pub const TASK_SUBMISSIONS: &str = "task_submissions";
    pub const TASK_COMPLETIONS: &str = "task_completions";
    pub const TASK_FAILURES: &str = "task_failures";
    pub const TASK_CANCELLATIONS: &str = "task_cancellations";
    pub const TASK_EXECUTION: &str = "task_execution";
    pub const ERRORS_TOTAL: &str = "errors_total";
    pub const CIRCUIT_BREAKER_OPENED: &str = "circuit_breaker_opened";
    pub const CIRCUIT_BREAKER_HEALTH: &str = "circuit_breaker_health";
}

/// Component names used for metric labels and error contexts
pub mod components {
    pub const TASK_COORDINATOR: &str = "task_coordinator";
    pub const ERROR_HANDLER: &str = "error_handler";
}

/// System defaults
pub mod system {
    pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 10;
    pub const DEFAULT_TASK_HISTORY_SIZE: usize = 1000;
    pub const DEFAULT_TASK_HISTORY_TTL_SECONDS: u64 = 24 * 60 * 60;
    pub const DEFAULT_TASK_PRIORITY: i32 = 1;

    pub const DEFAULT_CACHE_MAX_SIZE: usize = 1000;
    pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 60 * 60;
    pub const DEFAULT_CACHE_CLEANUP_INTERVAL_SECONDS: u64 = 60;
    pub const CACHE_CLEANUP_ERROR_PAUSE_SECONDS: u64 = 5;

    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
    pub const DEFAULT_RESET_TIMEOUT_SECONDS: f64 = 60.0;
    pub const DEFAULT_HALF_OPEN_TIMEOUT_SECONDS: f64 = 5.0;

    pub const DEFAULT_ERROR_HISTORY_SIZE: usize = 1000;
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;
    pub const DEFAULT_METRICS_WINDOW_SECONDS: u64 = 60;
}
