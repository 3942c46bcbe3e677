//! Task records, submission requests and the status report shape.

use crate::constants::{system, TaskStatus};
use crate::error_handling::TaskError;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

pub type TaskId = Uuid;

/// Outcome of a unit of work
pub type TaskResult = Result<Value, TaskError>;

/// A deferred unit of work, consumed when the task starts
pub type TaskWork = BoxFuture<'static, TaskResult>;

/// Bookkeeping record for one submitted task.
///
/// The work itself is not part of the record; it lives beside it in the
/// coordinator's pending map until the task starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Ids that must reach COMPLETED before this task may start; only shrinks
    pub dependencies: HashSet<TaskId>,
    /// Advisory only, never affects scheduling order
    pub priority: i32,
    pub timeout: Option<Duration>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<TaskError>,
    pub result: Option<Value>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        dependencies: HashSet<TaskId>,
        priority: i32,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            dependencies,
            priority,
            timeout,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            result: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn finish(&mut self, status: TaskStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    /// Elapsed time between start and completion, if both happened
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.completed_at? - self.started_at?)
    }
}

/// Everything needed to submit a task
pub struct TaskRequest {
    pub(crate) name: String,
    pub(crate) work: TaskWork,
    pub(crate) dependencies: HashSet<TaskId>,
    pub(crate) priority: i32,
    pub(crate) timeout: Option<Duration>,
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TaskRequest {
    pub fn new<F>(name: impl Into<String>, work: F) -> Self
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            work: work.boxed(),
            dependencies: HashSet::new(),
            priority: system::DEFAULT_TASK_PRIORITY,
            timeout: None,
        }
    }

    pub fn depends_on(mut self, task_id: TaskId) -> Self {
        self.dependencies.insert(task_id);
        self
    }

    pub fn with_dependencies(mut self, task_ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies.extend(task_ids);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Externally visible status of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub task_id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub dependencies: Vec<TaskId>,
    pub result: Option<Value>,
}

impl From<&Task> for TaskStatusReport {
    fn from(task: &Task) -> Self {
        let mut dependencies: Vec<TaskId> = task.dependencies.iter().copied().collect();
        dependencies.sort();

        Self {
            task_id: task.id,
            name: task.name.clone(),
            status: task.status,
            priority: task.priority,
            created_at: task.created_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
            error: task.error.as_ref().map(ToString::to_string),
            dependencies,
            result: task.result.clone(),
        }
    }
}

/// Point-in-time coordinator load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub pending_tasks: usize,
    pub running_tasks: usize,
    pub completed_tasks: usize,
    pub available_permits: usize,
}
