use crate::constants::{events, TaskStatus};
use crate::coordinator::{Task, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Event name, one of the `constants::events` values
    pub name: String,
    pub task_id: TaskId,
    pub task_name: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub error: Option<String>,
    pub duration_ms: Option<f64>,
    pub emitted_at: DateTime<Utc>,
}

impl TaskEvent {
    /// Build an event describing `task` in its current state
    pub fn for_task(name: &str, task: &Task) -> Self {
        let duration_ms = match (task.started_at, task.completed_at) {
            (Some(started), Some(completed)) => {
                Some((completed - started).num_microseconds().unwrap_or(0) as f64 / 1000.0)
            }
            _ => None,
        };

        Self {
            name: name.to_string(),
            task_id: task.id,
            task_name: task.name.clone(),
            status: task.status,
            priority: task.priority,
            error: task.error.as_ref().map(ToString::to_string),
            duration_ms,
            emitted_at: Utc::now(),
        }
    }

    /// Event name for a terminal status
    pub fn name_for_status(status: TaskStatus) -> &'static str {
        match status {
            TaskStatus::Pending => events::TASK_SUBMITTED,
            TaskStatus::Running => events::TASK_STARTED,
            TaskStatus::Completed => events::TASK_COMPLETED,
            TaskStatus::Failed => events::TASK_FAILED,
            TaskStatus::Cancelled => events::TASK_CANCELLED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_by_status() {
        assert_eq!(TaskEvent::name_for_status(TaskStatus::Completed), "task.completed");
        assert_eq!(TaskEvent::name_for_status(TaskStatus::Cancelled), "task.cancelled");
        assert_eq!(TaskEvent::name_for_status(TaskStatus::Pending), "task.submitted");
    }
}
