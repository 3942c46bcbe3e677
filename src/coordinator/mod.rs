//! # Task Coordinator
//!
//! Dependency-aware execution of asynchronous work under a concurrency bound.
//!
//! ## Lifecycle
//!
//! ```text
//! submit ──> PENDING ──deps met──> RUNNING ──> COMPLETED ──> releases dependents
//!               │                     │   └──> FAILED     (dependents keep waiting)
//!               └──cancel──> CANCELLED <──cancel
//! ```
//!
//! A task flips to RUNNING before it holds a concurrency permit; the permit
//! bounds how many units of work execute at once. Terminal tasks move into a
//! bounded, auto-expiring history cache, so status queries for long-finished
//! tasks eventually return `None`.
//!
//! Dependencies are re-checked on every completion rather than resolved up
//! front. Priority is advisory and only reported.
//!
//! ## Example
//!
//! ```rust,no_run
//! use arcana_core::coordinator::{TaskCoordinator, TaskRequest};
//! use serde_json::json;
//!
//! # async fn example() -> arcana_core::Result<()> {
//! let coordinator = TaskCoordinator::new(4)?;
//! let fetch = coordinator.submit_task(TaskRequest::new("fetch", async { Ok(json!([1, 2, 3])) }))?;
//! let report = coordinator.submit_task(
//!     TaskRequest::new("report", async { Ok(json!("done")) }).depends_on(fetch),
//! )?;
//!
//! let status = coordinator.wait_for_task(report).await;
//! # Ok(())
//! # }
//! ```

pub mod scheduler;
pub mod task;

pub use scheduler::{TaskCoordinator, TaskCoordinatorBuilder};
pub use task::{Task, TaskId, TaskMetrics, TaskRequest, TaskResult, TaskStatusReport, TaskWork};
