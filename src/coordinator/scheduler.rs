//! Task coordinator: submission, dependency release, bounded execution and
//! cancellation.

use super::task::{Task, TaskId, TaskMetrics, TaskRequest, TaskStatusReport, TaskWork};
use crate::cache::Cache;
use crate::config::{ArcanaConfig, CoordinatorConfig};
use crate::constants::{components, events, metric_names, TaskStatus};
use crate::error::{CoordinatorError, Result};
use crate::error_handling::{ErrorHandler, ErrorKind, ErrorMetadata, TaskError};
use crate::events::{EventPublisher, FeedbackSink, TaskEvent};
use crate::logging::log_task_operation;
use crate::metrics::{noop_sink, MetricKind, MetricTimer, MetricsSink};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// A panicking work unit fails its task like any other execution error
fn panic_error(payload: &(dyn Any + Send)) -> TaskError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    TaskError::new(ErrorKind::Execution, format!("task panicked: {detail}"))
}

struct PendingTask {
    task: Task,
    work: TaskWork,
    /// Submission order; dependents released together start in this order
    sequence: u64,
}

struct RunningTask {
    task: Task,
    cancel: CancellationToken,
}

#[derive(Default)]
struct CoordinatorState {
    pending: HashMap<TaskId, PendingTask>,
    running: HashMap<TaskId, RunningTask>,
    next_sequence: u64,
}

struct CoordinatorInner {
    state: Mutex<CoordinatorState>,
    completed: Cache<Task>,
    semaphore: Arc<Semaphore>,
    max_concurrent_tasks: usize,
    default_timeout: Option<Duration>,
    error_handler: Arc<ErrorHandler>,
    metrics: Arc<dyn MetricsSink>,
    feedback: Option<Arc<dyn FeedbackSink>>,
    events: Option<EventPublisher>,
    terminal: Notify,
    stopped: AtomicBool,
}

/// Dependency-aware task coordinator.
///
/// Every task lives in exactly one of pending, running or the completed
/// history. All three move under one lock, so no caller ever observes a task
/// in two places or in none while it is in flight. Cloning is cheap and
/// clones share state.
#[derive(Clone)]
pub struct TaskCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl fmt::Debug for TaskCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TaskCoordinator")
            .field("max_concurrent_tasks", &self.inner.max_concurrent_tasks)
            .field("pending", &state.pending.len())
            .field("running", &state.running.len())
            .field("completed", &self.inner.completed.len())
            .field("stopped", &self.inner.stopped.load(Ordering::Acquire))
            .finish()
    }
}

/// Fluent construction of a [`TaskCoordinator`]
#[derive(Debug, Default)]
pub struct TaskCoordinatorBuilder {
    config: CoordinatorConfig,
    error_handler: Option<Arc<ErrorHandler>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    feedback: Option<Arc<dyn FeedbackSink>>,
    events: Option<EventPublisher>,
}

impl TaskCoordinatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, max_concurrent_tasks: usize) -> Self {
        self.config.max_concurrent_tasks = max_concurrent_tasks;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_task_timeout_seconds = Some(timeout.as_secs_f64());
        self
    }

    pub fn with_error_handler(mut self, error_handler: Arc<ErrorHandler>) -> Self {
        self.error_handler = Some(error_handler);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackSink>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Publish lifecycle events on a broadcast channel callers can subscribe to
    pub fn with_event_publisher(mut self, publisher: EventPublisher) -> Self {
        self.feedback = Some(Arc::new(publisher.clone()));
        self.events = Some(publisher);
        self
    }

    /// Build the coordinator
    pub fn build(self) -> Result<TaskCoordinator> {
        let config = self.config;
        if config.max_concurrent_tasks == 0 {
            return Err(CoordinatorError::ValidationError(
                "max_concurrent_tasks must be greater than 0".to_string(),
            ));
        }
        if config.task_history_size == 0 {
            return Err(CoordinatorError::ValidationError(
                "task_history_size must be greater than 0".to_string(),
            ));
        }
        config.validate()?;

        let metrics = self.metrics.unwrap_or_else(noop_sink);
        let error_handler = self.error_handler.unwrap_or_else(|| {
            Arc::new(ErrorHandler::new().with_metrics(Arc::clone(&metrics)))
        });

        info!(
            max_concurrent_tasks = config.max_concurrent_tasks,
            task_history_size = config.task_history_size,
            task_history_ttl_seconds = config.task_history_ttl_seconds,
            "🏗️ COORDINATOR: Creating TaskCoordinator"
        );

        Ok(TaskCoordinator {
            inner: Arc::new(CoordinatorInner {
                state: Mutex::new(CoordinatorState::default()),
                completed: Cache::from_config("task_history", &config.history_cache_config()),
                semaphore: Arc::new(Semaphore::new(config.max_concurrent_tasks)),
                max_concurrent_tasks: config.max_concurrent_tasks,
                default_timeout: config.default_task_timeout(),
                error_handler,
                metrics,
                feedback: self.feedback,
                events: self.events,
                terminal: Notify::new(),
                stopped: AtomicBool::new(false),
            }),
        })
    }
}

impl TaskCoordinator {
    pub fn builder() -> TaskCoordinatorBuilder {
        TaskCoordinatorBuilder::new()
    }

    /// Coordinator with default settings and the given concurrency bound
    pub fn new(max_concurrent_tasks: usize) -> Result<Self> {
        Self::builder()
            .with_max_concurrent_tasks(max_concurrent_tasks)
            .build()
    }

    /// Coordinator and error handler wired from a full configuration
    pub fn from_config(config: &ArcanaConfig) -> Result<Self> {
        config.validate()?;
        let error_handler =
            ErrorHandler::from_config(&config.error_handling, &config.circuit_breakers);
        Self::builder()
            .with_config(config.coordinator.clone())
            .with_error_handler(Arc::new(error_handler))
            .with_event_publisher(EventPublisher::from_config(&config.events))
            .build()
    }

    /// Lifecycle events, when the coordinator was built with a publisher
    pub fn subscribe_events(&self) -> Option<broadcast::Receiver<TaskEvent>> {
        self.inner.events.as_ref().map(EventPublisher::subscribe)
    }

    pub fn error_handler(&self) -> &Arc<ErrorHandler> {
        &self.inner.error_handler
    }

    pub fn max_concurrent_tasks(&self) -> usize {
        self.inner.max_concurrent_tasks
    }

    /// Start background maintenance of the completed-task history
    pub fn start(&self) {
        self.inner.stopped.store(false, Ordering::Release);
        self.inner.completed.start();
        info!("🚀 COORDINATOR: TaskCoordinator started");
    }

    /// Stop accepting work and cancel every pending and running task
    #[instrument(skip(self))]
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            debug!("COORDINATOR: Already stopped");
        }

        let cancelled: Vec<Task> = {
            let mut state = self.inner.state.lock();
            let mut cancelled = Vec::new();

            let mut pending: Vec<PendingTask> = state.pending.drain().map(|(_, p)| p).collect();
            pending.sort_by_key(|p| p.sequence);
            for PendingTask { mut task, .. } in pending {
                task.finish(TaskStatus::Cancelled);
                self.inner.completed.set(task.id.to_string(), task.clone());
                cancelled.push(task);
            }

            for (_, RunningTask { mut task, cancel }) in state.running.drain() {
                cancel.cancel();
                task.finish(TaskStatus::Cancelled);
                self.inner.completed.set(task.id.to_string(), task.clone());
                cancelled.push(task);
            }
            cancelled
        };

        for task in &cancelled {
            self.record_cancellation(task);
        }
        self.inner.completed.stop();
        self.inner.terminal.notify_waiters();

        info!(
            cancelled_tasks = cancelled.len(),
            "🛑 COORDINATOR: TaskCoordinator stopped"
        );
    }

    pub fn is_accepting(&self) -> bool {
        !self.inner.stopped.load(Ordering::Acquire) && !self.inner.error_handler.is_shutdown()
    }

    /// Submit a task; it starts as soon as its dependencies have completed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit_task(&self, request: TaskRequest) -> Result<TaskId> {
        if self.inner.stopped.load(Ordering::Acquire) {
            return Err(CoordinatorError::ShuttingDown(
                "coordinator has been stopped".to_string(),
            ));
        }
        if self.inner.error_handler.is_shutdown() {
            return Err(CoordinatorError::ShuttingDown(
                "error handler signalled shutdown".to_string(),
            ));
        }
        if request.name.trim().is_empty() {
            return Err(CoordinatorError::ValidationError(
                "task name must not be empty".to_string(),
            ));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CoordinatorError::Internal(
                "submit_task requires a Tokio runtime".to_string(),
            ));
        }

        let TaskRequest {
            name,
            work,
            mut dependencies,
            priority,
            timeout,
        } = request;
        let timeout = timeout.or(self.inner.default_timeout);

        let mut state = self.inner.state.lock();

        dependencies.retain(|dependency| !self.completed_in_history(dependency));
        let task = Task::new(name, dependencies, priority, timeout);
        let task_id = task.id;
        let ready = task.is_ready();
        let event = TaskEvent::for_task(events::TASK_SUBMITTED, &task);

        debug!(
            task_id = %task_id,
            task_name = %task.name,
            priority = priority,
            dependencies = task.dependencies.len(),
            "COORDINATOR: Task submitted"
        );

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.pending.insert(
            task_id,
            PendingTask {
                task,
                work,
                sequence,
            },
        );

        let priority_label = priority.to_string();
        self.inner.metrics.record(
            metric_names::TASK_SUBMISSIONS,
            1.0,
            MetricKind::Counter,
            components::TASK_COORDINATOR,
            &[("priority", priority_label.as_str())],
        );
        // submitted is published before the task can start
        self.emit(event);

        if ready {
            Self::start_locked(&self.inner, &mut state, task_id);
        }

        Ok(task_id)
    }

    /// A dependency counts as satisfied only if history holds it as COMPLETED
    fn completed_in_history(&self, task_id: &TaskId) -> bool {
        self.inner
            .completed
            .get(&task_id.to_string())
            .is_some_and(|task| task.status == TaskStatus::Completed)
    }

    /// Move a pending task to running and spawn its execution
    fn start_locked(inner: &Arc<CoordinatorInner>, state: &mut CoordinatorState, task_id: TaskId) {
        let Some(PendingTask { mut task, work, .. }) = state.pending.remove(&task_id) else {
            return;
        };

        task.mark_running();
        let cancel = CancellationToken::new();
        let snapshot = task.clone();
        state.running.insert(
            task_id,
            RunningTask {
                task,
                cancel: cancel.clone(),
            },
        );

        tokio::spawn(Self::execute(Arc::clone(inner), snapshot, work, cancel));
    }

    async fn execute(
        inner: Arc<CoordinatorInner>,
        task: Task,
        work: TaskWork,
        cancel: CancellationToken,
    ) {
        let task_id = task.id;
        let timeout = task.timeout;
        let timer = MetricTimer::start(metric_names::TASK_EXECUTION, components::TASK_COORDINATOR);
        Self::emit_with(&inner, TaskEvent::for_task(events::TASK_STARTED, &task));

        let semaphore = Arc::clone(&inner.semaphore);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| TaskError::internal("task semaphore closed"))?;
                let work = AssertUnwindSafe(work).catch_unwind().map(|caught| {
                    caught.unwrap_or_else(|payload| Err(panic_error(payload.as_ref())))
                });
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, work)
                        .await
                        .unwrap_or_else(|_| Err(TaskError::timeout(limit))),
                    None => work.await,
                }
            } => Some(result),
        };

        let Some(result) = outcome else {
            debug!(task_id = %task_id, "COORDINATOR: Task work dropped after cancellation");
            return;
        };

        let elapsed_ms = timer.elapsed_ms();
        let (status, value, error) = match result {
            Ok(value) => (TaskStatus::Completed, Some(value), None),
            Err(error) => (TaskStatus::Failed, None, Some(error)),
        };

        let Some(finished) = Self::finish(&inner, task_id, status, value, error) else {
            debug!(task_id = %task_id, "COORDINATOR: Task was cancelled before its result was recorded");
            return;
        };

        inner.metrics.record(
            metric_names::TASK_EXECUTION,
            elapsed_ms,
            MetricKind::Timer,
            components::TASK_COORDINATOR,
            &[("task_name", finished.name.as_str())],
        );

        match &finished.error {
            None => {
                inner.metrics.record(
                    metric_names::TASK_COMPLETIONS,
                    1.0,
                    MetricKind::Counter,
                    components::TASK_COORDINATOR,
                    &[("task_name", finished.name.as_str())],
                );
                let duration = format!("{elapsed_ms:.1}ms");
                log_task_operation(
                    "execute_task",
                    Some(task_id),
                    Some(finished.name.as_str()),
                    finished.status.as_str(),
                    Some(duration.as_str()),
                );
            }
            Some(error) => {
                inner.metrics.record(
                    metric_names::TASK_FAILURES,
                    1.0,
                    MetricKind::Counter,
                    components::TASK_COORDINATOR,
                    &[
                        ("task_name", finished.name.as_str()),
                        ("kind", error.kind.as_str()),
                    ],
                );
                let details = error.to_string();
                log_task_operation(
                    "execute_task",
                    Some(task_id),
                    Some(finished.name.as_str()),
                    finished.status.as_str(),
                    Some(details.as_str()),
                );
            }
        }

        Self::emit_with(
            &inner,
            TaskEvent::for_task(TaskEvent::name_for_status(finished.status), &finished),
        );

        if let Some(error) = &finished.error {
            let metadata = ErrorMetadata::for_component(components::TASK_COORDINATOR)
                .with("operation", "execute_task")
                .with("task_id", task_id.to_string())
                .with("task_name", finished.name.clone());
            inner.error_handler.handle_error(error, metadata).await;
        }

        inner.terminal.notify_waiters();
    }

    /// Record a terminal outcome and release dependents.
    ///
    /// Returns `None` when the task is no longer running, which means a
    /// cancellation already recorded it.
    fn finish(
        inner: &Arc<CoordinatorInner>,
        task_id: TaskId,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<TaskError>,
    ) -> Option<Task> {
        let mut state = inner.state.lock();
        let RunningTask { mut task, .. } = state.running.remove(&task_id)?;

        task.result = result;
        task.error = error;
        task.finish(status);
        inner.completed.set(task_id.to_string(), task.clone());

        Self::check_dependents(inner, &mut state, task_id, status);
        Some(task)
    }

    /// Strip `finished_id` from waiting tasks and start those left with no
    /// dependencies. Only a COMPLETED outcome releases anything; dependents
    /// of failed or cancelled tasks keep waiting.
    fn check_dependents(
        inner: &Arc<CoordinatorInner>,
        state: &mut CoordinatorState,
        finished_id: TaskId,
        status: TaskStatus,
    ) {
        if status != TaskStatus::Completed {
            return;
        }

        let mut ready: Vec<(u64, TaskId)> = state
            .pending
            .iter_mut()
            .filter_map(|(id, pending)| {
                let removed = pending.task.dependencies.remove(&finished_id);
                (removed && pending.task.is_ready()).then_some((pending.sequence, *id))
            })
            .collect();
        ready.sort_unstable();

        for (_, task_id) in ready {
            debug!(task_id = %task_id, released_by = %finished_id, "COORDINATOR: Dependencies met");
            Self::start_locked(inner, state, task_id);
        }
    }

    /// Cancel a pending or running task.
    ///
    /// Returns false for unknown or already terminal tasks. Running work is
    /// dropped at its next suspension point.
    pub fn cancel_task(&self, task_id: TaskId) -> bool {
        let cancelled = {
            let mut state = self.inner.state.lock();
            let task = if let Some(PendingTask { task, .. }) = state.pending.remove(&task_id) {
                Some(task)
            } else if let Some(RunningTask { task, cancel }) = state.running.remove(&task_id) {
                cancel.cancel();
                Some(task)
            } else {
                None
            };

            task.map(|mut task| {
                task.finish(TaskStatus::Cancelled);
                self.inner.completed.set(task_id.to_string(), task.clone());
                Self::check_dependents(&self.inner, &mut state, task_id, TaskStatus::Cancelled);
                task
            })
        };

        match cancelled {
            Some(task) => {
                self.record_cancellation(&task);
                self.inner.terminal.notify_waiters();
                true
            }
            None => {
                debug!(task_id = %task_id, "COORDINATOR: Nothing to cancel");
                false
            }
        }
    }

    fn record_cancellation(&self, task: &Task) {
        self.inner.metrics.record(
            metric_names::TASK_CANCELLATIONS,
            1.0,
            MetricKind::Counter,
            components::TASK_COORDINATOR,
            &[("task_name", task.name.as_str())],
        );
        log_task_operation(
            "cancel_task",
            Some(task.id),
            Some(task.name.as_str()),
            task.status.as_str(),
            None,
        );
        self.emit(TaskEvent::for_task(events::TASK_CANCELLED, task));
    }

    /// Current status, looked up in pending, then running, then history
    pub fn get_task_status(&self, task_id: TaskId) -> Option<TaskStatusReport> {
        let state = self.inner.state.lock();
        if let Some(pending) = state.pending.get(&task_id) {
            return Some(TaskStatusReport::from(&pending.task));
        }
        if let Some(running) = state.running.get(&task_id) {
            return Some(TaskStatusReport::from(&running.task));
        }
        self.inner
            .completed
            .get(&task_id.to_string())
            .map(|task| TaskStatusReport::from(&task))
    }

    /// Wait until the task reaches a terminal status; `None` if unknown
    pub async fn wait_for_task(&self, task_id: TaskId) -> Option<TaskStatusReport> {
        loop {
            let notified = self.inner.terminal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.get_task_status(task_id) {
                None => return None,
                Some(report) if report.status.is_terminal() => return Some(report),
                Some(_) => {}
            }

            notified.await;
        }
    }

    /// Counts per lifecycle stage, also recorded as gauges
    pub fn get_task_metrics(&self) -> TaskMetrics {
        let (pending_tasks, running_tasks) = {
            let state = self.inner.state.lock();
            (state.pending.len(), state.running.len())
        };
        let metrics = TaskMetrics {
            pending_tasks,
            running_tasks,
            completed_tasks: self.inner.completed.len(),
            available_permits: self.inner.semaphore.available_permits(),
        };

        for (name, value) in [
            ("pending_tasks", metrics.pending_tasks),
            ("running_tasks", metrics.running_tasks),
            ("completed_tasks", metrics.completed_tasks),
            ("available_permits", metrics.available_permits),
        ] {
            self.inner.metrics.record(
                name,
                value as f64,
                MetricKind::Gauge,
                components::TASK_COORDINATOR,
                &[],
            );
        }

        metrics
    }

    fn emit(&self, event: TaskEvent) {
        Self::emit_with(&self.inner, event);
    }

    fn emit_with(inner: &CoordinatorInner, event: TaskEvent) {
        if let Some(feedback) = &inner.feedback {
            feedback.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InMemoryMetricsSink;
    use serde_json::json;
    use tokio::time::sleep;

    fn quick(value: i64) -> TaskRequest {
        TaskRequest::new(format!("task-{value}"), async move { Ok(json!(value)) })
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        assert!(matches!(
            TaskCoordinator::new(0),
            Err(CoordinatorError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unusable_coordinator_config_is_rejected() {
        let infinite_timeout = CoordinatorConfig {
            default_task_timeout_seconds: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(matches!(
            TaskCoordinator::builder().with_config(infinite_timeout).build(),
            Err(CoordinatorError::ConfigurationError(_))
        ));

        let mut config = ArcanaConfig::default();
        config.coordinator.history_cleanup_interval_seconds = 0;
        assert!(matches!(
            TaskCoordinator::from_config(&config),
            Err(CoordinatorError::ConfigurationError(_))
        ));

        let mut config = ArcanaConfig::default();
        config.events.channel_capacity = 0;
        assert!(matches!(
            TaskCoordinator::from_config(&config),
            Err(CoordinatorError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_unbounded_history_ttl_keeps_tasks() {
        let config = CoordinatorConfig {
            task_history_ttl_seconds: u64::MAX,
            ..Default::default()
        };
        let coordinator = TaskCoordinator::builder().with_config(config).build().unwrap();

        let id = coordinator.submit_task(quick(3)).unwrap();
        let report = coordinator.wait_for_task(id).await.unwrap();
        assert_eq!(report.status, TaskStatus::Completed);
        assert_eq!(
            coordinator.get_task_status(id).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_task_completes_with_result() {
        let coordinator = TaskCoordinator::new(2).unwrap();
        let id = coordinator.submit_task(quick(7)).unwrap();

        let report = coordinator.wait_for_task(id).await.unwrap();
        assert_eq!(report.status, TaskStatus::Completed);
        assert_eq!(report.result, Some(json!(7)));
        assert!(report.started_at.is_some());
        assert!(report.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_task_has_no_status() {
        let coordinator = TaskCoordinator::new(1).unwrap();
        let id = uuid::Uuid::new_v4();
        assert!(coordinator.get_task_status(id).is_none());
        assert!(coordinator.wait_for_task(id).await.is_none());
        assert!(!coordinator.cancel_task(id));
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let coordinator = TaskCoordinator::new(1).unwrap();
        let result = coordinator.submit_task(TaskRequest::new("  ", async { Ok(json!(null)) }));
        assert!(matches!(result, Err(CoordinatorError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_failed_task_records_error_and_keeps_dependents_pending() {
        let coordinator = TaskCoordinator::new(2).unwrap();
        let failing = coordinator
            .submit_task(TaskRequest::new("failing", async {
                Err(TaskError::task("boom"))
            }))
            .unwrap();
        let dependent = coordinator
            .submit_task(quick(1).depends_on(failing))
            .unwrap();

        let report = coordinator.wait_for_task(failing).await.unwrap();
        assert_eq!(report.status, TaskStatus::Failed);
        assert_eq!(report.error.as_deref(), Some("task error: boom"));

        sleep(Duration::from_millis(20)).await;
        let dependent_report = coordinator.get_task_status(dependent).unwrap();
        assert_eq!(dependent_report.status, TaskStatus::Pending);
        assert_eq!(dependent_report.dependencies, vec![failing]);
        assert!(coordinator.is_accepting());
    }

    #[tokio::test]
    async fn test_completed_dependencies_are_pruned_at_submit() {
        let coordinator = TaskCoordinator::new(2).unwrap();
        let first = coordinator.submit_task(quick(1)).unwrap();
        coordinator.wait_for_task(first).await.unwrap();

        let second = coordinator.submit_task(quick(2).depends_on(first)).unwrap();
        let report = coordinator.wait_for_task(second).await.unwrap();
        assert_eq!(report.status, TaskStatus::Completed);
        assert!(report.dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_running_task() {
        let coordinator = TaskCoordinator::new(1).unwrap();
        let id = coordinator
            .submit_task(TaskRequest::new("slow", async {
                sleep(Duration::from_secs(10)).await;
                Ok(json!("never"))
            }))
            .unwrap();

        sleep(Duration::from_millis(20)).await;
        assert_eq!(
            coordinator.get_task_status(id).unwrap().status,
            TaskStatus::Running
        );

        assert!(coordinator.cancel_task(id));
        let report = coordinator.get_task_status(id).unwrap();
        assert_eq!(report.status, TaskStatus::Cancelled);
        assert!(report.error.is_none());

        // permit is returned once the work is dropped
        sleep(Duration::from_millis(20)).await;
        assert_eq!(coordinator.get_task_metrics().available_permits, 1);
    }

    #[tokio::test]
    async fn test_default_timeout_applies() {
        let coordinator = TaskCoordinator::builder()
            .with_max_concurrent_tasks(1)
            .with_default_timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let id = coordinator
            .submit_task(TaskRequest::new("slow", async {
                sleep(Duration::from_secs(5)).await;
                Ok(json!(null))
            }))
            .unwrap();

        let report = coordinator.wait_for_task(id).await.unwrap();
        assert_eq!(report.status, TaskStatus::Failed);
        assert!(report.error.unwrap().starts_with("timeout error"));
    }

    #[tokio::test]
    async fn test_stop_cancels_everything_and_rejects_new_work() {
        let coordinator = TaskCoordinator::new(1).unwrap();
        coordinator.start();

        let running = coordinator
            .submit_task(TaskRequest::new("slow", async {
                sleep(Duration::from_secs(10)).await;
                Ok(json!(null))
            }))
            .unwrap();
        let waiting = coordinator.submit_task(quick(1).depends_on(running)).unwrap();

        coordinator.stop();

        assert_eq!(
            coordinator.get_task_status(running).unwrap().status,
            TaskStatus::Cancelled
        );
        assert_eq!(
            coordinator.get_task_status(waiting).unwrap().status,
            TaskStatus::Cancelled
        );
        assert!(matches!(
            coordinator.submit_task(quick(2)),
            Err(CoordinatorError::ShuttingDown(_))
        ));
    }

    #[tokio::test]
    async fn test_error_handler_shutdown_rejects_submissions() {
        let coordinator = TaskCoordinator::new(1).unwrap();
        let id = coordinator
            .submit_task(TaskRequest::new("corrupt", async {
                Err(TaskError::new(ErrorKind::Internal, "invariant broken"))
            }))
            .unwrap();

        coordinator.wait_for_task(id).await.unwrap();
        assert!(coordinator.error_handler().is_shutdown());
        assert!(!coordinator.is_accepting());
        assert!(matches!(
            coordinator.submit_task(quick(1)),
            Err(CoordinatorError::ShuttingDown(_))
        ));
    }

    #[tokio::test]
    async fn test_configured_coordinator_publishes_events() {
        let coordinator = TaskCoordinator::from_config(&ArcanaConfig::default()).unwrap();
        let mut receiver = coordinator.subscribe_events().unwrap();

        let id = coordinator.submit_task(quick(5)).unwrap();
        coordinator.wait_for_task(id).await.unwrap();

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.name, events::TASK_SUBMITTED);
        assert_eq!(first.task_id, id);
        assert!(TaskCoordinator::new(1).unwrap().subscribe_events().is_none());
    }

    #[tokio::test]
    async fn test_metrics_and_events_are_emitted() {
        let sink = Arc::new(InMemoryMetricsSink::default());
        let publisher = Arc::new(EventPublisher::new(16));
        let mut events = publisher.subscribe();

        let coordinator = TaskCoordinator::builder()
            .with_max_concurrent_tasks(2)
            .with_metrics(sink.clone())
            .with_feedback(publisher.clone())
            .build()
            .unwrap();

        let id = coordinator.submit_task(quick(3).with_priority(4)).unwrap();
        coordinator.wait_for_task(id).await.unwrap();

        let submissions = sink.samples(metric_names::TASK_SUBMISSIONS);
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].labels["priority"], "4");
        assert_eq!(sink.samples(metric_names::TASK_COMPLETIONS).len(), 1);
        assert_eq!(sink.samples(metric_names::TASK_EXECUTION).len(), 1);

        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.push(event.name);
        }
        assert_eq!(names, vec!["task.submitted", "task.started", "task.completed"]);

        let metrics = coordinator.get_task_metrics();
        assert_eq!(metrics.completed_tasks, 1);
        assert_eq!(metrics.available_permits, 2);
        assert_eq!(sink.last_value("completed_tasks"), Some(1.0));
    }
}
