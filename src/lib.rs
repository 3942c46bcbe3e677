#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Arcana Core
//!
//! Resilient, dependency-aware task coordination for async Rust services.
//!
//! ## Overview
//!
//! Arcana Core runs named units of asynchronous work under a concurrency
//! bound, starts each one only after the tasks it depends on have completed,
//! and keeps a bounded history of how every task ended. Failures are
//! classified and routed to recovery strategies; circuit breakers protect
//! flaky downstream resources.
//!
//! ## Module Organization
//!
//! - [`coordinator`] - Task submission, dependency release, cancellation and status
//! - [`cache`] - Generic TTL cache with LRU/LFU/FIFO/TTL eviction
//! - [`resilience`] - Circuit breakers and their registry
//! - [`error_handling`] - Error classification and recovery routing
//! - [`metrics`] - Metric sinks and windowed aggregation
//! - [`events`] - Task lifecycle feedback events
//! - [`config`] - Layered configuration (file + environment)
//! - [`logging`] - Structured logging setup
//! - [`error`] - Crate error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arcana_core::{ArcanaConfig, TaskCoordinator, TaskRequest, TaskStatus};
//! use serde_json::json;
//!
//! # async fn example() -> arcana_core::Result<()> {
//! arcana_core::logging::init_structured_logging();
//!
//! let coordinator = TaskCoordinator::from_config(&ArcanaConfig::default())?;
//! coordinator.start();
//!
//! let id = coordinator.submit_task(TaskRequest::new("greet", async { Ok(json!("hello")) }))?;
//! let report = coordinator.wait_for_task(id).await;
//! assert_eq!(report.map(|r| r.status), Some(TaskStatus::Completed));
//!
//! coordinator.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! cargo bench --features benchmarks
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod error_handling;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod resilience;

pub use cache::{Cache, CacheStats, EvictionStrategy};
pub use config::{ArcanaConfig, ConfigManager, ConfigurationError};
pub use constants::{system, TaskStatus};
// Re-export constants events with different name to avoid conflict
pub use constants::events as system_events;
pub use coordinator::{
    TaskCoordinator, TaskCoordinatorBuilder, TaskId, TaskMetrics, TaskRequest, TaskStatusReport,
};
pub use error::{CoordinatorError, Result};
pub use error_handling::{
    ErrorCategory, ErrorHandler, ErrorKind, ErrorMetadata, ErrorSeverity, RecoveryStrategy,
    TaskError,
};
pub use events::{EventPublisher, FeedbackSink, TaskEvent};
pub use metrics::{InMemoryMetricsSink, MetricKind, MetricsSink};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerManager};
