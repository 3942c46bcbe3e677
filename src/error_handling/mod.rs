//! # Error Handling
//!
//! Classification of work failures into severity and category, and routing to
//! a recovery strategy.
//!
//! ```text
//! TaskError ──classify()──> ErrorContext ──> observers (per ErrorKind, isolated)
//!                                       └──> strategy map ──> RecoveryHandler
//!                                                         ├─> circuit breaker
//!                                                         └─> shutdown signal
//! ```
//!
//! The handler is routing and bookkeeping only. Retry loops, delays and
//! fallback values are supplied through [`RecoveryHandler`].

pub mod classifier;
pub mod handler;
pub mod strategy;

pub use classifier::{
    classify, ErrorCategory, ErrorContext, ErrorKind, ErrorMetadata, ErrorSeverity, TaskError,
};
pub use handler::{observer_fn, ErrorHandler, ErrorObserver, FnObserver};
pub use strategy::{
    default_recovery_strategies, default_recovery_strategy, LoggingRecoveryHandler,
    RecoveryHandler, RecoveryStrategy,
};
