//! # Feedback Events
//!
//! Structured lifecycle events emitted by the coordinator. Emission is
//! optional and fire-and-forget: a coordinator without a sink, or a publisher
//! without subscribers, drops events silently.

pub mod publisher;
pub mod types;

pub use publisher::{EventPublisher, FeedbackSink};
pub use types::TaskEvent;
