//! # Metrics
//!
//! Fire-and-forget metric recording. Components hold an `Arc<dyn MetricsSink>`
//! and never observe failures from it.
//!
//! - [`NoopMetricsSink`] - discards everything (default)
//! - [`TracingMetricsSink`] - emits each sample as a `tracing` event
//! - [`InMemoryMetricsSink`] - keeps a sliding window per metric name and
//!   aggregates count/min/max/mean/median/sum/stddev

pub mod aggregator;

pub use aggregator::{InMemoryMetricsSink, MetricSample, MetricStatistics};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Kinds of metrics that can be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing value
    Counter,
    /// Value that can go up or down
    Gauge,
    /// Distribution of values
    Histogram,
    /// Duration measurement in milliseconds
    Timer,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Timer => "timer",
        };
        f.write_str(name)
    }
}

/// Destination for metric samples.
///
/// Implementations must not block and must not panic; recording is called
/// from inside the coordinator's hot path.
pub trait MetricsSink: Send + Sync + fmt::Debug {
    fn record(
        &self,
        name: &str,
        value: f64,
        kind: MetricKind,
        component: &str,
        labels: &[(&str, &str)],
    );
}

/// Sink that drops every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _: &str, _: f64, _: MetricKind, _: &str, _: &[(&str, &str)]) {}
}

/// Sink that logs each sample at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record(
        &self,
        name: &str,
        value: f64,
        kind: MetricKind,
        component: &str,
        labels: &[(&str, &str)],
    ) {
        tracing::debug!(
            metric = name,
            value = value,
            kind = %kind,
            component = component,
            labels = ?labels,
            "📊 METRIC"
        );
    }
}

/// Shared no-op sink used when no sink is configured
pub fn noop_sink() -> Arc<dyn MetricsSink> {
    Arc::new(NoopMetricsSink)
}

/// Measures elapsed wall-clock time and records it as a timer metric
#[derive(Debug)]
pub struct MetricTimer {
    name: String,
    component: String,
    started: Instant,
}

impl MetricTimer {
    pub fn start(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Record the elapsed milliseconds and return them
    pub fn stop(self, sink: &dyn MetricsSink, labels: &[(&str, &str)]) -> f64 {
        let elapsed = self.elapsed_ms();
        sink.record(&self.name, elapsed, MetricKind::Timer, &self.component, labels);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_kind_display_matches_serde() {
        assert_eq!(MetricKind::Timer.to_string(), "timer");
        assert_eq!(
            serde_json::to_string(&MetricKind::Histogram).unwrap(),
            "\"histogram\""
        );
    }

    #[test]
    fn test_timer_records_into_sink() {
        let sink = InMemoryMetricsSink::default();
        let timer = MetricTimer::start("op", "test");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let elapsed = timer.stop(&sink, &[("outcome", "ok")]);

        assert!(elapsed >= 5.0);
        let stats = sink.statistics("op").unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(sink.samples("op")[0].kind, MetricKind::Timer);
    }

    #[test]
    fn test_noop_and_tracing_sinks_accept_samples() {
        NoopMetricsSink.record("a", 1.0, MetricKind::Counter, "test", &[]);
        TracingMetricsSink.record("a", 1.0, MetricKind::Gauge, "test", &[("k", "v")]);
    }
}
