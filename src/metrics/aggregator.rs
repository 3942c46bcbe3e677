//! Windowed in-memory aggregation.

use super::{MetricKind, MetricsSink};
use crate::constants::system;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant};

/// One recorded sample
#[derive(Debug, Clone)]
pub struct MetricSample {
    pub name: String,
    pub kind: MetricKind,
    pub value: f64,
    pub component: String,
    pub labels: HashMap<String, String>,
    pub recorded_at: Instant,
}

/// Statistical summary of the samples inside the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub sum: f64,
    /// Sample standard deviation; 0.0 with fewer than two samples
    pub stddev: f64,
}

impl MetricStatistics {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        let stddev = if count < 2 {
            0.0
        } else {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        };

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            sum,
            stddev,
        })
    }
}

/// Sink that retains samples for a sliding time window
#[derive(Debug)]
pub struct InMemoryMetricsSink {
    window: Duration,
    samples: Mutex<HashMap<String, VecDeque<MetricSample>>>,
}

impl Default for InMemoryMetricsSink {
    fn default() -> Self {
        Self::new(Duration::from_secs(system::DEFAULT_METRICS_WINDOW_SECONDS))
    }
}

impl InMemoryMetricsSink {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: Mutex::new(HashMap::new()),
        }
    }

    fn prune(window: Duration, samples: &mut VecDeque<MetricSample>, now: Instant) {
        while samples
            .front()
            .is_some_and(|sample| now.duration_since(sample.recorded_at) > window)
        {
            samples.pop_front();
        }
    }

    /// Summary for one metric, or `None` if nothing is in the window
    pub fn statistics(&self, name: &str) -> Option<MetricStatistics> {
        let now = Instant::now();
        let mut guard = self.samples.lock();
        let samples = guard.get_mut(name)?;
        Self::prune(self.window, samples, now);
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        MetricStatistics::from_values(&values)
    }

    /// Samples currently inside the window, oldest first
    pub fn samples(&self, name: &str) -> Vec<MetricSample> {
        let now = Instant::now();
        let mut guard = self.samples.lock();
        match guard.get_mut(name) {
            Some(samples) => {
                Self::prune(self.window, samples, now);
                samples.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Most recent value recorded under `name`
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.samples
            .lock()
            .get(name)
            .and_then(|samples| samples.back())
            .map(|sample| sample.value)
    }

    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.samples.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// All metric summaries keyed by name
    pub fn snapshot(&self) -> BTreeMap<String, MetricStatistics> {
        self.metric_names()
            .into_iter()
            .filter_map(|name| self.statistics(&name).map(|stats| (name, stats)))
            .collect()
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn record(
        &self,
        name: &str,
        value: f64,
        kind: MetricKind,
        component: &str,
        labels: &[(&str, &str)],
    ) {
        let now = Instant::now();
        let sample = MetricSample {
            name: name.to_string(),
            kind,
            value,
            component: component.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            recorded_at: now,
        };

        let mut guard = self.samples.lock();
        let samples = guard.entry(name.to_string()).or_default();
        samples.push_back(sample);
        Self::prune(self.window, samples, now);
    }
}
