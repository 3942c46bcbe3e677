//! Shared helpers for integration tests
#![allow(dead_code)]

use arcana_core::{TaskError, TaskRequest};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub mod strategies;

/// Install a test subscriber once per binary; later calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("arcana_core=debug")
        .with_test_writer()
        .try_init();
}

/// Work that sleeps, then appends `value` to a shared log
pub fn recording_task(
    name: &str,
    log: &Arc<Mutex<Vec<i64>>>,
    value: i64,
    delay: Duration,
) -> TaskRequest {
    let log = Arc::clone(log);
    TaskRequest::new(name, async move {
        tokio::time::sleep(delay).await;
        log.lock().push(value);
        Ok(json!(value))
    })
}

/// Work that fails after an optional delay
pub fn failing_task(name: &str, error: TaskError, delay: Duration) -> TaskRequest {
    TaskRequest::new(name, async move {
        tokio::time::sleep(delay).await;
        Err(error)
    })
}

/// Tracks how many units of work run at the same time
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn task(self: &Arc<Self>, name: &str, duration: Duration) -> TaskRequest {
        let probe = Arc::clone(self);
        TaskRequest::new(name, async move {
            let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
            probe.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(duration).await;
            probe.current.fetch_sub(1, Ordering::SeqCst);
            Ok(json!(null))
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
