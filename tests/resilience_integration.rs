//! Circuit breakers guarding task work

mod common;

use arcana_core::resilience::CircuitState;
use arcana_core::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, ErrorKind, TaskCoordinator,
    TaskError, TaskRequest, TaskStatus,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fast_config(threshold: u32) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: threshold,
        reset_timeout: Duration::from_millis(100),
        half_open_timeout: Duration::from_millis(100),
    }
}

#[tokio::test]
async fn test_breaker_opens_then_recovers_after_reset_timeout() {
    let breaker = CircuitBreaker::new("flaky_api".to_string(), fast_config(2));
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        let result: Result<(), _> = breaker
            .execute(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TaskError::external("503"))
            })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::OperationFailed(_))));
    }

    let counted = Arc::clone(&calls);
    let rejected = breaker
        .execute(|| async move {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TaskError>(())
        })
        .await;
    assert!(rejected.unwrap_err().is_circuit_open());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    let value = breaker
        .execute(|| async { Ok::<_, TaskError>(42) })
        .await
        .unwrap();
    assert_eq!(value, 42);
    assert_eq!(breaker.failure_count(), 0);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_circuit_open_surfaces_as_distinct_task_error() {
    let coordinator = TaskCoordinator::new(2).unwrap();
    let breaker = coordinator.error_handler().get_circuit_breaker("payments");
    breaker.force_open();

    let guarded = Arc::clone(&breaker);
    let id = coordinator
        .submit_task(TaskRequest::new("charge", async move {
            let value = guarded
                .execute(|| async { Ok::<_, TaskError>(json!("charged")) })
                .await?;
            Ok(value)
        }))
        .unwrap();

    let report = coordinator.wait_for_task(id).await.unwrap();
    assert_eq!(report.status, TaskStatus::Failed);

    let history = coordinator.error_handler().get_error_history(None, None, 1);
    assert_eq!(history[0].kind, ErrorKind::CircuitOpen);
    assert!(coordinator.is_accepting());
}

#[tokio::test]
async fn test_registry_shares_breakers_by_name() {
    let coordinator = TaskCoordinator::new(1).unwrap();
    let handler = coordinator.error_handler();

    let a = handler.get_circuit_breaker("search");
    let b = handler.get_circuit_breaker("search");
    assert!(Arc::ptr_eq(&a, &b));

    a.record_failure();
    assert_eq!(b.failure_count(), 1);
    assert!(handler
        .circuit_breakers()
        .list_components()
        .contains(&"search".to_string()));
}
