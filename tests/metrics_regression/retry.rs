//! Retry coordinator metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use zk_resilience_client::{
    ClientConfig, RetryCoordinator, SessionError, SessionState, SessionStateTracker,
};

fn coordinator(name: &str, tracker: &SessionStateTracker) -> RetryCoordinator {
    let config = ClientConfig::builder()
        .name(name)
        .retry_timeout(Duration::from_millis(50))
        .build();
    RetryCoordinator::new(tracker.clone(), Arc::new(config))
}

#[tokio::test]
#[serial]
async fn retry_wait_metrics_exist() {
    init_recorder();

    let tracker = SessionStateTracker::new();
    tracker.set_state(SessionState::ConnectedWithSession);
    let coordinator = coordinator("metrics_wait", &tracker);

    let mut failed = false;
    let _ = coordinator
        .retry_until_connected(|| {
            let first = !failed;
            failed = true;
            async move {
                if first {
                    Err(SessionError::ConnectionLoss)
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert_counter_exists("zk_client_retry_waits_total");
    assert_metric_has_label("zk_client_retry_waits_total", "client", "metrics_wait");
    assert_metric_has_label("zk_client_retry_calls_total", "client", "metrics_wait");
}

#[tokio::test]
#[serial]
async fn retry_timeout_metrics() {
    init_recorder();

    let tracker = SessionStateTracker::new();
    tracker.set_state(SessionState::Connecting);
    let coordinator = coordinator("metrics_timeout", &tracker);

    let result: Result<(), _> = coordinator
        .retry_until_connected(|| async { Err(SessionError::SessionExpired) })
        .await;
    assert!(result.unwrap_err().is_timeout());

    assert_metric_has_label("zk_client_retry_calls_total", "client", "metrics_timeout");
    assert_metric_has_label("zk_client_retry_calls_total", "result", "timeout");
}
