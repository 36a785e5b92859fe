//! Property tests for the retry coordinator.
//!
//! Invariants tested:
//! - An operation that fails `n` times while the session stays usable is
//!   invoked exactly `n + 1` times
//! - Domain errors are never retried
//! - With the session down, the operation is invoked once and the call times out

use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Builder;
use zk_resilience_client::{
    ClientConfig, RetryCoordinator, RetryError, SessionError, SessionState, SessionStateTracker,
};

fn coordinator(tracker: &SessionStateTracker, retry_timeout: Duration) -> RetryCoordinator {
    let config = ClientConfig::builder().retry_timeout(retry_timeout).build();
    RetryCoordinator::new(tracker.clone(), Arc::new(config))
}

fn session_loss() -> impl Strategy<Value = SessionError> {
    prop_oneof![
        Just(SessionError::ConnectionLoss),
        Just(SessionError::SessionExpired),
    ]
}

fn domain_error() -> impl Strategy<Value = SessionError> {
    prop_oneof![
        "/[a-z]{1,6}".prop_map(|path| SessionError::NoNode { path }),
        "/[a-z]{1,6}".prop_map(|path| SessionError::NodeExists { path }),
        "/[a-z]{1,6}".prop_map(|path| SessionError::BadVersion { path }),
        Just(SessionError::AuthFailed),
        Just(SessionError::Closed),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: n session losses while connected cost exactly n extra calls
    #[test]
    fn retries_each_session_loss_once(failures in 0usize..20, error in session_loss()) {
        let rt = Builder::new_current_thread().enable_time().build().unwrap();
        rt.block_on(async {
            let tracker = SessionStateTracker::new();
            tracker.set_state(SessionState::ConnectedWithSession);
            let coordinator = coordinator(&tracker, Duration::from_secs(5));
            let calls = AtomicUsize::new(0);

            let result = coordinator
                .retry_until_connected(|| {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    let error = error.clone();
                    async move { if n < failures { Err(error) } else { Ok(n) } }
                })
                .await;

            assert_eq!(result.unwrap(), failures);
            assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
        });
    }

    /// Property: a domain error is returned unchanged after exactly one call
    #[test]
    fn domain_errors_are_returned_unchanged(error in domain_error()) {
        let rt = Builder::new_current_thread().enable_time().build().unwrap();
        rt.block_on(async {
            let tracker = SessionStateTracker::new();
            let coordinator = coordinator(&tracker, Duration::from_secs(5));
            let calls = AtomicUsize::new(0);

            let result: Result<(), _> = coordinator
                .retry_until_connected(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let error = error.clone();
                    async move { Err(error) }
                })
                .await;

            match result {
                Err(RetryError::Inner(returned)) => assert_eq!(returned, error),
                other => panic!("expected inner error, got {other:?}"),
            }
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        });
    }

    /// Property: whatever the non-usable state, a lost session times out after one call
    #[test]
    fn down_session_times_out_after_one_call(
        state in prop_oneof![
            Just(SessionState::Disconnected),
            Just(SessionState::Connecting),
            Just(SessionState::AuthFailed),
            Just(SessionState::Expired),
        ],
        timeout_ms in 1u64..30,
    ) {
        let rt = Builder::new_current_thread().enable_time().start_paused(true).build().unwrap();
        rt.block_on(async {
            let tracker = SessionStateTracker::new();
            tracker.set_state(state);
            let coordinator = coordinator(&tracker, Duration::from_millis(timeout_ms));
            let calls = AtomicUsize::new(0);

            let result: Result<(), _> = coordinator
                .retry_until_connected(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(SessionError::ConnectionLoss) }
                })
                .await;

            assert!(result.unwrap_err().is_timeout());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        });
    }
}
