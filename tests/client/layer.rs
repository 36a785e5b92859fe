use super::connected_client;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::{Service, ServiceBuilder, ServiceExt};
use zk_resilience_client::{RetryError, SessionLoss, SessionState};
use zk_resilience_session::{InMemoryEnsemble, SessionError};

#[derive(Debug, Clone, PartialEq)]
enum RpcError {
    Unavailable,
    Rejected,
}

impl SessionLoss for RpcError {
    fn is_session_loss(&self) -> bool {
        matches!(self, RpcError::Unavailable)
    }
}

#[tokio::test]
async fn layer_shares_the_client_session_state() {
    let ensemble = InMemoryEnsemble::new();
    let client = connected_client(&ensemble).await;
    ensemble.set_state(SessionState::Connecting);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut svc = ServiceBuilder::new()
        .layer(client.retry_layer())
        .service_fn(move |key: String| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(RpcError::Unavailable)
                } else {
                    Ok(format!("value-of-{key}"))
                }
            }
        });

    let reconnect = tokio::spawn({
        let ensemble = ensemble.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            ensemble.set_state(SessionState::ConnectedWithSession);
        }
    });

    let value = svc
        .ready()
        .await
        .unwrap()
        .call("k".to_string())
        .await
        .unwrap();
    reconnect.await.unwrap();
    assert_eq!(value, "value-of-k");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn layer_surfaces_non_loss_errors() {
    let client = connected_client(&InMemoryEnsemble::new()).await;
    let svc = ServiceBuilder::new()
        .layer(client.retry_layer())
        .service_fn(|_: ()| async { Err::<(), _>(RpcError::Rejected) });

    let err = svc.oneshot(()).await.unwrap_err();
    assert!(matches!(err, RetryError::Inner(RpcError::Rejected)));
}

#[tokio::test(start_paused = true)]
async fn layer_times_out_like_the_client() {
    let ensemble = InMemoryEnsemble::new();
    let client = connected_client(&ensemble).await;
    ensemble.set_state(SessionState::Expired);

    let svc = ServiceBuilder::new()
        .layer(client.retry_layer())
        .service_fn(|_: ()| async { Err::<(), _>(SessionError::SessionExpired) });

    let err = svc.oneshot(()).await.unwrap_err();
    assert!(matches!(err, RetryError::Timeout { attempts: 1, .. }));
}
