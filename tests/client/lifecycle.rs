use super::{connected_client, test_client};
use std::time::Duration;
use zk_resilience_client::{Acl, ClientError, CreateMode, SessionState};
use zk_resilience_session::{InMemoryEnsemble, SessionError};

#[tokio::test]
async fn is_connected_follows_the_session() {
    let ensemble = InMemoryEnsemble::new();
    let client = test_client(&ensemble);
    assert!(!client.is_connected());
    assert_eq!(client.state(), SessionState::Disconnected);

    client.connect().await.unwrap();
    assert!(client.is_connected());

    ensemble.set_state(SessionState::Connecting);
    assert!(!client.is_connected());
    ensemble.set_state(SessionState::ConnectedWithSession);
    assert!(client.is_connected());

    client.disconnect();
    assert!(
        client
            .wait_for_state(SessionState::Disconnected, Duration::from_secs(1))
            .await
    );
    assert!(!client.is_connected());
}

#[tokio::test]
async fn disconnect_without_connect_is_a_no_op() {
    let client = test_client(&InMemoryEnsemble::new());
    client.disconnect();
    client.disconnect();
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn disconnect_closes_the_session_on_the_ensemble() {
    let ensemble = InMemoryEnsemble::new();
    let client = connected_client(&ensemble).await;
    assert_eq!(ensemble.open_sessions().len(), 1);

    client.disconnect();
    assert!(ensemble.open_sessions().is_empty());
    assert!(client.session().is_none());
}

#[tokio::test(start_paused = true)]
async fn connect_waits_for_the_session_to_establish() {
    let ensemble = InMemoryEnsemble::new().with_auto_session(false);
    let client = test_client(&ensemble);

    let establish = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(client.state(), SessionState::Connecting);
        ensemble.set_state(SessionState::ConnectedWithSession);
    };
    let (connected, ()) = tokio::join!(client.connect(), establish);

    connected.unwrap();
    assert!(client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn connect_gives_up_after_session_timeout() {
    let ensemble = InMemoryEnsemble::new().with_auto_session(false);
    let client = test_client(&ensemble);

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectTimeout { .. }));
    assert!(client.get("/").await.unwrap_err().is_before_connect());
}

#[tokio::test(start_paused = true)]
async fn connect_fails_fast_on_auth_failure() {
    let ensemble = InMemoryEnsemble::new().with_auto_session(false);
    let client = test_client(&ensemble);
    let start = tokio::time::Instant::now();

    let reject = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        ensemble.set_state(SessionState::AuthFailed);
    };
    let (connected, ()) = tokio::join!(client.connect(), reject);

    assert!(matches!(
        connected.unwrap_err(),
        ClientError::Session(SessionError::AuthFailed)
    ));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(client.session().is_none());
    assert!(ensemble.open_sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn connect_fails_fast_when_the_new_session_expires() {
    let ensemble = InMemoryEnsemble::new().with_auto_session(false);
    let client = test_client(&ensemble);
    let start = tokio::time::Instant::now();

    let expire = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        ensemble.set_state(SessionState::Expired);
    };
    let (connected, ()) = tokio::join!(client.connect(), expire);

    assert!(matches!(
        connected.unwrap_err(),
        ClientError::Session(SessionError::SessionExpired)
    ));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(client.session().is_none());
}

#[tokio::test]
async fn dropping_a_client_closes_its_session() {
    let ensemble = InMemoryEnsemble::new();
    {
        let client = connected_client(&ensemble).await;
        client.create_data_with_path("/members/x", b"").await.unwrap();
        client
            .create("/members/me", b"", CreateMode::Ephemeral, &[Acl::open_unsafe()])
            .await
            .unwrap();
        assert_eq!(ensemble.open_sessions().len(), 1);
    }

    assert!(ensemble.open_sessions().is_empty());
    let observer = connected_client(&ensemble).await;
    assert!(observer.exists("/members/me").await.unwrap().is_none());
    assert!(observer.exists("/members/x").await.unwrap().is_some());
}

#[tokio::test]
async fn wait_for_state_returns_false_on_timeout() {
    let client = connected_client(&InMemoryEnsemble::new()).await;
    assert!(
        !client
            .wait_for_state(SessionState::Expired, Duration::from_millis(20))
            .await
    );
}

#[tokio::test]
async fn independent_clients_do_not_share_state() {
    let first_ensemble = InMemoryEnsemble::new();
    let second_ensemble = InMemoryEnsemble::new();
    let first = connected_client(&first_ensemble).await;
    let second = connected_client(&second_ensemble).await;

    first_ensemble.set_state(SessionState::Connecting);
    assert!(!first.is_connected());
    assert!(second.is_connected());
    assert!(second.get("/").await.is_ok());
}
