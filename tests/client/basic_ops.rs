use super::{connected_client, test_client};
use zk_resilience_client::{Acl, ClientError, CreateMode, Perms, ANY_VERSION};
use zk_resilience_session::{InMemoryEnsemble, Session, SessionError};

#[tokio::test]
async fn create_get_delete_tree_scenario() {
    let ensemble = InMemoryEnsemble::new();
    let client = test_client(&ensemble);
    let data = b"some data".to_vec();

    assert_eq!(
        client.create_data_with_path("/a/b", &data).await.unwrap_err(),
        ClientError::OperationBeforeConnect
    );

    client.connect().await.unwrap();
    client.create_data_with_path("/a/b", &data).await.unwrap();

    let (got, stat) = client.get("/a/b").await.unwrap();
    assert_eq!(got, data);
    assert_eq!(stat.data_length as usize, data.len());

    client.delete_tree("/a").await.unwrap();
    assert!(client.exists("/a").await.unwrap().is_none());
    assert!(client.exists("/a/b").await.unwrap().is_none());
}

#[tokio::test]
async fn set_bumps_version_and_checks_it() {
    let client = connected_client(&InMemoryEnsemble::new()).await;
    client
        .create("/cfg", b"v0", CreateMode::Persistent, &[Acl::open_unsafe()])
        .await
        .unwrap();

    let stat = client.set("/cfg", b"v1", 0).await.unwrap();
    assert_eq!(stat.version, 1);

    let err = client.set("/cfg", b"v2", 0).await.unwrap_err();
    assert!(matches!(
        err.session_error(),
        Some(SessionError::BadVersion { .. })
    ));

    client.set("/cfg", b"v2", ANY_VERSION).await.unwrap();
    assert_eq!(client.get("/cfg").await.unwrap().0, b"v2");
}

#[tokio::test]
async fn sequential_nodes_get_increasing_suffixes() {
    let client = connected_client(&InMemoryEnsemble::new()).await;
    client.create_data_with_path("/election", b"").await.unwrap();

    let first = client
        .create("/election/n-", b"", CreateMode::EphemeralSequential, &[])
        .await
        .unwrap();
    let second = client
        .create("/election/n-", b"", CreateMode::EphemeralSequential, &[])
        .await
        .unwrap();

    assert_eq!(first, "/election/n-0000000000");
    assert_eq!(second, "/election/n-0000000001");
    assert_eq!(
        client.children("/election").await.unwrap(),
        vec!["n-0000000000", "n-0000000001"]
    );
}

#[tokio::test]
async fn ephemeral_nodes_vanish_with_their_session() {
    let ensemble = InMemoryEnsemble::new();
    let owner = connected_client(&ensemble).await;
    let observer = connected_client(&ensemble).await;

    owner
        .create("/members", b"", CreateMode::Persistent, &[])
        .await
        .unwrap();
    owner
        .create("/members/me", b"", CreateMode::Ephemeral, &[])
        .await
        .unwrap();
    let stat = observer.exists("/members/me").await.unwrap().unwrap();
    assert_eq!(stat.ephemeral_owner, owner.session().unwrap().session_id());

    owner.disconnect();
    assert!(observer.exists("/members/me").await.unwrap().is_none());
    assert!(observer.exists("/members").await.unwrap().is_some());
}

#[tokio::test]
async fn domain_errors_surface_immediately() {
    let client = connected_client(&InMemoryEnsemble::new()).await;

    assert!(client.get("/missing").await.unwrap_err().is_no_node());
    assert!(client.delete("/missing", ANY_VERSION).await.unwrap_err().is_no_node());

    client.create_data_with_path("/p/c", b"").await.unwrap();
    let err = client.delete("/p", ANY_VERSION).await.unwrap_err();
    assert!(matches!(err.session_error(), Some(SessionError::NotEmpty { .. })));

    let err = client
        .create("no-slash", b"", CreateMode::Persistent, &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err.session_error(),
        Some(SessionError::InvalidPath { .. })
    ));
}

#[tokio::test]
async fn delete_tree_handles_wide_and_deep_trees() {
    let client = connected_client(&InMemoryEnsemble::new()).await;
    for i in 0..20 {
        client
            .create_data_with_path(&format!("/root/wide/n{i}"), b"x")
            .await
            .unwrap();
    }
    client
        .create_data_with_path("/root/deep/a/b/c/d/e/f", b"x")
        .await
        .unwrap();

    client.delete_tree("/root").await.unwrap();
    assert!(client.exists("/root").await.unwrap().is_none());
    assert!(client.children("/").await.unwrap().is_empty());
}

#[tokio::test]
async fn acls_are_carried_through() {
    let acl = Acl::new(Perms::READ | Perms::WRITE, "digest", "user:hash");
    assert!(acl.perms.contains(Perms::READ));
    assert!(!acl.perms.contains(Perms::ADMIN));

    let ensemble = InMemoryEnsemble::new();
    let client = connected_client(&ensemble).await;
    client
        .create("/secured", b"", CreateMode::Persistent, &[acl.clone()])
        .await
        .unwrap();
    assert!(client.exists("/secured").await.unwrap().is_some());
    assert_eq!(ensemble.acl("/secured").unwrap(), vec![acl]);

    // Intermediate nodes get the open ACL.
    client.create_data_with_path("/open/leaf", b"").await.unwrap();
    assert_eq!(ensemble.acl("/open").unwrap(), vec![Acl::open_unsafe()]);
}
