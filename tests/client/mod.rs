mod basic_ops;
mod layer;
mod lifecycle;

use std::time::Duration;
use zk_resilience_client::{Client, ClientConfig};
use zk_resilience_session::InMemoryEnsemble;

/// Client with a one-second retry timeout, matching the timeout the
/// scenarios below are written against.
pub(crate) fn test_client(ensemble: &InMemoryEnsemble) -> Client<InMemoryEnsemble> {
    let config = ClientConfig::builder()
        .name("test")
        .retry_timeout(Duration::from_secs(1))
        .session_timeout(Duration::from_secs(2))
        .build();
    Client::new(config, ensemble.clone())
}

pub(crate) async fn connected_client(ensemble: &InMemoryEnsemble) -> Client<InMemoryEnsemble> {
    let client = test_client(ensemble);
    client.connect().await.unwrap();
    client
}
