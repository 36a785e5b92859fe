//! Tower layer implementation for retry-until-connected.

use crate::coordinator::RetryCoordinator;
use crate::service::RetryUntilConnected;
use tower::Layer;

/// Layer that runs every request through a [`RetryCoordinator`].
///
/// Requests failing with a session-loss error are retried once the session is
/// usable again, until the coordinator's retry timeout. Usually obtained from
/// [`Client::retry_layer`](crate::Client::retry_layer) so the layer shares the
/// client's session state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tower::ServiceBuilder;
/// use zk_resilience_client::{
///     ClientConfig, RetryCoordinator, RetryUntilConnectedLayer, SessionError, SessionStateTracker,
/// };
///
/// let coordinator = RetryCoordinator::new(
///     SessionStateTracker::new(),
///     Arc::new(ClientConfig::default()),
/// );
/// let service = ServiceBuilder::new()
///     .layer(RetryUntilConnectedLayer::new(coordinator))
///     .service_fn(|path: String| async move { Ok::<_, SessionError>(path.len()) });
/// # let _ = service;
/// ```
#[derive(Clone, Debug)]
pub struct RetryUntilConnectedLayer {
    coordinator: RetryCoordinator,
}

impl RetryUntilConnectedLayer {
    /// Creates a layer driven by `coordinator`.
    pub fn new(coordinator: RetryCoordinator) -> Self {
        Self { coordinator }
    }
}

impl<S> Layer<S> for RetryUntilConnectedLayer {
    type Service = RetryUntilConnected<S>;

    fn layer(&self, service: S) -> Self::Service {
        RetryUntilConnected::new(service, self.coordinator.clone())
    }
}
