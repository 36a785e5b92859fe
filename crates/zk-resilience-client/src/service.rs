//! Retry-until-connected service implementation.

use crate::coordinator::RetryCoordinator;
use crate::error::RetryError;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};
use zk_resilience_core::SessionLoss;

/// Service that retries session-loss failures of the inner service once the
/// session is usable again.
#[derive(Clone, Debug)]
pub struct RetryUntilConnected<S> {
    inner: S,
    coordinator: RetryCoordinator,
}

impl<S> RetryUntilConnected<S> {
    pub(crate) fn new(inner: S, coordinator: RetryCoordinator) -> Self {
        Self { inner, coordinator }
    }

    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, Request> Service<Request> for RetryUntilConnected<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: SessionLoss + Send + 'static,
    Request: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = RetryError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RetryError::Inner)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Each attempt drives its own clone to readiness; the one readied by
        // poll_ready is left untouched.
        let inner = self.inner.clone();
        let coordinator = self.coordinator.clone();

        Box::pin(async move {
            coordinator
                .retry_until_connected(move || {
                    let svc = inner.clone();
                    let request = request.clone();
                    async move { svc.oneshot(request).await }
                })
                .await
        })
    }
}
