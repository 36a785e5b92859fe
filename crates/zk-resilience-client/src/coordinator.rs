//! Retry-until-connected coordination.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use zk_resilience_core::{SessionLoss, SessionState};

use crate::config::ClientConfig;
use crate::error::RetryError;
use crate::events::ClientEvent;
use crate::tracker::SessionStateTracker;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

/// Runs operations against the session and, when one fails because the
/// session is unusable, parks the caller until the watcher reports a usable
/// session or the call's deadline passes.
///
/// Cloning is cheap; clones share the tracker and configuration. Any number
/// of callers may wait at once: each one is woken by every state change and
/// re-checks the state on its own, so no ordering between callers is implied.
#[derive(Clone)]
pub struct RetryCoordinator {
    tracker: SessionStateTracker,
    config: Arc<ClientConfig>,
}

impl RetryCoordinator {
    /// Creates a coordinator that waits on `tracker`, using the retry timeout
    /// and listeners of `config`.
    pub fn new(tracker: SessionStateTracker, config: Arc<ClientConfig>) -> Self {
        Self { tracker, config }
    }

    /// The state tracker this coordinator waits on.
    pub fn tracker(&self) -> &SessionStateTracker {
        &self.tracker
    }

    /// Per-call retry deadline.
    pub fn retry_timeout(&self) -> Duration {
        self.config.retry_timeout
    }

    /// Runs `operation` until it succeeds, fails with an error that is not a
    /// session loss, or the retry timeout elapses.
    ///
    /// The first invocation happens immediately. After a session-loss error
    /// the caller waits for [`SessionState::ConnectedWithSession`], without
    /// sleeping if the session is already usable again, and then invokes the
    /// operation once more. The deadline is fixed when the call starts; once
    /// it has passed the operation is never invoked again and
    /// [`RetryError::Timeout`] is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use zk_resilience_client::{
    ///     ClientConfig, RetryCoordinator, SessionError, SessionState, SessionStateTracker,
    /// };
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let tracker = SessionStateTracker::new();
    /// tracker.set_state(SessionState::ConnectedWithSession);
    /// let coordinator = RetryCoordinator::new(tracker, Arc::new(ClientConfig::default()));
    ///
    /// let mut calls = 0;
    /// let result = coordinator
    ///     .retry_until_connected(|| {
    ///         calls += 1;
    ///         let outcome = if calls == 1 {
    ///             Err(SessionError::SessionExpired)
    ///         } else {
    ///             Ok("done")
    ///         };
    ///         async move { outcome }
    ///     })
    ///     .await;
    ///
    /// assert_eq!(result.unwrap(), "done");
    /// assert_eq!(calls, 2);
    /// # }
    /// ```
    pub async fn retry_until_connected<T, E, F, Fut>(
        &self,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: SessionLoss,
    {
        let started = Instant::now();
        let deadline = started + self.config.retry_timeout;
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(value) => {
                    self.on_success(attempts);
                    return Ok(value);
                }
                Err(error) if !error.is_session_loss() => {
                    self.on_error(attempts);
                    return Err(RetryError::Inner(error));
                }
                Err(_) => {}
            }

            self.on_wait(attempts);
            if !self.wait_connected_until(deadline).await {
                let elapsed = started.elapsed();
                self.on_timeout(attempts, elapsed);
                return Err(RetryError::Timeout { attempts, elapsed });
            }
        }
    }

    /// Waits up to `timeout` for the tracked state to satisfy `predicate`.
    ///
    /// Returns `true` as soon as it does, which may be immediately.
    pub async fn wait_until<P>(&self, mut predicate: P, timeout: Duration) -> bool
    where
        P: FnMut(SessionState) -> bool,
    {
        let mut receiver = self.tracker.subscribe();
        let wait = receiver.wait_for(|state| predicate(*state));
        let satisfied = matches!(tokio::time::timeout(timeout, wait).await, Ok(Ok(_)));
        satisfied
    }

    async fn wait_connected_until(&self, deadline: Instant) -> bool {
        let mut receiver = self.tracker.subscribe();
        let wait = receiver.wait_for(|state| state.is_connected());
        let connected = matches!(tokio::time::timeout_at(deadline, wait).await, Ok(Ok(_)));
        // A usable state seen at or after the deadline does not earn another attempt.
        connected && Instant::now() < deadline
    }

    fn on_success(&self, attempts: usize) {
        #[cfg(feature = "tracing")]
        trace!(client = %self.config.name, attempts, "operation succeeded");

        #[cfg(feature = "metrics")]
        self.record_call("success", attempts);

        self.config.emit(&ClientEvent::RetrySucceeded {
            client_name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            attempts,
        });
    }

    fn on_error(&self, _attempts: usize) {
        #[cfg(feature = "metrics")]
        self.record_call("error", _attempts);
    }

    fn on_wait(&self, attempt: usize) {
        let state = self.tracker.state();

        #[cfg(feature = "tracing")]
        debug!(
            client = %self.config.name,
            attempt,
            state = %state,
            "session lost during operation, waiting for reconnect"
        );

        #[cfg(feature = "metrics")]
        counter!("zk_client_retry_waits_total", "client" => self.config.name.clone())
            .increment(1);

        self.config.emit(&ClientEvent::RetryWaiting {
            client_name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            attempt,
            state,
        });
    }

    fn on_timeout(&self, attempts: usize, elapsed: Duration) {
        #[cfg(feature = "tracing")]
        warn!(
            client = %self.config.name,
            attempts,
            elapsed = ?elapsed,
            state = %self.tracker.state(),
            "gave up waiting for the session"
        );

        #[cfg(feature = "metrics")]
        self.record_call("timeout", attempts);

        self.config.emit(&ClientEvent::RetryTimedOut {
            client_name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            attempts,
            elapsed,
        });
    }

    #[cfg(feature = "metrics")]
    fn record_call(&self, result: &'static str, attempts: usize) {
        counter!(
            "zk_client_retry_calls_total",
            "client" => self.config.name.clone(),
            "result" => result
        )
        .increment(1);
        histogram!("zk_client_retry_attempts", "client" => self.config.name.clone())
            .record(attempts as f64);
    }
}

impl std::fmt::Debug for RetryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryCoordinator")
            .field("client", &self.config.name)
            .field("state", &self.tracker.state())
            .field("retry_timeout", &self.config.retry_timeout)
            .finish()
    }
}
