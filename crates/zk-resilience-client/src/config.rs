//! Client configuration.

use crate::events::ClientEvent;
use std::time::Duration;
use zk_resilience_core::events::{EventListener, EventListeners, FnListener};
use zk_resilience_core::SessionState;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge, describe_histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Server used when none is configured.
pub const DEFAULT_SERVER: &str = "127.0.0.1:2181";

/// Session timeout used when none is configured.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry timeout used when none is configured.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`Client`](crate::Client).
#[derive(Clone)]
pub struct ClientConfig {
    /// Name of this client instance, used in events, logs and metric labels.
    pub(crate) name: String,
    /// Ensemble members as `host:port`.
    pub(crate) servers: Vec<String>,
    /// Session timeout requested from the ensemble. Also bounds `connect`.
    pub(crate) session_timeout: Duration,
    /// How long one operation may wait for the session to become usable,
    /// measured from the start of the call.
    pub(crate) retry_timeout: Duration,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<ClientEvent>,
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "zk_client_state_transitions_total",
                    "Session state changes recorded by the watcher"
                );
                describe_gauge!(
                    "zk_client_connected",
                    "1 while the session is usable, 0 otherwise"
                );
                describe_counter!(
                    "zk_client_retry_waits_total",
                    "Times an operation waited for the session after a session-loss error"
                );
                describe_counter!(
                    "zk_client_retry_calls_total",
                    "Operations run through the retry coordinator, by result"
                );
                describe_histogram!(
                    "zk_client_retry_attempts",
                    "Invocations needed per coordinated operation"
                );
                describe_counter!(
                    "zk_client_payload_rejections_total",
                    "Writes rejected locally for exceeding the payload limit"
                );
            });
        }
        ClientConfigBuilder::new()
    }

    /// Name of this client instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ensemble members.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Requested session timeout.
    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Per-operation retry deadline.
    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    pub(crate) fn emit(&self, event: &ClientEvent) {
        self.event_listeners.emit(event);
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfigBuilder::new().build()
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("name", &self.name)
            .field("servers", &self.servers)
            .field("session_timeout", &self.session_timeout)
            .field("retry_timeout", &self.retry_timeout)
            .field("event_listeners", &self.event_listeners.len())
            .finish()
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    name: String,
    servers: Vec<String>,
    session_timeout: Duration,
    retry_timeout: Duration,
    event_listeners: EventListeners<ClientEvent>,
}

impl ClientConfigBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self {
            name: "zk_client".to_string(),
            servers: Vec::new(),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of this client instance.
    ///
    /// Default: "zk_client"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds one ensemble member (`host:port`).
    ///
    /// Default: `127.0.0.1:2181` if no server is added.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.servers.push(server.into());
        self
    }

    /// Replaces the ensemble member list.
    ///
    /// Accepts a comma separated connect string such as
    /// `"zk1:2181,zk2:2181"` as a single entry.
    pub fn servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.servers = servers
            .into_iter()
            .flat_map(|entry| {
                entry
                    .into()
                    .split(',')
                    .map(str::trim)
                    .filter(|server| !server.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        self
    }

    /// Sets the session timeout requested from the ensemble.
    ///
    /// `connect` also waits at most this long for the session to be established.
    /// Default: 10 seconds
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Sets how long a single operation may wait for the session to become
    /// usable again. The deadline runs from the start of the call and is not
    /// reset between waits.
    ///
    /// Default: 5 seconds
    pub fn retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    /// Registers a listener for every [`ClientEvent`].
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<ClientEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Registers a callback for session state changes.
    ///
    /// Runs on the session's callback path; keep it short.
    ///
    /// # Callback Signature
    /// `Fn(SessionState, SessionState)` - previous and new state.
    ///
    /// # Example
    /// ```rust
    /// use zk_resilience_client::ClientConfig;
    ///
    /// let config = ClientConfig::builder()
    ///     .on_state_change(|from, to| {
    ///         println!("session {} -> {}", from, to);
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(SessionState, SessionState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::StateChanged { from, to, .. } = event {
                f(*from, *to);
            }
        }));
        self
    }

    /// Registers a callback for when an operation starts waiting for the session.
    ///
    /// # Callback Signature
    /// `Fn(usize, SessionState)` - attempts made so far and the state observed
    /// when the wait began.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, SessionState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::RetryWaiting { attempt, state, .. } = event {
                f(*attempt, *state);
            }
        }));
        self
    }

    /// Registers a callback for coordinated operations that succeeded.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - invocations needed, 1 on the optimistic path.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::RetrySucceeded { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback for operations that gave up at the retry deadline.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)` - invocations made and time spent.
    pub fn on_retry_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::RetryTimedOut {
                attempts, elapsed, ..
            } = event
            {
                f(*attempts, *elapsed);
            }
        }));
        self
    }

    /// Registers a callback for successful `connect` calls.
    ///
    /// # Callback Signature
    /// `Fn(i64)` - the new session id.
    pub fn on_connected<F>(mut self, f: F) -> Self
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::Connected { session_id, .. } = event {
                f(*session_id);
            }
        }));
        self
    }

    /// Registers a callback for `disconnect` calls that closed a session.
    pub fn on_disconnected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::Disconnected { .. } = event {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ClientConfig {
        let servers = if self.servers.is_empty() {
            vec![DEFAULT_SERVER.to_string()]
        } else {
            self.servers
        };
        ClientConfig {
            name: self.name,
            servers,
            session_timeout: self.session_timeout,
            retry_timeout: self.retry_timeout,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
