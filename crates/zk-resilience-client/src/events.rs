use std::time::{Duration, Instant};
use zk_resilience_core::events::Event;
use zk_resilience_core::SessionState;

/// Events emitted by a [`Client`](crate::Client) and its retry coordinator.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The watcher recorded a new session state.
    StateChanged {
        client_name: String,
        timestamp: Instant,
        from: SessionState,
        to: SessionState,
    },
    /// `connect` established a usable session.
    Connected {
        client_name: String,
        timestamp: Instant,
        session_id: i64,
    },
    /// `disconnect` started tearing the session down.
    Disconnected {
        client_name: String,
        timestamp: Instant,
    },
    /// An operation failed with a session-loss error and the caller is
    /// about to wait for the session.
    RetryWaiting {
        client_name: String,
        timestamp: Instant,
        attempt: usize,
        state: SessionState,
    },
    /// An operation succeeded (first try or after waiting).
    RetrySucceeded {
        client_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The session stayed unusable past the retry deadline.
    RetryTimedOut {
        client_name: String,
        timestamp: Instant,
        attempts: usize,
        elapsed: Duration,
    },
    /// A write was rejected locally for exceeding the payload limit.
    PayloadRejected {
        client_name: String,
        timestamp: Instant,
        size: usize,
        limit: usize,
    },
}

impl Event for ClientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::StateChanged { .. } => "state_changed",
            ClientEvent::Connected { .. } => "connected",
            ClientEvent::Disconnected { .. } => "disconnected",
            ClientEvent::RetryWaiting { .. } => "retry_waiting",
            ClientEvent::RetrySucceeded { .. } => "retry_succeeded",
            ClientEvent::RetryTimedOut { .. } => "retry_timed_out",
            ClientEvent::PayloadRejected { .. } => "payload_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ClientEvent::StateChanged { timestamp, .. }
            | ClientEvent::Connected { timestamp, .. }
            | ClientEvent::Disconnected { timestamp, .. }
            | ClientEvent::RetryWaiting { timestamp, .. }
            | ClientEvent::RetrySucceeded { timestamp, .. }
            | ClientEvent::RetryTimedOut { timestamp, .. }
            | ClientEvent::PayloadRejected { timestamp, .. } => *timestamp,
        }
    }

    fn client_name(&self) -> &str {
        match self {
            ClientEvent::StateChanged { client_name, .. }
            | ClientEvent::Connected { client_name, .. }
            | ClientEvent::Disconnected { client_name, .. }
            | ClientEvent::RetryWaiting { client_name, .. }
            | ClientEvent::RetrySucceeded { client_name, .. }
            | ClientEvent::RetryTimedOut { client_name, .. }
            | ClientEvent::PayloadRejected { client_name, .. } => client_name,
        }
    }
}
