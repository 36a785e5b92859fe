//! Error types for the resilient client.

use std::fmt;
use std::time::Duration;
use zk_resilience_core::SessionError;

/// Errors returned by [`RetryCoordinator::retry_until_connected`](crate::RetryCoordinator::retry_until_connected)
/// and the [`RetryUntilConnected`](crate::RetryUntilConnected) service.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The session did not become usable before the retry deadline.
    ///
    /// Carries no copy of the last session-loss error.
    Timeout {
        /// Invocations made before giving up.
        attempts: usize,
        /// Time spent since the call started.
        elapsed: Duration,
    },

    /// The operation failed with an error that is not a session loss.
    Inner(E),
}

impl<E> RetryError<E> {
    /// Returns `true` if this is a [`RetryError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Timeout { .. })
    }

    /// Extracts the operation's own error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Inner(e) => Some(e),
            RetryError::Timeout { .. } => None,
        }
    }
}

impl<E> fmt::Display for RetryError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { attempts, elapsed } => write!(
                f,
                "session not usable after {} attempt(s) over {:?}",
                attempts, elapsed
            ),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timeout { .. } => None,
            Self::Inner(e) => Some(e),
        }
    }
}

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// An operation was attempted while the client holds no session, i.e.
    /// before `connect` or after `disconnect`. Never retried.
    #[error("operation attempted before connect")]
    OperationBeforeConnect,

    /// The session stayed unusable past the retry deadline.
    #[error("session not usable after {attempts} attempt(s) over {elapsed:?}")]
    RetryTimeout {
        /// Invocations made before giving up.
        attempts: usize,
        /// Time spent since the call started.
        elapsed: Duration,
    },

    /// A write payload is too large. Checked locally, before any request.
    #[error("payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Exclusive size limit.
        limit: usize,
    },

    /// `connect` created a session that was not established in time.
    #[error("session not established within {timeout:?}")]
    ConnectTimeout {
        /// The configured session timeout.
        timeout: Duration,
    },

    /// The session rejected the request, or could not be created.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// Returns `true` if the retry deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::RetryTimeout { .. })
    }

    /// Returns `true` if the client held no session.
    pub fn is_before_connect(&self) -> bool {
        matches!(self, ClientError::OperationBeforeConnect)
    }

    /// Returns `true` if a payload was rejected locally.
    pub fn is_payload_too_large(&self) -> bool {
        matches!(self, ClientError::PayloadTooLarge { .. })
    }

    /// The session's error, if that is what this is.
    pub fn session_error(&self) -> Option<&SessionError> {
        match self {
            ClientError::Session(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if the node does not exist.
    pub fn is_no_node(&self) -> bool {
        self.session_error().is_some_and(SessionError::is_no_node)
    }

    /// Returns `true` if the node already exists.
    pub fn is_node_exists(&self) -> bool {
        self.session_error().is_some_and(SessionError::is_node_exists)
    }
}

impl From<RetryError<SessionError>> for ClientError {
    fn from(err: RetryError<SessionError>) -> Self {
        match err {
            RetryError::Timeout { attempts, elapsed } => {
                ClientError::RetryTimeout { attempts, elapsed }
            }
            RetryError::Inner(e) => ClientError::Session(e),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
