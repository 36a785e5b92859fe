//! Error taxonomy of the underlying session.
//!
//! Errors fall in two classes. Session-loss errors ([`SessionError::SessionExpired`],
//! [`SessionError::ConnectionLoss`]) mean the attempt failed because the session was
//! unusable at the time, and the same request may succeed once the session is back.
//! Every other error is a verdict on the request itself and retrying would not
//! change it.
//!
//! The [`SessionLoss`] trait is the classifier the retry coordinator is generic
//! over, so services with their own error types can opt in:
//!
//! ```rust
//! use zk_resilience_core::SessionLoss;
//!
//! #[derive(Debug)]
//! enum StoreError {
//!     Unavailable,
//!     Rejected,
//! }
//!
//! impl SessionLoss for StoreError {
//!     fn is_session_loss(&self) -> bool {
//!         matches!(self, StoreError::Unavailable)
//!     }
//! }
//!
//! assert!(StoreError::Unavailable.is_session_loss());
//! assert!(!StoreError::Rejected.is_session_loss());
//! ```

/// Classifies errors that were caused by a temporarily unusable session.
pub trait SessionLoss {
    /// Returns `true` if the failed call may succeed once the session is usable again.
    fn is_session_loss(&self) -> bool;
}

/// Errors reported by the underlying session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The server expired the session.
    #[error("session has been expired by the server")]
    SessionExpired,

    /// The connection dropped mid-request; the session may still be alive.
    #[error("connection to the server has been lost")]
    ConnectionLoss,

    /// The node does not exist.
    #[error("node does not exist: {path}")]
    NoNode {
        /// Path of the missing node.
        path: String,
    },

    /// The node already exists.
    #[error("node already exists: {path}")]
    NodeExists {
        /// Path of the existing node.
        path: String,
    },

    /// The expected version did not match the node's version.
    #[error("version conflict on {path}")]
    BadVersion {
        /// Path of the node.
        path: String,
    },

    /// The node has children and cannot be deleted.
    #[error("node has children: {path}")]
    NotEmpty {
        /// Path of the node.
        path: String,
    },

    /// Ephemeral nodes may not have children.
    #[error("ephemeral node cannot have children: {path}")]
    NoChildrenForEphemerals {
        /// Path of the ephemeral parent.
        path: String,
    },

    /// The path is malformed.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The server rejected the client's credentials.
    #[error("authentication failed")]
    AuthFailed,

    /// The session has been closed by the client.
    #[error("session is closed")]
    Closed,

    /// A session could not be established.
    #[error("failed to connect: {reason}")]
    ConnectFailed {
        /// Why the connection attempt failed.
        reason: String,
    },
}

impl SessionError {
    /// Returns `true` for session expiry and connection loss.
    pub fn is_session_loss(&self) -> bool {
        matches!(
            self,
            SessionError::SessionExpired | SessionError::ConnectionLoss
        )
    }

    /// Returns `true` if this is a [`SessionError::NoNode`].
    pub fn is_no_node(&self) -> bool {
        matches!(self, SessionError::NoNode { .. })
    }

    /// Returns `true` if this is a [`SessionError::NodeExists`].
    pub fn is_node_exists(&self) -> bool {
        matches!(self, SessionError::NodeExists { .. })
    }
}

impl SessionLoss for SessionError {
    fn is_session_loss(&self) -> bool {
        SessionError::is_session_loss(self)
    }
}

impl<T: SessionLoss + ?Sized> SessionLoss for Box<T> {
    fn is_session_loss(&self) -> bool {
        (**self).is_session_loss()
    }
}
