use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use zk_resilience_core::{SessionError, SessionState};

use crate::types::{Acl, CreateMode, Stat};

/// Receives connectivity changes from a session.
///
/// Sessions call this from their own callback path, concurrently with
/// requests issued by callers. Implementations must return quickly and must
/// not block or await: a slow listener stalls delivery of every later
/// notification.
pub trait StateListener: Send + Sync {
    /// Called whenever the session's connectivity changes.
    fn on_state_change(&self, state: SessionState);
}

impl<F> StateListener for F
where
    F: Fn(SessionState) + Send + Sync,
{
    fn on_state_change(&self, state: SessionState) {
        self(state)
    }
}

/// A live handle to a coordination-service ensemble.
///
/// Every request either succeeds, fails with a session-loss error
/// ([`SessionError::is_session_loss`]) when the session is mid-reconnect or
/// expired, or fails with a domain error about the request itself.
pub trait Session: Send + Sync + 'static {
    /// Creates a node and returns its actual path (which differs from `path`
    /// for sequential nodes).
    fn create(
        &self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
        acl: &[Acl],
    ) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Returns a node's data and metadata.
    fn get(&self, path: &str) -> impl Future<Output = Result<(Vec<u8>, Stat), SessionError>> + Send;

    /// Replaces a node's data if its version matches `version`
    /// ([`ANY_VERSION`](crate::ANY_VERSION) matches any).
    fn set(
        &self,
        path: &str,
        data: &[u8],
        version: i32,
    ) -> impl Future<Output = Result<Stat, SessionError>> + Send;

    /// Deletes a childless node if its version matches `version`.
    fn delete(&self, path: &str, version: i32)
        -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Returns the node's metadata, or `None` if it does not exist.
    fn exists(&self, path: &str) -> impl Future<Output = Result<Option<Stat>, SessionError>> + Send;

    /// Returns the names (not paths) of a node's children, sorted.
    fn children(&self, path: &str)
        -> impl Future<Output = Result<Vec<String>, SessionError>> + Send;

    /// Server-assigned id of the current session.
    fn session_id(&self) -> i64;

    /// Starts tearing the session down and returns immediately.
    ///
    /// The transition to [`SessionState::Disconnected`] is reported to the
    /// listener asynchronously.
    fn close(&self);
}

/// Establishes sessions. Pluggable so tests can substitute an in-memory ensemble.
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The session type produced by this factory.
    type Session: Session;

    /// Connects to `servers` and registers `listener` for connectivity changes.
    ///
    /// Returning `Ok` means the handle exists, not that it is usable: the
    /// listener reports when the session is established.
    fn connect(
        &self,
        servers: &[String],
        session_timeout: Duration,
        listener: Arc<dyn StateListener>,
    ) -> impl Future<Output = Result<Self::Session, SessionError>> + Send;
}
