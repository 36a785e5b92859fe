//! The public client surface.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use zk_resilience_core::{SessionError, SessionState};
use zk_resilience_session::{path, Acl, ConnectionFactory, CreateMode, Session, Stat, ANY_VERSION};

use crate::config::ClientConfig;
use crate::coordinator::RetryCoordinator;
use crate::error::{ClientError, Result};
use crate::events::ClientEvent;
use crate::layer::RetryUntilConnectedLayer;
use crate::tracker::SessionStateTracker;
use crate::watcher::Watcher;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::{info, warn};

/// Writes must be strictly smaller than this many bytes (1 MiB).
pub const MAX_DATA_SIZE: usize = 1024 * 1024;

/// A coordination-service client whose operations survive session loss.
///
/// Every operation goes through the client's [`RetryCoordinator`]: if the
/// session is mid-reconnect or expired, the call waits for the watcher to
/// report a usable session and tries again, up to the configured retry
/// timeout. Errors about the request itself are returned on first occurrence.
///
/// Each client owns its own tracker, watcher and coordinator, so any number
/// of independent clients can live in one process.
///
/// # Examples
///
/// ```rust
/// use zk_resilience_client::{Client, ClientConfig};
/// use zk_resilience_session::InMemoryEnsemble;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), zk_resilience_client::ClientError> {
/// let client = Client::new(ClientConfig::default(), InMemoryEnsemble::new());
/// assert!(client.create_data_with_path("/a/b", b"hello").await.unwrap_err().is_before_connect());
///
/// client.connect().await?;
/// client.create_data_with_path("/a/b", b"hello").await?;
/// let (data, _stat) = client.get("/a/b").await?;
/// assert_eq!(data, b"hello");
///
/// client.delete_tree("/a").await?;
/// assert!(client.exists("/a").await?.is_none());
/// client.disconnect();
/// # Ok(())
/// # }
/// ```
pub struct Client<F: ConnectionFactory> {
    config: Arc<ClientConfig>,
    factory: F,
    coordinator: RetryCoordinator,
    session: RwLock<Option<Arc<F::Session>>>,
    connecting: tokio::sync::Mutex<()>,
}

impl<F: ConnectionFactory> Client<F> {
    /// Creates a disconnected client that will open sessions through `factory`.
    pub fn new(config: ClientConfig, factory: F) -> Self {
        let config = Arc::new(config);
        let coordinator = RetryCoordinator::new(SessionStateTracker::new(), Arc::clone(&config));
        Self {
            config,
            factory,
            coordinator,
            session: RwLock::new(None),
            connecting: tokio::sync::Mutex::new(()),
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The coordinator wrapping this client's operations.
    pub fn coordinator(&self) -> &RetryCoordinator {
        &self.coordinator
    }

    /// The current session handle, if connected.
    pub fn session(&self) -> Option<Arc<F::Session>> {
        self.session.read().unwrap().clone()
    }

    /// Latest state reported by the watcher.
    pub fn state(&self) -> SessionState {
        self.coordinator.tracker().state()
    }

    /// Returns `true` only while the session is [`SessionState::ConnectedWithSession`].
    ///
    /// May briefly stay `true` after [`disconnect`](Self::disconnect) returns,
    /// until the watcher hears about the teardown.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Waits up to `timeout` for the watcher to report `state`.
    pub async fn wait_for_state(&self, state: SessionState, timeout: Duration) -> bool {
        self.coordinator
            .wait_until(move |current| current == state, timeout)
            .await
    }

    /// Opens a session and waits, up to the session timeout, for it to be
    /// established.
    ///
    /// Does nothing if the client already holds a session. If the session
    /// reports [`SessionState::AuthFailed`] or [`SessionState::Expired`]
    /// instead, or nothing usable arrives within the timeout, the new session
    /// is closed again and the matching error ([`SessionError::AuthFailed`],
    /// [`SessionError::SessionExpired`] or [`ClientError::ConnectTimeout`])
    /// is returned.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.connecting.lock().await;
        if self.session().is_some() {
            return Ok(());
        }

        let tracker = self.coordinator.tracker();
        let generation = tracker.begin_generation();
        let watcher = Arc::new(Watcher::new(
            tracker.clone(),
            generation,
            Arc::clone(&self.config),
        ));
        let session = self
            .factory
            .connect(&self.config.servers, self.config.session_timeout, watcher)
            .await?;
        let session = Arc::new(session);
        *self.session.write().unwrap() = Some(Arc::clone(&session));

        let timeout = self.config.session_timeout;
        let mut settled = None;
        self.coordinator
            .wait_until(
                |state| {
                    let done = matches!(
                        state,
                        SessionState::ConnectedWithSession
                            | SessionState::AuthFailed
                            | SessionState::Expired
                    );
                    if done {
                        settled = Some(state);
                    }
                    done
                },
                timeout,
            )
            .await;

        let failure = match settled {
            Some(SessionState::ConnectedWithSession) => None,
            Some(SessionState::AuthFailed) => Some(SessionError::AuthFailed.into()),
            Some(_) => Some(SessionError::SessionExpired.into()),
            None => Some(ClientError::ConnectTimeout { timeout }),
        };
        if let Some(err) = failure {
            #[cfg(feature = "tracing")]
            warn!(client = %self.config.name, error = %err, "session not established");

            self.session.write().unwrap().take();
            session.close();
            return Err(err);
        }

        let session_id = session.session_id();

        #[cfg(feature = "tracing")]
        info!(client = %self.config.name, session_id, "connected");

        self.config.emit(&ClientEvent::Connected {
            client_name: self.config.name.clone(),
            timestamp: Instant::now(),
            session_id,
        });
        Ok(())
    }

    /// Starts closing the session and returns immediately.
    ///
    /// The watcher records [`SessionState::Disconnected`] asynchronously; use
    /// [`wait_for_state`](Self::wait_for_state) when that must be observed.
    /// Later operations fail with [`ClientError::OperationBeforeConnect`]
    /// until the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        let Some(session) = self.session.write().unwrap().take() else {
            return;
        };
        session.close();

        #[cfg(feature = "tracing")]
        info!(client = %self.config.name, session_id = session.session_id(), "disconnecting");

        self.config.emit(&ClientEvent::Disconnected {
            client_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }

    /// Creates a node and returns its actual path.
    pub async fn create(
        &self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
        acl: &[Acl],
    ) -> Result<String> {
        self.check_payload(data)?;
        let session = self.live_session()?;
        let session = session.as_ref();
        Ok(self
            .coordinator
            .retry_until_connected(move || session.create(path, data, mode, acl))
            .await?)
    }

    /// Creates a persistent node holding `data`, creating any missing
    /// ancestors as empty persistent nodes first.
    pub async fn create_data_with_path(&self, path: &str, data: &[u8]) -> Result<()> {
        self.check_payload(data)?;
        path::validate(path)?;
        let acl = [Acl::open_unsafe()];
        for ancestor in path::ancestors(path) {
            match self.create(ancestor, &[], CreateMode::Persistent, &acl).await {
                Ok(_) => {}
                Err(err) if err.is_node_exists() => {}
                Err(err) => return Err(err),
            }
        }
        self.create(path, data, CreateMode::Persistent, &acl).await?;
        Ok(())
    }

    /// Returns a node's data and metadata.
    pub async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat)> {
        let session = self.live_session()?;
        let session = session.as_ref();
        Ok(self
            .coordinator
            .retry_until_connected(move || session.get(path))
            .await?)
    }

    /// Replaces a node's data if its version matches `version`
    /// ([`ANY_VERSION`] matches any).
    pub async fn set(&self, path: &str, data: &[u8], version: i32) -> Result<Stat> {
        self.check_payload(data)?;
        let session = self.live_session()?;
        let session = session.as_ref();
        Ok(self
            .coordinator
            .retry_until_connected(move || session.set(path, data, version))
            .await?)
    }

    /// Deletes a childless node if its version matches `version`.
    pub async fn delete(&self, path: &str, version: i32) -> Result<()> {
        let session = self.live_session()?;
        let session = session.as_ref();
        Ok(self
            .coordinator
            .retry_until_connected(move || session.delete(path, version))
            .await?)
    }

    /// Returns the node's metadata, or `None` if it does not exist.
    pub async fn exists(&self, path: &str) -> Result<Option<Stat>> {
        let session = self.live_session()?;
        let session = session.as_ref();
        Ok(self
            .coordinator
            .retry_until_connected(move || session.exists(path))
            .await?)
    }

    /// Returns the sorted names of a node's children.
    pub async fn children(&self, path: &str) -> Result<Vec<String>> {
        let session = self.live_session()?;
        let session = session.as_ref();
        Ok(self
            .coordinator
            .retry_until_connected(move || session.children(path))
            .await?)
    }

    /// Deletes `path` and everything below it, deepest nodes first.
    ///
    /// Descendants removed concurrently by someone else are skipped, but a
    /// `path` that does not exist fails with [`SessionError::NoNode`] rather
    /// than succeeding as a no-op, so callers can tell a typo from a finished
    /// delete. The root cannot be deleted.
    pub async fn delete_tree(&self, path: &str) -> Result<()> {
        path::validate(path)?;
        if path == path::ROOT {
            return Err(SessionError::InvalidPath {
                path: path.to_string(),
                reason: "the root node cannot be deleted",
            }
            .into());
        }

        // Pre-order listing: every node precedes its descendants.
        let mut nodes = Vec::new();
        let mut pending = vec![path.to_string()];
        while let Some(node) = pending.pop() {
            let children = match self.children(&node).await {
                Ok(children) => children,
                Err(err) if err.is_no_node() && node != path => continue,
                Err(err) => return Err(err),
            };
            pending.extend(children.iter().map(|child| path::join(&node, child)));
            nodes.push(node);
        }

        for node in nodes.iter().rev() {
            match self.delete(node, ANY_VERSION).await {
                Ok(()) => {}
                Err(err) if err.is_no_node() && node != path => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// A Tower layer that runs any service through this client's coordinator.
    pub fn retry_layer(&self) -> RetryUntilConnectedLayer {
        RetryUntilConnectedLayer::new(self.coordinator.clone())
    }

    fn live_session(&self) -> Result<Arc<F::Session>> {
        self.session().ok_or(ClientError::OperationBeforeConnect)
    }

    fn check_payload(&self, data: &[u8]) -> Result<()> {
        if data.len() < MAX_DATA_SIZE {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        warn!(client = %self.config.name, size = data.len(), limit = MAX_DATA_SIZE, "payload too large");

        #[cfg(feature = "metrics")]
        counter!("zk_client_payload_rejections_total", "client" => self.config.name.clone())
            .increment(1);

        self.config.emit(&ClientEvent::PayloadRejected {
            client_name: self.config.name.clone(),
            timestamp: Instant::now(),
            size: data.len(),
            limit: MAX_DATA_SIZE,
        });
        Err(ClientError::PayloadTooLarge {
            size: data.len(),
            limit: MAX_DATA_SIZE,
        })
    }
}

/// Dropping a client closes its session, so its ephemeral nodes go with it.
impl<F: ConnectionFactory> Drop for Client<F> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<F: ConnectionFactory> std::fmt::Debug for Client<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.config.name)
            .field("servers", &self.config.servers)
            .field("state", &self.state())
            .field("has_session", &self.session.read().unwrap().is_some())
            .finish()
    }
}
