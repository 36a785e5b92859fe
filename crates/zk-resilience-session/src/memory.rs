//! In-process ensemble with hand-driven connectivity.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(feature = "tracing")]
use tracing::debug;

use zk_resilience_core::{SessionError, SessionState};

use crate::path;
use crate::session::{ConnectionFactory, Session, StateListener};
use crate::types::{Acl, CreateMode, Stat, ANY_VERSION};

/// An in-memory coordination-service ensemble.
///
/// Acts as the server side for any number of [`InMemorySession`]s and
/// implements [`ConnectionFactory`]. Clones share the same data tree, so a
/// test can keep one handle while a client owns another.
///
/// Connectivity is driven by hand with [`InMemorySession::set_state`] or
/// [`InMemoryEnsemble::set_state`]; while a session is not
/// [`SessionState::ConnectedWithSession`] its requests fail with
/// session-loss errors, exactly like a real session mid-reconnect.
#[derive(Clone)]
pub struct InMemoryEnsemble {
    tree: Arc<Mutex<Tree>>,
    sessions: Arc<Mutex<Vec<InMemorySession>>>,
    next_session_id: Arc<AtomicI64>,
    accepting: Arc<AtomicBool>,
    auto_session: bool,
}

impl InMemoryEnsemble {
    /// Creates an ensemble holding only the root node.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Mutex::new(Tree::new())),
            sessions: Arc::new(Mutex::new(Vec::new())),
            next_session_id: Arc::new(AtomicI64::new(1)),
            accepting: Arc::new(AtomicBool::new(true)),
            auto_session: true,
        }
    }

    /// Whether new sessions report `Connecting` then `ConnectedWithSession`
    /// during connect (the default), or stop at `Connecting` until driven by hand.
    pub fn with_auto_session(mut self, auto_session: bool) -> Self {
        self.auto_session = auto_session;
        self
    }

    /// Makes later connection attempts fail (`false`) or succeed (`true`).
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::Release);
    }

    /// Drives every open session to `state`, as a network partition or
    /// ensemble restart would.
    pub fn set_state(&self, state: SessionState) {
        for session in self.open_sessions() {
            session.set_state(state);
        }
    }

    /// Sessions that have not been closed.
    pub fn open_sessions(&self) -> Vec<InMemorySession> {
        self.sessions.lock().unwrap().clone()
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        self.tree.lock().unwrap().nodes.len()
    }

    /// The ACL a node was created with, read straight from the tree.
    pub fn acl(&self, path: &str) -> Result<Vec<Acl>, SessionError> {
        Ok(self.tree.lock().unwrap().node(path)?.acl.clone())
    }
}

impl Default for InMemoryEnsemble {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEnsemble")
            .field("nodes", &self.node_count())
            .field("open_sessions", &self.sessions.lock().unwrap().len())
            .field("auto_session", &self.auto_session)
            .finish()
    }
}

impl ConnectionFactory for InMemoryEnsemble {
    type Session = InMemorySession;

    async fn connect(
        &self,
        servers: &[String],
        session_timeout: Duration,
        listener: Arc<dyn StateListener>,
    ) -> Result<InMemorySession, SessionError> {
        if servers.is_empty() {
            return Err(SessionError::ConnectFailed {
                reason: "no servers configured".to_string(),
            });
        }
        if !self.accepting.load(Ordering::Acquire) {
            return Err(SessionError::ConnectFailed {
                reason: format!("no server reachable among {}", servers.join(",")),
            });
        }

        let id = self.next_session_id.fetch_add(1, Ordering::AcqRel);
        let session = InMemorySession {
            inner: Arc::new(SessionInner {
                id,
                session_timeout,
                tree: Arc::clone(&self.tree),
                registry: Arc::clone(&self.sessions),
                state: Mutex::new(SessionState::Disconnected),
                closed: AtomicBool::new(false),
                listener,
            }),
        };
        self.sessions.lock().unwrap().push(session.clone());

        #[cfg(feature = "tracing")]
        debug!(session_id = id, "in-memory session opened");

        session.set_state(SessionState::Connecting);
        if self.auto_session {
            session.set_state(SessionState::ConnectedWithSession);
        }
        Ok(session)
    }
}

/// A session against an [`InMemoryEnsemble`].
#[derive(Clone)]
pub struct InMemorySession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: i64,
    session_timeout: Duration,
    tree: Arc<Mutex<Tree>>,
    registry: Arc<Mutex<Vec<InMemorySession>>>,
    state: Mutex<SessionState>,
    closed: AtomicBool,
    listener: Arc<dyn StateListener>,
}

impl InMemorySession {
    /// Sets this session's connectivity and reports it to the listener
    /// before returning.
    ///
    /// Expiry drops the session's ephemeral nodes. Ignored once closed.
    pub fn set_state(&self, state: SessionState) {
        if self.is_closed() {
            return;
        }
        // Held across the callback so notifications arrive in order.
        let mut current = self.inner.state.lock().unwrap();
        *current = state;
        if state == SessionState::Expired {
            self.inner.tree.lock().unwrap().remove_ephemerals(self.inner.id);
        }
        self.inner.listener.on_state_change(state);
    }

    /// Current connectivity as seen by the session itself.
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap()
    }

    /// Returns `true` once [`Session::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Session timeout requested at connect time.
    pub fn session_timeout(&self) -> Duration {
        self.inner.session_timeout
    }

    fn check_usable(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        match self.state() {
            SessionState::ConnectedWithSession => Ok(()),
            SessionState::Expired => Err(SessionError::SessionExpired),
            SessionState::AuthFailed => Err(SessionError::AuthFailed),
            SessionState::Disconnected | SessionState::Connecting => {
                Err(SessionError::ConnectionLoss)
            }
        }
    }

    fn with_tree<T>(
        &self,
        f: impl FnOnce(&mut Tree) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        self.check_usable()?;
        let mut tree = self.inner.tree.lock().unwrap();
        f(&mut tree)
    }
}

impl std::fmt::Debug for InMemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySession")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Session for InMemorySession {
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
        acl: &[Acl],
    ) -> Result<String, SessionError> {
        let owner = self.inner.id;
        self.with_tree(|tree| tree.create(path, data, mode, acl, owner))
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), SessionError> {
        self.with_tree(|tree| {
            let node = tree.node(path)?;
            Ok((node.data.clone(), node.stat))
        })
    }

    async fn set(&self, path: &str, data: &[u8], version: i32) -> Result<Stat, SessionError> {
        self.with_tree(|tree| tree.set(path, data, version))
    }

    async fn delete(&self, path: &str, version: i32) -> Result<(), SessionError> {
        self.with_tree(|tree| tree.delete(path, version))
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>, SessionError> {
        self.with_tree(|tree| {
            path::validate(path)?;
            Ok(tree.nodes.get(path).map(|node| node.stat))
        })
    }

    async fn children(&self, path: &str) -> Result<Vec<String>, SessionError> {
        self.with_tree(|tree| Ok(tree.node(path)?.children.iter().cloned().collect()))
    }

    fn session_id(&self) -> i64 {
        self.inner.id
    }

    fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let id = self.inner.id;
        self.inner.tree.lock().unwrap().remove_ephemerals(id);
        self.inner
            .registry
            .lock()
            .unwrap()
            .retain(|session| session.inner.id != id);
        *self.inner.state.lock().unwrap() = SessionState::Disconnected;

        #[cfg(feature = "tracing")]
        debug!(session_id = id, "in-memory session closed");

        let listener = Arc::clone(&self.inner.listener);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    listener.on_state_change(SessionState::Disconnected);
                });
            }
            Err(_) => listener.on_state_change(SessionState::Disconnected),
        }
    }
}

struct Node {
    data: Vec<u8>,
    stat: Stat,
    acl: Vec<Acl>,
    children: BTreeSet<String>,
}

struct Tree {
    nodes: HashMap<String, Node>,
    zxid: i64,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            path::ROOT.to_string(),
            Node {
                data: Vec::new(),
                stat: Stat::default(),
                acl: vec![Acl::open_unsafe()],
                children: BTreeSet::new(),
            },
        );
        Self { nodes, zxid: 0 }
    }

    fn node(&self, path: &str) -> Result<&Node, SessionError> {
        path::validate(path)?;
        self.nodes.get(path).ok_or_else(|| SessionError::NoNode {
            path: path.to_string(),
        })
    }

    fn next_zxid(&mut self) -> i64 {
        self.zxid += 1;
        self.zxid
    }

    fn create(
        &mut self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
        acl: &[Acl],
        owner: i64,
    ) -> Result<String, SessionError> {
        path::validate(path)?;
        let parent_path = path::parent(path).ok_or_else(|| SessionError::NodeExists {
            path: path.to_string(),
        })?;
        let parent = self
            .nodes
            .get(parent_path)
            .ok_or_else(|| SessionError::NoNode {
                path: path.to_string(),
            })?;
        if parent.stat.ephemeral_owner != 0 {
            return Err(SessionError::NoChildrenForEphemerals {
                path: parent_path.to_string(),
            });
        }

        let actual = if mode.is_sequential() {
            format!("{path}{:010}", parent.stat.cversion)
        } else {
            path.to_string()
        };
        if self.nodes.contains_key(&actual) {
            return Err(SessionError::NodeExists { path: actual });
        }

        let zxid = self.next_zxid();
        let now = now_millis();
        let stat = Stat {
            czxid: zxid,
            mzxid: zxid,
            ctime: now,
            mtime: now,
            version: 0,
            cversion: 0,
            ephemeral_owner: if mode.is_ephemeral() { owner } else { 0 },
            data_length: data.len() as i32,
            num_children: 0,
        };
        self.nodes.insert(
            actual.clone(),
            Node {
                data: data.to_vec(),
                stat,
                acl: acl.to_vec(),
                children: BTreeSet::new(),
            },
        );
        self.link_child(parent_path, path::name(&actual));
        Ok(actual)
    }

    fn set(&mut self, path: &str, data: &[u8], version: i32) -> Result<Stat, SessionError> {
        path::validate(path)?;
        let zxid = self.zxid + 1;
        let node = self.nodes.get_mut(path).ok_or_else(|| SessionError::NoNode {
            path: path.to_string(),
        })?;
        if version != ANY_VERSION && version != node.stat.version {
            return Err(SessionError::BadVersion {
                path: path.to_string(),
            });
        }
        node.data = data.to_vec();
        node.stat.version += 1;
        node.stat.mzxid = zxid;
        node.stat.mtime = now_millis();
        node.stat.data_length = data.len() as i32;
        let stat = node.stat;
        self.zxid = zxid;
        Ok(stat)
    }

    fn delete(&mut self, path: &str, version: i32) -> Result<(), SessionError> {
        path::validate(path)?;
        let parent_path = path::parent(path).ok_or_else(|| SessionError::InvalidPath {
            path: path.to_string(),
            reason: "the root node cannot be deleted",
        })?;
        let node = self.nodes.get(path).ok_or_else(|| SessionError::NoNode {
            path: path.to_string(),
        })?;
        if version != ANY_VERSION && version != node.stat.version {
            return Err(SessionError::BadVersion {
                path: path.to_string(),
            });
        }
        if !node.children.is_empty() {
            return Err(SessionError::NotEmpty {
                path: path.to_string(),
            });
        }
        self.nodes.remove(path);
        self.next_zxid();
        self.unlink_child(parent_path, path::name(path));
        Ok(())
    }

    fn remove_ephemerals(&mut self, owner: i64) {
        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.stat.ephemeral_owner == owner)
            .map(|(path, _)| path.clone())
            .collect();
        for path in owned {
            // Ephemerals never have children, so this cannot hit NotEmpty.
            let _ = self.delete(&path, ANY_VERSION);
        }
    }

    fn link_child(&mut self, parent: &str, child: &str) {
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.insert(child.to_string());
            parent.stat.cversion += 1;
            parent.stat.num_children = parent.children.len() as i32;
        }
    }

    fn unlink_child(&mut self, parent: &str, child: &str) {
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.remove(child);
            parent.stat.cversion += 1;
            parent.stat.num_children = parent.children.len() as i32;
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
