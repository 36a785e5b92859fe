//! Latest known connectivity state of the client's session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use zk_resilience_core::SessionState;

/// Holds the session's latest known state and wakes everyone waiting on it.
///
/// A pure latch: any sequence of states is accepted. Every write replaces
/// the value under the channel's lock and notifies all subscribers, and every
/// subscriber re-checks the current value when it starts waiting and after
/// each wake-up. A change published before a waiter subscribes is therefore
/// never missed.
///
/// Writes come from the [`Watcher`](crate::Watcher). Each connection attempt
/// opens a new generation, and notifications from an older generation are
/// dropped so a torn-down session cannot clobber its successor's state.
#[derive(Clone)]
pub struct SessionStateTracker {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl SessionStateTracker {
    /// Creates a tracker in [`SessionState::Disconnected`].
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                state,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Replaces the state, wakes all waiters, and returns the previous state.
    ///
    /// Meant for the watcher and for harnesses standing in for one.
    pub fn set_state(&self, state: SessionState) -> SessionState {
        self.inner.state.send_replace(state)
    }

    /// A receiver for waiting on state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Current connection generation.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Starts a new generation and resets the state to
    /// [`SessionState::Disconnected`].
    pub(crate) fn begin_generation(&self) -> u64 {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.set_state(SessionState::Disconnected);
        generation
    }

    /// Sets the state if `generation` is still current. Returns the previous
    /// state, or `None` if the write was stale and dropped.
    pub(crate) fn set_state_for(
        &self,
        generation: u64,
        state: SessionState,
    ) -> Option<SessionState> {
        let mut previous = None;
        self.inner.state.send_if_modified(|current| {
            if self.inner.generation.load(Ordering::Acquire) != generation {
                return false;
            }
            previous = Some(std::mem::replace(current, state));
            true
        });
        previous
    }
}

impl Default for SessionStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStateTracker")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}
