//! Bridges session notifications into the state tracker.

use std::sync::Arc;
use std::time::Instant;

use zk_resilience_core::SessionState;
use zk_resilience_session::StateListener;

use crate::config::ClientConfig;
use crate::events::ClientEvent;
use crate::tracker::SessionStateTracker;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
#[cfg(feature = "tracing")]
use tracing::{info, trace};

/// Listener registered with the session at connect time.
///
/// Each notification is recorded in the [`SessionStateTracker`], which wakes
/// every caller blocked in the retry coordinator. Runs on the session's
/// callback path, so it only updates state and reports it; it never blocks.
pub struct Watcher {
    tracker: SessionStateTracker,
    generation: u64,
    config: Arc<ClientConfig>,
}

impl Watcher {
    pub(crate) fn new(
        tracker: SessionStateTracker,
        generation: u64,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            tracker,
            generation,
            config,
        }
    }

    /// Connection generation this watcher belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl StateListener for Watcher {
    fn on_state_change(&self, state: SessionState) {
        let Some(from) = self.tracker.set_state_for(self.generation, state) else {
            #[cfg(feature = "tracing")]
            trace!(
                client = %self.config.name,
                generation = self.generation,
                state = %state,
                "dropping notification from a replaced session"
            );
            return;
        };

        #[cfg(feature = "tracing")]
        info!(client = %self.config.name, from = %from, to = %state, "session state changed");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "zk_client_state_transitions_total",
                "client" => self.config.name.clone(),
                "from" => from.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("zk_client_connected", "client" => self.config.name.clone())
                .set(if state.is_connected() { 1.0 } else { 0.0 });
        }

        self.config.emit(&ClientEvent::StateChanged {
            client_name: self.config.name.clone(),
            timestamp: Instant::now(),
            from,
            to: state,
        });
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("client", &self.config.name)
            .field("generation", &self.generation)
            .finish()
    }
}
