//! Session-aware client for a ZooKeeper-style coordination service.
//!
//! Every request a [`Client`] makes is wrapped by a [`RetryCoordinator`]. When
//! the session is lost mid-request, the coordinator waits for the session
//! watcher to report a usable session again and retries, bounded by a
//! per-call timeout. Errors about the request itself (missing node, version
//! conflict) are returned immediately.
//!
//! # Features
//!
//! - **Retry until connected**: session-loss failures are retried with no
//!   polling; waiters wake as soon as the session is re-established
//! - **Fixed deadline**: a call never waits longer than the retry timeout in
//!   total, however many reconnects happen in between
//! - **Stale-session filtering**: notifications from a replaced session cannot
//!   overwrite the state of the current one
//! - **Tree helpers**: [`Client::create_data_with_path`] and
//!   [`Client::delete_tree`]
//! - **Tower integration**: [`RetryUntilConnectedLayer`] applies the same retry
//!   logic to any service whose errors implement [`SessionLoss`]
//! - **Event system**: state changes, retries and timeouts through listeners
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use zk_resilience_client::{Client, ClientConfig, SessionState};
//! use zk_resilience_session::InMemoryEnsemble;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), zk_resilience_client::ClientError> {
//! let ensemble = InMemoryEnsemble::new();
//! let config = ClientConfig::builder()
//!     .name("inventory")
//!     .servers(["zk1:2181,zk2:2181"])
//!     .retry_timeout(Duration::from_secs(2))
//!     .on_state_change(|from, to| println!("session {from} -> {to}"))
//!     .build();
//!
//! let client = Client::new(config, ensemble.clone());
//! client.connect().await?;
//! client.create_data_with_path("/inventory/items", b"42").await?;
//!
//! // A flapping session is invisible to callers as long as it comes back in time.
//! ensemble.set_state(SessionState::Connecting);
//! let reader = tokio::spawn({
//!     let ensemble = ensemble.clone();
//!     async move {
//!         tokio::time::sleep(Duration::from_millis(50)).await;
//!         ensemble.set_state(SessionState::ConnectedWithSession);
//!     }
//! });
//! let (data, _) = client.get("/inventory/items").await?;
//! assert_eq!(data, b"42");
//! # reader.await.unwrap();
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod coordinator;
mod error;
mod events;
mod layer;
mod service;
mod tracker;
mod watcher;

pub use client::{Client, MAX_DATA_SIZE};
pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_RETRY_TIMEOUT, DEFAULT_SERVER,
    DEFAULT_SESSION_TIMEOUT,
};
pub use coordinator::RetryCoordinator;
pub use error::{ClientError, Result, RetryError};
pub use events::ClientEvent;
pub use layer::RetryUntilConnectedLayer;
pub use service::RetryUntilConnected;
pub use tracker::SessionStateTracker;
pub use watcher::Watcher;

pub use zk_resilience_core::{SessionError, SessionLoss, SessionState};
pub use zk_resilience_session::{Acl, CreateMode, Perms, Stat, ANY_VERSION};
