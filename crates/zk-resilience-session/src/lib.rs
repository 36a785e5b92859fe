//! The underlying-session boundary of zk-resilience.
//!
//! A [`Session`] is a live handle to a coordination-service ensemble. It performs
//! the literal create/get/set/delete/exists/children requests and reports its
//! connectivity through a [`StateListener`] registered when a
//! [`ConnectionFactory`] establishes it. Nothing in this crate retries: a
//! request issued while the session is unusable fails with a session-loss
//! error and the caller decides what to do.
//!
//! [`InMemoryEnsemble`] is a complete in-process implementation whose
//! connectivity can be driven by hand, for deterministic tests of code built
//! on top of a session.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use zk_resilience_core::SessionState;
//! use zk_resilience_session::{
//!     Acl, ConnectionFactory, CreateMode, InMemoryEnsemble, Session, StateListener,
//! };
//!
//! struct Ignore;
//! impl StateListener for Ignore {
//!     fn on_state_change(&self, _state: SessionState) {}
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), zk_resilience_core::SessionError> {
//! let ensemble = InMemoryEnsemble::new();
//! let session = ensemble
//!     .connect(&["127.0.0.1:2181".to_string()], Duration::from_secs(10), Arc::new(Ignore))
//!     .await?;
//!
//! session
//!     .create("/config", b"v1", CreateMode::Persistent, &[Acl::open_unsafe()])
//!     .await?;
//! let (data, stat) = session.get("/config").await?;
//! assert_eq!(data, b"v1");
//! assert_eq!(stat.version, 0);
//! # Ok(())
//! # }
//! ```

mod memory;
pub mod path;
mod session;
mod types;

pub use memory::{InMemoryEnsemble, InMemorySession};
pub use session::{ConnectionFactory, Session, StateListener};
pub use types::{Acl, CreateMode, Perms, Stat, ANY_VERSION};

pub use zk_resilience_core::{SessionError, SessionState};
