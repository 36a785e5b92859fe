//! Core types for zk-resilience.
//!
//! This crate provides the vocabulary shared by the session collaborator and
//! the resilient client:
//! - Session connectivity states
//! - The session error taxonomy and the session-loss classifier
//! - Event system for observability

pub mod error;
pub mod events;
pub mod state;

pub use error::{SessionError, SessionLoss};
pub use events::{Event, EventListener, EventListeners, FnListener};
pub use state::SessionState;
