//! Connectivity states of a coordination-service session.

use std::fmt;

/// Latest known connectivity state of an underlying session.
///
/// The session library may report these in any order; nothing here enforces
/// transition legality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SessionState {
    /// No connection to any server.
    #[default]
    Disconnected,

    /// Connecting or reconnecting to a server.
    Connecting,

    /// Connected and holding a live session. The only usable state.
    ConnectedWithSession,

    /// The server rejected the client's credentials.
    AuthFailed,

    /// The server expired the session.
    Expired,
}

impl SessionState {
    /// Returns `true` only for [`SessionState::ConnectedWithSession`].
    pub fn is_connected(self) -> bool {
        matches!(self, SessionState::ConnectedWithSession)
    }

    /// Stable snake_case label, used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::ConnectedWithSession => "connected_with_session",
            SessionState::AuthFailed => "auth_failed",
            SessionState::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
