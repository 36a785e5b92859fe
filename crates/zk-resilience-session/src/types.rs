//! Node metadata, create modes and access control.

use bitflags::bitflags;

/// Version argument that matches any node version.
pub const ANY_VERSION: i32 = -1;

/// Metadata kept by the ensemble for every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stat {
    /// Transaction id that created the node.
    pub czxid: i64,
    /// Transaction id that last modified the node's data.
    pub mzxid: i64,
    /// Creation time, milliseconds since the Unix epoch.
    pub ctime: i64,
    /// Last modification time, milliseconds since the Unix epoch.
    pub mtime: i64,
    /// Number of data changes.
    pub version: i32,
    /// Number of child changes; also feeds sequential suffixes.
    pub cversion: i32,
    /// Owning session id for ephemeral nodes, 0 otherwise.
    pub ephemeral_owner: i64,
    /// Length of the node's data.
    pub data_length: i32,
    /// Number of children.
    pub num_children: i32,
}

/// How a node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CreateMode {
    /// Outlives the session that created it.
    #[default]
    Persistent,
    /// Removed when the creating session ends.
    Ephemeral,
    /// Persistent, with a monotonically increasing suffix appended to the name.
    PersistentSequential,
    /// Ephemeral, with a monotonically increasing suffix appended to the name.
    EphemeralSequential,
}

impl CreateMode {
    /// Returns `true` for the ephemeral modes.
    pub fn is_ephemeral(self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    /// Returns `true` for the sequential modes.
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential
        )
    }
}

bitflags! {
    /// Permission bitset of an [`Acl`] entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Perms: u32 {
        /// Read the node's data and list its children.
        const READ = 1 << 0;
        /// Set the node's data.
        const WRITE = 1 << 1;
        /// Create children.
        const CREATE = 1 << 2;
        /// Delete children.
        const DELETE = 1 << 3;
        /// Change the node's ACL.
        const ADMIN = 1 << 4;
        const ALL = Self::READ.bits()
            | Self::WRITE.bits()
            | Self::CREATE.bits()
            | Self::DELETE.bits()
            | Self::ADMIN.bits();
    }
}

/// One access-control entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Acl {
    /// Granted permissions.
    pub perms: Perms,
    /// Authentication scheme, e.g. "world" or "digest".
    pub scheme: String,
    /// Identity within the scheme.
    pub id: String,
}

impl Acl {
    /// Creates an entry.
    pub fn new(perms: Perms, scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            perms,
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    /// Everyone may do anything.
    pub fn open_unsafe() -> Self {
        Self::new(Perms::ALL, "world", "anyone")
    }

    /// Everyone may read.
    pub fn read_unsafe() -> Self {
        Self::new(Perms::READ, "world", "anyone")
    }
}
