//! Store and hierarchy errors.

use std::path::PathBuf;

use custos_types::{EntityKind, ObjectId, Version};
use uuid::Uuid;

/// Errors returned by stores and the hierarchy.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The referenced service, group or object does not exist.
    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: EntityKind, id: Uuid },

    /// The object exists but the requested version was never written.
    #[error("object {object} has no version {version}")]
    VersionNotFound { object: ObjectId, version: Version },

    /// The object's update pointer is at the last representable version.
    #[error("object {object} has no versions left")]
    VersionsExhausted { object: ObjectId },

    /// A loaded snapshot contradicts itself.
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),

    /// Another process holds the snapshot lock.
    #[error("snapshot {path} is locked by another process (lock file {lock})")]
    Locked { path: PathBuf, lock: PathBuf },

    /// The entity exists but no access control spec is stored for it.
    #[error("no access control spec for {kind} {id}")]
    NoAcsFound { kind: EntityKind, id: Uuid },

    /// A shared lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),

    /// Snapshot file I/O failed.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot contents could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for the two not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::EntityNotFound { .. } | StoreError::VersionNotFound { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
