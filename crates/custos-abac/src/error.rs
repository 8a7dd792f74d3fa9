//! Evaluation errors.
//!
//! Integrity errors mean stored policy or registries are inconsistent and
//! are never folded into a denial.

use custos_store::StoreError;
use custos_types::{AttributeId, EntityKind, EntityRef, ObjectId, Version};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while deciding an access request.
#[derive(Debug, Error)]
pub enum AbacError {
    /// The permission name carries no registered entity prefix.
    #[error("unknown permission prefix: {permission}")]
    UnknownPermissionPrefix { permission: String },

    /// The entity's spec has no entry for the permission.
    #[error("permission {permission} is not defined for {entity}")]
    UndefinedPermission {
        permission: String,
        entity: EntityRef,
    },

    /// The entity exists but has no access control spec.
    #[error("no access control spec for {kind} {id}")]
    NoAcsFound { kind: EntityKind, id: Uuid },

    /// A chain references an attribute id that was never provisioned.
    #[error("attribute definition not found: {0}")]
    MissingAttributeDefinition(AttributeId),

    /// No comparator is registered for a `(class, type)` pair.
    #[error("no comparator registered for {class}/{attr_type}")]
    UnknownComparator { class: String, attr_type: String },

    /// Duplicate comparator or ambiguous permission prefix at registry build time.
    #[error("registry conflict: {0}")]
    RegistryConflict(String),

    /// The entity does not exist, or no id was given and there is no default.
    #[error("{kind} not found: {}", .id.map_or_else(|| "<none>".to_owned(), |id| id.to_string()))]
    EntityNotFound { kind: EntityKind, id: Option<Uuid> },

    /// The object exists but the version does not.
    #[error("object {object} has no version {version}")]
    VersionNotFound { object: ObjectId, version: Version },

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl AbacError {
    /// Policy or registry inconsistency. A front-end must report these as a
    /// failure distinct from both denial and not-found.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            AbacError::UnknownPermissionPrefix { .. }
                | AbacError::UndefinedPermission { .. }
                | AbacError::NoAcsFound { .. }
                | AbacError::MissingAttributeDefinition(_)
                | AbacError::UnknownComparator { .. }
                | AbacError::RegistryConflict(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AbacError::EntityNotFound { .. } | AbacError::VersionNotFound { .. }
        )
    }
}

impl From<StoreError> for AbacError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EntityNotFound { kind, id } => AbacError::EntityNotFound { kind, id: Some(id) },
            StoreError::VersionNotFound { object, version } => {
                AbacError::VersionNotFound { object, version }
            }
            StoreError::NoAcsFound { kind, id } => AbacError::NoAcsFound { kind, id },
            other => AbacError::Store(other),
        }
    }
}

/// Result type for evaluation.
pub type Result<T> = std::result::Result<T, AbacError>;
