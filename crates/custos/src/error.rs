//! Error types for the Custos facade.

use custos_abac::AbacError;
use custos_store::StoreError;
use thiserror::Error;

/// How a front-end should surface a failure.
///
/// Denials are not errors at all; they come back as a normal response with
/// `granted == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Stored policy or registries are inconsistent.
    Integrity,
    /// The entity or version does not exist.
    NotFound,
    /// The backing store failed.
    Store,
    /// The request itself was malformed.
    InvalidRequest,
}

/// Errors returned by [`Custos`](crate::Custos) operations.
#[derive(Debug, Error)]
pub enum CustosError {
    #[error(transparent)]
    Access(#[from] AbacError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CustosError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CustosError::Access(e) if e.is_integrity() => ErrorKind::Integrity,
            CustosError::Access(e) if e.is_not_found() => ErrorKind::NotFound,
            CustosError::Access(_) => ErrorKind::Store,
            CustosError::Store(StoreError::NoAcsFound { .. }) => ErrorKind::Integrity,
            CustosError::Store(e) if e.is_not_found() => ErrorKind::NotFound,
            CustosError::Store(_) => ErrorKind::Store,
            CustosError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Result type for Custos operations.
pub type Result<T> = std::result::Result<T, CustosError>;

#[cfg(test)]
mod tests {
    use super::*;
    use custos_types::{EntityKind, ObjectId, Version};
    use test_case::test_case;
    use uuid::Uuid;

    #[test_case(
        CustosError::Access(AbacError::UnknownPermissionPrefix { permission: "x".into() }),
        ErrorKind::Integrity ; "unknown prefix"
    )]
    #[test_case(
        CustosError::Access(AbacError::EntityNotFound { kind: EntityKind::Group, id: None }),
        ErrorKind::NotFound ; "abac not found"
    )]
    #[test_case(
        CustosError::Store(StoreError::VersionNotFound {
            object: ObjectId::new(Uuid::nil()),
            version: Version::new(4),
        }),
        ErrorKind::NotFound ; "store version not found"
    )]
    #[test_case(
        CustosError::Store(StoreError::NoAcsFound { kind: EntityKind::Object, id: Uuid::nil() }),
        ErrorKind::Integrity ; "store missing acs"
    )]
    #[test_case(
        CustosError::Access(AbacError::Store(StoreError::Poisoned("memory store"))),
        ErrorKind::Store ; "poisoned"
    )]
    #[test_case(CustosError::invalid("bad base64"), ErrorKind::InvalidRequest ; "invalid")]
    fn error_kinds(err: CustosError, kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }
}
