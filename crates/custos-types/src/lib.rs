//! # custos-types: Core types for `Custos`
//!
//! This crate contains shared types used across the `Custos` system:
//! - Entity IDs ([`AttributeId`], [`ServiceId`], [`GroupId`], [`ObjectId`])
//! - Object versions ([`Version`])
//! - Entity kinds ([`EntityKind`])
//! - Access attributes ([`AccessAttribute`], [`AttributeStatus`], [`AttributeResult`])
//! - Policy shapes ([`AccessControlChain`], [`AccessControlSpec`])

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod attribute;
pub mod policy;
pub mod wire;

pub use attribute::{AccessAttribute, AttributeResult, AttributeStatus, tags};
pub use policy::{AccessControlChain, AccessControlSpec, permissions};

// ============================================================================
// Entity IDs - All Copy (16-byte UUIDs)
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generates a fresh random (v4) identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a provisioned access attribute definition.
    AttributeId
);

uuid_id!(
    /// Identifier of a service, the root of the resource hierarchy.
    ServiceId
);

uuid_id!(
    /// Identifier of a group of objects owned by a service.
    GroupId
);

uuid_id!(
    /// Identifier of a versioned object (a protected key or secret).
    ObjectId
);

// ============================================================================
// Version - Copy (monotonic per-object counter)
// ============================================================================

/// Version number of an object.
///
/// Versions start at [`Version::INITIAL`] and grow by exactly one per write.
/// A version number is never reused for the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The version assigned when an object is created.
    pub const INITIAL: Version = Version(1);

    pub fn new(version: u64) -> Self {
        Self(version)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the version that follows this one, or `None` at `u64::MAX`.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

// ============================================================================
// Entity Kind
// ============================================================================

/// The three levels of the resource hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Service,
    Group,
    Object,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Service => "service",
            EntityKind::Group => "group",
            EntityKind::Object => "object",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to one entity of the hierarchy.
///
/// Object references may pin a version; `None` means the published
/// (read) version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Service(ServiceId),
    Group(GroupId),
    Object {
        id: ObjectId,
        version: Option<Version>,
    },
}

impl EntityRef {
    /// Builds a reference of the given kind. `version` is ignored for
    /// services and groups.
    pub fn from_parts(kind: EntityKind, id: Uuid, version: Option<Version>) -> Self {
        match kind {
            EntityKind::Service => EntityRef::Service(ServiceId::new(id)),
            EntityKind::Group => EntityRef::Group(GroupId::new(id)),
            EntityKind::Object => EntityRef::Object {
                id: ObjectId::new(id),
                version,
            },
        }
    }

    /// Unpinned reference to an object's published version.
    pub fn object(id: ObjectId) -> Self {
        EntityRef::Object { id, version: None }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Service(_) => EntityKind::Service,
            EntityRef::Group(_) => EntityKind::Group,
            EntityRef::Object { .. } => EntityKind::Object,
        }
    }

    pub fn uuid(&self) -> Uuid {
        match self {
            EntityRef::Service(id) => id.as_uuid(),
            EntityRef::Group(id) => id.as_uuid(),
            EntityRef::Object { id, .. } => id.as_uuid(),
        }
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityRef::Object {
                id,
                version: Some(v),
            } => write!(f, "object {id}+{v}"),
            other => write!(f, "{} {}", other.kind(), other.uuid()),
        }
    }
}
