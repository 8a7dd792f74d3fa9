//! # Custos
//!
//! Attribute-based access control and secret release.
//!
//! Callers present access attributes (shared secrets, facts about the
//! request such as its source address) and ask for a permission on a
//! service, a group or a versioned object. Custos decides, reports which of
//! the caller's attributes mattered, and only on success discloses a value
//! or a listing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Custos                            │
//! │  ┌──────────┐   ┌────────────┐   ┌───────────┐   ┌────────┐  │
//! │  │  Caller  │ → │ Evaluator  │ → │ Hierarchy │ → │ Store  │  │
//! │  │ +context │   │(chains,    │   │(service → │   │(memory,│  │
//! │  │          │   │ reconcile) │   │ group →   │   │ JSON   │  │
//! │  │          │   │            │   │ object)   │   │ snap)  │  │
//! │  └──────────┘   └────────────┘   └───────────┘   └────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - **Engine**: [`Custos`] - guarded operations and key disclosure
//! - **Requests**: [`Caller`], [`RequestContext`], [`AccessRequest`], [`KeyRequest`]
//! - **Responses**: [`Guarded`], [`Response`], [`Disclosure`]

mod context;
mod engine;
mod error;
mod response;

pub use context::{AccessRequest, Caller, KeyRequest, RequestContext};
pub use engine::Custos;
pub use error::{CustosError, ErrorKind, Result};
pub use response::{
    Disclosure, GroupEntry, Guarded, KeyOutcome, KeyStatus, ObjectEntry, ObjectUpdate,
    ObjectValue, ObjectVersion, Payload, Response, Status,
};

// Re-export the building blocks
pub use custos_abac::{
    AttributeComparator, ComparatorRegistry, Decision, PermissionRouter, PskComparator,
};
pub use custos_config::{ConfigLoader, CustosConfig};
pub use custos_store::{AttributeStore, Hierarchy, MemoryStore, ResourceStore, SnapshotLock};
pub use custos_types::{
    AccessAttribute, AccessControlChain, AccessControlSpec, AttributeId, AttributeResult,
    AttributeStatus, EntityKind, EntityRef, GroupId, ObjectId, ServiceId, Version, permissions,
};
