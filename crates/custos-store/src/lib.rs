//! # custos-store: Storage for `Custos`
//!
//! Two injected collaborators back the engine:
//!
//! - [`AttributeStore`]: provisioned attribute definitions by id.
//! - [`ResourceStore`]: access control specs, group and object lists,
//!   object values and version pointers.
//!
//! [`MemoryStore`] implements both and can be saved to and loaded from a
//! JSON snapshot. [`Hierarchy`] layers the service → group → object model
//! on top of any [`ResourceStore`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use custos_store::{Hierarchy, MemoryStore};
//! use custos_types::AccessControlSpec;
//!
//! let hierarchy = Hierarchy::new(Arc::new(MemoryStore::new()));
//! let service = hierarchy.create_service(AccessControlSpec::new()).unwrap();
//! let group = hierarchy
//!     .service(service)
//!     .unwrap()
//!     .create_group(AccessControlSpec::new())
//!     .unwrap();
//!
//! let (object, version) = hierarchy
//!     .group(group)
//!     .unwrap()
//!     .create_object(AccessControlSpec::new(), "secret".into())
//!     .unwrap();
//! assert_eq!(version.as_u64(), 1);
//!
//! let outcome = hierarchy
//!     .object(object)
//!     .unwrap()
//!     .update("rotated".into(), AccessControlSpec::new())
//!     .unwrap();
//! assert_eq!(outcome.version.as_u64(), 2);
//! assert!(outcome.published);
//! ```

mod error;
mod hierarchy;
mod memory;
mod store;


pub use error::{Result, StoreError};
pub use hierarchy::{Group, Hierarchy, Object, Service, UpdateOutcome, VersionedValue};
pub use memory::{
    AcsRecord, AttributeRecord, GroupRecord, MemoryStore, ObjectRecord, ServiceRecord, Snapshot,
    SnapshotLock, ValueRecord,
};
pub use store::{AcsKey, AttributeStore, ResourceStore, VersionPointers};
