//! # custos-abac: Attribute-based access decisions
//!
//! Decides whether a caller's access attributes satisfy the access control
//! spec stored for a service, group or object.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Access Request                             │
//! │  (permission, entity id, attributes)        │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Evaluator                                  │
//! │  ├─ Route permission prefix to entity kind  │
//! │  ├─ Fetch the entity's spec                 │
//! │  ├─ Reconcile each chain in order           │
//! │  └─ First satisfied chain wins              │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision                                   │
//! │  - granted                                  │
//! │  - attribute report                         │
//! │  - chain index                              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use custos_abac::Evaluator;
//! use custos_store::{AttributeStore, MemoryStore};
//! use custos_types::{
//!     AccessAttribute, AccessControlChain, AccessControlSpec, AttributeId, permissions,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let secret = AttributeId::generate();
//! store
//!     .put_attribute(secret, AccessAttribute::psk(&b"SECRET"[..]))
//!     .unwrap();
//!
//! let evaluator = Evaluator::new(Arc::clone(&store), Arc::clone(&store));
//! let acs = AccessControlSpec::new().with_permission(
//!     permissions::SRV_GRP_LIST,
//!     vec![AccessControlChain::new(vec![secret])],
//! );
//! let service = evaluator.hierarchy().create_service(acs).unwrap();
//!
//! let decision = evaluator
//!     .decide(
//!         permissions::SRV_GRP_LIST,
//!         Some(service.as_uuid()),
//!         None,
//!         &[AccessAttribute::psk(&b"SECRET"[..])],
//!     )
//!     .unwrap();
//! assert!(decision.granted);
//! ```

pub mod comparator;
pub mod evaluator;
pub mod reconcile;
pub mod routing;

mod error;

pub use comparator::{AttributeComparator, ComparatorRegistry, ComparatorRegistryBuilder, PskComparator};
pub use error::{AbacError, Result};
pub use evaluator::{Decision, Evaluator};
pub use reconcile::{ChainOutcome, reconcile};
pub use routing::{PermissionRouter, PermissionRouterBuilder};
