//! Store traits.
//!
//! Plain gets and puts are atomic per key. The read-modify-write steps of
//! the hierarchy (list appends, version writes, publishing) are separate
//! trait operations that the store performs atomically, so every handle
//! sharing a store is sequenced by the same primitive.

use bytes::Bytes;
use custos_types::{
    AccessAttribute, AccessControlSpec, AttributeId, GroupId, ObjectId, ServiceId, Version,
};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Key of a raw access control spec record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AcsKey {
    Service(ServiceId),
    Group(GroupId),
    Object(ObjectId, Version),
}

/// An object's published and latest-written versions.
///
/// `read <= update` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPointers {
    pub read: Version,
    pub update: Version,
}

impl VersionPointers {
    /// Pointers of a freshly created object.
    pub const INITIAL: VersionPointers = VersionPointers {
        read: Version::INITIAL,
        update: Version::INITIAL,
    };

    /// Returns true if `version` has been written.
    pub fn contains(&self, version: Version) -> bool {
        version >= Version::INITIAL && version <= self.update
    }
}

/// Provisioned attribute definitions.
pub trait AttributeStore: Send + Sync {
    /// Returns the definition stored under `id`, or `None`.
    fn get_attribute(&self, id: &AttributeId) -> Result<Option<AccessAttribute>>;

    fn put_attribute(&self, id: AttributeId, attribute: AccessAttribute) -> Result<()>;
}

/// Hierarchy records and raw access control specs.
pub trait ResourceStore: Send + Sync {
    fn get_acs(&self, key: &AcsKey) -> Result<Option<AccessControlSpec>>;
    fn put_acs(&self, key: AcsKey, acs: AccessControlSpec) -> Result<()>;

    /// Ordered group list of a service. `None` means the service does not exist.
    fn get_service_groups(&self, id: &ServiceId) -> Result<Option<Vec<GroupId>>>;
    fn put_service_groups(&self, id: ServiceId, groups: Vec<GroupId>) -> Result<()>;

    /// Ordered object list of a group. `None` means the group does not exist.
    fn get_group_objects(&self, id: &GroupId) -> Result<Option<Vec<ObjectId>>>;
    fn put_group_objects(&self, id: GroupId, objects: Vec<ObjectId>) -> Result<()>;

    fn get_object_value(&self, id: &ObjectId, version: Version) -> Result<Option<Bytes>>;
    fn put_object_value(&self, id: ObjectId, version: Version, value: Bytes) -> Result<()>;

    /// Version pointers of an object. `None` means the object does not exist.
    fn get_versions(&self, id: &ObjectId) -> Result<Option<VersionPointers>>;
    fn put_versions(&self, id: ObjectId, pointers: VersionPointers) -> Result<()>;

    // ------------------------------------------------------------------------
    // Atomic compound operations
    // ------------------------------------------------------------------------

    /// Appends `group` to the service's list.
    ///
    /// Fails with `EntityNotFound` if the service does not exist.
    fn append_service_group(&self, id: &ServiceId, group: GroupId) -> Result<()>;

    /// Appends `object` to the group's list.
    ///
    /// Fails with `EntityNotFound` if the group does not exist.
    fn append_group_object(&self, id: &GroupId, object: ObjectId) -> Result<()>;

    /// Stores `value` and `acs` at `update + 1`, then moves the update
    /// pointer there. The read pointer is left alone.
    ///
    /// Fails with `VersionsExhausted` rather than reuse a version.
    fn write_object_version(
        &self,
        id: &ObjectId,
        value: Bytes,
        acs: AccessControlSpec,
    ) -> Result<Version>;

    /// Moves the read pointer up to the update pointer.
    ///
    /// Returns the newly published version, or `None` when the read pointer
    /// had already caught up.
    fn publish_object(&self, id: &ObjectId) -> Result<Option<Version>>;
}
