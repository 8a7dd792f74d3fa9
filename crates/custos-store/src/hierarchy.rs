//! The versioned service → group → object hierarchy.
//!
//! Entities exist when their membership or version record exists: a
//! service's group list, a group's object list, an object's version
//! pointers. Access control specs are separate records, so an entity can
//! exist without one (`NoAcsFound`).
//!
//! Read-modify-write steps (list appends, version writes, publishing) are
//! single atomic [`ResourceStore`] operations. Any number of hierarchies
//! over the same store therefore stay sequenced per parent and per object.

use std::sync::Arc;

use bytes::Bytes;
use custos_types::{AccessControlSpec, EntityKind, EntityRef, GroupId, ObjectId, ServiceId, Version};
use tracing::debug;
use uuid::Uuid;

use crate::store::{AcsKey, ResourceStore, VersionPointers};
use crate::{Result, StoreError};

// ============================================================================
// Hierarchy
// ============================================================================

/// Navigation and mutation of services, groups and objects over a
/// [`ResourceStore`].
#[derive(Debug)]
pub struct Hierarchy<S> {
    store: Arc<S>,
}

impl<S: ResourceStore> Hierarchy<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates a service with an empty group list.
    pub fn create_service(&self, acs: AccessControlSpec) -> Result<ServiceId> {
        let id = ServiceId::generate();
        self.store.put_acs(AcsKey::Service(id), acs)?;
        self.store.put_service_groups(id, Vec::new())?;
        debug!(service = %id, "created service");
        Ok(id)
    }

    pub fn service(&self, id: ServiceId) -> Result<Service<'_, S>> {
        if self.store.get_service_groups(&id)?.is_none() {
            return Err(not_found(EntityKind::Service, id.as_uuid()));
        }
        Ok(Service { hierarchy: self, id })
    }

    pub fn group(&self, id: GroupId) -> Result<Group<'_, S>> {
        if self.store.get_group_objects(&id)?.is_none() {
            return Err(not_found(EntityKind::Group, id.as_uuid()));
        }
        Ok(Group { hierarchy: self, id })
    }

    pub fn object(&self, id: ObjectId) -> Result<Object<'_, S>> {
        if self.store.get_versions(&id)?.is_none() {
            return Err(not_found(EntityKind::Object, id.as_uuid()));
        }
        Ok(Object { hierarchy: self, id })
    }

    /// Fetches the access control spec governing `entity`.
    ///
    /// Unpinned object references resolve to the published version.
    pub fn acs(&self, entity: &EntityRef) -> Result<AccessControlSpec> {
        match *entity {
            EntityRef::Service(id) => self.service(id)?.acs(),
            EntityRef::Group(id) => self.group(id)?.acs(),
            EntityRef::Object { id, version } => self.object(id)?.acs(version),
        }
    }

    fn stored_acs(&self, key: AcsKey, kind: EntityKind, id: Uuid) -> Result<AccessControlSpec> {
        self.store
            .get_acs(&key)?
            .ok_or(StoreError::NoAcsFound { kind, id })
    }
}

fn not_found(kind: EntityKind, id: Uuid) -> StoreError {
    StoreError::EntityNotFound { kind, id }
}

// ============================================================================
// Service
// ============================================================================

/// Handle to an existing service.
#[derive(Debug)]
pub struct Service<'h, S> {
    hierarchy: &'h Hierarchy<S>,
    id: ServiceId,
}

impl<S: ResourceStore> Service<'_, S> {
    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn acs(&self) -> Result<AccessControlSpec> {
        self.hierarchy.stored_acs(
            AcsKey::Service(self.id),
            EntityKind::Service,
            self.id.as_uuid(),
        )
    }

    /// Replaces the service's access control spec.
    pub fn set_acs(&self, acs: AccessControlSpec) -> Result<()> {
        self.hierarchy.store.put_acs(AcsKey::Service(self.id), acs)?;
        debug!(service = %self.id, "replaced service acs");
        Ok(())
    }

    /// Group ids in creation order.
    pub fn list_groups(&self) -> Result<Vec<GroupId>> {
        self.hierarchy
            .store
            .get_service_groups(&self.id)?
            .ok_or_else(|| not_found(EntityKind::Service, self.id.as_uuid()))
    }

    /// Creates a group and appends it to this service's list.
    pub fn create_group(&self, acs: AccessControlSpec) -> Result<GroupId> {
        let store = &self.hierarchy.store;
        let group = GroupId::generate();

        // Child records first: the parent list never names a half-built group.
        store.put_acs(AcsKey::Group(group), acs)?;
        store.put_group_objects(group, Vec::new())?;

        store.append_service_group(&self.id, group)?;

        debug!(service = %self.id, group = %group, "created group");
        Ok(group)
    }
}

// ============================================================================
// Group
// ============================================================================

/// Handle to an existing group.
#[derive(Debug)]
pub struct Group<'h, S> {
    hierarchy: &'h Hierarchy<S>,
    id: GroupId,
}

impl<S: ResourceStore> Group<'_, S> {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn acs(&self) -> Result<AccessControlSpec> {
        self.hierarchy
            .stored_acs(AcsKey::Group(self.id), EntityKind::Group, self.id.as_uuid())
    }

    /// Replaces the group's access control spec.
    pub fn set_acs(&self, acs: AccessControlSpec) -> Result<()> {
        self.hierarchy.store.put_acs(AcsKey::Group(self.id), acs)?;
        debug!(group = %self.id, "replaced group acs");
        Ok(())
    }

    /// Object ids in creation order.
    pub fn list_objects(&self) -> Result<Vec<ObjectId>> {
        self.hierarchy
            .store
            .get_group_objects(&self.id)?
            .ok_or_else(|| not_found(EntityKind::Group, self.id.as_uuid()))
    }

    /// Creates an object at [`Version::INITIAL`] and appends it to this
    /// group's list. Both version pointers start at 1.
    pub fn create_object(
        &self,
        acs: AccessControlSpec,
        value: Bytes,
    ) -> Result<(ObjectId, Version)> {
        let store = &self.hierarchy.store;
        let object = ObjectId::generate();
        let version = Version::INITIAL;

        store.put_object_value(object, version, value)?;
        store.put_acs(AcsKey::Object(object, version), acs)?;
        store.put_versions(object, VersionPointers::INITIAL)?;

        store.append_group_object(&self.id, object)?;

        debug!(group = %self.id, object = %object, "created object");
        Ok((object, version))
    }
}

// ============================================================================
// Object
// ============================================================================

/// A protected value at a specific version.
#[derive(Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub version: Version,
    pub value: Bytes,
}

impl std::fmt::Debug for VersionedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedValue")
            .field("version", &self.version)
            .field("value_len", &self.value.len())
            .finish()
    }
}

/// Result of [`Object::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The version the update was written at.
    pub version: Version,
    /// Whether the publish step advanced the read pointer. `false` means a
    /// concurrent update already published this version or a later one.
    pub published: bool,
}

/// Handle to an existing object.
#[derive(Debug)]
pub struct Object<'h, S> {
    hierarchy: &'h Hierarchy<S>,
    id: ObjectId,
}

impl<S: ResourceStore> Object<'_, S> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn versions(&self) -> Result<VersionPointers> {
        self.hierarchy
            .store
            .get_versions(&self.id)?
            .ok_or_else(|| not_found(EntityKind::Object, self.id.as_uuid()))
    }

    /// Resolves an optional version to a written one, defaulting to the
    /// published version.
    pub fn resolve(&self, version: Option<Version>) -> Result<Version> {
        let pointers = self.versions()?;
        match version {
            None => Ok(pointers.read),
            Some(v) if pointers.contains(v) => Ok(v),
            Some(v) => Err(StoreError::VersionNotFound {
                object: self.id,
                version: v,
            }),
        }
    }

    pub fn acs(&self, version: Option<Version>) -> Result<AccessControlSpec> {
        let version = self.resolve(version)?;
        self.hierarchy.stored_acs(
            AcsKey::Object(self.id, version),
            EntityKind::Object,
            self.id.as_uuid(),
        )
    }

    pub fn value(&self, version: Option<Version>) -> Result<VersionedValue> {
        let version = self.resolve(version)?;
        let value = self
            .hierarchy
            .store
            .get_object_value(&self.id, version)?
            .ok_or(StoreError::VersionNotFound {
                object: self.id,
                version,
            })?;
        Ok(VersionedValue { version, value })
    }

    /// Writes `value` and `acs` at a new version and publishes it.
    pub fn update(&self, value: Bytes, acs: AccessControlSpec) -> Result<UpdateOutcome> {
        let version = self.write(value, acs)?;
        let published = self.publish()?;
        Ok(UpdateOutcome { version, published })
    }

    /// First phase of an update: stores `value` and `acs` at
    /// `updateVersion + 1` and bumps the update pointer. The read pointer is
    /// left alone.
    pub fn write(&self, value: Bytes, acs: AccessControlSpec) -> Result<Version> {
        let version = self
            .hierarchy
            .store
            .write_object_version(&self.id, value, acs)?;
        debug!(object = %self.id, version = %version, "wrote object version");
        Ok(version)
    }

    /// Second phase of an update: advances the read pointer to the update
    /// pointer. Returns `false` if there was nothing to advance.
    pub fn publish(&self) -> Result<bool> {
        match self.hierarchy.store.publish_object(&self.id)? {
            Some(read) => {
                debug!(object = %self.id, read = %read, "published object version");
                Ok(true)
            }
            None => {
                debug!(object = %self.id, "publish did not advance");
                Ok(false)
            }
        }
    }
}
