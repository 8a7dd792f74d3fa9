//! In-memory store with JSON snapshot persistence.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use custos_types::{
    AccessAttribute, AccessControlSpec, AttributeId, EntityKind, GroupId, ObjectId, ServiceId,
    Version, wire,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{AcsKey, AttributeStore, ResourceStore, VersionPointers};
use crate::{Result, StoreError};

#[derive(Debug, Default)]
struct Tables {
    attributes: HashMap<AttributeId, AccessAttribute>,
    acs: HashMap<AcsKey, AccessControlSpec>,
    service_groups: HashMap<ServiceId, Vec<GroupId>>,
    group_objects: HashMap<GroupId, Vec<ObjectId>>,
    object_values: HashMap<(ObjectId, Version), Bytes>,
    versions: HashMap<ObjectId, VersionPointers>,
}

/// Both stores backed by hash maps behind a single `RwLock`.
///
/// Each trait call takes the lock once. Compound operations hold the write
/// lock across their read and write, so they are atomic for every handle
/// sharing the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Poisoned("memory store"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Poisoned("memory store"))
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Copies the current contents into a serializable snapshot.
    ///
    /// Records are sorted so the same contents always produce the same file.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let tables = self.read()?;

        let mut snapshot = Snapshot {
            attributes: tables
                .attributes
                .iter()
                .map(|(id, attribute)| AttributeRecord {
                    id: *id,
                    attribute: attribute.clone(),
                })
                .collect(),
            acs: tables
                .acs
                .iter()
                .map(|(key, acs)| AcsRecord {
                    key: *key,
                    acs: acs.clone(),
                })
                .collect(),
            services: tables
                .service_groups
                .iter()
                .map(|(id, groups)| ServiceRecord {
                    id: *id,
                    groups: groups.clone(),
                })
                .collect(),
            groups: tables
                .group_objects
                .iter()
                .map(|(id, objects)| GroupRecord {
                    id: *id,
                    objects: objects.clone(),
                })
                .collect(),
            objects: tables
                .versions
                .iter()
                .map(|(id, pointers)| ObjectRecord {
                    id: *id,
                    read_version: pointers.read,
                    update_version: pointers.update,
                })
                .collect(),
            values: tables
                .object_values
                .iter()
                .map(|((id, version), value)| ValueRecord {
                    object: *id,
                    version: *version,
                    value: value.clone(),
                })
                .collect(),
        };
        drop(tables);

        snapshot.attributes.sort_by_key(|r| r.id);
        snapshot.acs.sort_by_key(|r| r.key);
        snapshot.services.sort_by_key(|r| r.id);
        snapshot.groups.sort_by_key(|r| r.id);
        snapshot.objects.sort_by_key(|r| r.id);
        snapshot.values.sort_by_key(|r| (r.object, r.version));
        Ok(snapshot)
    }

    /// Builds a store from a snapshot, rejecting one that contradicts itself.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let tables = Tables {
            attributes: snapshot
                .attributes
                .into_iter()
                .map(|r| (r.id, r.attribute))
                .collect(),
            acs: snapshot.acs.into_iter().map(|r| (r.key, r.acs)).collect(),
            service_groups: snapshot
                .services
                .into_iter()
                .map(|r| (r.id, r.groups))
                .collect(),
            group_objects: snapshot
                .groups
                .into_iter()
                .map(|r| (r.id, r.objects))
                .collect(),
            object_values: snapshot
                .values
                .into_iter()
                .map(|r| ((r.object, r.version), r.value))
                .collect(),
            versions: snapshot
                .objects
                .into_iter()
                .map(|r| {
                    (
                        r.id,
                        VersionPointers {
                            read: r.read_version,
                            update: r.update_version,
                        },
                    )
                })
                .collect(),
        };
        tables.check_consistency()?;
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// Loads a store from a snapshot file. A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot, starting empty");
            return Ok(Self::new());
        }

        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            services = snapshot.services.len(),
            objects = snapshot.objects.len(),
            "loaded snapshot"
        );
        Self::from_snapshot(snapshot)
    }

    /// Writes a snapshot file.
    ///
    /// The file is written next to `path`, fsync'd, then renamed over it, so
    /// readers see either the old or the new snapshot.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush().map_err(|e| StoreError::io(&tmp, e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| StoreError::io(&tmp, e))?;
        drop(writer);

        fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
        debug!(path = %path.display(), "saved snapshot");
        Ok(())
    }
}

impl AttributeStore for MemoryStore {
    fn get_attribute(&self, id: &AttributeId) -> Result<Option<AccessAttribute>> {
        Ok(self.read()?.attributes.get(id).cloned())
    }

    fn put_attribute(&self, id: AttributeId, attribute: AccessAttribute) -> Result<()> {
        self.write()?.attributes.insert(id, attribute);
        Ok(())
    }
}

impl ResourceStore for MemoryStore {
    fn get_acs(&self, key: &AcsKey) -> Result<Option<AccessControlSpec>> {
        Ok(self.read()?.acs.get(key).cloned())
    }

    fn put_acs(&self, key: AcsKey, acs: AccessControlSpec) -> Result<()> {
        self.write()?.acs.insert(key, acs);
        Ok(())
    }

    fn get_service_groups(&self, id: &ServiceId) -> Result<Option<Vec<GroupId>>> {
        Ok(self.read()?.service_groups.get(id).cloned())
    }

    fn put_service_groups(&self, id: ServiceId, groups: Vec<GroupId>) -> Result<()> {
        self.write()?.service_groups.insert(id, groups);
        Ok(())
    }

    fn get_group_objects(&self, id: &GroupId) -> Result<Option<Vec<ObjectId>>> {
        Ok(self.read()?.group_objects.get(id).cloned())
    }

    fn put_group_objects(&self, id: GroupId, objects: Vec<ObjectId>) -> Result<()> {
        self.write()?.group_objects.insert(id, objects);
        Ok(())
    }

    fn get_object_value(&self, id: &ObjectId, version: Version) -> Result<Option<Bytes>> {
        Ok(self.read()?.object_values.get(&(*id, version)).cloned())
    }

    fn put_object_value(&self, id: ObjectId, version: Version, value: Bytes) -> Result<()> {
        self.write()?.object_values.insert((id, version), value);
        Ok(())
    }

    fn get_versions(&self, id: &ObjectId) -> Result<Option<VersionPointers>> {
        Ok(self.read()?.versions.get(id).copied())
    }

    fn put_versions(&self, id: ObjectId, pointers: VersionPointers) -> Result<()> {
        self.write()?.versions.insert(id, pointers);
        Ok(())
    }

    fn append_service_group(&self, id: &ServiceId, group: GroupId) -> Result<()> {
        self.write()?
            .service_groups
            .get_mut(id)
            .ok_or(StoreError::EntityNotFound {
                kind: EntityKind::Service,
                id: id.as_uuid(),
            })?
            .push(group);
        Ok(())
    }

    fn append_group_object(&self, id: &GroupId, object: ObjectId) -> Result<()> {
        self.write()?
            .group_objects
            .get_mut(id)
            .ok_or(StoreError::EntityNotFound {
                kind: EntityKind::Group,
                id: id.as_uuid(),
            })?
            .push(object);
        Ok(())
    }

    fn write_object_version(
        &self,
        id: &ObjectId,
        value: Bytes,
        acs: AccessControlSpec,
    ) -> Result<Version> {
        let mut tables = self.write()?;
        let pointers = *tables.versions.get(id).ok_or(StoreError::EntityNotFound {
            kind: EntityKind::Object,
            id: id.as_uuid(),
        })?;
        let version = pointers
            .update
            .next()
            .ok_or(StoreError::VersionsExhausted { object: *id })?;

        tables.object_values.insert((*id, version), value);
        tables.acs.insert(AcsKey::Object(*id, version), acs);
        tables.versions.insert(
            *id,
            VersionPointers {
                read: pointers.read,
                update: version,
            },
        );
        Ok(version)
    }

    fn publish_object(&self, id: &ObjectId) -> Result<Option<Version>> {
        let mut tables = self.write()?;
        let pointers = tables
            .versions
            .get_mut(id)
            .ok_or(StoreError::EntityNotFound {
                kind: EntityKind::Object,
                id: id.as_uuid(),
            })?;
        if pointers.update <= pointers.read {
            return Ok(None);
        }
        pointers.read = pointers.update;
        Ok(Some(pointers.read))
    }
}

// ============================================================================
// Snapshot consistency
// ============================================================================

impl Tables {
    /// Checks the invariants a running store maintains: list entries exist,
    /// `1 <= read <= update`, and every written version has a value and a
    /// spec.
    fn check_consistency(&self) -> Result<()> {
        let inconsistent = |msg: String| Err(StoreError::InconsistentSnapshot(msg));

        for (service, groups) in &self.service_groups {
            if let Some(group) = groups.iter().find(|g| !self.group_objects.contains_key(g)) {
                return inconsistent(format!("service {service} lists unknown group {group}"));
            }
        }
        for (group, objects) in &self.group_objects {
            if let Some(object) = objects.iter().find(|o| !self.versions.contains_key(o)) {
                return inconsistent(format!("group {group} lists unknown object {object}"));
            }
        }

        for (object, pointers) in &self.versions {
            if pointers.read < Version::INITIAL || pointers.read > pointers.update {
                return inconsistent(format!(
                    "object {object} has read version {} past update version {}",
                    pointers.read, pointers.update
                ));
            }
        }

        // Versions are unique keys, so a full set of records for 1..=update
        // is exactly `update` records inside that range.
        let mut values: HashMap<ObjectId, u64> = HashMap::new();
        for (object, version) in self.object_values.keys() {
            match self.versions.get(object) {
                Some(pointers) if pointers.contains(*version) => {
                    *values.entry(*object).or_default() += 1;
                }
                _ => {
                    return inconsistent(format!(
                        "value for object {object} version {version} was never written"
                    ));
                }
            }
        }
        let mut specs: HashMap<ObjectId, u64> = HashMap::new();
        for key in self.acs.keys() {
            if let AcsKey::Object(object, version) = key {
                match self.versions.get(object) {
                    Some(pointers) if pointers.contains(*version) => {
                        *specs.entry(*object).or_default() += 1;
                    }
                    _ => {
                        return inconsistent(format!(
                            "spec for object {object} version {version} was never written"
                        ));
                    }
                }
            }
        }
        for (object, pointers) in &self.versions {
            let written = pointers.update.as_u64();
            if values.get(object).copied().unwrap_or(0) != written {
                return inconsistent(format!("object {object} is missing version values"));
            }
            if specs.get(object).copied().unwrap_or(0) != written {
                return inconsistent(format!("object {object} is missing version specs"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Snapshot lock
// ============================================================================

/// Exclusive claim on a snapshot file, shared by every process using it.
///
/// Hold it from [`MemoryStore::load`] to [`MemoryStore::save`]: without it
/// two processes can each load, mutate and save, and the later save drops
/// the earlier one's writes. The lock file is removed on drop.
#[derive(Debug)]
pub struct SnapshotLock {
    lock: PathBuf,
}

impl SnapshotLock {
    pub fn acquire(snapshot: impl AsRef<Path>) -> Result<Self> {
        let path = snapshot.as_ref();
        let lock = lock_path(path);

        if let Some(parent) = lock.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&lock) {
            Ok(_) => {
                debug!(lock = %lock.display(), "acquired snapshot lock");
                Ok(Self { lock })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StoreError::Locked {
                path: path.to_path_buf(),
                lock,
            }),
            Err(e) => Err(StoreError::io(&lock, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock) {
            warn!(lock = %self.lock.display(), error = %e, "failed to release snapshot lock");
        }
    }
}

fn lock_path(snapshot: &Path) -> PathBuf {
    let mut name = snapshot.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

// ============================================================================
// Snapshot format
// ============================================================================

/// Serializable image of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
    #[serde(default)]
    pub acs: Vec<AcsRecord>,
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
    #[serde(default)]
    pub values: Vec<ValueRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub id: AttributeId,
    pub attribute: AccessAttribute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcsRecord {
    pub key: AcsKey,
    pub acs: AccessControlSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: ServiceId,
    pub groups: Vec<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub objects: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub read_version: Version,
    pub update_version: Version,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub object: ObjectId,
    pub version: Version,
    #[serde(with = "wire::base64_bytes")]
    pub value: Bytes,
}

impl std::fmt::Debug for ValueRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueRecord")
            .field("object", &self.object)
            .field("version", &self.version)
            .field("value_len", &self.value.len())
            .finish()
    }
}
