//! The Custos engine: guarded operations over a shared store.

use std::sync::Arc;

use bytes::Bytes;
use custos_abac::{ComparatorRegistry, Decision, Evaluator, PermissionRouter};
use custos_config::EngineConfig;
use custos_store::{AttributeStore, Hierarchy, ResourceStore};
use custos_types::{
    AccessAttribute, AccessControlSpec, AttributeId, EntityKind, EntityRef, GroupId, ObjectId,
    ServiceId, Version, permissions,
};
use tracing::{debug, info};

use crate::context::{AccessRequest, Caller, KeyRequest};
use crate::error::{CustosError, ErrorKind, Result};
use crate::response::{
    Disclosure, Guarded, KeyOutcome, KeyStatus, ObjectUpdate, ObjectValue, ObjectVersion,
};

/// Attribute-based access control and secret release.
///
/// Every guarded operation decides first and touches protected data only
/// when access is granted. Denials are ordinary results; errors are
/// reserved for integrity, not-found and store failures.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use custos::{Caller, Custos};
/// use custos_store::MemoryStore;
/// use custos_types::{AccessAttribute, AccessControlChain, AccessControlSpec, permissions};
///
/// let custos = Custos::new(Arc::new(MemoryStore::new()));
/// let secret = custos
///     .provision_attribute(AccessAttribute::psk(&b"SECRET"[..]))
///     .unwrap();
/// let acs = AccessControlSpec::new().with_permission(
///     permissions::SRV_GRP_LIST,
///     vec![AccessControlChain::new(vec![secret])],
/// );
/// let service = custos.create_service(acs).unwrap();
///
/// let caller = Caller::new(vec![AccessAttribute::psk(&b"SECRET"[..])]);
/// let groups = custos.list_groups(Some(service), &caller).unwrap();
/// assert!(groups.granted);
/// assert_eq!(groups.payload, Some(vec![]));
/// ```
#[derive(Debug)]
pub struct Custos<S> {
    store: Arc<S>,
    evaluator: Evaluator<S, S>,
    echo_context: bool,
    context_attributes: bool,
}

impl<S: AttributeStore + ResourceStore> Custos<S> {
    /// Creates an engine with the built-in comparators and default settings.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &EngineConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: &EngineConfig) -> Self {
        let evaluator = Evaluator::new(Arc::clone(&store), Arc::clone(&store))
            .with_default_service(config.default_service.map(ServiceId::new));
        Self {
            store,
            evaluator,
            echo_context: config.echo_context,
            context_attributes: config.context_attributes,
        }
    }

    pub fn with_comparators(mut self, comparators: ComparatorRegistry) -> Self {
        self.evaluator = self.evaluator.with_comparators(comparators);
        self
    }

    pub fn with_router(mut self, router: PermissionRouter) -> Self {
        self.evaluator = self.evaluator.with_router(router);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn hierarchy(&self) -> &Hierarchy<S> {
        self.evaluator.hierarchy()
    }

    // ========================================================================
    // Decisions
    // ========================================================================

    /// Everything the caller presents: supplied attributes first, then
    /// context attributes.
    pub fn provided(&self, caller: &Caller) -> Vec<AccessAttribute> {
        let mut provided = caller.attributes.clone();
        if self.context_attributes {
            provided.extend(caller.context.attributes(self.echo_context));
        }
        provided
    }

    /// Runs a raw permission check.
    pub fn check(&self, request: &AccessRequest) -> Result<Decision> {
        self.decide(
            &request.permission,
            request.entity,
            request.version,
            &request.caller,
        )
    }

    fn decide(
        &self,
        permission: &str,
        entity: Option<uuid::Uuid>,
        version: Option<Version>,
        caller: &Caller,
    ) -> Result<Decision> {
        let provided = self.provided(caller);
        debug!(
            permission = %permission,
            user = caller.context.user.as_deref().unwrap_or("-"),
            attributes = provided.len(),
            "deciding"
        );
        Ok(self
            .evaluator
            .decide(permission, entity, version, &provided)?)
    }

    // ========================================================================
    // Provisioning
    // ========================================================================

    /// Stores an attribute definition and returns its new id.
    ///
    /// Definitions are immutable. An attribute whose `(class, type)` has no
    /// comparator could never be evaluated and is rejected.
    pub fn provision_attribute(&self, attribute: AccessAttribute) -> Result<AttributeId> {
        if !self
            .evaluator
            .comparators()
            .supports(&attribute.class, &attribute.attr_type)
        {
            return Err(CustosError::invalid(format!(
                "no comparator for {}/{}",
                attribute.class, attribute.attr_type
            )));
        }

        let id = AttributeId::generate();
        let class = attribute.class.clone();
        let attr_type = attribute.attr_type.clone();
        self.store.put_attribute(id, attribute.with_echo(false))?;
        info!(attribute = %id, class = %class, attr_type = %attr_type, "provisioned attribute");
        Ok(id)
    }

    /// Creates a service. Unguarded: services are the root of trust.
    pub fn create_service(&self, acs: AccessControlSpec) -> Result<ServiceId> {
        self.validate_acs(EntityKind::Service, &acs)?;
        let id = self.hierarchy().create_service(acs)?;
        info!(service = %id, "created service");
        Ok(id)
    }

    /// Checks that every permission in `acs` routes to `kind` and every
    /// referenced attribute is provisioned.
    pub fn validate_acs(&self, kind: EntityKind, acs: &AccessControlSpec) -> Result<()> {
        for permission in acs.permissions() {
            let routed = self
                .evaluator
                .router()
                .route(permission)
                .map_err(|e| CustosError::invalid(e.to_string()))?;
            if routed != kind {
                return Err(CustosError::invalid(format!(
                    "permission {permission} governs a {routed}, not a {kind}"
                )));
            }
        }
        for id in acs.referenced_attributes() {
            if self.store.get_attribute(id)?.is_none() {
                return Err(CustosError::invalid(format!(
                    "attribute {id} is not provisioned"
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Services and groups
    // ========================================================================

    /// Lists a service's groups (`srv_grp_list`). `None` uses the default
    /// service.
    pub fn list_groups(
        &self,
        service: Option<ServiceId>,
        caller: &Caller,
    ) -> Result<Guarded<Vec<GroupId>>> {
        let decision = self.decide(
            permissions::SRV_GRP_LIST,
            service.map(|s| s.as_uuid()),
            None,
            caller,
        )?;
        if !decision.granted {
            return Ok(Guarded::denied(decision));
        }
        let service = service_of(&decision)?;
        let groups = self.hierarchy().service(service)?.list_groups()?;
        Ok(Guarded::granted(decision, groups))
    }

    /// Creates a group under a service (`srv_grp_create`).
    pub fn create_group(
        &self,
        service: Option<ServiceId>,
        acs: AccessControlSpec,
        caller: &Caller,
    ) -> Result<Guarded<GroupId>> {
        let decision = self.decide(
            permissions::SRV_GRP_CREATE,
            service.map(|s| s.as_uuid()),
            None,
            caller,
        )?;
        if !decision.granted {
            return Ok(Guarded::denied(decision));
        }
        self.validate_acs(EntityKind::Group, &acs)?;
        let service = service_of(&decision)?;
        let group = self.hierarchy().service(service)?.create_group(acs)?;
        info!(service = %service, group = %group, "created group");
        Ok(Guarded::granted(decision, group))
    }

    /// Lists a group's objects (`grp_obj_list`).
    pub fn list_objects(
        &self,
        group: GroupId,
        caller: &Caller,
    ) -> Result<Guarded<Vec<ObjectId>>> {
        let decision = self.decide(permissions::GRP_OBJ_LIST, Some(group.as_uuid()), None, caller)?;
        if !decision.granted {
            return Ok(Guarded::denied(decision));
        }
        let objects = self.hierarchy().group(group)?.list_objects()?;
        Ok(Guarded::granted(decision, objects))
    }

    /// Creates an object at version 1 (`grp_obj_create`).
    pub fn create_object(
        &self,
        group: GroupId,
        acs: AccessControlSpec,
        value: Bytes,
        caller: &Caller,
    ) -> Result<Guarded<ObjectVersion>> {
        let decision =
            self.decide(permissions::GRP_OBJ_CREATE, Some(group.as_uuid()), None, caller)?;
        if !decision.granted {
            return Ok(Guarded::denied(decision));
        }
        self.validate_acs(EntityKind::Object, &acs)?;
        let (object, version) = self.hierarchy().group(group)?.create_object(acs, value)?;
        info!(group = %group, object = %object, "created object");
        Ok(Guarded::granted(decision, ObjectVersion { object, version }))
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Releases an object's value (`obj_read`). `None` reads the published
    /// version.
    ///
    /// The value returned is always the one whose spec was evaluated, even
    /// if a newer version is published concurrently.
    pub fn read_object(
        &self,
        object: ObjectId,
        version: Option<Version>,
        caller: &Caller,
    ) -> Result<Guarded<ObjectValue>> {
        let decision = self.decide(permissions::OBJ_READ, Some(object.as_uuid()), version, caller)?;
        if !decision.granted {
            return Ok(Guarded::denied(decision));
        }
        let value = self.release(&decision)?;
        Ok(Guarded::granted(decision, value))
    }

    /// Writes and publishes a new version (`obj_update`), gated by the
    /// published version's spec.
    pub fn update_object(
        &self,
        object: ObjectId,
        value: Bytes,
        acs: AccessControlSpec,
        caller: &Caller,
    ) -> Result<Guarded<ObjectUpdate>> {
        let decision = self.decide(permissions::OBJ_UPDATE, Some(object.as_uuid()), None, caller)?;
        if !decision.granted {
            return Ok(Guarded::denied(decision));
        }
        self.validate_acs(EntityKind::Object, &acs)?;
        let outcome = self.hierarchy().object(object)?.update(value, acs)?;
        info!(
            object = %object,
            version = %outcome.version,
            published = outcome.published,
            "updated object"
        );
        Ok(Guarded::granted(
            decision,
            ObjectUpdate {
                object,
                version: outcome.version,
                published: outcome.published,
            },
        ))
    }

    /// Returns an entity's spec (`{srv,grp,obj}_acs_get`).
    pub fn get_acs(
        &self,
        entity: EntityRef,
        caller: &Caller,
    ) -> Result<Guarded<AccessControlSpec>> {
        let permission = match entity.kind() {
            EntityKind::Service => permissions::SRV_ACS_GET,
            EntityKind::Group => permissions::GRP_ACS_GET,
            EntityKind::Object => permissions::OBJ_ACS_GET,
        };
        let decision = self.decide(permission, Some(entity.uuid()), version_of(&entity), caller)?;
        if !decision.granted {
            return Ok(Guarded::denied(decision));
        }
        let acs = self.hierarchy().acs(&decision.entity)?;
        Ok(Guarded::granted(decision, acs))
    }

    /// Replaces an entity's spec (`{srv,grp,obj}_acs_set`).
    ///
    /// Object specs are immutable per version, so setting one writes and
    /// publishes a new version carrying the current value.
    pub fn set_acs(
        &self,
        entity: EntityRef,
        acs: AccessControlSpec,
        caller: &Caller,
    ) -> Result<Guarded<AccessControlSpec>> {
        let permission = match entity.kind() {
            EntityKind::Service => permissions::SRV_ACS_SET,
            EntityKind::Group => permissions::GRP_ACS_SET,
            EntityKind::Object => permissions::OBJ_ACS_SET,
        };
        let decision = self.decide(permission, Some(entity.uuid()), None, caller)?;
        if !decision.granted {
            return Ok(Guarded::denied(decision));
        }
        self.validate_acs(entity.kind(), &acs)?;

        match decision.entity {
            EntityRef::Service(id) => self.hierarchy().service(id)?.set_acs(acs.clone())?,
            EntityRef::Group(id) => self.hierarchy().group(id)?.set_acs(acs.clone())?,
            EntityRef::Object { id, version } => {
                let object = self.hierarchy().object(id)?;
                let current = object.value(version)?;
                let outcome = object.update(current.value, acs.clone())?;
                debug!(object = %id, version = %outcome.version, "object acs written as new version");
            }
        }
        info!(entity = %decision.entity, "replaced access control spec");
        Ok(Guarded::granted(decision, acs))
    }

    // ========================================================================
    // Key disclosure
    // ========================================================================

    /// Decides a batch of key requests, each against its own object's spec.
    ///
    /// Keys whose object or version does not exist are `unknown`; any other
    /// error aborts the whole batch.
    pub fn disclose(&self, keys: &[KeyRequest], caller: &Caller) -> Result<Disclosure> {
        let mut outcomes = Vec::with_capacity(keys.len());

        for key in keys {
            let object = ObjectId::new(key.object);
            let outcome = match self.read_object(object, key.version, caller) {
                Ok(Guarded {
                    granted: true,
                    attributes,
                    payload: Some(released),
                }) => KeyOutcome {
                    object,
                    status: KeyStatus::Accepted,
                    version: Some(released.version),
                    value: Some(released.value),
                    attributes,
                },
                Ok(guarded) => KeyOutcome {
                    object,
                    status: KeyStatus::Denied,
                    version: key.version,
                    value: None,
                    attributes: guarded.attributes,
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(object = %object, error = %e, "unknown key");
                    KeyOutcome {
                        object,
                        status: KeyStatus::Unknown,
                        version: None,
                        value: None,
                        attributes: Vec::new(),
                    }
                }
                Err(e) => return Err(e),
            };
            outcomes.push(outcome);
        }

        let disclosure = Disclosure { keys: outcomes };
        info!(
            keys = keys.len(),
            status = ?disclosure.status(),
            "disclosure decided"
        );
        Ok(disclosure)
    }

    fn release(&self, decision: &Decision) -> Result<ObjectValue> {
        match decision.entity {
            EntityRef::Object { id, version } => {
                let current = self.hierarchy().object(id)?.value(version)?;
                Ok(ObjectValue {
                    object: id,
                    version: current.version,
                    value: current.value,
                })
            }
            other => Err(misrouted(&other, EntityKind::Object)),
        }
    }
}

fn service_of(decision: &Decision) -> Result<ServiceId> {
    match decision.entity {
        EntityRef::Service(id) => Ok(id),
        other => Err(misrouted(&other, EntityKind::Service)),
    }
}

fn version_of(entity: &EntityRef) -> Option<Version> {
    match entity {
        EntityRef::Object { version, .. } => *version,
        _ => None,
    }
}

/// A custom router sent a fixed permission to the wrong kind of entity.
fn misrouted(entity: &EntityRef, expected: EntityKind) -> CustosError {
    CustosError::invalid(format!("permission routed to {entity}, expected a {expected}"))
}
