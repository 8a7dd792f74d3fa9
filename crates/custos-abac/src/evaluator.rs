//! Access-control-chain evaluation.
//!
//! A permission resolves to an ordered list of chains (OR). Each chain is a
//! list of attribute ids (AND). Chains are tried in order; the first one the
//! caller satisfies grants access. If none does, the report of the chain
//! that got furthest (longest leading run of accepted attributes, earliest
//! on ties) is returned with the denial.

use std::sync::Arc;

use custos_store::{AttributeStore, Hierarchy, ResourceStore};
use custos_types::{
    AccessAttribute, AccessControlChain, AttributeResult, EntityKind, EntityRef, ServiceId,
    Version,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::reconcile::{ChainOutcome, reconcile};
use crate::{AbacError, ComparatorRegistry, PermissionRouter, Result};

// ============================================================================
// Decision
// ============================================================================

/// The result of deciding one access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub granted: bool,
    /// Attribute report of the winning (or best-effort) chain.
    pub attributes: Vec<AttributeResult>,
    /// Index of the reported chain. `None` when the permission has no chains.
    pub chain: Option<usize>,
    /// The entity whose spec was consulted. Object references are always
    /// pinned to the version that was evaluated.
    pub entity: EntityRef,
}

// ============================================================================
// Evaluator
// ============================================================================

/// Decides access requests against stored policy.
#[derive(Debug)]
pub struct Evaluator<A, R> {
    attributes: Arc<A>,
    hierarchy: Hierarchy<R>,
    comparators: ComparatorRegistry,
    router: PermissionRouter,
    default_service: Option<ServiceId>,
}

impl<A: AttributeStore, R: ResourceStore> Evaluator<A, R> {
    /// Creates an evaluator with the built-in comparators and prefixes.
    pub fn new(attributes: Arc<A>, resources: Arc<R>) -> Self {
        Self {
            attributes,
            hierarchy: Hierarchy::new(resources),
            comparators: ComparatorRegistry::default(),
            router: PermissionRouter::default(),
            default_service: None,
        }
    }

    pub fn with_comparators(mut self, comparators: ComparatorRegistry) -> Self {
        self.comparators = comparators;
        self
    }

    pub fn with_router(mut self, router: PermissionRouter) -> Self {
        self.router = router;
        self
    }

    /// Service used when a service permission names no entity.
    pub fn with_default_service(mut self, service: Option<ServiceId>) -> Self {
        self.default_service = service;
        self
    }

    pub fn hierarchy(&self) -> &Hierarchy<R> {
        &self.hierarchy
    }

    pub fn attributes(&self) -> &Arc<A> {
        &self.attributes
    }

    pub fn comparators(&self) -> &ComparatorRegistry {
        &self.comparators
    }

    pub fn router(&self) -> &PermissionRouter {
        &self.router
    }

    /// Resolves the entity a request targets.
    ///
    /// The kind comes from the permission prefix. A missing id falls back to
    /// the default service for service permissions and is `EntityNotFound`
    /// otherwise. `version` is only meaningful for objects.
    pub fn target(
        &self,
        permission: &str,
        entity: Option<Uuid>,
        version: Option<Version>,
    ) -> Result<EntityRef> {
        let kind = self.router.route(permission)?;
        let id = match (entity, kind) {
            (Some(id), _) => id,
            (None, EntityKind::Service) => self
                .default_service
                .map(|s| s.as_uuid())
                .ok_or(AbacError::EntityNotFound { kind, id: None })?,
            (None, _) => return Err(AbacError::EntityNotFound { kind, id: None }),
        };
        Ok(EntityRef::from_parts(kind, id, version))
    }

    /// Decides whether `provided` grants `permission` on `entity`.
    ///
    /// `provided` is the caller's attributes followed by any context
    /// attributes. Integrity errors from any chain abort the decision.
    pub fn decide(
        &self,
        permission: &str,
        entity: Option<Uuid>,
        version: Option<Version>,
        provided: &[AccessAttribute],
    ) -> Result<Decision> {
        self.target(permission, entity, version)
            .and_then(|target| self.evaluate(permission, target, provided))
            .inspect_err(|e| {
                if e.is_integrity() {
                    error!(permission = %permission, error = %e, "access decision aborted");
                }
            })
    }

    fn evaluate(
        &self,
        permission: &str,
        target: EntityRef,
        provided: &[AccessAttribute],
    ) -> Result<Decision> {
        let target = self.pin(target)?;
        let acs = self.hierarchy.acs(&target)?;
        let chains = acs
            .chains(permission)
            .ok_or_else(|| AbacError::UndefinedPermission {
                permission: permission.to_owned(),
                entity: target,
            })?;

        let mut best: Option<(usize, usize, Vec<AttributeResult>)> = None;

        for (index, chain) in chains.iter().enumerate() {
            let required = self.resolve_chain(chain)?;
            let results = reconcile(&self.comparators, &required, provided)?;
            let outcome = ChainOutcome::of(&results[..required.len()]);

            debug!(
                permission = %permission,
                entity = %target,
                chain = index,
                satisfied = outcome.satisfied,
                accepted_run = outcome.accepted_run,
                "evaluated chain"
            );

            if outcome.satisfied {
                info!(
                    permission = %permission,
                    entity = %target,
                    chain = index,
                    "access granted"
                );
                return Ok(Decision {
                    granted: true,
                    attributes: results,
                    chain: Some(index),
                    entity: target,
                });
            }

            if best
                .as_ref()
                .is_none_or(|(_, run, _)| outcome.accepted_run > *run)
            {
                best = Some((index, outcome.accepted_run, results));
            }
        }

        let (chain, attributes) = match best {
            Some((index, _, results)) => (Some(index), results),
            None => (None, Vec::new()),
        };
        warn!(
            permission = %permission,
            entity = %target,
            chains = chains.len(),
            best_chain = ?chain,
            "access denied"
        );
        Ok(Decision {
            granted: false,
            attributes,
            chain,
            entity: target,
        })
    }

    /// Pins unversioned object references to the published version so the
    /// spec evaluated and any value released afterwards belong together.
    fn pin(&self, target: EntityRef) -> Result<EntityRef> {
        match target {
            EntityRef::Object { id, version } => {
                let version = self.hierarchy.object(id)?.resolve(version)?;
                Ok(EntityRef::Object {
                    id,
                    version: Some(version),
                })
            }
            other => Ok(other),
        }
    }

    fn resolve_chain(&self, chain: &AccessControlChain) -> Result<Vec<AccessAttribute>> {
        chain
            .attributes()
            .iter()
            .map(|id| {
                self.attributes
                    .get_attribute(id)?
                    .ok_or(AbacError::MissingAttributeDefinition(*id))
            })
            .collect()
    }
}
