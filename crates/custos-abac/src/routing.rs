//! Permission-prefix routing.
//!
//! A permission name's prefix selects which entity's access control spec
//! governs it: `srv_` → service, `grp_` → group, `obj_` → object.

use custos_types::EntityKind;

use crate::{AbacError, Result};

/// Closed prefix → entity-kind table.
///
/// No registered prefix is a prefix of another, so at most one route
/// matches any permission name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRouter {
    routes: Vec<(String, EntityKind)>,
}

impl PermissionRouter {
    pub const SERVICE_PREFIX: &'static str = "srv_";
    pub const GROUP_PREFIX: &'static str = "grp_";
    pub const OBJECT_PREFIX: &'static str = "obj_";

    pub fn builder() -> PermissionRouterBuilder {
        PermissionRouterBuilder::default()
    }

    /// Returns the entity kind governing `permission`.
    pub fn route(&self, permission: &str) -> Result<EntityKind> {
        self.routes
            .iter()
            .find(|(prefix, _)| permission.starts_with(prefix.as_str()))
            .map(|(_, kind)| *kind)
            .ok_or_else(|| AbacError::UnknownPermissionPrefix {
                permission: permission.to_owned(),
            })
    }

    /// The prefix registered for `kind`, if any.
    pub fn prefix_for(&self, kind: EntityKind) -> Option<&str> {
        self.routes
            .iter()
            .find(|(_, k)| *k == kind)
            .map(|(prefix, _)| prefix.as_str())
    }
}

impl Default for PermissionRouter {
    fn default() -> Self {
        Self {
            routes: vec![
                (Self::SERVICE_PREFIX.to_owned(), EntityKind::Service),
                (Self::GROUP_PREFIX.to_owned(), EntityKind::Group),
                (Self::OBJECT_PREFIX.to_owned(), EntityKind::Object),
            ],
        }
    }
}

/// Builder for [`PermissionRouter`].
#[derive(Debug, Default)]
pub struct PermissionRouterBuilder {
    routes: Vec<(String, EntityKind)>,
}

impl PermissionRouterBuilder {
    pub fn route(mut self, prefix: impl Into<String>, kind: EntityKind) -> Self {
        self.routes.push((prefix.into(), kind));
        self
    }

    /// Validates the table: prefixes must be non-empty and no prefix may
    /// start another (which also rules out duplicates).
    pub fn build(self) -> Result<PermissionRouter> {
        for (i, (prefix, _)) in self.routes.iter().enumerate() {
            if prefix.is_empty() {
                return Err(AbacError::RegistryConflict(
                    "empty permission prefix".to_owned(),
                ));
            }
            for (other, _) in &self.routes[i + 1..] {
                if prefix.starts_with(other.as_str()) || other.starts_with(prefix.as_str()) {
                    return Err(AbacError::RegistryConflict(format!(
                        "permission prefixes {prefix:?} and {other:?} overlap"
                    )));
                }
            }
        }
        Ok(PermissionRouter {
            routes: self.routes,
        })
    }
}
