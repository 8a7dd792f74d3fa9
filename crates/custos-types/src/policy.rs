//! Access control specifications.
//!
//! An [`AccessControlSpec`] maps each permission name to an ordered list of
//! [`AccessControlChain`]s. The chains are alternatives (OR); the attribute
//! ids inside one chain must all be satisfied (AND).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::AttributeId;

/// Permission names used by the hierarchy.
///
/// The prefix (`srv_`, `grp_`, `obj_`) selects which entity's spec is
/// consulted; the full string is the key inside that spec.
pub mod permissions {
    pub const SRV_GRP_CREATE: &str = "srv_grp_create";
    pub const SRV_GRP_LIST: &str = "srv_grp_list";
    pub const SRV_ACS_GET: &str = "srv_acs_get";
    pub const SRV_ACS_SET: &str = "srv_acs_set";

    pub const GRP_OBJ_CREATE: &str = "grp_obj_create";
    pub const GRP_OBJ_LIST: &str = "grp_obj_list";
    pub const GRP_ACS_GET: &str = "grp_acs_get";
    pub const GRP_ACS_SET: &str = "grp_acs_set";

    pub const OBJ_READ: &str = "obj_read";
    pub const OBJ_UPDATE: &str = "obj_update";
    pub const OBJ_ACS_GET: &str = "obj_acs_get";
    pub const OBJ_ACS_SET: &str = "obj_acs_set";
}

// ============================================================================
// AccessControlChain
// ============================================================================

/// An AND-list of attribute ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessControlChain(Vec<AttributeId>);

impl AccessControlChain {
    pub fn new(attributes: Vec<AttributeId>) -> Self {
        Self(attributes)
    }

    pub fn attributes(&self) -> &[AttributeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<AttributeId>> for AccessControlChain {
    fn from(attributes: Vec<AttributeId>) -> Self {
        Self(attributes)
    }
}

impl FromIterator<AttributeId> for AccessControlChain {
    fn from_iter<I: IntoIterator<Item = AttributeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// AccessControlSpec
// ============================================================================

/// Permission name → OR of chains.
///
/// Serialized as a plain JSON object:
/// `{"obj_read": [["<attr-uuid>"], ["<attr-uuid>", "<attr-uuid>"]]}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessControlSpec(BTreeMap<String, Vec<AccessControlChain>>);

impl AccessControlSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chains for a permission (builder pattern).
    pub fn with_permission(
        mut self,
        permission: impl Into<String>,
        chains: Vec<AccessControlChain>,
    ) -> Self {
        self.0.insert(permission.into(), chains);
        self
    }

    /// Grants every listed permission to the same set of chains.
    pub fn uniform<'a>(
        permissions: impl IntoIterator<Item = &'a str>,
        chains: &[AccessControlChain],
    ) -> Self {
        Self(
            permissions
                .into_iter()
                .map(|p| (p.to_string(), chains.to_vec()))
                .collect(),
        )
    }

    /// Returns the chains defined for `permission`, if the spec defines it.
    pub fn chains(&self, permission: &str) -> Option<&[AccessControlChain]> {
        self.0.get(permission).map(Vec::as_slice)
    }

    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// All attribute ids referenced anywhere in the spec, in permission order.
    pub fn referenced_attributes(&self) -> impl Iterator<Item = &AttributeId> {
        self.0
            .values()
            .flat_map(|chains| chains.iter())
            .flat_map(|chain| chain.attributes().iter())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(n: u128) -> AttributeId {
        AttributeId::new(uuid::Uuid::from_u128(n))
    }

    #[test]
    fn undefined_permission_is_none() {
        let acs = AccessControlSpec::new().with_permission("obj_read", vec![vec![attr(1)].into()]);
        assert!(acs.chains("obj_read").is_some());
        assert!(acs.chains("obj_update").is_none());
    }

    #[test]
    fn defined_but_empty_permission_is_some() {
        let acs = AccessControlSpec::new().with_permission("obj_read", vec![]);
        assert_eq!(acs.chains("obj_read").map(<[_]>::len), Some(0));
    }

    #[test]
    fn uniform_spec_shares_chains() {
        let chains = vec![AccessControlChain::new(vec![attr(1)])];
        let acs = AccessControlSpec::uniform(
            [permissions::OBJ_READ, permissions::OBJ_UPDATE],
            &chains,
        );
        assert_eq!(acs.chains(permissions::OBJ_READ), Some(&chains[..]));
        assert_eq!(acs.chains(permissions::OBJ_UPDATE), Some(&chains[..]));
        assert_eq!(acs.permissions().count(), 2);
    }

    #[test]
    fn json_shape_is_map_of_nested_lists() {
        let json = r#"{"srv_grp_list": [["9b386945-955e-4b7a-9668-641786843357"]]}"#;
        let acs: AccessControlSpec = serde_json::from_str(json).unwrap();
        let chains = acs.chains("srv_grp_list").unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(
            chains[0].attributes()[0].to_string(),
            "9b386945-955e-4b7a-9668-641786843357"
        );
    }

    #[test]
    fn referenced_attributes_walks_every_chain() {
        let acs = AccessControlSpec::new()
            .with_permission("a", vec![vec![attr(1), attr(2)].into()])
            .with_permission("b", vec![vec![attr(3)].into(), AccessControlChain::default()]);
        let ids: Vec<_> = acs.referenced_attributes().copied().collect();
        assert_eq!(ids, vec![attr(1), attr(2), attr(3)]);
    }
}
