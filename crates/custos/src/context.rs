//! Who is asking, and for what.
//!
//! A [`Caller`] is the attributes a client supplied plus the
//! [`RequestContext`] the front-end observed. Context attributes are derived
//! from the context and appended after the supplied ones, so reports list
//! them last.

use custos_types::{AccessAttribute, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Facts the front-end knows about a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Source address of the request, e.g. `"127.0.0.1"`.
    #[serde(rename = "SourceIP", default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    /// Authenticated user name, if the transport has one. Logged, never
    /// matched.
    #[serde(rename = "User", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl RequestContext {
    pub fn from_source_ip(source_ip: impl Into<String>) -> Self {
        Self {
            source_ip: Some(source_ip.into()),
            user: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Context attributes, in the order they are appended.
    pub fn attributes(&self, echo: bool) -> Vec<AccessAttribute> {
        self.source_ip
            .iter()
            .map(|ip| AccessAttribute::ip_source(ip).with_echo(echo))
            .collect()
    }
}

/// Attributes and context of the party making a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    #[serde(rename = "AccessAttributes", default)]
    pub attributes: Vec<AccessAttribute>,
    #[serde(rename = "Context", default)]
    pub context: RequestContext,
}

impl Caller {
    pub fn new(attributes: Vec<AccessAttribute>) -> Self {
        Self {
            attributes,
            context: RequestContext::default(),
        }
    }

    /// Caller with no attributes at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// A raw permission check: permission name, target and caller.
///
/// The entity kind is not part of the request; it follows from the
/// permission prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    #[serde(rename = "Permission")]
    pub permission: String,
    #[serde(rename = "UUID", default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Uuid>,
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(flatten)]
    pub caller: Caller,
}

impl AccessRequest {
    pub fn new(permission: impl Into<String>, entity: Option<Uuid>, caller: Caller) -> Self {
        Self {
            permission: permission.into(),
            entity,
            version: None,
            caller,
        }
    }

    pub fn at_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }
}

/// One key of a disclosure batch. No version means the published one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRequest {
    #[serde(rename = "UUID")]
    pub object: Uuid,
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}
