//! Results of guarded operations and their wire shape.

use bytes::Bytes;
use custos_abac::Decision;
use custos_types::{AccessControlSpec, AttributeResult, GroupId, ObjectId, Version, wire};
use serde::{Deserialize, Serialize};

// ============================================================================
// Guarded
// ============================================================================

/// Outcome of an operation that was gated by an access decision.
///
/// `payload` is `Some` exactly when `granted` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guarded<T> {
    pub granted: bool,
    pub attributes: Vec<AttributeResult>,
    pub payload: Option<T>,
}

impl<T> Guarded<T> {
    pub(crate) fn granted(decision: Decision, payload: T) -> Self {
        Self {
            granted: true,
            attributes: decision.attributes,
            payload: Some(payload),
        }
    }

    pub(crate) fn denied(decision: Decision) -> Self {
        Self {
            granted: false,
            attributes: decision.attributes,
            payload: None,
        }
    }

    /// Returns the payload, or `None` if access was denied.
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    pub fn status(&self) -> Status {
        Status::from_granted(self.granted)
    }
}

impl<T: Payload> Guarded<T> {
    /// Renders the wire response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(self.status(), self.attributes);
        if let Some(payload) = self.payload {
            payload.fill(&mut response);
        }
        response
    }
}

// ============================================================================
// Wire response
// ============================================================================

/// Overall status of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Accepted,
    Denied,
}

impl Status {
    pub fn from_granted(granted: bool) -> Self {
        if granted {
            Status::Accepted
        } else {
            Status::Denied
        }
    }
}

/// Per-key status in a disclosure batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Accepted,
    Denied,
    /// The object or version does not exist.
    Unknown,
}

/// `{"UUID": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    #[serde(rename = "UUID")]
    pub id: GroupId,
}

/// `{"UUID", "Version"?, "Published"?, "Value"?, "Status"?, "AccessAttributes"?}`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    #[serde(rename = "UUID")]
    pub id: ObjectId,
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Set on update results; `false` means a concurrent update had already
    /// published this version or a later one.
    #[serde(rename = "Published", default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(
        rename = "Value",
        default,
        with = "wire::base64_bytes_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Bytes>,
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<KeyStatus>,
    #[serde(
        rename = "AccessAttributes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub attributes: Option<Vec<AttributeResult>>,
}

impl ObjectEntry {
    pub fn id(id: ObjectId) -> Self {
        Self {
            id,
            version: None,
            published: None,
            value: None,
            status: None,
            attributes: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }
}

impl std::fmt::Debug for ObjectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectEntry")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("published", &self.published)
            .field("value_len", &self.value.as_ref().map(Bytes::len))
            .field("status", &self.status)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Wire response of every guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "Status")]
    pub status: Status,
    #[serde(rename = "AccessAttributes", default)]
    pub attributes: Vec<AttributeResult>,
    #[serde(rename = "Groups", default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupEntry>>,
    #[serde(rename = "Objects", default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ObjectEntry>>,
    #[serde(
        rename = "AccessControlSpec",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub acs: Option<AccessControlSpec>,
}

impl Response {
    pub fn new(status: Status, attributes: Vec<AttributeResult>) -> Self {
        Self {
            status,
            attributes,
            groups: None,
            objects: None,
            acs: None,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// A payload that knows which response stanza it fills.
pub trait Payload {
    fn fill(self, response: &mut Response);
}

impl Payload for Vec<GroupId> {
    fn fill(self, response: &mut Response) {
        response.groups = Some(self.into_iter().map(|id| GroupEntry { id }).collect());
    }
}

impl Payload for GroupId {
    fn fill(self, response: &mut Response) {
        vec![self].fill(response);
    }
}

impl Payload for Vec<ObjectId> {
    fn fill(self, response: &mut Response) {
        response.objects = Some(self.into_iter().map(ObjectEntry::id).collect());
    }
}

impl Payload for AccessControlSpec {
    fn fill(self, response: &mut Response) {
        response.acs = Some(self);
    }
}

/// An object and one of its versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectVersion {
    pub object: ObjectId,
    pub version: Version,
}

impl Payload for ObjectVersion {
    fn fill(self, response: &mut Response) {
        response.objects = Some(vec![ObjectEntry::id(self.object).with_version(self.version)]);
    }
}

/// A released object value.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectValue {
    pub object: ObjectId,
    pub version: Version,
    pub value: Bytes,
}

impl std::fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectValue")
            .field("object", &self.object)
            .field("version", &self.version)
            .field("value_len", &self.value.len())
            .finish()
    }
}

impl Payload for ObjectValue {
    fn fill(self, response: &mut Response) {
        let mut entry = ObjectEntry::id(self.object).with_version(self.version);
        entry.value = Some(self.value);
        response.objects = Some(vec![entry]);
    }
}

/// Result of a guarded object update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectUpdate {
    pub object: ObjectId,
    pub version: Version,
    /// Whether this update's publish step advanced the read pointer.
    pub published: bool,
}

impl Payload for ObjectUpdate {
    fn fill(self, response: &mut Response) {
        let mut entry = ObjectEntry::id(self.object).with_version(self.version);
        entry.published = Some(self.published);
        response.objects = Some(vec![entry]);
    }
}

// ============================================================================
// Disclosure
// ============================================================================

/// Outcome for one key of a disclosure batch.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyOutcome {
    pub object: ObjectId,
    pub status: KeyStatus,
    /// The evaluated version; `None` for unknown keys.
    pub version: Option<Version>,
    /// Released only when `status` is accepted.
    pub value: Option<Bytes>,
    pub attributes: Vec<AttributeResult>,
}

impl std::fmt::Debug for KeyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyOutcome")
            .field("object", &self.object)
            .field("status", &self.status)
            .field("version", &self.version)
            .field("value_len", &self.value.as_ref().map(Bytes::len))
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Outcome of a disclosure batch.
///
/// `Debug` goes through [`KeyOutcome`]'s, so released values never print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    pub keys: Vec<KeyOutcome>,
}

impl Disclosure {
    /// Accepted only when every key was accepted.
    pub fn status(&self) -> Status {
        Status::from_granted(self.keys.iter().all(|k| k.status == KeyStatus::Accepted))
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(self.status(), Vec::new());
        response.objects = Some(
            self.keys
                .into_iter()
                .map(|key| ObjectEntry {
                    id: key.object,
                    version: key.version,
                    published: None,
                    value: key.value,
                    status: Some(key.status),
                    attributes: Some(key.attributes),
                })
                .collect(),
        );
        response
    }
}
