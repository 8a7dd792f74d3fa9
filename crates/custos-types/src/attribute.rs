//! Access attributes and their reconciliation results.
//!
//! An access attribute is a typed proof or fact: a shared secret the caller
//! knows, or a property of the request such as its source address. The
//! `(class, type)` pair selects how two values are compared; it does not
//! identify a particular attribute instance.

use std::fmt::{Debug, Display};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::wire;

/// Well-known attribute classes and types.
pub mod tags {
    /// Facts derived from the request itself (never typed by the caller).
    pub const CLASS_IMPLICIT: &str = "implicit";
    /// Proofs supplied by the caller.
    pub const CLASS_EXPLICIT: &str = "explicit";

    /// Source IP address of the request, NUL-terminated.
    pub const TYPE_IP_SRC: &str = "ip_src";
    /// Pre-shared key.
    pub const TYPE_PSK: &str = "psk";
}

// ============================================================================
// AccessAttribute
// ============================================================================

/// A typed proof or fact.
///
/// Wire shape: `{"Class": .., "Type": .., "Value": <base64>, "Echo": bool}`.
/// `Echo` defaults to `false` when absent, so stored definitions (which
/// never carry it) deserialize unchanged.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessAttribute {
    #[serde(rename = "Class")]
    pub class: String,
    #[serde(rename = "Type")]
    pub attr_type: String,
    #[serde(rename = "Value", with = "wire::base64_bytes")]
    pub value: Bytes,
    #[serde(rename = "Echo", default)]
    pub echo: bool,
}

impl AccessAttribute {
    /// Creates an attribute with `echo` disabled.
    pub fn new(class: impl Into<String>, attr_type: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            class: class.into(),
            attr_type: attr_type.into(),
            value: value.into(),
            echo: false,
        }
    }

    /// Creates an `explicit/psk` attribute.
    pub fn psk(value: impl Into<Bytes>) -> Self {
        Self::new(tags::CLASS_EXPLICIT, tags::TYPE_PSK, value)
    }

    /// Creates the `implicit/ip_src` context attribute for a source address.
    ///
    /// The value is the address string followed by a single NUL byte.
    pub fn ip_source(source_ip: &str) -> Self {
        let mut value = Vec::with_capacity(source_ip.len() + 1);
        value.extend_from_slice(source_ip.as_bytes());
        value.push(0);
        Self::new(tags::CLASS_IMPLICIT, tags::TYPE_IP_SRC, value)
    }

    /// Sets the echo flag.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Returns true if `other` has the same comparison semantics.
    pub fn same_kind(&self, other: &AccessAttribute) -> bool {
        self.class == other.class && self.attr_type == other.attr_type
    }
}

impl Debug for AccessAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values are secrets; only their length is shown.
        f.debug_struct("AccessAttribute")
            .field("class", &self.class)
            .field("attr_type", &self.attr_type)
            .field("value_len", &self.value.len())
            .field("echo", &self.echo)
            .finish()
    }
}

// ============================================================================
// AttributeStatus
// ============================================================================

/// Classification of one attribute after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeStatus {
    /// Matched a required attribute and the values compared equal.
    Accepted,
    /// Matched a required attribute but the comparison failed.
    Denied,
    /// Required by policy, not supplied.
    Required,
    /// Supplied, not needed by the evaluated chain.
    Ignored,
    /// Reserved. Never produced by reconciliation.
    Optional,
}

impl AttributeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeStatus::Accepted => "accepted",
            AttributeStatus::Denied => "denied",
            AttributeStatus::Required => "required",
            AttributeStatus::Ignored => "ignored",
            AttributeStatus::Optional => "optional",
        }
    }

    /// Returns true for statuses that make a chain fail.
    pub fn blocks_chain(&self) -> bool {
        matches!(self, AttributeStatus::Denied | AttributeStatus::Required)
    }
}

impl Display for AttributeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// AttributeResult
// ============================================================================

/// One entry of the attribute report returned to the caller.
///
/// Wire shape: `{"Class", "Type", "Value": <base64>|null, "Echo", "Status"}`.
///
/// The value is only ever present when `echo` is true; the constructor
/// enforces this so no code path can leak a non-echoable value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeResult {
    #[serde(rename = "Class")]
    class: String,
    #[serde(rename = "Type")]
    attr_type: String,
    #[serde(rename = "Value", with = "wire::base64_bytes_opt")]
    value: Option<Bytes>,
    #[serde(rename = "Echo")]
    echo: bool,
    #[serde(rename = "Status")]
    status: AttributeStatus,
}

impl AttributeResult {
    /// Builds a result, dropping the value unless `echo` is set.
    pub fn new(
        class: impl Into<String>,
        attr_type: impl Into<String>,
        status: AttributeStatus,
        echo: bool,
        value: Bytes,
    ) -> Self {
        Self {
            class: class.into(),
            attr_type: attr_type.into(),
            value: echo.then_some(value),
            echo,
            status,
        }
    }

    /// Result for a provided attribute, echoing per its own flag.
    pub fn for_provided(provided: &AccessAttribute, status: AttributeStatus) -> Self {
        Self::new(
            provided.class.clone(),
            provided.attr_type.clone(),
            status,
            provided.echo,
            provided.value.clone(),
        )
    }

    /// Result for a required attribute nobody supplied. Never echoes.
    pub fn missing(required: &AccessAttribute) -> Self {
        Self {
            class: required.class.clone(),
            attr_type: required.attr_type.clone(),
            value: None,
            echo: false,
            status: AttributeStatus::Required,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    pub fn status(&self) -> AttributeStatus {
        self.status
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn value(&self) -> Option<&Bytes> {
        self.value.as_ref()
    }
}

impl Debug for AttributeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeResult")
            .field("class", &self.class)
            .field("attr_type", &self.attr_type)
            .field("status", &self.status)
            .field("echo", &self.echo)
            .field("value_len", &self.value.as_ref().map(Bytes::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn ip_source_is_nul_terminated() {
        let aa = AccessAttribute::ip_source("127.0.0.1");
        assert_eq!(&aa.value[..], b"127.0.0.1\0");
        assert_eq!(aa.class, "implicit");
        assert_eq!(aa.attr_type, "ip_src");
        assert_eq!(wire::encode(&aa.value), "MTI3LjAuMC4xAA==");
    }

    #[test]
    fn wire_shape_uses_capitalized_keys() {
        let aa = AccessAttribute::psk(&b"It's A Trap!\0"[..]).with_echo(true);
        let json = serde_json::to_value(&aa).unwrap();
        assert_eq!(json["Class"], "explicit");
        assert_eq!(json["Type"], "psk");
        assert_eq!(json["Value"], "SXQncyBBIFRyYXAhAA==");
        assert_eq!(json["Echo"], true);
    }

    #[test]
    fn stored_definition_without_echo_parses() {
        let json = r#"{"Class":"explicit","Type":"psk","Value":"SXQncyBBIFRyYXAhAA=="}"#;
        let aa: AccessAttribute = serde_json::from_str(json).unwrap();
        assert!(!aa.echo);
        assert_eq!(&aa.value[..], b"It's A Trap!\0");
    }

    #[test]
    fn debug_never_prints_value() {
        let aa = AccessAttribute::psk(&b"hunter2"[..]);
        let rendered = format!("{aa:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("value_len: 7"));
    }

    #[test]
    fn result_drops_value_without_echo() {
        let r = AttributeResult::new("explicit", "psk", AttributeStatus::Denied, false, Bytes::from_static(b"B"));
        assert_eq!(r.value(), None);

        let json = serde_json::to_value(&r).unwrap();
        assert!(json["Value"].is_null());
        assert_eq!(json["Status"], "denied");
    }

    #[test]
    fn missing_result_never_echoes() {
        let required = AccessAttribute::psk(&b"SECRET"[..]).with_echo(true);
        let r = AttributeResult::missing(&required);
        assert_eq!(r.status(), AttributeStatus::Required);
        assert!(!r.echo());
        assert_eq!(r.value(), None);
    }

    #[test_case(AttributeStatus::Accepted, "accepted", false)]
    #[test_case(AttributeStatus::Denied, "denied", true)]
    #[test_case(AttributeStatus::Required, "required", true)]
    #[test_case(AttributeStatus::Ignored, "ignored", false)]
    #[test_case(AttributeStatus::Optional, "optional", false)]
    fn status_names_and_blocking(status: AttributeStatus, name: &str, blocks: bool) {
        assert_eq!(status.as_str(), name);
        assert_eq!(status.blocks_chain(), blocks);
        assert_eq!(serde_json::to_value(status).unwrap(), name);
    }

    fn any_status() -> impl Strategy<Value = AttributeStatus> {
        prop_oneof![
            Just(AttributeStatus::Accepted),
            Just(AttributeStatus::Denied),
            Just(AttributeStatus::Required),
            Just(AttributeStatus::Ignored),
            Just(AttributeStatus::Optional),
        ]
    }

    proptest! {
        /// A report entry carries its value on the wire exactly when the
        /// attribute allowed echo, whatever its status.
        #[test]
        fn report_value_is_on_the_wire_only_with_echo(
            value in proptest::collection::vec(any::<u8>(), 0..64),
            echo in any::<bool>(),
            status in any_status(),
        ) {
            let provided = AccessAttribute::psk(value.clone()).with_echo(echo);
            let json = serde_json::to_value(AttributeResult::for_provided(&provided, status)).unwrap();

            prop_assert_eq!(json["Status"].as_str(), Some(status.as_str()));
            if echo {
                let wire_value = json["Value"].as_str().unwrap();
                prop_assert_eq!(&wire::decode(wire_value).unwrap()[..], &value[..]);
            } else {
                prop_assert!(json["Value"].is_null());
            }
        }
    }
}
