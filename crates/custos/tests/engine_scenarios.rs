//! End-to-end scenarios through the Custos facade.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use custos::{
    AccessAttribute, AccessControlChain, AccessControlSpec, AccessRequest, AttributeId,
    AttributeStatus, Caller, Custos, EntityKind, EntityRef, ErrorKind, GroupId, KeyRequest,
    KeyStatus, MemoryStore, ObjectId, RequestContext, ServiceId, Status, Version, permissions,
};
use custos_config::EngineConfig;
use proptest::prelude::*;

// ============================================================================
// Fixture
// ============================================================================

const ADMIN_KEY: &[u8] = b"admin-key";
const READER_KEY: &[u8] = b"reader-key";

struct Fixture {
    custos: Custos<MemoryStore>,
    admin: AttributeId,
    reader: AttributeId,
    service: ServiceId,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    fn with_config(config: &EngineConfig) -> Self {
        let custos = Custos::with_config(Arc::new(MemoryStore::new()), config);
        let admin = custos
            .provision_attribute(AccessAttribute::psk(ADMIN_KEY))
            .unwrap();
        let reader = custos
            .provision_attribute(AccessAttribute::psk(READER_KEY))
            .unwrap();
        let service = custos
            .create_service(AccessControlSpec::uniform(
                [
                    permissions::SRV_GRP_CREATE,
                    permissions::SRV_GRP_LIST,
                    permissions::SRV_ACS_GET,
                    permissions::SRV_ACS_SET,
                ],
                &[only(admin)],
            ))
            .unwrap();
        Self {
            custos,
            admin,
            reader,
            service,
        }
    }

    fn group_acs(&self) -> AccessControlSpec {
        AccessControlSpec::uniform(
            [
                permissions::GRP_OBJ_CREATE,
                permissions::GRP_OBJ_LIST,
                permissions::GRP_ACS_GET,
                permissions::GRP_ACS_SET,
            ],
            &[only(self.admin)],
        )
    }

    /// Admin may do anything; the reader may only read.
    fn object_acs(&self) -> AccessControlSpec {
        AccessControlSpec::uniform(
            [
                permissions::OBJ_UPDATE,
                permissions::OBJ_ACS_GET,
                permissions::OBJ_ACS_SET,
            ],
            &[only(self.admin)],
        )
        .with_permission(
            permissions::OBJ_READ,
            vec![only(self.admin), only(self.reader)],
        )
    }

    fn group(&self) -> GroupId {
        self.custos
            .create_group(Some(self.service), self.group_acs(), &admin())
            .unwrap()
            .into_payload()
            .unwrap()
    }

    fn object(&self, group: GroupId, value: &'static [u8]) -> ObjectId {
        self.custos
            .create_object(group, self.object_acs(), Bytes::from_static(value), &admin())
            .unwrap()
            .into_payload()
            .unwrap()
            .object
    }
}

fn only(id: AttributeId) -> AccessControlChain {
    AccessControlChain::new(vec![id])
}

fn admin() -> Caller {
    Caller::new(vec![AccessAttribute::psk(ADMIN_KEY)])
}

fn reader() -> Caller {
    Caller::new(vec![AccessAttribute::psk(READER_KEY).with_echo(true)])
}

fn statuses(results: &[custos::AttributeResult]) -> Vec<AttributeStatus> {
    results.iter().map(custos::AttributeResult::status).collect()
}

// ============================================================================
// Reconciliation scenarios
// ============================================================================

#[test]
fn matching_secret_is_accepted_and_echoed() {
    let fx = Fixture::new();
    let group = fx.group();
    let object = fx.object(group, b"payload");

    let read = fx.custos.read_object(object, None, &reader()).unwrap();

    assert!(read.granted);
    // Chain [admin] fails first; the granted report is the reader chain's.
    assert_eq!(statuses(&read.attributes), vec![AttributeStatus::Accepted]);
    assert_eq!(
        read.attributes[0].value().map(|v| &v[..]),
        Some(READER_KEY)
    );
}

#[test]
fn absent_secret_is_required() {
    let fx = Fixture::new();

    let groups = fx
        .custos
        .list_groups(Some(fx.service), &Caller::anonymous())
        .unwrap();

    assert!(!groups.granted);
    assert_eq!(groups.payload, None);
    assert_eq!(statuses(&groups.attributes), vec![AttributeStatus::Required]);
    assert_eq!(groups.attributes[0].value(), None);
}

#[test]
fn wrong_secret_is_denied_without_echo() {
    let fx = Fixture::new();
    let caller = Caller::new(vec![AccessAttribute::psk(&b"guess"[..])]);

    let groups = fx.custos.list_groups(Some(fx.service), &caller).unwrap();

    assert!(!groups.granted);
    assert_eq!(statuses(&groups.attributes), vec![AttributeStatus::Denied]);
    assert!(!groups.attributes[0].echo());
    assert_eq!(groups.attributes[0].value(), None);
}

#[test]
fn second_chain_grants_when_first_fails() {
    let fx = Fixture::new();
    let group = fx.group();
    let object = fx.object(group, b"payload");

    let decision = fx
        .custos
        .check(&AccessRequest::new(
            permissions::OBJ_READ,
            Some(object.as_uuid()),
            reader(),
        ))
        .unwrap();

    assert!(decision.granted);
    assert_eq!(decision.chain, Some(1));
    assert_eq!(
        decision.entity,
        EntityRef::Object {
            id: object,
            version: Some(Version::INITIAL),
        }
    );
}

#[test]
fn updates_advance_both_version_pointers() {
    let fx = Fixture::new();
    let group = fx.group();
    let object = fx.object(group, b"v1");

    let mut versions = Vec::new();
    for value in [&b"v2"[..], &b"v3"[..]] {
        let update = fx
            .custos
            .update_object(
                object,
                Bytes::from_static(value),
                fx.object_acs(),
                &admin(),
            )
            .unwrap()
            .into_payload()
            .unwrap();
        assert!(update.published);
        versions.push(update.version);
    }
    assert_eq!(versions, vec![Version::new(2), Version::new(3)]);

    let pointers = fx.custos.hierarchy().object(object).unwrap().versions().unwrap();
    assert_eq!(pointers.read, Version::new(3));
    assert_eq!(pointers.update, Version::new(3));

    let latest = fx.custos.read_object(object, None, &reader()).unwrap();
    let released = latest.into_payload().unwrap();
    assert_eq!(released.version, Version::new(3));
    assert_eq!(&released.value[..], b"v3");

    let first = fx
        .custos
        .read_object(object, Some(Version::INITIAL), &reader())
        .unwrap()
        .into_payload()
        .unwrap();
    assert_eq!(&first.value[..], b"v1");
}

// ============================================================================
// Context attributes
// ============================================================================

#[test]
fn source_ip_is_reported_last_as_ignored() {
    let fx = Fixture::new();
    let caller = admin().with_context(RequestContext::from_source_ip("127.0.0.1"));

    let groups = fx.custos.list_groups(Some(fx.service), &caller).unwrap();

    assert!(groups.granted);
    assert_eq!(
        statuses(&groups.attributes),
        vec![AttributeStatus::Accepted, AttributeStatus::Ignored]
    );
    let ip = &groups.attributes[1];
    assert_eq!(ip.class(), "implicit");
    assert_eq!(ip.attr_type(), "ip_src");
    assert_eq!(ip.value().map(|v| &v[..]), Some(&b"127.0.0.1\0"[..]));
}

#[test]
fn context_echo_follows_config() {
    let fx = Fixture::with_config(&EngineConfig {
        echo_context: false,
        ..EngineConfig::default()
    });
    let caller = admin().with_context(RequestContext::from_source_ip("10.1.2.3"));

    let groups = fx.custos.list_groups(Some(fx.service), &caller).unwrap();

    assert_eq!(groups.attributes.len(), 2);
    assert!(!groups.attributes[1].echo());
    assert_eq!(groups.attributes[1].value(), None);
}

#[test]
fn context_attributes_can_be_disabled() {
    let fx = Fixture::with_config(&EngineConfig {
        context_attributes: false,
        ..EngineConfig::default()
    });
    let caller = admin().with_context(RequestContext::from_source_ip("10.1.2.3"));

    let groups = fx.custos.list_groups(Some(fx.service), &caller).unwrap();

    assert_eq!(statuses(&groups.attributes), vec![AttributeStatus::Accepted]);
}

// ============================================================================
// Hierarchy operations
// ============================================================================

#[test]
fn groups_and_objects_are_listed_in_creation_order() {
    let fx = Fixture::new();
    let first = fx.group();
    let second = fx.group();

    let groups = fx
        .custos
        .list_groups(Some(fx.service), &admin())
        .unwrap()
        .into_payload()
        .unwrap();
    assert_eq!(groups, vec![first, second]);

    let a = fx.object(first, b"a");
    let b = fx.object(first, b"b");
    let objects = fx
        .custos
        .list_objects(first, &admin())
        .unwrap()
        .into_payload()
        .unwrap();
    assert_eq!(objects, vec![a, b]);

    let empty = fx
        .custos
        .list_objects(second, &admin())
        .unwrap()
        .into_payload()
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn denied_create_leaves_hierarchy_untouched() {
    let fx = Fixture::new();

    let denied = fx
        .custos
        .create_group(Some(fx.service), fx.group_acs(), &reader())
        .unwrap();

    assert!(!denied.granted);
    let groups = fx
        .custos
        .list_groups(Some(fx.service), &admin())
        .unwrap()
        .into_payload()
        .unwrap();
    assert!(groups.is_empty());
}

#[test]
fn reader_cannot_update() {
    let fx = Fixture::new();
    let group = fx.group();
    let object = fx.object(group, b"v1");

    let denied = fx
        .custos
        .update_object(object, Bytes::from_static(b"v2"), fx.object_acs(), &reader())
        .unwrap();

    assert!(!denied.granted);
    let pointers = fx.custos.hierarchy().object(object).unwrap().versions().unwrap();
    assert_eq!(pointers.update, Version::INITIAL);
}

#[test]
fn default_service_serves_requests_without_id() {
    let fx = Fixture::new();
    let custos = Custos::with_config(
        Arc::clone(fx.custos.store()),
        &EngineConfig {
            default_service: Some(fx.service.as_uuid()),
            ..EngineConfig::default()
        },
    );

    let groups = custos.list_groups(None, &admin()).unwrap();
    assert!(groups.granted);

    let err = fx.custos.list_groups(None, &admin()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Access control specs
// ============================================================================

#[test]
fn group_acs_can_be_replaced() {
    let fx = Fixture::new();
    let group = fx.group();
    let open = AccessControlSpec::new().with_permission(
        permissions::GRP_OBJ_LIST,
        vec![AccessControlChain::default()],
    );

    let set = fx
        .custos
        .set_acs(EntityRef::Group(group), open.clone(), &admin())
        .unwrap();
    assert!(set.granted);

    // An empty chain grants anyone.
    let listed = fx.custos.list_objects(group, &Caller::anonymous()).unwrap();
    assert!(listed.granted);

    // The admin chain is gone with the old spec.
    let err = fx
        .custos
        .get_acs(EntityRef::Group(group), &admin())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn object_acs_change_writes_a_new_version() {
    let fx = Fixture::new();
    let group = fx.group();
    let object = fx.object(group, b"secret");
    let admin_only = AccessControlSpec::uniform(
        [
            permissions::OBJ_READ,
            permissions::OBJ_UPDATE,
            permissions::OBJ_ACS_GET,
            permissions::OBJ_ACS_SET,
        ],
        &[only(fx.admin)],
    );

    let set = fx
        .custos
        .set_acs(EntityRef::object(object), admin_only.clone(), &admin())
        .unwrap();
    assert!(set.granted);

    let pointers = fx.custos.hierarchy().object(object).unwrap().versions().unwrap();
    assert_eq!(pointers.read, Version::new(2));

    // The reader lost access to the current version, but version 1 keeps
    // its original spec.
    assert!(!fx.custos.read_object(object, None, &reader()).unwrap().granted);
    let old = fx
        .custos
        .read_object(object, Some(Version::INITIAL), &reader())
        .unwrap()
        .into_payload()
        .unwrap();
    assert_eq!(&old.value[..], b"secret");

    let current = fx
        .custos
        .get_acs(EntityRef::object(object), &admin())
        .unwrap()
        .into_payload()
        .unwrap();
    assert_eq!(current, admin_only);

    let value = fx
        .custos
        .read_object(object, None, &admin())
        .unwrap()
        .into_payload()
        .unwrap();
    assert_eq!(&value.value[..], b"secret");
}

#[test]
fn acs_for_wrong_entity_kind_is_rejected() {
    let fx = Fixture::new();
    let group = fx.group();

    let err = fx
        .custos
        .create_object(group, fx.group_acs(), Bytes::from_static(b"x"), &admin())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[test]
fn acs_with_unprovisioned_attribute_is_rejected() {
    let fx = Fixture::new();
    let acs = AccessControlSpec::new().with_permission(
        permissions::SRV_GRP_LIST,
        vec![only(AttributeId::generate())],
    );

    let err = fx.custos.create_service(acs).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[test]
fn attribute_without_comparator_is_rejected() {
    let fx = Fixture::new();

    let err = fx
        .custos
        .provision_attribute(AccessAttribute::new("explicit", "otp", &b"123456"[..]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

// ============================================================================
// Failure kinds
// ============================================================================

#[test]
fn unknown_permission_prefix_is_integrity_error() {
    let fx = Fixture::new();

    let err = fx
        .custos
        .check(&AccessRequest::new(
            "tenant_read",
            Some(fx.service.as_uuid()),
            admin(),
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn unknown_entity_is_not_found() {
    let fx = Fixture::new();

    let err = fx
        .custos
        .read_object(ObjectId::generate(), None, &admin())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let group = fx.group();
    let object = fx.object(group, b"x");
    let err = fx
        .custos
        .read_object(object, Some(Version::new(9)), &admin())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn permission_kind_follows_prefix_not_caller() {
    let fx = Fixture::new();

    // A service id presented to an object permission is simply not an object.
    let err = fx
        .custos
        .check(&AccessRequest::new(
            permissions::OBJ_READ,
            Some(fx.service.as_uuid()),
            admin(),
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains(EntityKind::Object.as_str()));
}

// ============================================================================
// Key disclosure
// ============================================================================

#[test]
fn disclosure_reports_each_key() {
    let fx = Fixture::new();
    let group = fx.group();
    let readable = fx.object(group, b"one");
    let locked = fx
        .custos
        .create_object(
            group,
            AccessControlSpec::new().with_permission(permissions::OBJ_READ, vec![only(fx.admin)]),
            Bytes::from_static(b"two"),
            &admin(),
        )
        .unwrap()
        .into_payload()
        .unwrap()
        .object;
    let missing = ObjectId::generate();

    let disclosure = fx
        .custos
        .disclose(
            &[
                KeyRequest {
                    object: readable.as_uuid(),
                    version: None,
                },
                KeyRequest {
                    object: locked.as_uuid(),
                    version: None,
                },
                KeyRequest {
                    object: missing.as_uuid(),
                    version: None,
                },
            ],
            &reader(),
        )
        .unwrap();

    let keys: Vec<_> = disclosure.keys.iter().map(|k| k.status).collect();
    assert_eq!(
        keys,
        vec![KeyStatus::Accepted, KeyStatus::Denied, KeyStatus::Unknown]
    );
    assert_eq!(disclosure.keys[0].value.as_deref(), Some(&b"one"[..]));
    assert_eq!(disclosure.keys[1].value, None);
    assert_eq!(disclosure.status(), Status::Denied);
}

#[test]
fn disclosure_of_readable_keys_is_accepted() {
    let fx = Fixture::new();
    let group = fx.group();
    let a = fx.object(group, b"a");
    let b = fx.object(group, b"b");

    let disclosure = fx
        .custos
        .disclose(
            &[
                KeyRequest {
                    object: a.as_uuid(),
                    version: Some(Version::INITIAL),
                },
                KeyRequest {
                    object: b.as_uuid(),
                    version: None,
                },
            ],
            &reader(),
        )
        .unwrap();

    assert_eq!(disclosure.status(), Status::Accepted);
    let json = serde_json::to_value(disclosure.into_response()).unwrap();
    assert_eq!(json["Status"], "accepted");
    assert_eq!(json["Objects"][1]["Value"], "Yg==");
}

#[test]
fn empty_disclosure_is_accepted() {
    let fx = Fixture::new();
    let disclosure = fx.custos.disclose(&[], &admin()).unwrap();
    assert!(disclosure.keys.is_empty());
    assert_eq!(disclosure.status(), Status::Accepted);
}

// ============================================================================
// Wire responses
// ============================================================================

#[test]
fn read_response_never_leaks_non_echo_values() {
    let fx = Fixture::new();
    let group = fx.group();
    let object = fx.object(group, b"payload");

    let response = fx
        .custos
        .read_object(object, None, &admin())
        .unwrap()
        .into_response();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["Status"], "accepted");
    assert_eq!(json["AccessAttributes"][0]["Status"], "accepted");
    assert!(json["AccessAttributes"][0]["Value"].is_null());
    assert_eq!(json["Objects"][0]["Value"], "cGF5bG9hZA==");
    assert_eq!(json["Objects"][0]["Version"], 1);
}

// ============================================================================
// Shared stores
// ============================================================================

#[test]
fn engines_sharing_a_store_never_reuse_versions() {
    const ENGINES: u64 = 4;
    const UPDATES: u64 = 25;
    let fx = Fixture::new();
    let object = fx.object(fx.group(), b"v1");
    let acs = fx.object_acs();

    let handles: Vec<_> = (0..ENGINES)
        .map(|e| {
            let store = Arc::clone(fx.custos.store());
            let acs = acs.clone();
            thread::spawn(move || {
                let custos = Custos::new(store);
                (0..UPDATES)
                    .map(|u| {
                        custos
                            .update_object(object, Bytes::from(format!("{e}:{u}")), acs.clone(), &admin())
                            .unwrap()
                            .into_payload()
                            .unwrap()
                            .version
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let versions: HashSet<Version> = handles
        .into_iter()
        .flat_map(|t| t.join().unwrap())
        .collect();
    let expected: HashSet<Version> = (2..=ENGINES * UPDATES + 1).map(Version::new).collect();
    assert_eq!(versions, expected);

    let pointers = fx.custos.hierarchy().object(object).unwrap().versions().unwrap();
    assert_eq!(pointers.update, Version::new(ENGINES * UPDATES + 1));
    assert_eq!(pointers.read, pointers.update);
}

#[test]
fn engine_state_survives_snapshot_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custos.json");

    let fx = Fixture::new();
    let group = fx.group();
    let object = fx.object(group, b"It's A Trap!");
    fx.custos.store().save(&path).unwrap();

    let reloaded = Custos::new(Arc::new(MemoryStore::load(&path).unwrap()));
    let listed = reloaded.list_objects(group, &admin()).unwrap();
    assert_eq!(listed.into_payload(), Some(vec![object]));

    let released = reloaded
        .read_object(object, None, &reader())
        .unwrap()
        .into_payload()
        .unwrap();
    assert_eq!(released.version, Version::INITIAL);
    assert_eq!(&released.value[..], b"It's A Trap!");

    let wrong = Caller::new(vec![AccessAttribute::psk(&b"guess"[..])]);
    assert!(!reloaded.read_object(object, None, &wrong).unwrap().granted);
}

// ============================================================================
// Denial properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever keys an unprovisioned caller presents, every guarded
    /// operation denies, carries no payload, and leaves the object alone.
    #[test]
    fn denied_callers_get_no_payload(
        keys in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), 0..3),
    ) {
        prop_assume!(keys.iter().all(|k| k != ADMIN_KEY && k != READER_KEY));
        let fx = Fixture::new();
        let group = fx.group();
        let object = fx.object(group, b"secret");
        let caller = Caller::new(keys.into_iter().map(AccessAttribute::psk).collect());

        let read = fx.custos.read_object(object, None, &caller).unwrap();
        prop_assert!(!read.granted);
        prop_assert!(read.payload.is_none());
        prop_assert!(read.into_response().objects.is_none());

        let listed = fx.custos.list_objects(group, &caller).unwrap();
        prop_assert!(!listed.granted);
        prop_assert!(listed.payload.is_none());

        let acs = fx.custos.get_acs(EntityRef::object(object), &caller).unwrap();
        prop_assert!(acs.payload.is_none());

        let update = fx
            .custos
            .update_object(object, Bytes::from_static(b"x"), fx.object_acs(), &caller)
            .unwrap();
        prop_assert!(update.payload.is_none());

        let pointers = fx.custos.hierarchy().object(object).unwrap().versions().unwrap();
        prop_assert_eq!(pointers.update, Version::INITIAL);
    }
}
