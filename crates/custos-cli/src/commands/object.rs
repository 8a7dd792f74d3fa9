//! Object commands.

use anyhow::Result;
use bytes::Bytes;
use custos::{Caller, GroupId, ObjectId, Status, Version};
use custos_config::CustosConfig;
use uuid::Uuid;

use super::{Output, Session, failure, parse_acs};

pub fn create(
    config: CustosConfig,
    out: Output,
    group: Uuid,
    acs: &str,
    value: &Bytes,
    caller: &Caller,
) -> Result<Status> {
    let session = Session::open(config)?;
    let guarded = session
        .custos()
        .create_object(GroupId::new(group), parse_acs(acs)?, value.clone(), caller)
        .map_err(failure)?;
    if guarded.granted {
        session.save()?;
    }
    out.guarded(guarded)
}

pub fn list(config: CustosConfig, out: Output, group: Uuid, caller: &Caller) -> Result<Status> {
    let session = Session::open(config)?;
    let guarded = session
        .custos()
        .list_objects(GroupId::new(group), caller)
        .map_err(failure)?;
    out.guarded(guarded)
}

pub fn read(
    config: CustosConfig,
    out: Output,
    id: Uuid,
    version: Option<u64>,
    caller: &Caller,
) -> Result<Status> {
    let session = Session::open(config)?;
    let guarded = session
        .custos()
        .read_object(ObjectId::new(id), version.map(Version::new), caller)
        .map_err(failure)?;
    out.guarded(guarded)
}

pub fn update(
    config: CustosConfig,
    out: Output,
    id: Uuid,
    value: &Bytes,
    acs: &str,
    caller: &Caller,
) -> Result<Status> {
    let session = Session::open(config)?;
    let guarded = session
        .custos()
        .update_object(ObjectId::new(id), value.clone(), parse_acs(acs)?, caller)
        .map_err(failure)?;
    if guarded.granted {
        session.save()?;
    }
    out.guarded(guarded)
}
