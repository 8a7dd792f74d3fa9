//! Access control spec commands.

use anyhow::Result;
use custos::{Caller, EntityRef, GroupId, ObjectId, ServiceId, Status, Version};
use custos_config::CustosConfig;

use super::{Output, Session, failure, parse_acs};
use crate::TargetArgs;

fn entity(target: &TargetArgs, version: Option<u64>) -> Result<EntityRef> {
    match (target.service, target.group, target.object) {
        (Some(id), None, None) => Ok(EntityRef::Service(ServiceId::new(id))),
        (None, Some(id), None) => Ok(EntityRef::Group(GroupId::new(id))),
        (None, None, Some(id)) => Ok(EntityRef::Object {
            id: ObjectId::new(id),
            version: version.map(Version::new),
        }),
        _ => anyhow::bail!("Exactly one of --service, --group or --object is required"),
    }
}

pub fn get(
    config: CustosConfig,
    out: Output,
    target: &TargetArgs,
    version: Option<u64>,
    caller: &Caller,
) -> Result<Status> {
    let session = Session::open(config)?;
    let guarded = session
        .custos()
        .get_acs(entity(target, version)?, caller)
        .map_err(failure)?;
    out.guarded(guarded)
}

pub fn set(
    config: CustosConfig,
    out: Output,
    target: &TargetArgs,
    acs: &str,
    caller: &Caller,
) -> Result<Status> {
    let session = Session::open(config)?;
    let guarded = session
        .custos()
        .set_acs(entity(target, None)?, parse_acs(acs)?, caller)
        .map_err(failure)?;
    if guarded.granted {
        session.save()?;
    }
    out.guarded(guarded)
}
