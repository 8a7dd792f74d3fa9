//! Group commands.

use anyhow::Result;
use custos::{Caller, ServiceId, Status};
use custos_config::CustosConfig;
use uuid::Uuid;

use super::{Output, Session, failure, parse_acs};

pub fn create(
    config: CustosConfig,
    out: Output,
    service: Option<Uuid>,
    acs: &str,
    caller: &Caller,
) -> Result<Status> {
    let session = Session::open(config)?;
    let guarded = session
        .custos()
        .create_group(service.map(ServiceId::new), parse_acs(acs)?, caller)
        .map_err(failure)?;
    if guarded.granted {
        session.save()?;
    }
    out.guarded(guarded)
}

pub fn list(
    config: CustosConfig,
    out: Output,
    service: Option<Uuid>,
    caller: &Caller,
) -> Result<Status> {
    let session = Session::open(config)?;
    let guarded = session
        .custos()
        .list_groups(service.map(ServiceId::new), caller)
        .map_err(failure)?;
    out.guarded(guarded)
}
