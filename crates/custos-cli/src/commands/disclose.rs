//! Batch key disclosure.

use anyhow::Result;
use custos::{Caller, KeyRequest, Status};
use custos_config::CustosConfig;

use super::{Output, Session, failure, parse_key};

pub fn run(config: CustosConfig, out: Output, keys: &[String], caller: &Caller) -> Result<Status> {
    let keys = keys
        .iter()
        .map(|arg| {
            parse_key(arg).map(|(object, version)| KeyRequest { object, version })
        })
        .collect::<Result<Vec<_>>>()?;

    let session = Session::open(config)?;
    let disclosure = session.custos().disclose(&keys, caller).map_err(failure)?;
    out.response(disclosure.into_response())
}
