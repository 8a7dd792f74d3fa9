//! Raw permission checks.

use anyhow::Result;
use custos::{AccessRequest, Caller, Response, Status, Version};
use custos_config::CustosConfig;
use uuid::Uuid;

use super::{Output, Session, failure};

/// Decides a permission without touching protected data.
pub fn run(
    config: CustosConfig,
    out: Output,
    permission: String,
    id: Option<Uuid>,
    version: Option<u64>,
    caller: Caller,
) -> Result<Status> {
    let session = Session::open(config)?;
    let mut request = AccessRequest::new(permission, id, caller);
    if let Some(version) = version {
        request = request.at_version(Version::new(version));
    }

    let decision = session.custos().check(&request).map_err(failure)?;
    out.response(Response::new(
        Status::from_granted(decision.granted),
        decision.attributes,
    ))
}
