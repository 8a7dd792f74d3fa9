//! Service commands.

use anyhow::Result;
use custos_config::CustosConfig;

use super::{Session, failure, parse_acs};

/// Creates a service and prints its id.
pub fn create(config: CustosConfig, acs: &str) -> Result<()> {
    let session = Session::open(config)?;
    let id = session
        .custos()
        .create_service(parse_acs(acs)?)
        .map_err(failure)?;
    session.save()?;
    println!("{id}");
    Ok(())
}
