//! Attribute provisioning.

use anyhow::Result;
use custos::AccessAttribute;
use custos_config::CustosConfig;

use super::{Session, failure, parse_value};

/// Provisions an attribute and prints its id.
pub fn add(
    config: CustosConfig,
    value: &str,
    base64: bool,
    class: String,
    attr_type: String,
) -> Result<()> {
    let session = Session::open(config)?;
    let attribute = AccessAttribute::new(class, attr_type, parse_value(value, base64)?);
    let id = session
        .custos()
        .provision_attribute(attribute)
        .map_err(failure)?;
    session.save()?;
    println!("{id}");
    Ok(())
}
