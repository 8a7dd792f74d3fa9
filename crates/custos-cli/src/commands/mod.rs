//! CLI command implementations.

pub mod acs;
pub mod attr;
pub mod check;
pub mod config;
pub mod disclose;
pub mod group;
pub mod object;
pub mod service;
pub mod version;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use custos::{
    AccessControlSpec, AttributeResult, Custos, CustosError, ErrorKind, Guarded, MemoryStore,
    Payload, Response, SnapshotLock, Status,
};
use custos_config::CustosConfig;
use custos_types::{Version, wire};
use tracing::debug;
use uuid::Uuid;

use crate::style::{self, SemanticStyle};

// ============================================================================
// Session
// ============================================================================

/// An engine over the project's snapshot.
///
/// The snapshot lock is held for the whole session, so concurrent `custos`
/// processes cannot interleave load and save. Mutating commands call
/// [`Session::save`] once the operation succeeded.
pub struct Session {
    config: CustosConfig,
    custos: Custos<MemoryStore>,
    _lock: SnapshotLock,
}

impl Session {
    pub fn open(config: CustosConfig) -> Result<Self> {
        let lock = SnapshotLock::acquire(&config.store.snapshot)?;
        let store = MemoryStore::load(&config.store.snapshot).with_context(|| {
            format!(
                "Failed to load snapshot {}",
                config.store.snapshot.display()
            )
        })?;
        debug!(snapshot = %config.store.snapshot.display(), "opened session");
        let custos = Custos::with_config(Arc::new(store), &config.engine);
        Ok(Self {
            config,
            custos,
            _lock: lock,
        })
    }

    pub fn custos(&self) -> &Custos<MemoryStore> {
        &self.custos
    }

    pub fn save(&self) -> Result<()> {
        let path = &self.config.store.snapshot;
        self.custos
            .store()
            .save(path)
            .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
        debug!(snapshot = %path.display(), "saved session");
        Ok(())
    }
}

// ============================================================================
// Output
// ============================================================================

/// How guarded results are printed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Prints a guarded result and returns its status.
    pub fn guarded<T: Payload>(self, guarded: Guarded<T>) -> Result<Status> {
        self.response(guarded.into_response())
    }

    /// Prints a wire response and returns its status.
    pub fn response(self, response: Response) -> Result<Status> {
        let status = response.status;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(status);
        }

        print_status(status);
        print_report(&response.attributes);
        if let Some(groups) = &response.groups {
            let rows: Vec<Vec<String>> = groups.iter().map(|g| vec![g.id.to_string()]).collect();
            style::print_table(&["Group"], &rows);
        }
        if let Some(objects) = &response.objects {
            let rows: Vec<Vec<String>> = objects
                .iter()
                .map(|o| {
                    vec![
                        o.id.to_string(),
                        o.version.map_or_else(String::new, |v| v.to_string()),
                        o.status.map_or_else(String::new, |s| format!("{s:?}").to_lowercase()),
                        o.value.as_ref().map_or_else(String::new, |v| wire::encode(v)),
                    ]
                })
                .collect();
            style::print_table(&["Object", "Version", "Status", "Value (base64)"], &rows);
            if objects.iter().any(|o| o.published == Some(false)) {
                style::print_hint("written, but a later version was already published");
            }
        }
        if let Some(acs) = &response.acs {
            println!("{}", serde_json::to_string_pretty(acs)?);
        }
        Ok(status)
    }
}

fn print_status(status: Status) {
    match status {
        Status::Accepted => style::print_success("accepted"),
        Status::Denied => style::print_error("denied"),
    }
}

fn print_report(attributes: &[AttributeResult]) {
    if attributes.is_empty() {
        println!("{}", "(no attributes evaluated)".muted());
        return;
    }
    println!("{}", style::report_table(attributes));
}

// ============================================================================
// Argument parsing
// ============================================================================

/// Reads `--value`, decoding base64 when asked.
pub fn parse_value(value: &str, base64: bool) -> Result<Bytes> {
    if base64 {
        wire::decode(value).context("Value is not valid base64")
    } else {
        Ok(Bytes::from(value.to_owned()))
    }
}

/// Parses an access control spec from inline JSON or `@FILE`.
pub fn parse_acs(arg: &str) -> Result<AccessControlSpec> {
    let json = match arg.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?
        }
        None => arg.to_owned(),
    };
    serde_json::from_str(&json).context("Invalid access control spec")
}

/// Parses `UUID` or `UUID@VERSION`.
pub fn parse_key(arg: &str) -> Result<(Uuid, Option<Version>)> {
    let (id, version) = match arg.split_once('@') {
        Some((id, version)) => (id, Some(version)),
        None => (arg, None),
    };
    let id = Uuid::parse_str(id).with_context(|| format!("Invalid object id in key {arg}"))?;
    let version = version
        .map(|v| v.parse::<u64>().map(Version::new))
        .transpose()
        .with_context(|| format!("Invalid version in key {arg}"))?;
    Ok((id, version))
}

/// Converts an engine error, naming its failure class.
pub fn failure(err: CustosError) -> anyhow::Error {
    let class = match err.kind() {
        ErrorKind::Integrity => "integrity failure",
        ErrorKind::NotFound => "not found",
        ErrorKind::Store => "store failure",
        ErrorKind::InvalidRequest => return anyhow::Error::new(err),
    };
    anyhow::Error::new(err).context(class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_without_version() {
        let id = Uuid::from_u128(7);
        assert_eq!(parse_key(&id.to_string()).unwrap(), (id, None));
    }

    #[test]
    fn key_with_version() {
        let id = Uuid::from_u128(7);
        assert_eq!(
            parse_key(&format!("{id}@3")).unwrap(),
            (id, Some(Version::new(3)))
        );
    }

    #[test]
    fn bad_keys_are_rejected() {
        assert!(parse_key("not-a-uuid").is_err());
        assert!(parse_key(&format!("{}@x", Uuid::nil())).is_err());
    }

    #[test]
    fn inline_acs_parses() {
        let acs = parse_acs(r#"{"obj_read": [[]]}"#).unwrap();
        assert_eq!(acs.chains("obj_read").map(<[_]>::len), Some(1));
    }

    #[test]
    fn base64_value_decodes() {
        assert_eq!(&parse_value("YWJj", true).unwrap()[..], b"abc");
        assert_eq!(&parse_value("YWJj", false).unwrap()[..], b"YWJj");
        assert!(parse_value("***", true).is_err());
    }

    #[test]
    fn failures_name_their_class() {
        let err = failure(CustosError::invalid("bad"));
        assert_eq!(err.to_string(), "invalid request: bad");

        let err = failure(CustosError::Store(custos_store::StoreError::NoAcsFound {
            kind: custos_types::EntityKind::Group,
            id: Uuid::nil(),
        }));
        assert_eq!(
            format!("{err:#}"),
            format!("integrity failure: no access control spec for group {}", Uuid::nil())
        );
    }
}
