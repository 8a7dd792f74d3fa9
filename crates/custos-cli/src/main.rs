//! Custos command-line tool.
//!
//! Operates on a project directory whose `custos.toml` names the snapshot
//! file holding attributes, policies and objects.
//!
//! # Quick Start
//!
//! ```bash
//! # Provision a pre-shared key and create a service guarded by it
//! ATTR=$(custos attr add SECRET)
//! SRV=$(custos service create --acs "{\"srv_grp_create\": [[\"$ATTR\"]]}")
//!
//! # Create a group as a caller presenting the key
//! custos group create --service $SRV --acs '{}' --psk SECRET
//! ```

mod commands;
mod style;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use custos::{Caller, RequestContext, Status};
use custos_config::{ConfigLoader, CustosConfig};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Custos - attribute-based access control and secret release.
#[derive(Parser)]
#[command(name = "custos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (holds custos.toml).
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project: String,

    /// Print wire-format JSON responses instead of tables.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Attribute provisioning.
    #[command(subcommand)]
    Attr(AttrCommands),

    /// Service commands.
    #[command(subcommand)]
    Service(ServiceCommands),

    /// Group commands.
    #[command(subcommand)]
    Group(GroupCommands),

    /// Object commands.
    #[command(subcommand)]
    Object(ObjectCommands),

    /// Access control spec commands.
    #[command(subcommand)]
    Acs(AcsCommands),

    /// Run a raw permission check.
    Check {
        /// Permission name, e.g. obj_read.
        permission: String,

        /// Target entity. Service permissions fall back to the default service.
        #[arg(long)]
        id: Option<Uuid>,

        /// Object version (defaults to the published one).
        #[arg(long, value_name = "VERSION")]
        at: Option<u64>,

        #[command(flatten)]
        caller: CallerArgs,
    },

    /// Release a batch of object values.
    Disclose {
        /// Keys as UUID or UUID@VERSION.
        #[arg(required = true)]
        keys: Vec<String>,

        #[command(flatten)]
        caller: CallerArgs,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the merged configuration.
    Show {
        /// Output format (text, json, toml).
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate configuration files.
    Validate,
}

#[derive(Subcommand)]
enum AttrCommands {
    /// Provision an attribute and print its id.
    Add {
        /// Attribute value.
        value: String,

        /// Treat VALUE as base64.
        #[arg(long)]
        base64: bool,

        /// Attribute class.
        #[arg(long, default_value = "explicit")]
        class: String,

        /// Attribute type.
        #[arg(long = "type", default_value = "psk")]
        attr_type: String,
    },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// Create a service and print its id. Unguarded.
    Create {
        /// Access control spec as JSON, or @FILE.
        #[arg(long)]
        acs: String,
    },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// Create a group under a service (srv_grp_create).
    Create {
        /// Service id (defaults to engine.default_service).
        #[arg(long)]
        service: Option<Uuid>,

        /// Access control spec as JSON, or @FILE.
        #[arg(long)]
        acs: String,

        #[command(flatten)]
        caller: CallerArgs,
    },

    /// List a service's groups (srv_grp_list).
    List {
        /// Service id (defaults to engine.default_service).
        #[arg(long)]
        service: Option<Uuid>,

        #[command(flatten)]
        caller: CallerArgs,
    },
}

#[derive(Subcommand)]
enum ObjectCommands {
    /// Create an object in a group (grp_obj_create).
    Create {
        /// Group id.
        #[arg(long)]
        group: Uuid,

        /// Access control spec as JSON, or @FILE.
        #[arg(long)]
        acs: String,

        /// Object value.
        #[arg(long)]
        value: String,

        /// Treat --value as base64.
        #[arg(long)]
        base64: bool,

        #[command(flatten)]
        caller: CallerArgs,
    },

    /// List a group's objects (grp_obj_list).
    List {
        /// Group id.
        #[arg(long)]
        group: Uuid,

        #[command(flatten)]
        caller: CallerArgs,
    },

    /// Read an object's value (obj_read).
    Read {
        /// Object id.
        id: Uuid,

        /// Version to read (defaults to the published one).
        #[arg(long, value_name = "VERSION")]
        at: Option<u64>,

        #[command(flatten)]
        caller: CallerArgs,
    },

    /// Write and publish a new version (obj_update).
    Update {
        /// Object id.
        id: Uuid,

        /// New value.
        #[arg(long)]
        value: String,

        /// Treat --value as base64.
        #[arg(long)]
        base64: bool,

        /// Spec for the new version as JSON, or @FILE.
        #[arg(long)]
        acs: String,

        #[command(flatten)]
        caller: CallerArgs,
    },
}

#[derive(Subcommand)]
enum AcsCommands {
    /// Show an entity's spec ({srv,grp,obj}_acs_get).
    Get {
        #[command(flatten)]
        target: TargetArgs,

        /// Object version (defaults to the published one).
        #[arg(long, value_name = "VERSION", requires = "object")]
        at: Option<u64>,

        #[command(flatten)]
        caller: CallerArgs,
    },

    /// Replace an entity's spec ({srv,grp,obj}_acs_set).
    Set {
        #[command(flatten)]
        target: TargetArgs,

        /// New access control spec as JSON, or @FILE.
        #[arg(long)]
        acs: String,

        #[command(flatten)]
        caller: CallerArgs,
    },
}

/// Exactly one entity.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Service id.
    #[arg(long)]
    pub service: Option<Uuid>,

    /// Group id.
    #[arg(long)]
    pub group: Option<Uuid>,

    /// Object id.
    #[arg(long)]
    pub object: Option<Uuid>,
}

/// What the caller presents.
#[derive(Args)]
pub struct CallerArgs {
    /// Pre-shared key to present (repeatable).
    #[arg(long = "psk", value_name = "SECRET")]
    pub psk: Vec<String>,

    /// Allow presented keys to be echoed in the report.
    #[arg(long)]
    pub echo: bool,

    /// Source address of the request.
    #[arg(long, value_name = "IP")]
    pub source_ip: Option<String>,

    /// Caller name, for logs only.
    #[arg(long)]
    pub user: Option<String>,
}

impl CallerArgs {
    pub fn caller(&self) -> Caller {
        let attributes = self
            .psk
            .iter()
            .map(|secret| {
                custos::AccessAttribute::psk(secret.clone().into_bytes()).with_echo(self.echo)
            })
            .collect();
        let context = RequestContext {
            source_ip: self.source_ip.clone(),
            user: self.user.clone(),
        };
        Caller::new(attributes).with_context(context)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    style::set_no_color(cli.no_color);

    if let Commands::Version = cli.command {
        commands::version::run();
        return Ok(ExitCode::SUCCESS);
    }

    let config = ConfigLoader::new().with_project_dir(&cli.project).load()?;
    init_tracing(&config);
    let out = commands::Output::new(cli.json);

    let status = match cli.command {
        Commands::Version => Status::Accepted,
        Commands::Config(cmd) => {
            match cmd {
                ConfigCommands::Show { format } => commands::config::show(&config, &format)?,
                ConfigCommands::Validate => commands::config::validate(&cli.project, &config),
            }
            Status::Accepted
        }
        Commands::Attr(AttrCommands::Add {
            value,
            base64,
            class,
            attr_type,
        }) => {
            commands::attr::add(config, &value, base64, class, attr_type)?;
            Status::Accepted
        }
        Commands::Service(ServiceCommands::Create { acs }) => {
            commands::service::create(config, &acs)?;
            Status::Accepted
        }
        Commands::Group(cmd) => match cmd {
            GroupCommands::Create {
                service,
                acs,
                caller,
            } => commands::group::create(config, out, service, &acs, &caller.caller())?,
            GroupCommands::List { service, caller } => {
                commands::group::list(config, out, service, &caller.caller())?
            }
        },
        Commands::Object(cmd) => match cmd {
            ObjectCommands::Create {
                group,
                acs,
                value,
                base64,
                caller,
            } => commands::object::create(
                config,
                out,
                group,
                &acs,
                &commands::parse_value(&value, base64)?,
                &caller.caller(),
            )?,
            ObjectCommands::List { group, caller } => {
                commands::object::list(config, out, group, &caller.caller())?
            }
            ObjectCommands::Read { id, at, caller } => {
                commands::object::read(config, out, id, at, &caller.caller())?
            }
            ObjectCommands::Update {
                id,
                value,
                base64,
                acs,
                caller,
            } => commands::object::update(
                config,
                out,
                id,
                &commands::parse_value(&value, base64)?,
                &acs,
                &caller.caller(),
            )?,
        },
        Commands::Acs(cmd) => match cmd {
            AcsCommands::Get { target, at, caller } => {
                commands::acs::get(config, out, &target, at, &caller.caller())?
            }
            AcsCommands::Set {
                target,
                acs,
                caller,
            } => commands::acs::set(config, out, &target, &acs, &caller.caller())?,
        },
        Commands::Check {
            permission,
            id,
            at,
            caller,
        } => commands::check::run(config, out, permission, id, at, caller.caller())?,
        Commands::Disclose { keys, caller } => {
            commands::disclose::run(config, out, &keys, &caller.caller())?
        }
    };

    Ok(match status {
        Status::Accepted => ExitCode::SUCCESS,
        Status::Denied => ExitCode::from(2),
    })
}

/// Logs go to stderr; `RUST_LOG` overrides `logging.filter`.
fn init_tracing(config: &CustosConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
