//! Configuration commands.

use std::path::Path;

use anyhow::Result;
use custos_config::{CustosConfig, Paths};

use crate::style;

/// Show the merged configuration.
pub fn show(config: &CustosConfig, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(config)?),
        "toml" => println!("{}", config.to_toml()?),
        _ => {
            let default_service = config
                .engine
                .default_service
                .map_or_else(|| "none".to_string(), |s| s.to_string());
            let echo_context = config.engine.echo_context.to_string();
            let context_attributes = config.engine.context_attributes.to_string();
            let snapshot = config.store.snapshot.display().to_string();

            style::print_info_table(&[
                ("engine.default_service", &default_service),
                ("engine.echo_context", &echo_context),
                ("engine.context_attributes", &context_attributes),
                ("store.snapshot", &snapshot),
                ("logging.filter", &config.logging.filter),
            ]);
        }
    }
    Ok(())
}

/// Reports which config files were found. Loading already validated them.
pub fn validate(project: &str, config: &CustosConfig) {
    let project = Path::new(project);
    let project_file = Paths::project_config_file(project);
    let local_file = Paths::local_config_file(project);

    for file in [&project_file, &local_file] {
        if file.exists() {
            style::print_labeled("found", &file.display().to_string());
        }
    }
    if !Paths::is_initialized(project) {
        style::print_hint(&format!(
            "no custos.toml in {}, using defaults",
            project.display()
        ));
    }
    style::print_success(&format!(
        "configuration valid (snapshot: {})",
        config.store.snapshot.display()
    ));
}
