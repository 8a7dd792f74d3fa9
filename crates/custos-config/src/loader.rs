//! Configuration loader with multi-source merging

use crate::{CustosConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "CUSTOS".to_string(),
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "CUSTOS")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/custos/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Config files in ascending precedence. Missing files are skipped.
    pub fn files(&self) -> Vec<PathBuf> {
        let user = self
            .user_config
            .then(|| Paths::new().user_config_file().ok())
            .flatten();
        user.into_iter()
            .chain([
                Paths::project_config_file(&self.project_dir),
                Paths::local_config_file(&self.project_dir),
            ])
            .filter(|file| file.exists())
            .collect()
    }

    /// Merges defaults, config files and environment, then resolves and
    /// validates the result.
    pub fn load(self) -> Result<CustosConfig> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&CustosConfig::default())?);

        for file in self.files() {
            builder = builder.add_source(config::File::from(file).format(config::FileFormat::Toml));
        }

        // CUSTOS_ENGINE__ECHO_CONTEXT=false
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: CustosConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.resolve_paths(&self.project_dir);
        config
            .validate()
            .context("Configuration failed validation")?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> CustosConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn loader(project_dir: &Path) -> ConfigLoader {
        // A prefix no test environment sets keeps results deterministic.
        ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_prefix("CUSTOS_UNIT_TEST_UNSET")
            .without_user_config()
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert!(config.engine.echo_context);
        assert_eq!(config.engine.default_service, None);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[engine]
default_service = "30976aa2-fcf9-463e-a6ed-ba7e3ef6ebd4"
echo_context = false

[store]
snapshot = "data/custos.json"

[logging]
filter = "custos=debug"
"#;
        fs::write(project_dir.join("custos.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(
            config.engine.default_service.map(|u| u.to_string()).as_deref(),
            Some("30976aa2-fcf9-463e-a6ed-ba7e3ef6ebd4")
        );
        assert!(!config.engine.echo_context);
        assert!(config.engine.context_attributes);
        assert_eq!(config.store.snapshot, project_dir.join("data/custos.json"));
        assert_eq!(config.logging.filter, "custos=debug");
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("custos.toml"),
            r#"
[logging]
filter = "info"
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("custos.local.toml"),
            r#"
[logging]
filter = "trace"
"#,
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("custos.toml"),
            "[engine]\ndefault_service = \"not-a-uuid\"\n",
        )
        .expect("Failed to write config");

        assert!(loader(project_dir).load().is_err());
        assert_eq!(
            loader(project_dir).load_or_default(),
            CustosConfig::default()
        );
    }

    // Environment variables are not exercised here: the process environment
    // is shared between tests. In real use:
    //
    // CUSTOS_ENGINE__DEFAULT_SERVICE=30976aa2-fcf9-463e-a6ed-ba7e3ef6ebd4
    // CUSTOS_STORE__SNAPSHOT=/var/lib/custos/state.json
    // CUSTOS_LOGGING__FILTER=debug

    #[test]
    fn test_files_in_precedence_order() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        assert!(loader(project_dir).files().is_empty());

        fs::write(project_dir.join("custos.local.toml"), "").expect("Failed to write config");
        fs::write(project_dir.join("custos.toml"), "").expect("Failed to write config");

        assert_eq!(
            loader(project_dir).files(),
            vec![
                project_dir.join("custos.toml"),
                project_dir.join("custos.local.toml")
            ]
        );
    }

    #[test]
    fn test_path_resolution() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert!(config.store.snapshot.is_absolute());
        assert!(config.store.snapshot.starts_with(temp_dir.path()));
    }
}
