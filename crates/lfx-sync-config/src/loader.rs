//! Configuration loader with multi-source merging

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::SyncConfig;

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    config_file: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            env_prefix: "LFX".to_string(),
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Load from an explicit config file instead of the conventional names
    pub fn with_config_file(mut self, file: impl AsRef<Path>) -> Self {
        self.config_file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix (default: "LFX")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<SyncConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = SyncConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Project config (lfx-sync.toml), or the explicit file if given
        if let Some(file) = &self.config_file {
            builder = builder.add_source(
                config::File::from(file.clone())
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        } else {
            let project_config_file = self.project_dir.join("lfx-sync.toml");
            if project_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(project_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }

            // 3. Local config (lfx-sync.local.toml, gitignored)
            let local_config_file = self.project_dir.join("lfx-sync.local.toml");
            if local_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(local_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 4. Environment variables (LFX_*, nested keys separated by "__":
        //    LFX_BROKER__URL, LFX_AUTH__SERVICE_NAME, ...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
