//! Layered loading: defaults, then TOML files, then `ROLLBOOK_*` variables.
//!
//! Later layers override earlier ones key by key, so a local file only has
//! to name the settings it changes.

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};

use crate::{Paths, Result, RollbookConfig};

/// Finds and merges the configuration layers for one project directory.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader rooted at the current directory
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "ROLLBOOK".to_string(),
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Prefix of the environment layer; sections nest with `__`.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Config files present on disk, lowest precedence first: user file,
    /// `rollbook.toml`, `rollbook.local.toml`.
    pub fn file_layers(&self) -> Vec<PathBuf> {
        Paths::new()
            .user_config_file()
            .ok()
            .into_iter()
            .chain([
                Paths::project_config_file(&self.project_dir),
                Paths::local_config_file(&self.project_dir),
            ])
            .filter(|path| path.exists())
            .collect()
    }

    /// Merges every layer, resolves `data.dir` against the project
    /// directory and validates the result.
    pub fn load(self) -> Result<RollbookConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&RollbookConfig::default())?);

        for file in self.file_layers() {
            builder = builder.add_source(File::from(file).required(false).format(FileFormat::Toml));
        }

        // ROLLBOOK_SERVER__BIND_ADDRESS -> server.bind_address
        let environment = Environment::with_prefix(&self.env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);

        let mut merged: RollbookConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        merged.resolve_paths(&self.project_dir);
        merged.validate()?;

        Ok(merged)
    }

    /// Like [`load`](Self::load), falling back to resolved defaults when any
    /// layer is unreadable or invalid.
    pub fn load_or_default(self) -> RollbookConfig {
        let project_dir = self.project_dir.clone();
        self.load().unwrap_or_else(|_| {
            let mut defaults = RollbookConfig::default();
            defaults.resolve_paths(project_dir);
            defaults
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
