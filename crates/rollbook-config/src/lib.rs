//! Configuration management for Rollbook
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence, applied by the binary)
//! 2. Environment variables (ROLLBOOK_* prefix, `__` between section and key)
//! 3. rollbook.local.toml (gitignored, local overrides)
//! 4. rollbook.toml (git-tracked, project config)
//! 5. ~/.config/rollbook/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use rollbook_load::DataFiles;
use rollbook_types::TableName;
use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod paths;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Rollbook configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbookConfig {
    pub data: DataConfig,
    pub server: ServerConfig,
    pub query: QueryConfig,
}

/// Location of the CSV exports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub students: String,
    pub classes: String,
    pub semesters: String,
    pub dates: String,
    pub attendance: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("datasets/clean"),
            students: "dim_students.csv".to_string(),
            classes: "dim_classes.csv".to_string(),
            semesters: "dim_semesters.csv".to_string(),
            dates: "dim_date.csv".to_string(),
            attendance: "fact_attendance.csv".to_string(),
        }
    }
}

impl DataConfig {
    /// File name configured for `table`
    pub fn file_name(&self, table: TableName) -> &str {
        match table {
            TableName::Students => &self.students,
            TableName::Classes => &self.classes,
            TableName::Semesters => &self.semesters,
            TableName::Dates => &self.dates,
            TableName::Attendance => &self.attendance,
        }
    }

    /// Paths the loader reads from
    pub fn files(&self) -> DataFiles {
        TableName::ALL
            .into_iter()
            .fold(DataFiles::in_dir(&self.dir), |files, table| {
                files.with_file_name(table, self.file_name(table))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Allow cross-origin requests from any origin
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            cors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size for listings when the request has none
    pub default_per_page: usize,
    /// Rows per table returned by the sample endpoint
    pub sample_rows: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_per_page: 100,
            sample_rows: 3,
        }
    }
}

impl RollbookConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.data.dir.is_relative() {
            self.data.dir = base.join(&self.data.dir);
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.query.default_per_page == 0 {
            return Err(ConfigError::ValidationError(
                "query.default_per_page must be at least 1".to_string(),
            ));
        }
        self.bind_address()?;
        Ok(())
    }

    /// Parsed `server.bind_address`
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server.bind_address.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "server.bind_address {:?}: {e}",
                self.server.bind_address
            ))
        })
    }

    /// Render as TOML, in the layout the config files use
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
