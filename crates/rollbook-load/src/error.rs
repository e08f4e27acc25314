//! Loader error types

use std::path::PathBuf;

use rollbook_types::TableName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {table} at {path}: {source}")]
    ReadError {
        table: TableName,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed CSV in {table} at {path}: {source}")]
    CsvError {
        table: TableName,
        path: PathBuf,
        source: csv::Error,
    },

    #[error("{table} at {path} has no `{column}` column")]
    MissingColumn {
        table: TableName,
        path: PathBuf,
        column: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
