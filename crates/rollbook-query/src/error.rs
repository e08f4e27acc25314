//! Error types for query execution.

use rollbook_types::TableName;
use thiserror::Error;

/// Errors that can occur while answering a query.
///
/// Unresolved foreign keys and malformed cells are not errors; they are
/// routed to fallback buckets by the resolver.
#[derive(Debug, Error)]
pub enum QueryError {
    /// One or more tables the operation needs are empty or were never loaded.
    #[error("required tables not loaded: {}", join_tables(.missing))]
    MissingDependency { missing: Vec<TableName> },

    /// A caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Row serialization failed while building a response.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    /// Returns the missing tables for [`QueryError::MissingDependency`].
    pub fn missing_tables(&self) -> Option<&[TableName]> {
        match self {
            QueryError::MissingDependency { missing } => Some(missing),
            _ => None,
        }
    }
}

fn join_tables(tables: &[TableName]) -> String {
    tables
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
