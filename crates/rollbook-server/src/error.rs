//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rollbook_load::LoadError;
use rollbook_query::QueryError;
use rollbook_types::TableName;
use serde::Serialize;
use thiserror::Error;

/// Anything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("reload failed: {0}")]
    Reload(#[from] LoadError),

    #[error("reload task failed: {0}")]
    Task(String),
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<TableName>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Query(QueryError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            ApiError::Query(_) | ApiError::Reload(_) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Query(QueryError::MissingDependency { missing }) => ErrorResponse {
                error: "Required tables not loaded".to_string(),
                missing: Some(missing.clone()),
                details: None,
            },
            ApiError::Query(QueryError::InvalidArgument(message)) => ErrorResponse {
                error: "Invalid argument".to_string(),
                missing: None,
                details: Some(message.clone()),
            },
            other => ErrorResponse {
                error: other.to_string(),
                missing: None,
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_body() {
        let err = ApiError::from(QueryError::MissingDependency {
            missing: vec![TableName::Attendance, TableName::Students],
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": "Required tables not loaded",
                "missing": ["fact_attendance", "dim_students"],
            })
        );
    }

    #[test]
    fn test_invalid_argument_is_bad_request() {
        let err = ApiError::from(QueryError::InvalidArgument(
            "per_page must be at least 1".to_string(),
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
