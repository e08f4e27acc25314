//! Grade endpoints.

use axum::{Json, extract::State};
use rollbook_query::{BinCount, GroupAverage, Snapshot};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// List payload, `{"data": [...]}`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
}

/// One group average keyed by its dimension, e.g. `{"gender": "F", ...}`.
#[derive(Debug, Serialize)]
pub struct LabelledAverage {
    #[serde(flatten)]
    pub label: serde_json::Map<String, serde_json::Value>,
    pub avg_grade: Option<f64>,
    pub num_records: u64,
}

fn labelled(groups: Vec<GroupAverage>, key: &str) -> DataResponse<LabelledAverage> {
    let data = groups
        .into_iter()
        .map(|g| {
            let mut label = serde_json::Map::new();
            label.insert(key.to_string(), g.group.into());
            LabelledAverage {
                label,
                avg_grade: g.avg_grade,
                num_records: g.num_records,
            }
        })
        .collect();
    DataResponse { data }
}

fn average_by(
    state: &AppState,
    query: fn(&Snapshot) -> rollbook_query::Result<Vec<GroupAverage>>,
    key: &str,
) -> Result<Json<DataResponse<LabelledAverage>>, ApiError> {
    let groups = query(&state.current())?;
    Ok(Json(labelled(groups, key)))
}

/// Average grade per student gender.
///
/// GET /grades/by-gender
pub async fn by_gender(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<LabelledAverage>>, ApiError> {
    average_by(&state, Snapshot::average_grade_by_gender, "gender")
}

/// Average grade per class.
///
/// GET /grades/by-class
pub async fn by_class(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<LabelledAverage>>, ApiError> {
    average_by(&state, Snapshot::average_grade_by_class, "class_name")
}

/// Average grade per semester.
///
/// GET /grades/by-semester
pub async fn by_semester(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<LabelledAverage>>, ApiError> {
    average_by(&state, Snapshot::average_grade_by_semester, "semester_name")
}

/// Grade counts over the six fixed ranges.
///
/// GET /grades/distribution
pub async fn distribution(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<BinCount>>, ApiError> {
    let data = state.current().grade_distribution()?;
    Ok(Json(DataResponse { data }))
}
