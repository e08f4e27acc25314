//! Student endpoints.

use axum::{
    Json,
    extract::{Query, State},
};
use rollbook_query::{CategoryCounts, Page, StudentQuery, StudentRow};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// One labelled count, e.g. `{"gender": "F", "count": 12}`.
#[derive(Debug, Serialize)]
pub struct LabelledCount {
    #[serde(flatten)]
    pub label: serde_json::Map<String, serde_json::Value>,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct GenderCounts {
    pub total_students: usize,
    pub by_gender: Vec<LabelledCount>,
}

#[derive(Debug, Serialize)]
pub struct NationalityCounts {
    pub total_students: usize,
    pub by_nationality: Vec<LabelledCount>,
}

fn labelled(counts: CategoryCounts, key: &str) -> Vec<LabelledCount> {
    counts
        .groups
        .into_iter()
        .map(|group| {
            let mut label = serde_json::Map::new();
            label.insert(key.to_string(), group.category.into());
            LabelledCount {
                label,
                count: group.count,
            }
        })
        .collect()
}

/// Students per gender.
///
/// GET /students/count
pub async fn count_by_gender(State(state): State<AppState>) -> Result<Json<GenderCounts>, ApiError> {
    let counts = state.current().count_by_gender()?;
    Ok(Json(GenderCounts {
        total_students: counts.total,
        by_gender: labelled(counts, "gender"),
    }))
}

/// Students per nationality, most common first.
///
/// GET /students/by-nationality
pub async fn count_by_nationality(
    State(state): State<AppState>,
) -> Result<Json<NationalityCounts>, ApiError> {
    let counts = state.current().count_by_nationality()?;
    Ok(Json(NationalityCounts {
        total_students: counts.total,
        by_nationality: labelled(counts, "nationality"),
    }))
}

/// Filtered, paginated student listing.
///
/// GET /students?search=&gender=&nationality=&class_id=&grade_level=&page=&per_page=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<Page<StudentRow>>, ApiError> {
    let page = state.current().list_students(&query)?;
    tracing::info!(
        search = ?query.search,
        total = page.pagination.total,
        page = page.pagination.page,
        "students listed"
    );
    Ok(Json(page))
}
