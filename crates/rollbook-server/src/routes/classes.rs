//! Class endpoints.

use axum::{
    Json,
    extract::{Query, State},
};
use rollbook_query::{ClassQuery, ClassRow, Page};

use crate::error::ApiError;
use crate::state::AppState;

/// Filtered, paginated class listing.
///
/// GET /classes?search=&grade_level=&class_id=&page=&per_page=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<Json<Page<ClassRow>>, ApiError> {
    let page = state.current().list_classes(&query)?;
    tracing::info!(
        search = ?query.search,
        total = page.pagination.total,
        page = page.pagination.page,
        "classes listed"
    );
    Ok(Json(page))
}
