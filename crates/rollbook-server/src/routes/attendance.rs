//! Attendance trend endpoints.

use axum::{Json, extract::State};
use rollbook_query::{DayCount, MonthCount, SemesterCount, WeekdayCount};

use crate::error::ApiError;
use crate::routes::grades::DataResponse;
use crate::state::AppState;

/// GET /attendance/by-month
pub async fn by_month(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<MonthCount>>, ApiError> {
    let data = state.current().attendance_by_month()?;
    Ok(Json(DataResponse { data }))
}

/// GET /attendance/by-weekday
pub async fn by_weekday(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<WeekdayCount>>, ApiError> {
    let data = state.current().attendance_by_weekday()?;
    Ok(Json(DataResponse { data }))
}

/// GET /attendance/by-day
pub async fn by_day(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<DayCount>>, ApiError> {
    let data = state.current().attendance_by_day()?;
    Ok(Json(DataResponse { data }))
}

/// GET /attendance/by-semester
pub async fn by_semester(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<SemesterCount>>, ApiError> {
    let data = state.current().attendance_by_semester()?;
    Ok(Json(DataResponse { data }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{empty_state, loaded_state};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_by_month() {
        let Json(body) = by_month(State(loaded_state())).await.unwrap();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "data": [{"year": 2024, "month": 1, "month_name": "Jan", "count": 3}],
            })
        );
    }

    #[tokio::test]
    async fn test_by_weekday_and_day() {
        let Json(weekdays) = by_weekday(State(loaded_state())).await.unwrap();
        assert_eq!(weekdays.data[0].day_of_week, "Monday");
        assert_eq!(weekdays.data[0].count, 3);

        let Json(days) = by_day(State(loaded_state())).await.unwrap();
        assert_eq!(days.data[0].date, "2024-01-08");
    }

    #[tokio::test]
    async fn test_by_semester_appends_unknown_or_null() {
        let Json(body) = by_semester(State(loaded_state())).await.unwrap();
        let rows: Vec<(&str, u64)> = body
            .data
            .iter()
            .map(|s| (s.semester.as_str(), s.count))
            .collect();
        assert_eq!(rows, vec![("Spring", 2), ("Unknown/Null", 1)]);
    }

    #[tokio::test]
    async fn test_missing_dates_is_server_error() {
        let response = by_weekday(State(empty_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
