//! Result shapes and final ordering.
//!
//! Everything in here reshapes values the aggregation and listing passes
//! already computed. Nothing is re-derived.

use std::collections::BTreeMap;

use chrono::{DateTime, Month, Utc, Weekday};
use rollbook_types::{Class, Student, TableName};
use serde::Serialize;

use crate::resolve::UNKNOWN;

/// Three-letter English month name for 1-12.
pub fn month_abbreviation(month: i64) -> Option<&'static str> {
    let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
    month.name().get(..3)
}

/// Position of a day name in a Monday-first week.
///
/// Accepts any spelling chrono parses ("Monday", "mon"); `None` otherwise.
pub fn weekday_rank(name: &str) -> Option<u32> {
    name.trim()
        .parse::<Weekday>()
        .ok()
        .map(|day| day.num_days_from_monday())
}

// ============================================================================
// Status
// ============================================================================

/// Response of the health operation.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub loaded_at: DateTime<Utc>,
    pub tables: BTreeMap<TableName, usize>,
}

/// First rows of one table, for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct TableSample {
    pub rows: usize,
    pub head: Vec<serde_json::Value>,
}

// ============================================================================
// Aggregates
// ============================================================================

/// One group of a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// A grouped count over a dimension table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    /// Row count of the dimension table.
    pub total: usize,
    pub groups: Vec<CategoryCount>,
}

/// Average grade of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub group: String,
    /// Rounded half-to-even to two decimals.
    pub avg_grade: Option<f64>,
    pub num_records: u64,
}

/// One bucket of the grade distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinCount {
    pub range: &'static str,
    pub count: u64,
}

/// Attendance rows in one calendar month.
///
/// The trailing unresolved bucket has no year or month and is named
/// [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub month_name: String,
    pub count: u64,
}

/// Attendance rows on one day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    pub day_of_week: String,
    pub count: u64,
}

/// Attendance rows on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: String,
    pub count: u64,
}

/// Attendance rows attributed to one semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemesterCount {
    pub semester: String,
    pub count: u64,
}

// ============================================================================
// Listings
// ============================================================================

/// Pagination block of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// A student with the name of the class referenced by `class_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRow {
    #[serde(flatten)]
    pub student: Student,
    pub class_name: Option<String>,
}

/// A class as listed.
pub type ClassRow = Class;

// ============================================================================
// Ordering
// ============================================================================

/// Sorts groups by label, ascending.
pub(crate) fn sort_by_label<T>(rows: &mut [T], label: impl Fn(&T) -> &str) {
    rows.sort_by(|a, b| label(a).cmp(label(b)));
}

/// Sorts groups by descending count; equal counts keep their input order.
pub(crate) fn sort_by_count_desc(rows: &mut [CategoryCount]) {
    rows.sort_by(|a, b| b.count.cmp(&a.count));
}

/// Orders weekdays Monday→Sunday, then any other names in input order,
/// and appends the unresolved bucket.
pub(crate) fn order_weekdays(counts: Vec<(String, u64)>, unresolved: u64) -> Vec<WeekdayCount> {
    let mut rows: Vec<WeekdayCount> = counts
        .into_iter()
        .map(|(day_of_week, count)| WeekdayCount { day_of_week, count })
        .collect();
    // Stable sort: names chrono can't parse share the last rank.
    rows.sort_by_key(|r| weekday_rank(&r.day_of_week).unwrap_or(7));

    if unresolved > 0 {
        rows.push(WeekdayCount {
            day_of_week: UNKNOWN.to_string(),
            count: unresolved,
        });
    }
    rows
}

/// Orders months chronologically and appends the unresolved bucket.
pub(crate) fn order_months(counts: Vec<((i64, i64), u64)>, unresolved: u64) -> Vec<MonthCount> {
    let mut counts = counts;
    counts.sort_by_key(|(period, _)| *period);

    let mut rows: Vec<MonthCount> = counts
        .into_iter()
        .map(|((year, month), count)| MonthCount {
            year: Some(year),
            month: Some(month),
            month_name: month_abbreviation(month).unwrap_or(UNKNOWN).to_string(),
            count,
        })
        .collect();

    if unresolved > 0 {
        rows.push(MonthCount {
            year: None,
            month: None,
            month_name: UNKNOWN.to_string(),
            count: unresolved,
        });
    }
    rows
}

/// Orders days by ISO date and appends the unresolved bucket.
pub(crate) fn order_days(counts: Vec<(String, u64)>, unresolved: u64) -> Vec<DayCount> {
    let mut rows: Vec<DayCount> = counts
        .into_iter()
        .map(|(date, count)| DayCount { date, count })
        .collect();
    sort_by_label(&mut rows, |r| r.date.as_str());

    if unresolved > 0 {
        rows.push(DayCount {
            date: UNKNOWN.to_string(),
            count: unresolved,
        });
    }
    rows
}
