//! # rollbook-query: in-memory analytics over the attendance star schema
//!
//! This crate answers a fixed set of analytical queries against one fact
//! table (attendance records) and four dimension tables (students,
//! classes, semesters, calendar dates).
//!
//! ## Lifecycle
//!
//! A [`RowStore`] holds the loaded tables. [`Snapshot::build`] indexes it
//! once and from then on the snapshot is read-only: every query derives
//! fresh results from the same rows. A reload builds a new snapshot and
//! swaps it into a [`SnapshotHandle`]; queries already running keep the
//! snapshot they started with.
//!
//! ## Operations
//!
//! - Grouped counts: students by gender, by nationality
//! - Grouped averages: grade by gender, class, semester
//! - Distribution: grades over six fixed buckets
//! - Calendar trends: attendance by month, weekday, day, semester
//! - Listings: filtered, paginated students and classes
//!
//! Each operation first checks that the tables it reads are non-empty and
//! fails with [`QueryError::MissingDependency`] otherwise.
//!
//! ## Usage
//!
//! ```ignore
//! use rollbook_query::{RowStore, Snapshot, StudentQuery};
//!
//! let snapshot = Snapshot::build(RowStore::new().with_students(students));
//! let by_gender = snapshot.count_by_gender()?;
//! let page = snapshot.list_students(&StudentQuery {
//!     search: Some("ana".into()),
//!     ..Default::default()
//! })?;
//! ```

mod aggregate;
mod error;
mod index;
mod listing;
mod resolve;
mod result;
mod store;


use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use rollbook_types::TableName;
use tracing::debug;

// Re-export public types
pub use aggregate::{GRADE_BINS, GradeBin, bin_index, round_average};
pub use error::{QueryError, Result};
pub use index::{DateParts, Indexes, KeyIndex};
pub use listing::{
    Cell, ClassField, ClassQuery, Condition, DEFAULT_PER_PAGE, Filter, Listable, Literal,
    PageRequest, StudentField, StudentQuery,
};
pub use resolve::{Resolution, UNKNOWN, UNKNOWN_OR_NULL, resolve};
pub use result::{
    BinCount, CategoryCount, CategoryCounts, ClassRow, DayCount, GroupAverage, HealthReport,
    MonthCount, Page, Pagination, SemesterCount, StudentRow, TableSample, WeekdayCount,
    month_abbreviation, weekday_rank,
};
pub use store::RowStore;

/// An indexed, immutable view of one load.
#[derive(Debug, Clone)]
pub struct Snapshot {
    store: RowStore,
    indexes: Indexes,
    loaded_at: DateTime<Utc>,
    default_per_page: usize,
}

impl Snapshot {
    /// Indexes `store` and stamps the snapshot with the current time.
    pub fn build(store: RowStore) -> Self {
        let indexes = Indexes::build(&store);
        Self {
            store,
            indexes,
            loaded_at: Utc::now(),
            default_per_page: DEFAULT_PER_PAGE,
        }
    }

    /// A snapshot with no rows. Every query that reads a table fails.
    pub fn empty() -> Self {
        Self::build(RowStore::new())
    }

    /// Overrides the page size listings use when the caller passes none.
    ///
    /// Zero is ignored.
    #[must_use]
    pub fn with_default_per_page(mut self, per_page: usize) -> Self {
        if per_page > 0 {
            self.default_per_page = per_page;
        }
        self
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn indexes(&self) -> &Indexes {
        &self.indexes
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn default_per_page(&self) -> usize {
        self.default_per_page
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Load time and per-table row counts. Never fails.
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            loaded_at: self.loaded_at,
            tables: self.store.row_counts(),
        }
    }

    /// The first `n` rows of every table, as JSON objects.
    pub fn sample(&self, n: usize) -> Result<BTreeMap<TableName, TableSample>> {
        let mut out = BTreeMap::new();
        for table in TableName::ALL {
            let head = match table {
                TableName::Students => head_json(&self.store.students, n)?,
                TableName::Classes => head_json(&self.store.classes, n)?,
                TableName::Semesters => head_json(&self.store.semesters, n)?,
                TableName::Dates => head_json(&self.store.dates, n)?,
                TableName::Attendance => head_json(&self.store.attendance, n)?,
            };
            out.insert(
                table,
                TableSample {
                    rows: self.store.row_count(table),
                    head,
                },
            );
        }
        Ok(out)
    }

    // ========================================================================
    // Student counts
    // ========================================================================

    pub fn count_by_gender(&self) -> Result<CategoryCounts> {
        self.store.require(&[TableName::Students])?;
        debug!(op = "count_by_gender", "executing query");
        Ok(aggregate::count_by_gender(&self.store.students))
    }

    pub fn count_by_nationality(&self) -> Result<CategoryCounts> {
        self.store.require(&[TableName::Students])?;
        debug!(op = "count_by_nationality", "executing query");
        Ok(aggregate::count_by_nationality(&self.store.students))
    }

    // ========================================================================
    // Grades
    // ========================================================================

    pub fn average_grade_by_gender(&self) -> Result<Vec<GroupAverage>> {
        self.store
            .require(&[TableName::Attendance, TableName::Students])?;
        debug!(op = "average_grade_by_gender", "executing query");
        Ok(aggregate::average_grade_by_gender(
            &self.store.attendance,
            &self.indexes,
        ))
    }

    pub fn average_grade_by_class(&self) -> Result<Vec<GroupAverage>> {
        self.store
            .require(&[TableName::Attendance, TableName::Classes])?;
        debug!(op = "average_grade_by_class", "executing query");
        Ok(aggregate::average_grade_by_class(
            &self.store.attendance,
            &self.indexes,
        ))
    }

    pub fn average_grade_by_semester(&self) -> Result<Vec<GroupAverage>> {
        self.store
            .require(&[TableName::Attendance, TableName::Semesters])?;
        debug!(op = "average_grade_by_semester", "executing query");
        Ok(aggregate::average_grade_by_semester(
            &self.store.attendance,
            &self.indexes,
        ))
    }

    pub fn grade_distribution(&self) -> Result<Vec<BinCount>> {
        self.store.require(&[TableName::Attendance])?;
        debug!(op = "grade_distribution", "executing query");
        Ok(aggregate::grade_distribution(&self.store.attendance))
    }

    // ========================================================================
    // Attendance trends
    // ========================================================================

    pub fn attendance_by_month(&self) -> Result<Vec<MonthCount>> {
        self.store
            .require(&[TableName::Attendance, TableName::Dates])?;
        debug!(op = "attendance_by_month", "executing query");
        Ok(aggregate::attendance_by_month(
            &self.store.attendance,
            &self.indexes,
        ))
    }

    pub fn attendance_by_weekday(&self) -> Result<Vec<WeekdayCount>> {
        self.store
            .require(&[TableName::Attendance, TableName::Dates])?;
        debug!(op = "attendance_by_weekday", "executing query");
        Ok(aggregate::attendance_by_weekday(
            &self.store.attendance,
            &self.indexes,
        ))
    }

    pub fn attendance_by_day(&self) -> Result<Vec<DayCount>> {
        self.store
            .require(&[TableName::Attendance, TableName::Dates])?;
        debug!(op = "attendance_by_day", "executing query");
        Ok(aggregate::attendance_by_day(
            &self.store.attendance,
            &self.indexes,
        ))
    }

    pub fn attendance_by_semester(&self) -> Result<Vec<SemesterCount>> {
        self.store
            .require(&[TableName::Attendance, TableName::Semesters])?;
        debug!(op = "attendance_by_semester", "executing query");
        Ok(aggregate::attendance_by_semester(
            &self.store.attendance,
            &self.indexes,
        ))
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Students matching `query`, one page, each with its class name.
    pub fn list_students(&self, query: &StudentQuery) -> Result<Page<StudentRow>> {
        self.store.require(&[TableName::Students])?;
        let request = PageRequest::new(query.page, query.per_page, self.default_per_page)?;
        let filter = query.filter();
        debug!(
            op = "list_students",
            conditions = filter.len(),
            page = request.page,
            per_page = request.per_page,
            "executing query"
        );

        let matched = filter.apply(&self.store.students);
        Ok(request.paginate(&matched, |student| StudentRow {
            class_name: student
                .class_id
                .and_then(|id| self.indexes.class_name_by_id.get(id))
                .cloned(),
            student: (*student).clone(),
        }))
    }

    /// Classes matching `query`, one page.
    pub fn list_classes(&self, query: &ClassQuery) -> Result<Page<ClassRow>> {
        self.store.require(&[TableName::Classes])?;
        let request = PageRequest::new(query.page, query.per_page, self.default_per_page)?;
        let filter = query.filter();
        debug!(
            op = "list_classes",
            conditions = filter.len(),
            page = request.page,
            per_page = request.per_page,
            "executing query"
        );

        let matched = filter.apply(&self.store.classes);
        Ok(request.paginate(&matched, |class| (*class).clone()))
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

fn head_json<T: serde::Serialize>(rows: &[T], n: usize) -> Result<Vec<serde_json::Value>> {
    rows.iter()
        .take(n)
        .map(|row| serde_json::to_value(row).map_err(QueryError::from))
        .collect()
}

// ============================================================================
// Snapshot Handle
// ============================================================================

/// Shared slot holding the current snapshot.
///
/// Readers clone the inner `Arc` and release the lock immediately, so a
/// long query never blocks a reload and a reload never tears a query.
#[derive(Debug, Default)]
pub struct SnapshotHandle {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Returns the snapshot queries should run against.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swaps in `snapshot` and returns the one it replaced.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, Arc::new(snapshot))
    }
}
