//! Row store: the five typed tables as loaded.

use std::collections::BTreeMap;

use rollbook_types::{AttendanceFact, CalendarDate, Class, Semester, Student, TableName};

use crate::error::{QueryError, Result};

/// The loaded star schema.
///
/// Rows keep their load order. Nothing in the engine mutates a store once
/// it has been handed to [`crate::Snapshot::build`].
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    pub students: Vec<Student>,
    pub classes: Vec<Class>,
    pub semesters: Vec<Semester>,
    pub dates: Vec<CalendarDate>,
    pub attendance: Vec<AttendanceFact>,
}

impl RowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_students(mut self, rows: Vec<Student>) -> Self {
        self.students = rows;
        self
    }

    pub fn with_classes(mut self, rows: Vec<Class>) -> Self {
        self.classes = rows;
        self
    }

    pub fn with_semesters(mut self, rows: Vec<Semester>) -> Self {
        self.semesters = rows;
        self
    }

    pub fn with_dates(mut self, rows: Vec<CalendarDate>) -> Self {
        self.dates = rows;
        self
    }

    pub fn with_attendance(mut self, rows: Vec<AttendanceFact>) -> Self {
        self.attendance = rows;
        self
    }

    /// Returns the number of rows in a table.
    pub fn row_count(&self, table: TableName) -> usize {
        match table {
            TableName::Students => self.students.len(),
            TableName::Classes => self.classes.len(),
            TableName::Semesters => self.semesters.len(),
            TableName::Dates => self.dates.len(),
            TableName::Attendance => self.attendance.len(),
        }
    }

    /// Row counts for every table, in load order.
    pub fn row_counts(&self) -> BTreeMap<TableName, usize> {
        TableName::ALL
            .into_iter()
            .map(|t| (t, self.row_count(t)))
            .collect()
    }

    /// A table counts as loaded when it holds at least one row.
    pub fn is_loaded(&self, table: TableName) -> bool {
        self.row_count(table) > 0
    }

    /// Checks that every table in `tables` is loaded.
    ///
    /// All missing tables are reported at once, in the order requested.
    pub fn require(&self, tables: &[TableName]) -> Result<()> {
        let missing: Vec<TableName> = tables
            .iter()
            .copied()
            .filter(|t| !self.is_loaded(*t))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(QueryError::MissingDependency { missing })
        }
    }
}
