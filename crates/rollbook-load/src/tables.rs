//! Row mappings for the five star-schema tables.

use rollbook_types::{AttendanceFact, CalendarDate, Class, Semester, Student, TableName};

use crate::columns::Cells;

/// A row type that can be read from a CSV export.
pub trait CsvRow: Sized {
    /// Table this row type belongs to.
    const TABLE: TableName;

    /// Columns read from the file.
    const COLUMNS: &'static [&'static str];

    /// Column that must be present in the header row.
    const KEY: &'static str;

    /// Builds one row from its cells.
    fn from_cells(cells: &mut Cells<'_>) -> Self;
}

impl CsvRow for Student {
    const TABLE: TableName = TableName::Students;
    const COLUMNS: &'static [&'static str] = &[
        "student_key",
        "student_id",
        "first_name",
        "last_name",
        "gender",
        "nationality",
        "birthdate",
        "grade_level",
        "class_id",
    ];
    const KEY: &'static str = "student_key";

    fn from_cells(cells: &mut Cells<'_>) -> Self {
        Self {
            student_key: cells.int("student_key"),
            student_id: cells.int("student_id"),
            first_name: cells.text("first_name"),
            last_name: cells.text("last_name"),
            gender: cells.text("gender"),
            nationality: cells.text("nationality"),
            birthdate: cells.text("birthdate"),
            grade_level: cells.int("grade_level"),
            class_id: cells.int("class_id"),
        }
    }
}

impl CsvRow for Class {
    const TABLE: TableName = TableName::Classes;
    const COLUMNS: &'static [&'static str] = &["class_key", "class_id", "class_name", "grade_level"];
    const KEY: &'static str = "class_key";

    fn from_cells(cells: &mut Cells<'_>) -> Self {
        Self {
            class_key: cells.int("class_key"),
            class_id: cells.int("class_id"),
            class_name: cells.text("class_name"),
            grade_level: cells.int("grade_level"),
        }
    }
}

impl CsvRow for Semester {
    const TABLE: TableName = TableName::Semesters;
    const COLUMNS: &'static [&'static str] = &[
        "semester_key",
        "semester_id",
        "semester_name",
        "start_date",
        "end_date",
    ];
    const KEY: &'static str = "semester_key";

    fn from_cells(cells: &mut Cells<'_>) -> Self {
        Self {
            semester_key: cells.int("semester_key"),
            semester_id: cells.int("semester_id"),
            semester_name: cells.text("semester_name"),
            start_date: cells.text("start_date"),
            end_date: cells.text("end_date"),
        }
    }
}

impl CsvRow for CalendarDate {
    const TABLE: TableName = TableName::Dates;
    const COLUMNS: &'static [&'static str] =
        &["date_key", "date_value", "year", "month", "day", "day_of_week"];
    const KEY: &'static str = "date_key";

    fn from_cells(cells: &mut Cells<'_>) -> Self {
        Self {
            date_key: cells.int("date_key"),
            date_value: cells.text("date_value"),
            year: cells.int("year"),
            month: cells.int("month"),
            day: cells.int("day"),
            day_of_week: cells.text("day_of_week"),
        }
    }
}

impl CsvRow for AttendanceFact {
    const TABLE: TableName = TableName::Attendance;
    const COLUMNS: &'static [&'static str] = &[
        "attendance_id",
        "student_key",
        "class_key",
        "semester_key",
        "date_key",
        "grade",
    ];
    const KEY: &'static str = "attendance_id";

    fn from_cells(cells: &mut Cells<'_>) -> Self {
        Self {
            attendance_id: cells.int("attendance_id"),
            student_key: cells.foreign_key("student_key"),
            class_key: cells.foreign_key("class_key"),
            semester_key: cells.foreign_key("semester_key"),
            date_key: cells.foreign_key("date_key"),
            grade: cells.int("grade"),
        }
    }
}
