//! Query command - run one operation against freshly loaded exports.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use rollbook_query::{ClassQuery, Snapshot, StudentQuery};
use serde::Serialize;

use super::{load_config, load_snapshot};

/// The fixed query set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryOp {
    StudentsByGender,
    StudentsByNationality,
    GradesByGender,
    GradesByClass,
    GradesBySemester,
    GradeDistribution,
    AttendanceByMonth,
    AttendanceByWeekday,
    AttendanceByDay,
    AttendanceBySemester,
    Students,
    Classes,
    Sample,
}

/// Filters and paging for the `students` and `classes` listings.
#[derive(Debug, Clone, Default, Args)]
pub struct ListingArgs {
    /// Case-insensitive search (names for students, name or id for classes).
    #[arg(long)]
    pub search: Option<String>,

    /// Exact gender (students only).
    #[arg(long)]
    pub gender: Option<String>,

    /// Exact nationality (students only).
    #[arg(long)]
    pub nationality: Option<String>,

    /// Exact class id.
    #[arg(long)]
    pub class_id: Option<i64>,

    /// Exact grade level.
    #[arg(long)]
    pub grade_level: Option<i64>,

    /// 1-based page number.
    #[arg(long)]
    pub page: Option<usize>,

    /// Rows per page.
    #[arg(long)]
    pub per_page: Option<usize>,
}

impl ListingArgs {
    fn students(&self) -> StudentQuery {
        StudentQuery {
            search: self.search.clone(),
            gender: self.gender.clone(),
            nationality: self.nationality.clone(),
            class_id: self.class_id,
            grade_level: self.grade_level,
            page: self.page,
            per_page: self.per_page,
        }
    }

    fn classes(&self) -> ClassQuery {
        ClassQuery {
            search: self.search.clone(),
            class_id: self.class_id,
            grade_level: self.grade_level,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

pub fn run(
    project: &Path,
    data_dir: Option<PathBuf>,
    op: QueryOp,
    listing: &ListingArgs,
) -> Result<()> {
    let config = load_config(project, data_dir)?;
    let snapshot = load_snapshot(&config)?;

    let output = execute(&snapshot, op, listing, config.query.sample_rows)
        .with_context(|| format!("Query {op:?} failed"))?;
    println!("{output}");
    Ok(())
}

/// Runs `op` and renders the result as pretty JSON.
pub fn execute(
    snapshot: &Snapshot,
    op: QueryOp,
    listing: &ListingArgs,
    sample_rows: usize,
) -> Result<String> {
    match op {
        QueryOp::StudentsByGender => render(&snapshot.count_by_gender()?),
        QueryOp::StudentsByNationality => render(&snapshot.count_by_nationality()?),
        QueryOp::GradesByGender => render(&snapshot.average_grade_by_gender()?),
        QueryOp::GradesByClass => render(&snapshot.average_grade_by_class()?),
        QueryOp::GradesBySemester => render(&snapshot.average_grade_by_semester()?),
        QueryOp::GradeDistribution => render(&snapshot.grade_distribution()?),
        QueryOp::AttendanceByMonth => render(&snapshot.attendance_by_month()?),
        QueryOp::AttendanceByWeekday => render(&snapshot.attendance_by_weekday()?),
        QueryOp::AttendanceByDay => render(&snapshot.attendance_by_day()?),
        QueryOp::AttendanceBySemester => render(&snapshot.attendance_by_semester()?),
        QueryOp::Students => render(&snapshot.list_students(&listing.students())?),
        QueryOp::Classes => render(&snapshot.list_classes(&listing.classes())?),
        QueryOp::Sample => render(&snapshot.sample(sample_rows)?),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
