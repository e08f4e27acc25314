//! # rollbook-types: Core row types for `Rollbook`
//!
//! This crate contains the typed rows of the attendance star schema:
//! - Dimension rows ([`Student`], [`Class`], [`Semester`], [`CalendarDate`])
//! - The fact row ([`AttendanceFact`])
//! - Foreign key cells ([`ForeignKey`])
//! - Table identifiers ([`TableName`])
//!
//! Rows are produced once by the loader and never mutated afterwards.
//! Integer columns that failed to parse are carried as `None`; foreign
//! keys keep the distinction between a null marker and garbage input.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Literal placeholder written by database exports for "no value".
pub const NULL_SENTINEL: &str = "\\N";

// ============================================================================
// Foreign Keys
// ============================================================================

/// A foreign key cell on the fact table.
///
/// Raw exports overload a single column with integers, empty cells and the
/// `\N` sentinel. The three cases are kept apart here so resolution can
/// dispatch on them explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ForeignKey {
    /// A well-formed integer key.
    Present(i64),
    /// Empty cell or the `\N` sentinel.
    #[default]
    Null,
    /// Something that is neither an integer nor a null marker.
    Malformed,
}

impl ForeignKey {
    /// Parses a raw cell.
    ///
    /// Surrounding whitespace is ignored. Empty cells and `\N` are
    /// [`ForeignKey::Null`], anything that is not an `i64` is
    /// [`ForeignKey::Malformed`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == NULL_SENTINEL {
            return ForeignKey::Null;
        }
        trimmed
            .parse::<i64>()
            .map_or(ForeignKey::Malformed, ForeignKey::Present)
    }

    /// Returns the key if it is well-formed.
    pub fn key(self) -> Option<i64> {
        match self {
            ForeignKey::Present(key) => Some(key),
            ForeignKey::Null | ForeignKey::Malformed => None,
        }
    }

    /// Returns true for [`ForeignKey::Present`].
    pub fn is_present(self) -> bool {
        matches!(self, ForeignKey::Present(_))
    }
}

impl From<i64> for ForeignKey {
    fn from(value: i64) -> Self {
        ForeignKey::Present(value)
    }
}

impl From<Option<i64>> for ForeignKey {
    fn from(value: Option<i64>) -> Self {
        value.map_or(ForeignKey::Null, ForeignKey::Present)
    }
}

impl Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForeignKey::Present(key) => write!(f, "{key}"),
            ForeignKey::Null => f.write_str(NULL_SENTINEL),
            ForeignKey::Malformed => f.write_str("<malformed>"),
        }
    }
}

// Serialized as a plain JSON number or null; malformed keys carry no value.
impl Serialize for ForeignKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.key().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ForeignKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<i64>::deserialize(deserializer).map(ForeignKey::from)
    }
}

// ============================================================================
// Table Names
// ============================================================================

/// The five tables of the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableName {
    #[serde(rename = "dim_students")]
    Students,
    #[serde(rename = "dim_classes")]
    Classes,
    #[serde(rename = "dim_semesters")]
    Semesters,
    #[serde(rename = "dim_date")]
    Dates,
    #[serde(rename = "fact_attendance")]
    Attendance,
}

impl TableName {
    /// All tables in load order.
    pub const ALL: [TableName; 5] = [
        TableName::Students,
        TableName::Classes,
        TableName::Semesters,
        TableName::Dates,
        TableName::Attendance,
    ];

    /// Canonical table name as used in exports and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Students => "dim_students",
            TableName::Classes => "dim_classes",
            TableName::Semesters => "dim_semesters",
            TableName::Dates => "dim_date",
            TableName::Attendance => "fact_attendance",
        }
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTable(pub String);

impl Display for UnknownTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown table: {}", self.0)
    }
}

impl std::error::Error for UnknownTable {}

impl FromStr for TableName {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}

// ============================================================================
// Dimension Rows
// ============================================================================

/// A row of `dim_students`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_key: Option<i64>,
    pub student_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub birthdate: Option<String>,
    pub grade_level: Option<i64>,
    /// References [`Class::class_id`] (business key, not surrogate).
    pub class_id: Option<i64>,
}

/// A row of `dim_classes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub class_key: Option<i64>,
    pub class_id: Option<i64>,
    pub class_name: Option<String>,
    pub grade_level: Option<i64>,
}

/// A row of `dim_semesters`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub semester_key: Option<i64>,
    pub semester_id: Option<i64>,
    pub semester_name: Option<String>,
    /// ISO date, string-comparable.
    pub start_date: Option<String>,
    /// ISO date, string-comparable.
    pub end_date: Option<String>,
}

/// A row of `dim_date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
    pub date_key: Option<i64>,
    /// ISO date (`YYYY-MM-DD`).
    pub date_value: Option<String>,
    pub year: Option<i64>,
    /// 1-12.
    pub month: Option<i64>,
    pub day: Option<i64>,
    /// Day name, e.g. `Monday`.
    pub day_of_week: Option<String>,
}

// ============================================================================
// Fact Rows
// ============================================================================

/// A row of `fact_attendance`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceFact {
    pub attendance_id: Option<i64>,
    pub student_key: ForeignKey,
    pub class_key: ForeignKey,
    pub semester_key: ForeignKey,
    pub date_key: ForeignKey,
    /// Expected in 0-100; absent when the cell was empty or not an integer.
    pub grade: Option<i64>,
}
