//! Query processor: filtered, paginated listings over dimension tables.
//!
//! A [`Filter`] is an AND of [`Condition`]s. A search condition is an OR
//! over two text fields with case-insensitive substring matching; an
//! equality condition compares one typed field exactly. Filtering keeps
//! the store's row order, and pagination slices the filtered rows.

use std::fmt::{Debug, Display};
use std::str::FromStr;

use rollbook_types::{Class, Student};
use serde::{Deserialize, Deserializer, de};

use crate::error::{QueryError, Result};
use crate::result::{Page, Pagination};

/// Page size used when the caller does not pass one.
pub const DEFAULT_PER_PAGE: usize = 100;

// ============================================================================
// Fields
// ============================================================================

/// A borrowed field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell<'a> {
    Int(i64),
    Text(&'a str),
}

/// An owned comparison value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Text(String),
}

/// A row type that can be listed.
pub trait Listable {
    /// Field selector for this row type.
    type Field: Copy + Debug;

    /// Fields the free-text search looks at.
    const SEARCH_FIELDS: [Self::Field; 2];

    /// Returns a field's value, `None` when absent.
    fn cell(&self, field: Self::Field) -> Option<Cell<'_>>;
}

/// Listable fields of [`Student`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentField {
    FirstName,
    LastName,
    Gender,
    Nationality,
    ClassId,
    GradeLevel,
}

impl Listable for Student {
    type Field = StudentField;

    const SEARCH_FIELDS: [StudentField; 2] = [StudentField::FirstName, StudentField::LastName];

    fn cell(&self, field: StudentField) -> Option<Cell<'_>> {
        match field {
            StudentField::FirstName => self.first_name.as_deref().map(Cell::Text),
            StudentField::LastName => self.last_name.as_deref().map(Cell::Text),
            StudentField::Gender => self.gender.as_deref().map(Cell::Text),
            StudentField::Nationality => self.nationality.as_deref().map(Cell::Text),
            StudentField::ClassId => self.class_id.map(Cell::Int),
            StudentField::GradeLevel => self.grade_level.map(Cell::Int),
        }
    }
}

/// Listable fields of [`Class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassField {
    ClassName,
    ClassId,
    GradeLevel,
}

impl Listable for Class {
    type Field = ClassField;

    const SEARCH_FIELDS: [ClassField; 2] = [ClassField::ClassName, ClassField::ClassId];

    fn cell(&self, field: ClassField) -> Option<Cell<'_>> {
        match field {
            ClassField::ClassName => self.class_name.as_deref().map(Cell::Text),
            ClassField::ClassId => self.class_id.map(Cell::Int),
            ClassField::GradeLevel => self.grade_level.map(Cell::Int),
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

/// A single predicate.
#[derive(Debug, Clone)]
pub enum Condition<F> {
    /// Case-insensitive substring match against either field.
    Search { fields: [F; 2], needle: String },
    /// Exact match on one field.
    Equals { field: F, value: Literal },
}

impl<F: Copy> Condition<F> {
    /// Evaluates this condition against a row.
    ///
    /// Absent fields read as "" for search and never satisfy an equality.
    pub fn matches<R: Listable<Field = F>>(&self, row: &R) -> bool {
        match self {
            Condition::Search { fields, needle } => fields.iter().any(|&field| {
                let haystack = match row.cell(field) {
                    Some(Cell::Text(text)) => text.to_lowercase(),
                    Some(Cell::Int(n)) => n.to_string(),
                    None => String::new(),
                };
                haystack.contains(needle.as_str())
            }),
            Condition::Equals { field, value } => match (row.cell(*field), value) {
                (Some(Cell::Int(a)), Literal::Int(b)) => a == *b,
                (Some(Cell::Text(a)), Literal::Text(b)) => a == b,
                _ => false,
            },
        }
    }
}

/// Conjunction of conditions. An empty filter matches every row.
#[derive(Debug, Clone)]
pub struct Filter<F> {
    conditions: Vec<Condition<F>>,
}

impl<F> Default for Filter<F> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }
}

impl<F: Copy> Filter<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a search over `fields`. Empty needles add nothing.
    pub fn search(mut self, fields: [F; 2], needle: &str) -> Self {
        if !needle.is_empty() {
            self.conditions.push(Condition::Search {
                fields,
                needle: needle.to_lowercase(),
            });
        }
        self
    }

    /// Adds an exact-match condition.
    pub fn equals(mut self, field: F, value: Literal) -> Self {
        self.conditions.push(Condition::Equals { field, value });
        self
    }

    /// Adds an exact-match condition when `value` is present.
    pub fn equals_opt(self, field: F, value: Option<Literal>) -> Self {
        match value {
            Some(value) => self.equals(field, value),
            None => self,
        }
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates all conditions against a row.
    pub fn matches<R: Listable<Field = F>>(&self, row: &R) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }

    /// Returns matching rows in their original order.
    pub fn apply<'a, R: Listable<Field = F>>(&self, rows: &'a [R]) -> Vec<&'a R> {
        rows.iter().filter(|row| self.matches(*row)).collect()
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number. Page 0 is accepted and is always empty.
    pub page: usize,
    /// At least 1.
    pub per_page: usize,
}

impl PageRequest {
    /// Builds a request from optional caller input.
    ///
    /// `page` defaults to 1 and `per_page` to `default_per_page`.
    pub fn new(page: Option<usize>, per_page: Option<usize>, default_per_page: usize) -> Result<Self> {
        let per_page = per_page.unwrap_or(default_per_page);
        if per_page == 0 {
            return Err(QueryError::InvalidArgument(
                "per_page must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            page: page.unwrap_or(1),
            per_page,
        })
    }

    /// Slices `rows` to this page and maps the kept rows with `f`.
    ///
    /// The slice is `[(page - 1) * per_page, page * per_page)` clipped to
    /// the input. Pages past the end are empty rather than an error.
    pub fn paginate<T, U>(&self, rows: &[T], f: impl Fn(&T) -> U) -> Page<U> {
        let total = rows.len();
        let start = self.page.saturating_sub(1).saturating_mul(self.per_page);
        let end = self.page.saturating_mul(self.per_page).min(total);

        let data = if self.page == 0 || start >= end {
            Vec::new()
        } else {
            rows[start..end].iter().map(f).collect()
        };

        Page {
            data,
            pagination: Pagination {
                page: self.page,
                per_page: self.per_page,
                total,
                total_pages: total.div_ceil(self.per_page),
            },
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Reads an optional parameter, treating an empty or blank value as absent.
///
/// Form-encoded queries send `?class_id=` for a cleared field.
fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

fn non_blank(value: Option<&String>) -> Option<Literal> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| Literal::Text(v.to_string()))
}

/// Parameters of the student listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentQuery {
    /// Matched against first and last name.
    #[serde(deserialize_with = "blank_as_none")]
    pub search: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub nationality: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub class_id: Option<i64>,
    #[serde(deserialize_with = "blank_as_none")]
    pub grade_level: Option<i64>,
    #[serde(deserialize_with = "blank_as_none")]
    pub page: Option<usize>,
    #[serde(deserialize_with = "blank_as_none")]
    pub per_page: Option<usize>,
}

impl StudentQuery {
    pub fn filter(&self) -> Filter<StudentField> {
        Filter::new()
            .search(
                Student::SEARCH_FIELDS,
                self.search.as_deref().unwrap_or_default(),
            )
            .equals_opt(StudentField::Gender, non_blank(self.gender.as_ref()))
            .equals_opt(
                StudentField::Nationality,
                non_blank(self.nationality.as_ref()),
            )
            .equals_opt(StudentField::ClassId, self.class_id.map(Literal::Int))
            .equals_opt(StudentField::GradeLevel, self.grade_level.map(Literal::Int))
    }
}

/// Parameters of the class listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClassQuery {
    /// Matched against class name and class id.
    #[serde(deserialize_with = "blank_as_none")]
    pub search: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub class_id: Option<i64>,
    #[serde(deserialize_with = "blank_as_none")]
    pub grade_level: Option<i64>,
    #[serde(deserialize_with = "blank_as_none")]
    pub page: Option<usize>,
    #[serde(deserialize_with = "blank_as_none")]
    pub per_page: Option<usize>,
}

impl ClassQuery {
    pub fn filter(&self) -> Filter<ClassField> {
        Filter::new()
            .search(
                Class::SEARCH_FIELDS,
                self.search.as_deref().unwrap_or_default(),
            )
            .equals_opt(ClassField::ClassId, self.class_id.map(Literal::Int))
            .equals_opt(ClassField::GradeLevel, self.grade_level.map(Literal::Int))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn student(first: &str, last: Option<&str>, gender: Option<&str>, class_id: Option<i64>) -> Student {
        Student {
            first_name: Some(first.to_string()),
            last_name: last.map(str::to_string),
            gender: gender.map(str::to_string),
            class_id,
            ..Default::default()
        }
    }

    fn roster() -> Vec<Student> {
        vec![
            student("Amira", Some("Haddad"), Some("F"), Some(101)),
            student("Lucas", Some("Amaral"), Some("M"), Some(102)),
            student("Noah", None, Some("M"), Some(101)),
            student("Sofia", Some("Rossi"), None, None),
        ]
    }

    fn first_names(rows: &[&Student]) -> Vec<String> {
        rows.iter()
            .map(|s| s.first_name.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_search_is_case_insensitive_or_over_both_fields() {
        let rows = roster();
        let filter = Filter::new().search(Student::SEARCH_FIELDS, "AMA");

        // "Amaral" matches on last name; "Amira" does not contain "ama".
        assert_eq!(first_names(&filter.apply(&rows)), vec!["Lucas"]);

        let filter = Filter::new().search(Student::SEARCH_FIELDS, "am");
        assert_eq!(first_names(&filter.apply(&rows)), vec!["Amira", "Lucas"]);
    }

    #[test]
    fn test_conditions_are_anded_and_order_preserved() {
        let rows = roster();
        let filter = Filter::new()
            .equals(StudentField::Gender, Literal::Text("M".into()))
            .equals(StudentField::ClassId, Literal::Int(101));

        assert_eq!(first_names(&filter.apply(&rows)), vec!["Noah"]);
    }

    #[test]
    fn test_absent_fields_never_match_equality() {
        let rows = roster();
        let by_class = Filter::new().equals(StudentField::ClassId, Literal::Int(0));
        assert!(by_class.apply(&rows).is_empty());

        let by_gender = Filter::new().equals(StudentField::Gender, Literal::Text(String::new()));
        assert!(by_gender.apply(&rows).is_empty());
    }

    #[test]
    fn test_absent_search_field_reads_as_empty() {
        let rows = roster();
        // Noah has no last name; matching still works on the first name.
        let filter = Filter::new().search(Student::SEARCH_FIELDS, "noa");
        assert_eq!(first_names(&filter.apply(&rows)), vec!["Noah"]);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let rows = roster();
        let filter: Filter<StudentField> = Filter::new().search(Student::SEARCH_FIELDS, "");
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&rows).len(), rows.len());
    }

    #[test]
    fn test_class_search_matches_numeric_id() {
        let classes = vec![
            Class {
                class_id: Some(305),
                class_name: Some("Grade 3 - Section A".into()),
                ..Default::default()
            },
            Class {
                class_id: Some(410),
                class_name: Some("Grade 4 - Section C".into()),
                ..Default::default()
            },
        ];

        let filter = ClassQuery {
            search: Some("41".into()),
            ..Default::default()
        }
        .filter();
        let hits = filter.apply(&classes);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].class_id, Some(410));
    }

    #[test]
    fn test_student_query_builds_one_condition_per_parameter() {
        let query = StudentQuery {
            search: Some("a".into()),
            gender: Some("F".into()),
            nationality: None,
            class_id: Some(101),
            grade_level: None,
            page: None,
            per_page: None,
        };
        assert_eq!(query.filter().len(), 3);
        assert!(StudentQuery::default().filter().is_empty());
    }

    #[test]
    fn test_blank_parameters_read_as_absent() {
        let query: StudentQuery = serde_json::from_value(serde_json::json!({
            "search": "",
            "gender": "",
            "nationality": " ",
            "class_id": "",
            "grade_level": "",
            "page": "",
            "per_page": "",
        }))
        .unwrap();

        assert!(query.class_id.is_none());
        assert!(query.per_page.is_none());
        assert!(query.filter().is_empty());
    }

    #[test]
    fn test_numeric_parameters_parse_from_text() {
        let query: ClassQuery = serde_json::from_value(serde_json::json!({
            "class_id": "410",
            "page": " 2 ",
        }))
        .unwrap();
        assert_eq!(query.class_id, Some(410));
        assert_eq!(query.page, Some(2));

        let err = serde_json::from_value::<ClassQuery>(serde_json::json!({ "per_page": "ten" }));
        assert!(err.is_err());
    }

    #[test]
    fn test_blank_text_filters_are_skipped() {
        let rows = roster();
        let query = StudentQuery {
            gender: Some(String::new()),
            nationality: Some("  ".into()),
            ..Default::default()
        };
        assert!(query.filter().is_empty());
        assert_eq!(query.filter().apply(&rows).len(), rows.len());
    }

    #[test_case(1, 2 => (vec![0, 1], 3); "first page")]
    #[test_case(3, 2 => (vec![4], 3); "short last page")]
    #[test_case(4, 2 => (vec![], 3); "past the end")]
    #[test_case(0, 2 => (vec![], 3); "page zero")]
    #[test_case(1, 100 => (vec![0, 1, 2, 3, 4], 1); "one big page")]
    fn pages(page: usize, per_page: usize) -> (Vec<usize>, usize) {
        let rows: Vec<usize> = (0..5).collect();
        let request = PageRequest::new(Some(page), Some(per_page), DEFAULT_PER_PAGE).unwrap();
        let out = request.paginate(&rows, |r| *r);
        assert_eq!(out.pagination.total, 5);
        (out.data, out.pagination.total_pages)
    }

    #[test]
    fn test_page_defaults_and_validation() {
        let request = PageRequest::new(None, None, DEFAULT_PER_PAGE).unwrap();
        assert_eq!(
            request,
            PageRequest {
                page: 1,
                per_page: 100
            }
        );

        assert!(matches!(
            PageRequest::new(Some(1), Some(0), DEFAULT_PER_PAGE),
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_input_has_zero_pages() {
        let rows: Vec<u8> = Vec::new();
        let out = PageRequest::new(Some(1), Some(10), DEFAULT_PER_PAGE)
            .unwrap()
            .paginate(&rows, |r| *r);
        assert!(out.data.is_empty());
        assert_eq!(out.pagination.total, 0);
        assert_eq!(out.pagination.total_pages, 0);
    }
}
