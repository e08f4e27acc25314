//! End-to-end query scenarios over the fixture school.
//!
//! Covers every snapshot operation, broken-key attribution, dependency
//! checks and snapshot swapping.

use std::sync::Arc;

use rollbook_types::{ForeignKey, TableName};

use crate::tests::{fact, k, school, semester, student};
use crate::{
    ClassQuery, QueryError, RowStore, Snapshot, SnapshotHandle, StudentQuery, UNKNOWN,
    UNKNOWN_OR_NULL,
};

fn groups(averages: &[crate::GroupAverage]) -> Vec<(&str, Option<f64>, u64)> {
    averages
        .iter()
        .map(|g| (g.group.as_str(), g.avg_grade, g.num_records))
        .collect()
}

// ============================================================================
// Student Counts
// ============================================================================

#[test]
fn test_count_by_gender_sorted_by_label() {
    let snapshot = Snapshot::build(school());
    let counts = snapshot.count_by_gender().unwrap();

    assert_eq!(counts.total, 4);
    let got: Vec<(&str, u64)> = counts
        .groups
        .iter()
        .map(|g| (g.category.as_str(), g.count))
        .collect();
    assert_eq!(got, vec![("F", 1), ("M", 2), (UNKNOWN, 1)]);
}

#[test]
fn test_count_by_nationality_most_common_first() {
    let snapshot = Snapshot::build(school());
    let counts = snapshot.count_by_nationality().unwrap();

    let got: Vec<(&str, u64)> = counts
        .groups
        .iter()
        .map(|g| (g.category.as_str(), g.count))
        .collect();
    assert_eq!(got, vec![("Lebanon", 2), ("Brazil", 1), (UNKNOWN, 1)]);
}

// ============================================================================
// Grades
// ============================================================================

#[test]
fn test_average_by_gender_pools_unknown_students() {
    let snapshot = Snapshot::build(school());
    let averages = snapshot.average_grade_by_gender().unwrap();

    // Student 4 has no gender and student 99 does not exist: both are "Unknown".
    // The malformed student key (row 7) and the missing grade (row 5) drop out.
    assert_eq!(
        groups(&averages),
        vec![
            ("F", Some(90.0), 1),
            ("M", Some(85.67), 3),
            (UNKNOWN, Some(50.0), 2),
        ]
    );
}

#[test]
fn test_average_by_class_labels_unresolved_keys() {
    let snapshot = Snapshot::build(school());
    let averages = snapshot.average_grade_by_class().unwrap();

    assert_eq!(
        groups(&averages),
        vec![
            ("Class 30", Some(100.0), 1),
            ("Grade 1 - Section A", Some(77.67), 3),
            ("Grade 1 - Section B", Some(60.0), 2),
        ]
    );
}

#[test]
fn test_average_by_semester_skips_null_and_malformed_keys() {
    let snapshot = Snapshot::build(school());
    let averages = snapshot.average_grade_by_semester().unwrap();

    assert_eq!(
        groups(&averages),
        vec![("Fall 2023", Some(61.0), 1), ("Spring 2024", Some(86.75), 4)]
    );
}

#[test]
fn test_grade_distribution_over_fixture() {
    let snapshot = Snapshot::build(school());
    let bins: Vec<(&str, u64)> = snapshot
        .grade_distribution()
        .unwrap()
        .iter()
        .map(|b| (b.range, b.count))
        .collect();

    assert_eq!(
        bins,
        vec![
            ("40-49", 1),
            ("50-59", 0),
            ("60-69", 1),
            ("70-79", 1),
            ("80-89", 1),
            ("90-100", 2),
        ]
    );
}

// ============================================================================
// Attendance Trends
// ============================================================================

#[test]
fn test_attendance_by_month_with_unknown_tail() {
    let snapshot = Snapshot::build(school());
    let months: Vec<(Option<i64>, Option<i64>, String, u64)> = snapshot
        .attendance_by_month()
        .unwrap()
        .into_iter()
        .map(|m| (m.year, m.month, m.month_name, m.count))
        .collect();

    assert_eq!(
        months,
        vec![
            (Some(2023), Some(12), "Dec".to_string(), 2),
            (Some(2024), Some(1), "Jan".to_string(), 4),
            (None, None, UNKNOWN.to_string(), 2),
        ]
    );
}

#[test]
fn test_attendance_by_weekday_monday_first() {
    let snapshot = Snapshot::build(school());
    let days: Vec<(String, u64)> = snapshot
        .attendance_by_weekday()
        .unwrap()
        .into_iter()
        .map(|d| (d.day_of_week, d.count))
        .collect();

    assert_eq!(
        days,
        vec![
            ("Monday".to_string(), 2),
            ("Tuesday".to_string(), 2),
            ("Friday".to_string(), 2),
            (UNKNOWN.to_string(), 2),
        ]
    );
}

#[test]
fn test_attendance_by_day_ascending() {
    let snapshot = Snapshot::build(school());
    let days: Vec<(String, u64)> = snapshot
        .attendance_by_day()
        .unwrap()
        .into_iter()
        .map(|d| (d.date, d.count))
        .collect();

    assert_eq!(
        days,
        vec![
            ("2023-12-15".to_string(), 2),
            ("2024-01-08".to_string(), 2),
            ("2024-01-09".to_string(), 2),
            (UNKNOWN.to_string(), 2),
        ]
    );
}

#[test]
fn test_attendance_by_semester_appends_unknown_or_null() {
    let snapshot = Snapshot::build(school());
    let semesters: Vec<(String, u64)> = snapshot
        .attendance_by_semester()
        .unwrap()
        .into_iter()
        .map(|s| (s.semester, s.count))
        .collect();

    assert_eq!(
        semesters,
        vec![
            ("Fall 2023".to_string(), 2),
            ("Spring 2024".to_string(), 4),
            (UNKNOWN_OR_NULL.to_string(), 2),
        ]
    );
}

#[test]
fn test_semester_attribution_example() {
    let store = RowStore::new()
        .with_semesters(vec![semester(1, "Spring", "2024-01-08", "2024-05-31")])
        .with_attendance(vec![
            fact(1, k(1), k(1), k(1), k(1), Some(80)),
            fact(2, k(1), k(1), ForeignKey::Null, k(1), Some(80)),
            fact(3, k(1), k(1), ForeignKey::parse("\\N"), k(1), Some(80)),
            fact(4, k(1), k(1), k(1), k(1), Some(80)),
        ]);

    let semesters: Vec<(String, u64)> = Snapshot::build(store)
        .attendance_by_semester()
        .unwrap()
        .into_iter()
        .map(|s| (s.semester, s.count))
        .collect();
    assert_eq!(
        semesters,
        vec![
            ("Spring".to_string(), 2),
            (UNKNOWN_OR_NULL.to_string(), 2)
        ]
    );
}

// ============================================================================
// Listings
// ============================================================================

#[test]
fn test_list_students_search_and_class_join() {
    let snapshot = Snapshot::build(school());
    let page = snapshot
        .list_students(&StudentQuery {
            search: Some("AM".into()),
            ..Default::default()
        })
        .unwrap();

    let got: Vec<(Option<&str>, Option<&str>)> = page
        .data
        .iter()
        .map(|r| (r.student.first_name.as_deref(), r.class_name.as_deref()))
        .collect();
    assert_eq!(
        got,
        vec![
            (Some("Amira"), Some("Grade 1 - Section A")),
            (Some("Lucas"), Some("Grade 1 - Section B")),
        ]
    );
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.per_page, 100);
}

#[test]
fn test_list_students_unknown_class_has_no_name() {
    let snapshot = Snapshot::build(school());
    let page = snapshot
        .list_students(&StudentQuery {
            class_id: Some(999),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].student.first_name.as_deref(), Some("Sofia"));
    assert_eq!(page.data[0].class_name, None);
}

#[test]
fn test_list_students_exact_filters_and_paging() {
    let snapshot = Snapshot::build(school());
    let query = StudentQuery {
        gender: Some("M".into()),
        page: Some(2),
        per_page: Some(1),
        ..Default::default()
    };
    let page = snapshot.list_students(&query).unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].student.first_name.as_deref(), Some("Noah"));
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.total_pages, 2);

    let beyond = snapshot
        .list_students(&StudentQuery {
            page: Some(3),
            ..query
        })
        .unwrap();
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.pagination.total, 2);
}

#[test]
fn test_list_classes_by_grade_level() {
    let snapshot = Snapshot::build(school());
    let page = snapshot
        .list_classes(&ClassQuery {
            grade_level: Some(1),
            search: Some("section b".into()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].class_key, Some(20));
}

#[test]
fn test_configured_default_page_size() {
    let snapshot = Snapshot::build(school()).with_default_per_page(3);
    let page = snapshot.list_students(&StudentQuery::default()).unwrap();

    assert_eq!(page.data.len(), 3);
    assert_eq!(page.pagination.per_page, 3);
    assert_eq!(page.pagination.total_pages, 2);

    // Zero is not a usable default and is ignored.
    assert_eq!(
        Snapshot::build(school())
            .with_default_per_page(0)
            .default_per_page(),
        100
    );
}

#[test]
fn test_zero_per_page_is_invalid() {
    let snapshot = Snapshot::build(school());
    let err = snapshot
        .list_classes(&ClassQuery {
            per_page: Some(0),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
}

// ============================================================================
// Dependencies
// ============================================================================

#[test]
fn test_missing_tables_fail_without_partial_results() {
    let snapshot = Snapshot::build(RowStore::new().with_students(vec![student(
        1,
        "Amira",
        "Haddad",
        Some("F"),
        None,
        None,
    )]));

    assert!(snapshot.count_by_gender().is_ok());

    let err = snapshot.average_grade_by_gender().unwrap_err();
    assert_eq!(err.missing_tables(), Some(&[TableName::Attendance][..]));

    let err = snapshot.attendance_by_month().unwrap_err();
    assert_eq!(
        err.missing_tables(),
        Some(&[TableName::Attendance, TableName::Dates][..])
    );

    let err = snapshot.list_classes(&ClassQuery::default()).unwrap_err();
    assert_eq!(err.missing_tables(), Some(&[TableName::Classes][..]));
}

#[test]
fn test_empty_snapshot_still_reports_health_and_sample() {
    let snapshot = Snapshot::empty();

    let health = snapshot.health();
    assert_eq!(health.status, "ok");
    assert_eq!(health.tables.len(), 5);
    assert!(health.tables.values().all(|rows| *rows == 0));

    let sample = snapshot.sample(3).unwrap();
    assert_eq!(sample.len(), 5);
    assert!(sample.values().all(|s| s.head.is_empty()));
}

#[test]
fn test_sample_takes_first_rows() {
    let snapshot = Snapshot::build(school());
    let sample = snapshot.sample(2).unwrap();

    let students = &sample[&TableName::Students];
    assert_eq!(students.rows, 4);
    assert_eq!(students.head.len(), 2);
    assert_eq!(students.head[0]["first_name"], "Amira");

    let attendance = &sample[&TableName::Attendance];
    assert_eq!(attendance.rows, 8);
    assert_eq!(attendance.head[1]["grade"], 75);
}

#[test]
fn test_health_reports_row_counts() {
    let health = Snapshot::build(school()).health();
    assert_eq!(health.tables[&TableName::Students], 4);
    assert_eq!(health.tables[&TableName::Attendance], 8);

    let json = serde_json::to_value(&health).unwrap();
    assert_eq!(json["tables"]["fact_attendance"], 8);
    assert_eq!(json["tables"]["dim_date"], 3);
}

// ============================================================================
// Snapshot Handle
// ============================================================================

#[test]
fn test_reload_swaps_snapshot_without_disturbing_readers() {
    let handle = SnapshotHandle::new(Snapshot::empty());
    let before = handle.current();
    assert!(before.count_by_gender().is_err());

    let old = handle.replace(Snapshot::build(school()));
    assert!(Arc::ptr_eq(&old, &before));

    // The reader that started before the swap keeps its snapshot.
    assert!(before.count_by_gender().is_err());
    assert_eq!(handle.current().count_by_gender().unwrap().total, 4);
}

#[test]
fn test_snapshot_handle_is_shared_across_threads() {
    let handle = Arc::new(SnapshotHandle::new(Snapshot::build(school())));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let handle = Arc::clone(&handle);
            std::thread::spawn(move || handle.current().grade_distribution().unwrap())
        })
        .collect();

    let expected = handle.current().grade_distribution().unwrap();
    for worker in workers {
        assert_eq!(worker.join().unwrap(), expected);
    }
}
