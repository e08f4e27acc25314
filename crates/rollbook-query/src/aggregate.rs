//! Aggregation engine: grouped counts, grouped averages, binning and
//! calendar grouping.
//!
//! Every operation is a single pass over one table with O(1) work per row
//! once the indexes exist. Accumulation happens in [`Groups`], which keeps
//! groups in first-seen order; the final ordering is applied by the
//! helpers in [`crate::result`].

use std::collections::HashMap;

use rollbook_types::{AttendanceFact, ForeignKey, Student};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::index::{DateParts, Indexes, KeyIndex};
use crate::resolve::{
    UNKNOWN, UNKNOWN_OR_NULL, category_or_unknown, class_label, resolve, semester_label,
    student_label,
};
use crate::result::{
    BinCount, CategoryCount, CategoryCounts, DayCount, GroupAverage, MonthCount, SemesterCount,
    WeekdayCount, order_days, order_months, order_weekdays, sort_by_count_desc, sort_by_label,
};

// ============================================================================
// Grade Bins
// ============================================================================

/// A closed integer range of grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeBin {
    pub label: &'static str,
    pub low: i64,
    pub high: i64,
}

/// The six distribution buckets, in reporting order.
///
/// Each bucket is `[low, low + 10)` except the last, which also takes 100.
pub const GRADE_BINS: [GradeBin; 6] = [
    GradeBin {
        label: "40-49",
        low: 40,
        high: 49,
    },
    GradeBin {
        label: "50-59",
        low: 50,
        high: 59,
    },
    GradeBin {
        label: "60-69",
        low: 60,
        high: 69,
    },
    GradeBin {
        label: "70-79",
        low: 70,
        high: 79,
    },
    GradeBin {
        label: "80-89",
        low: 80,
        high: 89,
    },
    GradeBin {
        label: "90-100",
        low: 90,
        high: 100,
    },
];

/// Returns the bucket index for a grade, or `None` outside `[40, 100]`.
pub fn bin_index(grade: i64) -> Option<usize> {
    GRADE_BINS
        .iter()
        .position(|bin| (bin.low..=bin.high).contains(&grade))
}

// ============================================================================
// Group State
// ============================================================================

/// Accumulators keyed by label, in first-seen order.
#[derive(Debug)]
struct Groups<S> {
    entries: Vec<(String, S)>,
    positions: HashMap<String, usize>,
}

impl<S: Default> Groups<S> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn entry(&mut self, label: &str) -> &mut S {
        let idx = match self.positions.get(label) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                self.positions.insert(label.to_string(), idx);
                self.entries.push((label.to_string(), S::default()));
                idx
            }
        };
        &mut self.entries[idx].1
    }

    fn into_entries(self) -> Vec<(String, S)> {
        self.entries
    }
}

/// Running sum and count for an average.
///
/// The sum is decimal so that no run of `i64` grades can overflow it.
#[derive(Debug, Clone, Copy, Default)]
struct AverageState {
    sum: Decimal,
    count: u64,
}

impl AverageState {
    fn update(&mut self, grade: i64) {
        self.sum = self.sum.saturating_add(Decimal::from(grade));
        self.count += 1;
    }

    fn finalize(self) -> Option<f64> {
        decimal_average(self.sum, self.count)
    }
}

/// `sum / count` rounded half-to-even to two decimals.
///
/// Computed in decimal so that exact midpoints such as `80.125` round the
/// same way on every platform. Returns `None` for an empty group.
pub fn round_average(sum: i64, count: u64) -> Option<f64> {
    decimal_average(Decimal::from(sum), count)
}

fn decimal_average(sum: Decimal, count: u64) -> Option<f64> {
    if count == 0 {
        return None;
    }
    let avg = sum / Decimal::from(count);
    let rounded = avg.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    // One correctly rounded division: the nearest f64 to the 2dp value.
    Some(rounded.mantissa() as f64 / 10_f64.powi(rounded.scale() as i32))
}

// ============================================================================
// Grouped Counts
// ============================================================================

/// Counts students per value of a categorical attribute.
fn count_students_by(
    students: &[Student],
    attribute: impl Fn(&Student) -> Option<&str>,
) -> Vec<CategoryCount> {
    let mut groups: Groups<u64> = Groups::new();
    for student in students {
        *groups.entry(category_or_unknown(attribute(student))) += 1;
    }

    groups
        .into_entries()
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect()
}

/// Students per gender, sorted by label.
pub fn count_by_gender(students: &[Student]) -> CategoryCounts {
    let mut groups = count_students_by(students, |s| s.gender.as_deref());
    sort_by_label(&mut groups, |g| g.category.as_str());
    CategoryCounts {
        total: students.len(),
        groups,
    }
}

/// Students per nationality, most common first.
pub fn count_by_nationality(students: &[Student]) -> CategoryCounts {
    let mut groups = count_students_by(students, |s| s.nationality.as_deref());
    sort_by_count_desc(&mut groups);
    CategoryCounts {
        total: students.len(),
        groups,
    }
}

// ============================================================================
// Grouped Averages
// ============================================================================

/// Average grade per resolved dimension label.
///
/// Rows need a well-formed key and an integer grade; anything else is left
/// out of both sum and count. Well-formed keys missing from the index are
/// labelled with `fallback(key)`.
fn average_grade_by(
    facts: &[AttendanceFact],
    key_of: impl Fn(&AttendanceFact) -> ForeignKey,
    index: &KeyIndex<String>,
    fallback: impl Fn(i64) -> String,
) -> Vec<GroupAverage> {
    let mut groups: Groups<AverageState> = Groups::new();

    for fact in facts {
        let Some(grade) = fact.grade else {
            continue;
        };
        let Some(label) = resolve(key_of(fact), index).label(&fallback) else {
            continue;
        };
        groups.entry(&label).update(grade);
    }

    let mut rows: Vec<GroupAverage> = groups
        .into_entries()
        .into_iter()
        .filter(|(_, state)| state.count > 0)
        .map(|(group, state)| GroupAverage {
            group,
            avg_grade: state.finalize(),
            num_records: state.count,
        })
        .collect();
    sort_by_label(&mut rows, |r| r.group.as_str());
    rows
}

/// Average grade per student gender.
pub fn average_grade_by_gender(facts: &[AttendanceFact], indexes: &Indexes) -> Vec<GroupAverage> {
    average_grade_by(
        facts,
        |f| f.student_key,
        &indexes.student_gender,
        student_label,
    )
}

/// Average grade per class name.
pub fn average_grade_by_class(facts: &[AttendanceFact], indexes: &Indexes) -> Vec<GroupAverage> {
    average_grade_by(
        facts,
        |f| f.class_key,
        &indexes.class_name,
        class_label,
    )
}

/// Average grade per semester name.
pub fn average_grade_by_semester(
    facts: &[AttendanceFact],
    indexes: &Indexes,
) -> Vec<GroupAverage> {
    average_grade_by(
        facts,
        |f| f.semester_key,
        &indexes.semester_name,
        semester_label,
    )
}

// ============================================================================
// Distribution
// ============================================================================

/// Grade counts over the six fixed buckets.
///
/// Absent grades and grades outside `[40, 100]` are dropped. All six
/// buckets are returned, in order, even when empty.
pub fn grade_distribution(facts: &[AttendanceFact]) -> Vec<BinCount> {
    let mut counts = [0u64; GRADE_BINS.len()];
    for idx in facts.iter().filter_map(|f| f.grade).filter_map(bin_index) {
        counts[idx] += 1;
    }

    GRADE_BINS
        .iter()
        .zip(counts)
        .map(|(bin, count)| BinCount {
            range: bin.label,
            count,
        })
        .collect()
}

// ============================================================================
// Calendar Grouping
// ============================================================================

fn calendar_of<'a>(fact: &AttendanceFact, indexes: &'a Indexes) -> Option<&'a DateParts> {
    resolve(fact.date_key, &indexes.calendar).found()
}

/// Attendance rows per (year, month), chronological.
///
/// Rows whose date does not resolve, or resolves to a date without a
/// valid year and month, are counted in a trailing "Unknown" entry.
pub fn attendance_by_month(facts: &[AttendanceFact], indexes: &Indexes) -> Vec<MonthCount> {
    let mut counts: HashMap<(i64, i64), u64> = HashMap::new();
    let mut unresolved = 0u64;

    for fact in facts {
        let period = calendar_of(fact, indexes).and_then(|parts| match (parts.year, parts.month) {
            (Some(year), Some(month)) if (1..=12).contains(&month) => Some((year, month)),
            _ => None,
        });
        match period {
            Some(period) => *counts.entry(period).or_default() += 1,
            None => unresolved += 1,
        }
    }

    order_months(counts.into_iter().collect(), unresolved)
}

/// Attendance rows per day of week, Monday first.
///
/// Names that are not weekdays follow the seven days in encounter order.
/// Unresolved dates and dates without a day name are counted in a trailing
/// "Unknown" entry.
pub fn attendance_by_weekday(facts: &[AttendanceFact], indexes: &Indexes) -> Vec<WeekdayCount> {
    let mut groups: Groups<u64> = Groups::new();
    let mut unresolved = 0u64;

    for fact in facts {
        match calendar_of(fact, indexes).and_then(|parts| parts.day_of_week.as_deref()) {
            Some(day) if !day.is_empty() && day != UNKNOWN => *groups.entry(day) += 1,
            _ => unresolved += 1,
        }
    }

    order_weekdays(groups.into_entries(), unresolved)
}

/// Attendance rows per calendar date, ascending.
pub fn attendance_by_day(facts: &[AttendanceFact], indexes: &Indexes) -> Vec<DayCount> {
    let mut groups: Groups<u64> = Groups::new();
    let mut unresolved = 0u64;

    for fact in facts {
        match calendar_of(fact, indexes).and_then(|parts| parts.date_value.as_deref()) {
            Some(date) if !date.is_empty() => *groups.entry(date) += 1,
            _ => unresolved += 1,
        }
    }

    order_days(groups.into_entries(), unresolved)
}

// ============================================================================
// Semester Attribution
// ============================================================================

/// Attendance rows per semester.
///
/// Null and malformed keys go to a single "Unknown/Null" counter appended
/// after the label-sorted semesters when non-zero. Well-formed keys that
/// are not in the semester table are labelled `"Semester {key}"`.
pub fn attendance_by_semester(facts: &[AttendanceFact], indexes: &Indexes) -> Vec<SemesterCount> {
    let mut groups: Groups<u64> = Groups::new();
    let mut unknown_or_null = 0u64;

    for fact in facts {
        match resolve(fact.semester_key, &indexes.semester_name)
            .label(semester_label)
        {
            Some(label) => *groups.entry(&label) += 1,
            None => unknown_or_null += 1,
        }
    }

    let mut rows: Vec<SemesterCount> = groups
        .into_entries()
        .into_iter()
        .map(|(semester, count)| SemesterCount { semester, count })
        .collect();
    sort_by_label(&mut rows, |r| r.semester.as_str());

    if unknown_or_null > 0 {
        rows.push(SemesterCount {
            semester: UNKNOWN_OR_NULL.to_string(),
            count: unknown_or_null,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::UNKNOWN;
    use crate::store::RowStore;
    use rollbook_types::{CalendarDate, Class, Semester};
    use test_case::test_case;

    fn fact(student_key: ForeignKey, grade: Option<i64>) -> AttendanceFact {
        AttendanceFact {
            student_key,
            grade,
            ..Default::default()
        }
    }

    fn graded(grade: i64) -> AttendanceFact {
        fact(ForeignKey::Null, Some(grade))
    }

    #[test_case(39 => None; "below range")]
    #[test_case(40 => Some(0); "lower edge")]
    #[test_case(49 => Some(0); "top of first bucket")]
    #[test_case(50 => Some(1); "second bucket edge")]
    #[test_case(89 => Some(4); "top of fifth bucket")]
    #[test_case(90 => Some(5); "last bucket edge")]
    #[test_case(100 => Some(5); "closed upper edge")]
    #[test_case(101 => None; "above range")]
    #[test_case(-5 => None; "negative")]
    fn bins(grade: i64) -> Option<usize> {
        bin_index(grade)
    }

    #[test_case(160, 2 => Some(80.0); "exact")]
    #[test_case(241, 3 => Some(80.33); "repeating decimal")]
    #[test_case(641, 8 => Some(80.12); "midpoint rounds to even down")]
    #[test_case(643, 8 => Some(80.38); "midpoint rounds to even up")]
    #[test_case(0, 0 => None; "empty group")]
    fn averages(sum: i64, count: u64) -> Option<f64> {
        round_average(sum, count)
    }

    #[test]
    fn test_extreme_grades_do_not_overflow_the_sum() {
        let store = RowStore::new().with_classes(vec![Class {
            class_key: Some(1),
            class_name: Some("A".into()),
            ..Default::default()
        }]);
        let indexes = Indexes::build(&store);
        let facts: Vec<AttendanceFact> = [i64::MAX, 1, i64::MIN, i64::MIN]
            .into_iter()
            .map(|grade| AttendanceFact {
                class_key: ForeignKey::Present(1),
                grade: Some(grade),
                ..Default::default()
            })
            .collect();

        let rows = average_grade_by_class(&facts[..2], &indexes);
        assert_eq!(rows[0].num_records, 2);
        assert_eq!(rows[0].avg_grade, Some(2_f64.powi(62)));

        let rows = average_grade_by_class(&facts[2..], &indexes);
        assert_eq!(rows[0].avg_grade, Some(-(2_f64.powi(63))));
    }

    #[test]
    fn test_gender_counts_sorted_by_label() {
        let students: Vec<Student> = [Some("M"), Some("F"), Some("M"), None]
            .into_iter()
            .map(|g| Student {
                gender: g.map(str::to_string),
                ..Default::default()
            })
            .collect();

        let counts = count_by_gender(&students);
        assert_eq!(counts.total, 4);
        assert_eq!(
            counts.groups,
            vec![
                CategoryCount {
                    category: "F".into(),
                    count: 1
                },
                CategoryCount {
                    category: "M".into(),
                    count: 2
                },
                CategoryCount {
                    category: "Unknown".into(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_nationality_counts_by_descending_count() {
        let students: Vec<Student> = ["Kenya", "Peru", "Peru", "Chile", "Kenya", "Peru"]
            .into_iter()
            .map(|n| Student {
                nationality: Some(n.to_string()),
                ..Default::default()
            })
            .collect();

        let counts = count_by_nationality(&students);
        let order: Vec<(&str, u64)> = counts
            .groups
            .iter()
            .map(|g| (g.category.as_str(), g.count))
            .collect();
        assert_eq!(order, vec![("Peru", 3), ("Kenya", 2), ("Chile", 1)]);
    }

    #[test]
    fn test_distribution_drops_out_of_range_and_keeps_all_buckets() {
        let facts = vec![
            graded(40),
            graded(59),
            graded(90),
            graded(101),
            fact(ForeignKey::Null, None),
        ];

        let dist = grade_distribution(&facts);
        let counts: Vec<(&str, u64)> = dist.iter().map(|b| (b.range, b.count)).collect();
        assert_eq!(
            counts,
            vec![
                ("40-49", 1),
                ("50-59", 1),
                ("60-69", 0),
                ("70-79", 0),
                ("80-89", 0),
                ("90-100", 1),
            ]
        );
    }

    #[test]
    fn test_average_by_gender_skips_unusable_rows() {
        let store = RowStore::new().with_students(vec![
            Student {
                student_key: Some(1),
                gender: Some("F".into()),
                ..Default::default()
            },
            Student {
                student_key: Some(2),
                gender: Some("M".into()),
                ..Default::default()
            },
        ]);
        let indexes = Indexes::build(&store);
        let facts = vec![
            fact(ForeignKey::Present(1), Some(90)),
            fact(ForeignKey::Present(1), Some(81)),
            fact(ForeignKey::Present(2), Some(70)),
            // Unknown student: falls back to "Unknown".
            fact(ForeignKey::Present(3), Some(50)),
            // No usable grade or key: excluded entirely.
            fact(ForeignKey::Present(2), None),
            fact(ForeignKey::Null, Some(100)),
            fact(ForeignKey::Malformed, Some(100)),
        ];

        let rows = average_grade_by_gender(&facts, &indexes);
        assert_eq!(
            rows,
            vec![
                GroupAverage {
                    group: "F".into(),
                    avg_grade: Some(85.5),
                    num_records: 2
                },
                GroupAverage {
                    group: "M".into(),
                    avg_grade: Some(70.0),
                    num_records: 1
                },
                GroupAverage {
                    group: "Unknown".into(),
                    avg_grade: Some(50.0),
                    num_records: 1
                },
            ]
        );
    }

    #[test]
    fn test_average_by_class_synthesizes_missing_class_names() {
        let store = RowStore::new().with_classes(vec![Class {
            class_key: Some(1),
            class_name: Some("Grade 2 - Section B".into()),
            ..Default::default()
        }]);
        let indexes = Indexes::build(&store);
        let facts = vec![
            AttendanceFact {
                class_key: ForeignKey::Present(1),
                grade: Some(60),
                ..Default::default()
            },
            AttendanceFact {
                class_key: ForeignKey::Present(12),
                grade: Some(75),
                ..Default::default()
            },
        ];

        let groups: Vec<String> = average_grade_by_class(&facts, &indexes)
            .into_iter()
            .map(|r| r.group)
            .collect();
        assert_eq!(groups, vec!["Class 12", "Grade 2 - Section B"]);
    }

    #[test]
    fn test_semester_attribution_with_null_sentinel() {
        let store = RowStore::new().with_semesters(vec![Semester {
            semester_key: Some(1),
            semester_name: Some("Spring".into()),
            ..Default::default()
        }]);
        let indexes = Indexes::build(&store);
        let facts: Vec<AttendanceFact> = ["1", "", "\\N", "1"]
            .into_iter()
            .map(|raw| AttendanceFact {
                semester_key: ForeignKey::parse(raw),
                ..Default::default()
            })
            .collect();

        assert_eq!(
            attendance_by_semester(&facts, &indexes),
            vec![
                SemesterCount {
                    semester: "Spring".into(),
                    count: 2
                },
                SemesterCount {
                    semester: "Unknown/Null".into(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn test_semester_attribution_labels_unknown_keys() {
        let indexes = Indexes::default();
        let facts = vec![
            AttendanceFact {
                semester_key: ForeignKey::Present(4),
                ..Default::default()
            },
            AttendanceFact {
                semester_key: ForeignKey::Malformed,
                ..Default::default()
            },
        ];

        let rows = attendance_by_semester(&facts, &indexes);
        assert_eq!(rows[0].semester, "Semester 4");
        assert_eq!(rows[1].semester, UNKNOWN_OR_NULL);
        assert_eq!(rows.len(), 2);
    }

    fn calendar_store() -> RowStore {
        let date = |key: i64, value: &str, month: i64, dow: &str| CalendarDate {
            date_key: Some(key),
            date_value: Some(value.to_string()),
            year: Some(2024),
            month: Some(month),
            day: Some(1),
            day_of_week: Some(dow.to_string()),
        };
        RowStore::new().with_dates(vec![
            date(1, "2024-03-01", 3, "Friday"),
            date(2, "2024-01-01", 1, "Monday"),
            date(3, "2024-03-04", 3, "Monday"),
        ])
    }

    fn on(date_key: ForeignKey) -> AttendanceFact {
        AttendanceFact {
            date_key,
            ..Default::default()
        }
    }

    #[test]
    fn test_month_trend_with_unknown_dates() {
        let indexes = Indexes::build(&calendar_store());
        let facts = vec![
            on(ForeignKey::Present(1)),
            on(ForeignKey::Present(3)),
            on(ForeignKey::Present(2)),
            on(ForeignKey::Present(99)),
            on(ForeignKey::Null),
        ];

        let rows = attendance_by_month(&facts, &indexes);
        let shape: Vec<(&str, u64)> = rows
            .iter()
            .map(|r| (r.month_name.as_str(), r.count))
            .collect();
        assert_eq!(shape, vec![("Jan", 1), ("Mar", 2), (UNKNOWN, 2)]);
    }

    #[test]
    fn test_weekday_trend_monday_first() {
        let indexes = Indexes::build(&calendar_store());
        let facts = vec![
            on(ForeignKey::Present(1)),
            on(ForeignKey::Malformed),
            on(ForeignKey::Present(2)),
            on(ForeignKey::Present(3)),
        ];

        let rows = attendance_by_weekday(&facts, &indexes);
        let shape: Vec<(&str, u64)> = rows
            .iter()
            .map(|r| (r.day_of_week.as_str(), r.count))
            .collect();
        assert_eq!(shape, vec![("Monday", 2), ("Friday", 1), (UNKNOWN, 1)]);
    }

    #[test]
    fn test_weekday_unknown_trails_unrecognised_names() {
        let mut store = calendar_store();
        store.dates.push(CalendarDate {
            date_key: Some(4),
            day_of_week: Some("Funday".into()),
            ..Default::default()
        });
        let indexes = Indexes::build(&store);
        let facts = vec![
            on(ForeignKey::Null),
            on(ForeignKey::Present(4)),
            on(ForeignKey::Present(2)),
            on(ForeignKey::Present(99)),
        ];

        let rows = attendance_by_weekday(&facts, &indexes);
        let shape: Vec<(&str, u64)> = rows
            .iter()
            .map(|r| (r.day_of_week.as_str(), r.count))
            .collect();
        assert_eq!(shape, vec![("Monday", 1), ("Funday", 1), (UNKNOWN, 2)]);
    }

    #[test]
    fn test_daily_trend_sorted_by_date() {
        let indexes = Indexes::build(&calendar_store());
        let facts = vec![
            on(ForeignKey::Present(3)),
            on(ForeignKey::Present(1)),
            on(ForeignKey::Present(3)),
            on(ForeignKey::Present(2)),
        ];

        let rows = attendance_by_day(&facts, &indexes);
        let shape: Vec<(&str, u64)> = rows.iter().map(|r| (r.date.as_str(), r.count)).collect();
        assert_eq!(
            shape,
            vec![("2024-01-01", 1), ("2024-03-01", 1), ("2024-03-04", 2)]
        );
    }
}
