//! Index builder: key-addressable lookups over the dimension tables.
//!
//! Each index maps an integer key to the handful of descriptive fields
//! the queries need. Rows whose key did not parse as an integer are never
//! inserted, so lookups against them always take the fallback path.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, warn};

use crate::resolve::{category_or_unknown, class_label, semester_label};
use crate::store::RowStore;

/// A map from integer key to a descriptive value.
#[derive(Debug, Clone)]
pub struct KeyIndex<V> {
    entries: HashMap<i64, V>,
}

impl<V> Default for KeyIndex<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> KeyIndex<V> {
    /// Builds an index in one pass over `rows`.
    ///
    /// `key` extracts the integer key (rows yielding `None` are skipped);
    /// `value` derives the indexed value from the row and its key. On a
    /// duplicate key the first row wins.
    pub fn build<'a, R: 'a>(
        name: &'static str,
        rows: impl IntoIterator<Item = &'a R>,
        key: impl Fn(&R) -> Option<i64>,
        value: impl Fn(&R, i64) -> V,
    ) -> Self {
        let mut entries = HashMap::new();
        let mut skipped = 0usize;
        let mut duplicates = 0usize;

        for row in rows {
            let Some(k) = key(row) else {
                skipped += 1;
                continue;
            };
            match entries.entry(k) {
                Entry::Vacant(slot) => {
                    slot.insert(value(row, k));
                }
                Entry::Occupied(_) => duplicates += 1,
            }
        }

        if duplicates > 0 {
            warn!(index = name, duplicates, "duplicate keys ignored");
        }
        debug!(index = name, entries = entries.len(), skipped, "index built");

        Self { entries }
    }

    /// Looks up a key.
    pub fn get(&self, key: i64) -> Option<&V> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: i64) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Calendar attributes of a `dim_date` row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateParts {
    pub date_value: Option<String>,
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,
    pub day_of_week: Option<String>,
}

/// All indexes derived from a [`RowStore`].
#[derive(Debug, Clone, Default)]
pub struct Indexes {
    /// `student_key` → gender ("Unknown" when absent).
    pub student_gender: KeyIndex<String>,
    /// `class_key` → class name (`"Class {key}"` when absent).
    pub class_name: KeyIndex<String>,
    /// `class_id` (business key) → class name, for joins from students.
    pub class_name_by_id: KeyIndex<String>,
    /// `semester_key` → semester name (`"Semester {key}"` when absent).
    pub semester_name: KeyIndex<String>,
    /// `date_key` → calendar attributes.
    pub calendar: KeyIndex<DateParts>,
}

impl Indexes {
    /// Builds every index. Empty tables produce empty indexes.
    pub fn build(store: &RowStore) -> Self {
        let student_gender = KeyIndex::build(
            "student_gender",
            &store.students,
            |s| s.student_key,
            |s, _| category_or_unknown(s.gender.as_deref()).to_string(),
        );

        let class_name = KeyIndex::build(
            "class_name",
            &store.classes,
            |c| c.class_key,
            |c, key| named_or(c.class_name.as_deref(), || class_label(key)),
        );

        let class_name_by_id = KeyIndex::build(
            "class_name_by_id",
            &store.classes,
            |c| c.class_id,
            |c, id| named_or(c.class_name.as_deref(), || class_label(id)),
        );

        let semester_name = KeyIndex::build(
            "semester_name",
            &store.semesters,
            |s| s.semester_key,
            |s, key| named_or(s.semester_name.as_deref(), || semester_label(key)),
        );

        let calendar = KeyIndex::build(
            "calendar",
            &store.dates,
            |d| d.date_key,
            |d, _| DateParts {
                date_value: d.date_value.clone(),
                year: d.year,
                month: d.month,
                day: d.day,
                day_of_week: d.day_of_week.clone(),
            },
        );

        Self {
            student_gender,
            class_name,
            class_name_by_id,
            semester_name,
            calendar,
        }
    }
}

fn named_or(name: Option<&str>, fallback: impl FnOnce() -> String) -> String {
    match name {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => fallback(),
    }
}
