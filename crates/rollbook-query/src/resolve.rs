//! Join resolver and fallback label policy.
//!
//! Fact rows reference dimensions through [`ForeignKey`] cells. Resolution
//! is a pure lookup; what to do with a miss is the caller's decision, made
//! through the label helpers below.

use std::borrow::Cow;

use rollbook_types::ForeignKey;

use crate::index::KeyIndex;

/// Label for a missing categorical value or an unresolved student.
pub const UNKNOWN: &str = "Unknown";

/// Label for the bucket that collects null and malformed keys.
pub const UNKNOWN_OR_NULL: &str = "Unknown/Null";

/// Outcome of resolving a foreign key against an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a, V> {
    /// The key exists in the index.
    Found(&'a V),
    /// The key is a well-formed integer that the index does not contain.
    Unresolved(i64),
    /// The cell was empty or the `\N` sentinel.
    Null,
    /// The cell was not an integer.
    Malformed,
}

/// Resolves `fk` against `index`.
pub fn resolve<V>(fk: ForeignKey, index: &KeyIndex<V>) -> Resolution<'_, V> {
    match fk {
        ForeignKey::Present(key) => index
            .get(key)
            .map_or(Resolution::Unresolved(key), Resolution::Found),
        ForeignKey::Null => Resolution::Null,
        ForeignKey::Malformed => Resolution::Malformed,
    }
}

impl<'a, V> Resolution<'a, V> {
    /// True when the key was a well-formed integer, found or not.
    pub fn is_keyed(&self) -> bool {
        matches!(self, Resolution::Found(_) | Resolution::Unresolved(_))
    }

    /// Returns the resolved value, if any.
    pub fn found(self) -> Option<&'a V> {
        match self {
            Resolution::Found(value) => Some(value),
            _ => None,
        }
    }
}

impl<'a> Resolution<'a, String> {
    /// Label for a keyed resolution.
    ///
    /// Found keys yield the indexed label, unresolved keys yield
    /// `fallback(key)`. Null and malformed keys yield `None` so the caller
    /// can skip them or count them separately.
    pub fn label(self, fallback: impl FnOnce(i64) -> String) -> Option<Cow<'a, str>> {
        match self {
            Resolution::Found(label) => Some(Cow::Borrowed(label.as_str())),
            Resolution::Unresolved(key) => Some(Cow::Owned(fallback(key))),
            Resolution::Null | Resolution::Malformed => None,
        }
    }
}

// ============================================================================
// Fallback policy
// ============================================================================

/// Categorical value or [`UNKNOWN`] when absent or empty.
pub fn category_or_unknown(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => UNKNOWN,
    }
}

/// Fallback label for an unresolved student key.
pub fn student_label(_key: i64) -> String {
    UNKNOWN.to_string()
}

/// Fallback label for an unresolved or unnamed class.
pub fn class_label(key: i64) -> String {
    format!("Class {key}")
}

/// Fallback label for an unresolved or unnamed semester.
pub fn semester_label(key: i64) -> String {
    format!("Semester {key}")
}
