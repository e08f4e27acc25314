//! Header-addressed access to CSV records.
//!
//! Columns are looked up by header name, never by position, so exports
//! may reorder or add columns freely. Cells are trimmed; an empty cell is
//! an absent value.

use std::collections::HashMap;

use csv::StringRecord;
use rollbook_types::{ForeignKey, TableName};
use tracing::debug;

/// Positions of the wanted columns within one file's header row.
#[derive(Debug, Clone)]
pub(crate) struct Columns {
    table: TableName,
    positions: HashMap<&'static str, usize>,
}

impl Columns {
    /// Maps each wanted column name to its position in `headers`.
    ///
    /// Names absent from the header row are left unmapped and read as
    /// absent on every row.
    pub(crate) fn resolve(
        table: TableName,
        headers: &StringRecord,
        wanted: &[&'static str],
    ) -> Self {
        let found: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim(), i))
            .collect();

        let positions = wanted
            .iter()
            .filter_map(|name| found.get(name).map(|&i| (*name, i)))
            .collect();

        Self { table, positions }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Wraps one record for typed reads.
    pub(crate) fn cells<'r>(&'r self, record: &'r StringRecord) -> Cells<'r> {
        Cells {
            columns: self,
            record,
            malformed: 0,
        }
    }
}

/// Typed reads over one record.
///
/// Integer cells that fail to parse are absent and counted in
/// [`Cells::malformed`].
pub struct Cells<'r> {
    columns: &'r Columns,
    record: &'r StringRecord,
    malformed: u64,
}

impl<'r> Cells<'r> {
    fn raw(&self, name: &str) -> Option<&'r str> {
        let &pos = self.columns.positions.get(name)?;
        self.record.get(pos).map(str::trim)
    }

    /// Text cell, absent when empty.
    pub fn text(&self, name: &str) -> Option<String> {
        self.raw(name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Integer cell, absent when empty or not an integer.
    pub fn int(&mut self, name: &str) -> Option<i64> {
        let raw = self.raw(name).filter(|value| !value.is_empty())?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.note_malformed(name, raw);
                None
            }
        }
    }

    /// Foreign-key cell. Empty cells and `\N` are [`ForeignKey::Null`].
    pub fn foreign_key(&mut self, name: &str) -> ForeignKey {
        let Some(raw) = self.raw(name) else {
            return ForeignKey::Null;
        };
        let key = ForeignKey::parse(raw);
        if key == ForeignKey::Malformed {
            self.note_malformed(name, raw);
        }
        key
    }

    /// Number of malformed cells read so far.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    fn note_malformed(&mut self, column: &str, value: &str) {
        self.malformed += 1;
        debug!(
            table = %self.columns.table,
            column,
            value,
            line = self.record.position().map(csv::Position::line),
            "malformed value read as absent"
        );
    }
}
