//! # rollbook-load: CSV loader for the Rollbook star schema
//!
//! Reads the five table exports (`dim_students.csv`, `dim_classes.csv`,
//! `dim_semesters.csv`, `dim_date.csv`, `fact_attendance.csv`) into a
//! [`RowStore`].
//!
//! - Columns are matched by header name.
//! - Empty cells are absent values.
//! - Integer cells that do not parse are absent and counted as malformed.
//! - Foreign-key cells become [`rollbook_types::ForeignKey`]s; `\N` is null.
//! - A missing file is a warning and yields an empty table, which queries
//!   later report as a missing dependency.
//!
//! Unreadable files, broken CSV framing and a missing key column are
//! errors: nothing is loaded from a file that cannot be trusted.

mod columns;
mod error;
mod tables;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use rollbook_query::{RowStore, Snapshot};
use rollbook_types::TableName;
use serde::Serialize;
use tracing::{info, warn};

pub use columns::Cells;
pub use error::{LoadError, Result};
pub use tables::CsvRow;

use crate::columns::Columns;

// ============================================================================
// Data Files
// ============================================================================

/// Where each table's export lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    dir: PathBuf,
    file_names: BTreeMap<TableName, String>,
}

impl DataFiles {
    /// All five tables under `dir`, with their default file names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_names: TableName::ALL
                .into_iter()
                .map(|table| (table, default_file_name(table)))
                .collect(),
        }
    }

    /// Overrides the file name of one table.
    pub fn with_file_name(mut self, table: TableName, name: impl Into<String>) -> Self {
        self.file_names.insert(table, name.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a table's export.
    pub fn path(&self, table: TableName) -> PathBuf {
        match self.file_names.get(&table) {
            Some(name) => self.dir.join(name),
            None => self.dir.join(default_file_name(table)),
        }
    }
}

/// `<table>.csv`, e.g. `dim_students.csv`.
pub fn default_file_name(table: TableName) -> String {
    format!("{table}.csv")
}

// ============================================================================
// Load Report
// ============================================================================

/// Outcome of loading one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub path: PathBuf,
    /// False when the file did not exist.
    pub found: bool,
    pub rows: usize,
    /// Cells read as absent because they did not parse.
    pub malformed: u64,
}

/// Outcome of loading all tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub tables: BTreeMap<TableName, TableReport>,
}

impl LoadReport {
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(|t| t.rows).sum()
    }

    pub fn total_malformed(&self) -> u64 {
        self.tables.values().map(|t| t.malformed).sum()
    }

    /// Tables whose file was not found.
    pub fn missing_files(&self) -> Vec<TableName> {
        self.tables
            .iter()
            .filter(|(_, t)| !t.found)
            .map(|(table, _)| *table)
            .collect()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Rows read from one table, plus the malformed-cell count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRows<T> {
    pub rows: Vec<T>,
    pub malformed: u64,
}

/// Parses one table from any reader.
///
/// `path` is only used in error messages.
pub fn parse_table<T: CsvRow, R: Read>(reader: R, path: &Path) -> Result<TableRows<T>> {
    let csv_error = |source| LoadError::CsvError {
        table: T::TABLE,
        path: path.to_path_buf(),
        source,
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(csv_error)?.clone();
    let columns = Columns::resolve(T::TABLE, &headers, T::COLUMNS);
    if !columns.contains(T::KEY) {
        return Err(LoadError::MissingColumn {
            table: T::TABLE,
            path: path.to_path_buf(),
            column: T::KEY,
        });
    }

    let mut rows = Vec::new();
    let mut malformed = 0u64;
    for record in csv_reader.records() {
        let record = record.map_err(csv_error)?;
        let mut cells = columns.cells(&record);
        rows.push(T::from_cells(&mut cells));
        malformed += cells.malformed();
    }

    Ok(TableRows { rows, malformed })
}

/// Reads one table from disk. A missing file yields `None`.
pub fn read_table<T: CsvRow>(path: &Path) -> Result<Option<TableRows<T>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LoadError::ReadError {
                table: T::TABLE,
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_table(BufReader::new(file), path).map(Some)
}

fn load_into<T: CsvRow>(files: &DataFiles, report: &mut LoadReport) -> Result<Vec<T>> {
    let path = files.path(T::TABLE);
    let (rows, found, malformed) = match read_table::<T>(&path)? {
        Some(table) => (table.rows, true, table.malformed),
        None => {
            warn!(table = %T::TABLE, path = %path.display(), "file not found, table left empty");
            (Vec::new(), false, 0)
        }
    };

    if found {
        info!(table = %T::TABLE, rows = rows.len(), malformed, "table loaded");
    }
    report.tables.insert(
        T::TABLE,
        TableReport {
            path,
            found,
            rows: rows.len(),
            malformed,
        },
    );
    Ok(rows)
}

/// Loads all five tables.
pub fn load(files: &DataFiles) -> Result<(RowStore, LoadReport)> {
    info!(dir = %files.dir().display(), "loading tables");
    let mut report = LoadReport::default();

    let store = RowStore::new()
        .with_students(load_into(files, &mut report)?)
        .with_classes(load_into(files, &mut report)?)
        .with_semesters(load_into(files, &mut report)?)
        .with_dates(load_into(files, &mut report)?)
        .with_attendance(load_into(files, &mut report)?);

    info!(
        rows = report.total_rows(),
        malformed = report.total_malformed(),
        missing = report.missing_files().len(),
        "load complete"
    );
    Ok((store, report))
}

/// Loads all five tables and indexes them.
pub fn load_snapshot(files: &DataFiles) -> Result<(Snapshot, LoadReport)> {
    let (store, report) = load(files)?;
    Ok((Snapshot::build(store), report))
}
