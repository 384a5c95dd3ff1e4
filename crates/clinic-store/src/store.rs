#![deny(unsafe_code)]

//! The record store contract.
//!
//! The shared persistence layer is tabular and non-transactional: the
//! whole table is the unit of update, and there is no row-level write
//! primitive. Concurrency control is optimistic: every snapshot carries
//! an opaque revision token and `overwrite_all` is a compare-and-set
//! against it, so a writer working from a stale snapshot fails with
//! `RevisionMismatch` instead of silently clobbering concurrent changes.

use std::fmt;

use crate::Result;

/// The tables the tracker persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableId {
    /// Patient records, one row per registration.
    Patients,
    /// Station login/logout log, one row per session.
    Sessions,
}

impl TableId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Sessions => "sessions",
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque optimistic-concurrency token for a table's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A full read of one table: header, rows, and the revision they were
/// read at.
///
/// Snapshots are stale the moment they are returned; callers must re-read
/// before every mutating operation and never treat a held snapshot as
/// authoritative.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub revision: Revision,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableSnapshot {
    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value at (row, column index); missing trailing cells read as
    /// empty.
    pub fn cell<'a>(&'a self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Uniform access to the shared tabular store.
///
/// Implementations must be safe to share between concurrent station
/// sessions; all consistency guarantees flow from the revision tokens,
/// never from in-process locking visible to callers.
pub trait RecordStore: Send + Sync {
    /// Read the entire table. Returns an empty snapshot with the schema
    /// header when the table exists but has no rows.
    fn read_all(&self, table: TableId) -> Result<TableSnapshot>;

    /// Append rows to the end of the table without touching existing
    /// rows. Appends do not participate in the revision check.
    fn append_rows(&self, table: TableId, rows: Vec<Vec<String>>) -> Result<()>;

    /// Replace the entire table contents, but only if the table is still
    /// at `expected`. Returns the new revision on success.
    fn overwrite_all(
        &self,
        table: TableId,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        expected: &Revision,
    ) -> Result<Revision>;
}
