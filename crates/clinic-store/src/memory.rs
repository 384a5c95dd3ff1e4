#![deny(unsafe_code)]

//! In-memory store backend.
//!
//! Stands in for the shared spreadsheet in tests and embedded use:
//! handles are cheap clones of one shared state, so several concurrent
//! "stations" observe the same tables, and every mutation bumps a
//! monotonic revision counter that the compare-and-set overwrite checks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::schema::TableSchema;
use crate::store::{RecordStore, Revision, TableId, TableSnapshot};
use crate::{Result, StoreError};

#[derive(Debug)]
struct MemTable {
    revision: u64,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Shared in-memory tabular store.
#[derive(Debug, Clone)]
pub struct MemorySheetStore {
    inner: Arc<Mutex<HashMap<TableId, MemTable>>>,
}

impl MemorySheetStore {
    /// Create a store with both tables present and empty.
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        for table in [TableId::Patients, TableId::Sessions] {
            tables.insert(
                table,
                MemTable {
                    revision: 0,
                    columns: TableSchema::for_table(table).header(),
                    rows: Vec::new(),
                },
            );
        }
        Self {
            inner: Arc::new(Mutex::new(tables)),
        }
    }
}

impl Default for MemorySheetStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_poisoned() -> StoreError {
    StoreError::io(
        "<memory>",
        std::io::Error::other("memory store lock poisoned"),
    )
}

impl RecordStore for MemorySheetStore {
    fn read_all(&self, table: TableId) -> Result<TableSnapshot> {
        let tables = self.inner.lock().map_err(|_| lock_poisoned())?;
        let mem = tables
            .get(&table)
            .ok_or(StoreError::MissingTable { table })?;
        debug!(%table, revision = mem.revision, rows = mem.rows.len(), "read_all");
        Ok(TableSnapshot {
            revision: Revision::new(mem.revision.to_string()),
            columns: mem.columns.clone(),
            rows: mem.rows.clone(),
        })
    }

    fn append_rows(&self, table: TableId, rows: Vec<Vec<String>>) -> Result<()> {
        let mut tables = self.inner.lock().map_err(|_| lock_poisoned())?;
        let mem = tables
            .get_mut(&table)
            .ok_or(StoreError::MissingTable { table })?;
        debug!(%table, appended = rows.len(), "append_rows");
        mem.rows.extend(rows);
        mem.revision += 1;
        Ok(())
    }

    fn overwrite_all(
        &self,
        table: TableId,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        expected: &Revision,
    ) -> Result<Revision> {
        let mut tables = self.inner.lock().map_err(|_| lock_poisoned())?;
        let mem = tables
            .get_mut(&table)
            .ok_or(StoreError::MissingTable { table })?;
        if mem.revision.to_string() != expected.as_str() {
            debug!(%table, current = mem.revision, expected = %expected, "revision mismatch");
            return Err(StoreError::RevisionMismatch { table });
        }
        mem.columns = columns;
        mem.rows = rows;
        mem.revision += 1;
        debug!(%table, revision = mem.revision, rows = mem.rows.len(), "overwrite_all");
        Ok(Revision::new(mem.revision.to_string()))
    }
}
