#![deny(unsafe_code)]

//! CSV-file store backend.
//!
//! One CSV file per table under a base directory, read with a flexible
//! reader so short rows (missing trailing cells) come back padded-on-read
//! as empty strings. Revisions are content hashes of the file bytes;
//! overwrites go through a temp file plus rename, and writers on the same
//! handle are serialized so the revision check and the rename cannot
//! interleave on a single host.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use crate::hash::sha256_hex;
use crate::schema::TableSchema;
use crate::store::{RecordStore, Revision, TableId, TableSnapshot};
use crate::{Result, StoreError};

/// File-backed tabular store.
#[derive(Debug, Clone)]
pub struct CsvSheetStore {
    base_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CsvSheetStore {
    /// Open (or initialize) a store at the given directory.
    ///
    /// The directory is created if absent, and missing table files are
    /// seeded with their schema header.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| StoreError::io(&base_dir, e))?;
        let store = Self {
            base_dir,
            write_lock: Arc::new(Mutex::new(())),
        };
        for table in [TableId::Patients, TableId::Sessions] {
            let path = store.table_path(table);
            if !path.exists() {
                let schema = TableSchema::for_table(table);
                write_csv(&path, &schema.header(), &[])?;
            }
        }
        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn table_path(&self, table: TableId) -> PathBuf {
        self.base_dir.join(format!("{table}.csv"))
    }

    fn read_bytes(&self, table: TableId) -> Result<Vec<u8>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Err(StoreError::MissingTable { table });
        }
        fs::read(&path).map_err(|e| StoreError::io(&path, e))
    }
}

fn csv_bytes(columns: &[String], rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    writer
        .write_record(columns)
        .map_err(|e| csv_error("<buffer>", &e))?;
    for row in rows {
        writer.write_record(row).map_err(|e| csv_error("<buffer>", &e))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv_error("<buffer>", &e))
}

fn csv_error(path: impl Into<PathBuf>, err: &dyn std::fmt::Display) -> StoreError {
    StoreError::Csv {
        path: path.into(),
        message: err.to_string(),
    }
}

fn write_csv(path: &Path, columns: &[String], rows: &[Vec<String>]) -> Result<()> {
    let bytes = csv_bytes(columns, rows)?;
    let tmp = path.with_extension(format!(
        "csv.tmp-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));
    fs::write(&tmp, &bytes).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn parse_csv(path: &Path, bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = reader.records();
    let columns = match records.next() {
        Some(record) => record
            .map_err(|e| csv_error(path, &e))?
            .iter()
            .map(|cell| cell.trim().trim_matches('\u{feff}').to_string())
            .collect(),
        None => Vec::new(),
    };
    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| csv_error(path, &e))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok((columns, rows))
}

impl RecordStore for CsvSheetStore {
    fn read_all(&self, table: TableId) -> Result<TableSnapshot> {
        let bytes = self.read_bytes(table)?;
        let revision = Revision::new(sha256_hex(&bytes));
        let (columns, rows) = parse_csv(&self.table_path(table), &bytes)?;
        debug!(%table, rows = rows.len(), "read_all");
        Ok(TableSnapshot {
            revision,
            columns,
            rows,
        })
    }

    fn append_rows(&self, table: TableId, rows: Vec<Vec<String>>) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| {
            StoreError::io(self.table_path(table), std::io::Error::other("write lock poisoned"))
        })?;
        let bytes = self.read_bytes(table)?;
        let path = self.table_path(table);
        let (columns, mut existing) = parse_csv(&path, &bytes)?;
        debug!(%table, appended = rows.len(), "append_rows");
        existing.extend(rows);
        write_csv(&path, &columns, &existing)
    }

    fn overwrite_all(
        &self,
        table: TableId,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        expected: &Revision,
    ) -> Result<Revision> {
        let _guard = self.write_lock.lock().map_err(|_| {
            StoreError::io(self.table_path(table), std::io::Error::other("write lock poisoned"))
        })?;
        let current = Revision::new(sha256_hex(&self.read_bytes(table)?));
        if &current != expected {
            debug!(%table, "revision mismatch");
            return Err(StoreError::RevisionMismatch { table });
        }
        let path = self.table_path(table);
        write_csv(&path, &columns, &rows)?;
        let new_bytes = self.read_bytes(table)?;
        debug!(%table, rows = rows.len(), "overwrite_all");
        Ok(Revision::new(sha256_hex(&new_bytes)))
    }
}
