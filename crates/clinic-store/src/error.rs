#![deny(unsafe_code)]

use std::path::PathBuf;

use crate::store::TableId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read table file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("table {table} is missing required column {column:?}")]
    MissingColumn { table: TableId, column: String },

    #[error("table {table} does not exist in the store")]
    MissingTable { table: TableId },

    #[error("table {table} changed since it was read; re-read and retry")]
    RevisionMismatch { table: TableId },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the failure is transient and the operation may be retried
    /// after a fresh read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::RevisionMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
