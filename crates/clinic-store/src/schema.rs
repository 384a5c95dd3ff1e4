#![deny(unsafe_code)]

//! Fixed table schemas, validated at the adapter boundary.
//!
//! The original sheets inferred headers at runtime and padded whatever
//! they found; here each table has a fixed required-column set. Headers
//! missing a required column are rejected, and rows that fail typed
//! decoding are quarantined with a reason instead of being silently
//! padded.

use crate::store::{TableId, TableSnapshot};
use crate::{Result, StoreError};

pub const PID: &str = "pid";
pub const PATIENT_NAME: &str = "patientName";
pub const RECEIVED_AT: &str = "receivedAt";
pub const REGISTERED_BY: &str = "registeredBy";
pub const DRAWN_AT: &str = "drawnAt";
pub const DRAWN_BY: &str = "drawnBy";
pub const STATION: &str = "station";
pub const DRAW_COMPLETED: &str = "drawCompleted";
pub const PRIORITY: &str = "priority";

pub const SESSION_STATION: &str = "station";
pub const SESSION_STAFF_NAME: &str = "staffName";
pub const SESSION_STAFF_ID: &str = "staffId";
pub const SESSION_LOGIN_AT: &str = "loginAt";
pub const SESSION_LOGOUT_AT: &str = "logoutAt";

pub const PATIENT_COLUMNS: &[&str] = &[
    PID,
    PATIENT_NAME,
    RECEIVED_AT,
    REGISTERED_BY,
    DRAWN_AT,
    DRAWN_BY,
    STATION,
    DRAW_COMPLETED,
    PRIORITY,
];

pub const SESSION_COLUMNS: &[&str] = &[
    SESSION_STATION,
    SESSION_STAFF_NAME,
    SESSION_STAFF_ID,
    SESSION_LOGIN_AT,
    SESSION_LOGOUT_AT,
];

/// Required columns for a table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: TableId,
    pub columns: &'static [&'static str],
}

impl TableSchema {
    pub fn for_table(table: TableId) -> Self {
        match table {
            TableId::Patients => Self {
                table,
                columns: PATIENT_COLUMNS,
            },
            TableId::Sessions => Self {
                table,
                columns: SESSION_COLUMNS,
            },
        }
    }

    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| (*c).to_string()).collect()
    }

    /// Verify every required column is present in the snapshot header and
    /// return the index of each, in schema order. Extra columns are
    /// tolerated and preserved by writers.
    pub fn column_indices(&self, snapshot: &TableSnapshot) -> Result<Vec<usize>> {
        self.columns
            .iter()
            .map(|column| {
                snapshot
                    .column_index(column)
                    .ok_or_else(|| StoreError::MissingColumn {
                        table: self.table,
                        column: (*column).to_string(),
                    })
            })
            .collect()
    }
}

/// A row that failed typed decoding, kept aside with its position and
/// reason rather than dropped. Writers preserve quarantined rows verbatim.
#[derive(Debug, Clone)]
pub struct QuarantinedRow {
    pub row_index: usize,
    pub reason: String,
    pub cells: Vec<String>,
}
