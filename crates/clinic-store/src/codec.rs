#![deny(unsafe_code)]

//! Typed row codecs for the patient and session tables.
//!
//! Cells are plain strings on the wire: timestamps use the sheet's
//! `%Y-%m-%d %H:%M:%S` format, empty means "not set", and flags encode
//! as `"true"` / empty. Decoding validates at the boundary; rows that do
//! not conform are quarantined, not patched up.

use chrono::NaiveDateTime;
use tracing::warn;

use clinic_model::{
    ModelError, PatientRecord, Pid, StaffId, StationId, StationSession, format_timestamp,
    parse_timestamp,
};

use crate::schema::{self, QuarantinedRow, TableSchema};
use crate::store::{Revision, TableId, TableSnapshot};
use crate::Result;

/// Snapshot decoded against a fixed schema: typed records keyed by their
/// original row index, plus the rows that failed to decode.
#[derive(Debug, Clone)]
pub struct DecodedTable<T> {
    pub revision: Revision,
    pub records: Vec<(usize, T)>,
    pub quarantined: Vec<QuarantinedRow>,
}

fn opt_cell(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    match value.trim() {
        "" => Ok(false),
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(format!("unrecognized flag value {other:?}")),
    }
}

fn parse_opt_timestamp(value: &str) -> std::result::Result<Option<NaiveDateTime>, ModelError> {
    opt_cell(value).map(parse_timestamp).transpose()
}

/// Decode the patients table, quarantining rows that fail.
pub fn decode_patients(snapshot: &TableSnapshot) -> Result<DecodedTable<PatientRecord>> {
    let schema = TableSchema::for_table(TableId::Patients);
    let idx = schema.column_indices(snapshot)?;
    let [pid_i, name_i, received_i, registered_i, drawn_at_i, drawn_by_i, station_i, completed_i, priority_i] =
        [idx[0], idx[1], idx[2], idx[3], idx[4], idx[5], idx[6], idx[7], idx[8]];

    let mut records = Vec::with_capacity(snapshot.rows.len());
    let mut quarantined = Vec::new();
    for (row_index, row) in snapshot.rows.iter().enumerate() {
        let result = (|| -> std::result::Result<PatientRecord, String> {
            let record = PatientRecord {
                pid: Pid::new(snapshot.cell(row, pid_i)).map_err(|e| e.to_string())?,
                patient_name: snapshot.cell(row, name_i).trim().to_string(),
                received_at: parse_timestamp(snapshot.cell(row, received_i))
                    .map_err(|e| e.to_string())?,
                registered_by: StaffId::new(snapshot.cell(row, registered_i))
                    .map_err(|e| e.to_string())?,
                drawn_at: parse_opt_timestamp(snapshot.cell(row, drawn_at_i))
                    .map_err(|e| e.to_string())?,
                drawn_by: opt_cell(snapshot.cell(row, drawn_by_i))
                    .map(StaffId::new)
                    .transpose()
                    .map_err(|e| e.to_string())?,
                station: opt_cell(snapshot.cell(row, station_i))
                    .map(StationId::parse)
                    .transpose()
                    .map_err(|e| e.to_string())?,
                draw_completed: parse_flag(snapshot.cell(row, completed_i))?,
                priority: parse_flag(snapshot.cell(row, priority_i))?,
            };
            record.validate().map_err(|e| e.to_string())?;
            Ok(record)
        })();
        match result {
            Ok(record) => records.push((row_index, record)),
            Err(reason) => {
                warn!(table = %TableId::Patients, row_index, %reason, "quarantined row");
                quarantined.push(QuarantinedRow {
                    row_index,
                    reason,
                    cells: row.clone(),
                });
            }
        }
    }
    Ok(DecodedTable {
        revision: snapshot.revision.clone(),
        records,
        quarantined,
    })
}

/// Decode the sessions table, quarantining rows that fail.
pub fn decode_sessions(snapshot: &TableSnapshot) -> Result<DecodedTable<StationSession>> {
    let schema = TableSchema::for_table(TableId::Sessions);
    let idx = schema.column_indices(snapshot)?;
    let [station_i, name_i, staff_i, login_i, logout_i] = [idx[0], idx[1], idx[2], idx[3], idx[4]];

    let mut records = Vec::with_capacity(snapshot.rows.len());
    let mut quarantined = Vec::new();
    for (row_index, row) in snapshot.rows.iter().enumerate() {
        let result = (|| -> std::result::Result<StationSession, String> {
            Ok(StationSession {
                station: StationId::parse(snapshot.cell(row, station_i))
                    .map_err(|e| e.to_string())?,
                staff_name: snapshot.cell(row, name_i).trim().to_string(),
                staff_id: StaffId::new(snapshot.cell(row, staff_i)).map_err(|e| e.to_string())?,
                login_at: parse_timestamp(snapshot.cell(row, login_i)).map_err(|e| e.to_string())?,
                logout_at: parse_opt_timestamp(snapshot.cell(row, logout_i))
                    .map_err(|e| e.to_string())?,
            })
        })();
        match result {
            Ok(session) => records.push((row_index, session)),
            Err(reason) => {
                warn!(table = %TableId::Sessions, row_index, %reason, "quarantined row");
                quarantined.push(QuarantinedRow {
                    row_index,
                    reason,
                    cells: row.clone(),
                });
            }
        }
    }
    Ok(DecodedTable {
        revision: snapshot.revision.clone(),
        records,
        quarantined,
    })
}

fn patient_cell(record: &PatientRecord, column: &str) -> Option<String> {
    match column {
        schema::PID => Some(record.pid.to_string()),
        schema::PATIENT_NAME => Some(record.patient_name.clone()),
        schema::RECEIVED_AT => Some(format_timestamp(record.received_at)),
        schema::REGISTERED_BY => Some(record.registered_by.to_string()),
        schema::DRAWN_AT => Some(record.drawn_at.map(format_timestamp).unwrap_or_default()),
        schema::DRAWN_BY => Some(
            record
                .drawn_by
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        ),
        schema::STATION => Some(
            record
                .station
                .map(|s| s.to_string())
                .unwrap_or_default(),
        ),
        schema::DRAW_COMPLETED => Some(if record.draw_completed {
            "true".to_string()
        } else {
            String::new()
        }),
        schema::PRIORITY => Some(if record.priority {
            "true".to_string()
        } else {
            String::new()
        }),
        _ => None,
    }
}

fn session_cell(session: &StationSession, column: &str) -> Option<String> {
    match column {
        schema::SESSION_STATION => Some(session.station.to_string()),
        schema::SESSION_STAFF_NAME => Some(session.staff_name.clone()),
        schema::SESSION_STAFF_ID => Some(session.staff_id.to_string()),
        schema::SESSION_LOGIN_AT => Some(format_timestamp(session.login_at)),
        schema::SESSION_LOGOUT_AT => Some(
            session
                .logout_at
                .map(format_timestamp)
                .unwrap_or_default(),
        ),
        _ => None,
    }
}

/// Encode a patient record as a fresh row in schema column order.
pub fn encode_patient(record: &PatientRecord) -> Vec<String> {
    TableSchema::for_table(TableId::Patients)
        .columns
        .iter()
        .map(|column| patient_cell(record, column).unwrap_or_default())
        .collect()
}

/// Encode a session as a fresh row in schema column order.
pub fn encode_session(session: &StationSession) -> Vec<String> {
    TableSchema::for_table(TableId::Sessions)
        .columns
        .iter()
        .map(|column| session_cell(session, column).unwrap_or_default())
        .collect()
}

/// Rewrite one existing row in place from a typed record, honoring the
/// snapshot's actual column order and leaving cells in unknown (extra)
/// columns untouched.
pub fn patch_patient_row(columns: &[String], old_row: &[String], record: &PatientRecord) -> Vec<String> {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            patient_cell(record, column)
                .unwrap_or_else(|| old_row.get(i).cloned().unwrap_or_default())
        })
        .collect()
}

/// Session-table counterpart of [`patch_patient_row`].
pub fn patch_session_row(
    columns: &[String],
    old_row: &[String],
    session: &StationSession,
) -> Vec<String> {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            session_cell(session, column)
                .unwrap_or_else(|| old_row.get(i).cloned().unwrap_or_default())
        })
        .collect()
}
