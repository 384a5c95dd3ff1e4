//! Timestamp parsing and formatting for the shared tables.

use chrono::NaiveDateTime;

use crate::ModelError;

/// Wire format used for every timestamp cell in the shared tables.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ModelError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|_| {
        ModelError::InvalidTimestamp {
            value: value.to_string(),
            format: TIMESTAMP_FORMAT,
        }
    })
}

pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}
