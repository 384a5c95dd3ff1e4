#![deny(unsafe_code)]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{ModelError, Pid, StaffId, StationId};

/// Lifecycle state of a patient record, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawState {
    /// Registered at intake, waiting to be claimed by a draw station.
    Registered,
    /// Claimed by a station; sample draw in progress.
    Claimed,
    /// Draw completed. Terminal.
    Completed,
}

/// One patient's journey through the draw workflow.
///
/// Records are append-only in the shared store: created at registration,
/// mutated once at claim, mutated once at completion, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub pid: Pid,
    pub patient_name: String,
    pub received_at: NaiveDateTime,
    pub registered_by: StaffId,
    pub drawn_at: Option<NaiveDateTime>,
    pub drawn_by: Option<StaffId>,
    pub station: Option<StationId>,
    pub draw_completed: bool,
    pub priority: bool,
}

impl PatientRecord {
    /// Create a freshly registered record.
    pub fn registered(
        pid: Pid,
        patient_name: impl Into<String>,
        received_at: NaiveDateTime,
        registered_by: StaffId,
        priority: bool,
    ) -> Self {
        Self {
            pid,
            patient_name: patient_name.into(),
            received_at,
            registered_by,
            drawn_at: None,
            drawn_by: None,
            station: None,
            draw_completed: false,
            priority,
        }
    }

    pub fn state(&self) -> DrawState {
        if self.draw_completed {
            DrawState::Completed
        } else if self.drawn_at.is_some() {
            DrawState::Claimed
        } else {
            DrawState::Registered
        }
    }

    /// Check the record-level invariants.
    ///
    /// `drawn_at` and `drawn_by` are set together or not at all, and a
    /// completed draw implies a prior claim.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.drawn_at.is_some() != self.drawn_by.is_some() {
            return Err(ModelError::InvariantViolation {
                pid: self.pid.to_string(),
                message: "drawn_at and drawn_by must be set together".to_string(),
            });
        }
        if self.draw_completed && self.drawn_at.is_none() {
            return Err(ModelError::InvariantViolation {
                pid: self.pid.to_string(),
                message: "draw_completed set without a claim".to_string(),
            });
        }
        Ok(())
    }
}
