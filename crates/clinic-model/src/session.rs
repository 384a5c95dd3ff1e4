#![deny(unsafe_code)]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{StaffId, StationId};

/// One login/logout entry in the shared station log.
///
/// A session with no `logout_at` is open and occupies its station. The
/// log is append-only; logout stamps the existing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSession {
    pub station: StationId,
    pub staff_id: StaffId,
    pub staff_name: String,
    pub login_at: NaiveDateTime,
    pub logout_at: Option<NaiveDateTime>,
}

impl StationSession {
    pub fn open(
        station: StationId,
        staff_id: StaffId,
        staff_name: impl Into<String>,
        login_at: NaiveDateTime,
    ) -> Self {
        Self {
            station,
            staff_id,
            staff_name: staff_name.into(),
            login_at,
            logout_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.logout_at.is_none()
    }
}

/// Explicit per-operation context for an authenticated staff session.
///
/// Carried by reference into every workflow operation; the core never
/// reads ambient or global session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub station: StationId,
}

impl SessionContext {
    pub fn new(staff_id: StaffId, staff_name: impl Into<String>, station: StationId) -> Self {
        Self {
            staff_id,
            staff_name: staff_name.into(),
            station,
        }
    }
}
