#![deny(unsafe_code)]

//! Pure transition functions for the patient record lifecycle.
//!
//! `Registered → Claimed → Completed`, no skips, no reversals. These
//! functions mutate an in-memory copy only; the coordinator decides
//! whether the result is persisted, so a failed write never leaves a
//! half-applied transition behind.

use chrono::NaiveDateTime;

use clinic_model::{PatientRecord, StaffId, StationId};

use crate::{FlowError, Result};

/// Result of applying a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim was applied to this copy and needs to be persisted.
    Applied,
    /// The record was already claimed by the same staff member; nothing
    /// changed and nothing needs to be written.
    AlreadyOurs,
}

/// Result of applying a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
    Applied,
    /// Already completed; retrying is a no-op, not an error.
    AlreadyDone,
}

/// `Registered → Claimed`: stamp draw time, staff, and station together,
/// exactly once. The station stamp is never overwritten afterwards.
///
/// Claiming a record held by a different staff member fails with
/// [`FlowError::AlreadyClaimed`]; re-claiming one's own record (a retry
/// after a timeout, a page reload) is idempotent success.
pub fn claim(
    record: &mut PatientRecord,
    staff_id: &StaffId,
    station: StationId,
    at: NaiveDateTime,
) -> Result<ClaimOutcome> {
    match &record.drawn_by {
        Some(holder) if holder != staff_id => Err(FlowError::AlreadyClaimed {
            pid: record.pid.clone(),
            holder: holder.clone(),
        }),
        Some(_) => Ok(ClaimOutcome::AlreadyOurs),
        None => {
            record.drawn_at = Some(at);
            record.drawn_by = Some(staff_id.clone());
            record.station = Some(station);
            Ok(ClaimOutcome::Applied)
        }
    }
}

/// `Claimed → Completed`: terminal flag, set exactly once.
pub fn complete(record: &mut PatientRecord) -> Result<CompleteOutcome> {
    if record.drawn_at.is_none() {
        return Err(FlowError::NotClaimed {
            pid: record.pid.clone(),
        });
    }
    if record.draw_completed {
        return Ok(CompleteOutcome::AlreadyDone);
    }
    record.draw_completed = true;
    Ok(CompleteOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_model::{DrawState, Pid, parse_timestamp};

    fn staff(id: &str) -> StaffId {
        StaffId::new(id).expect("staff id")
    }

    fn registered() -> PatientRecord {
        PatientRecord::registered(
            Pid::new("P001").expect("pid"),
            "Nguyen Van A",
            parse_timestamp("2026-01-05 08:00:00").expect("ts"),
            staff("NV01"),
            false,
        )
    }

    #[test]
    fn claim_stamps_all_three_fields() {
        let mut record = registered();
        let at = parse_timestamp("2026-01-05 08:30:00").expect("ts");
        let outcome = claim(&mut record, &staff("NV02"), StationId::Desk(1), at).expect("claim");
        assert_eq!(outcome, ClaimOutcome::Applied);
        assert_eq!(record.drawn_at, Some(at));
        assert_eq!(record.drawn_by, Some(staff("NV02")));
        assert_eq!(record.station, Some(StationId::Desk(1)));
        assert_eq!(record.state(), DrawState::Claimed);
        record.validate().expect("valid after claim");
    }

    #[test]
    fn claim_by_other_staff_fails() {
        let mut record = registered();
        let at = parse_timestamp("2026-01-05 08:30:00").expect("ts");
        claim(&mut record, &staff("NV02"), StationId::Desk(1), at).expect("claim");

        let err = claim(&mut record, &staff("NV03"), StationId::Desk(2), at)
            .expect_err("second claim must fail");
        assert!(matches!(err, FlowError::AlreadyClaimed { .. }));
        // Loser must not disturb the winner's stamps.
        assert_eq!(record.drawn_by, Some(staff("NV02")));
        assert_eq!(record.station, Some(StationId::Desk(1)));
    }

    #[test]
    fn reclaim_by_same_staff_is_idempotent() {
        let mut record = registered();
        let first = parse_timestamp("2026-01-05 08:30:00").expect("ts");
        claim(&mut record, &staff("NV02"), StationId::Desk(1), first).expect("claim");

        let later = parse_timestamp("2026-01-05 08:45:00").expect("ts");
        let outcome =
            claim(&mut record, &staff("NV02"), StationId::Desk(2), later).expect("reclaim");
        assert_eq!(outcome, ClaimOutcome::AlreadyOurs);
        // Original stamps survive, including the station.
        assert_eq!(record.drawn_at, Some(first));
        assert_eq!(record.station, Some(StationId::Desk(1)));
    }

    #[test]
    fn complete_requires_a_claim() {
        let mut record = registered();
        let err = complete(&mut record).expect_err("complete without claim");
        assert!(matches!(err, FlowError::NotClaimed { .. }));
        assert!(!record.draw_completed);
    }

    #[test]
    fn complete_is_idempotent() {
        let mut record = registered();
        let at = parse_timestamp("2026-01-05 08:30:00").expect("ts");
        claim(&mut record, &staff("NV02"), StationId::Desk(1), at).expect("claim");

        assert_eq!(complete(&mut record).expect("complete"), CompleteOutcome::Applied);
        assert_eq!(
            complete(&mut record).expect("re-complete"),
            CompleteOutcome::AlreadyDone
        );
        assert_eq!(record.state(), DrawState::Completed);
    }
}
