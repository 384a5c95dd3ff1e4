#![deny(unsafe_code)]

//! Assignment coordination across the whole patient-record set.
//!
//! Every mutating operation here follows the same discipline against the
//! non-transactional store: take a fresh snapshot, apply the state
//! machine to an in-memory copy, and write back with the snapshot's
//! revision as a compare-and-set. A writer holding a stale snapshot loses
//! the write and re-reads; the losing side of a claim race observes the
//! winner's stamp and reports `AlreadyClaimed` instead of clobbering it.
//! Snapshots are never trusted beyond the one operation they were read
//! for.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use clinic_model::{
    CoordinatorOptions, DuplicatePidPolicy, PatientRecord, Pid, SessionContext,
};
use clinic_store::{
    RecordStore, TableId, TableSnapshot, decode_patients, encode_patient, patch_patient_row,
};

use crate::clock::{Clock, SystemClock};
use crate::machine::{self, ClaimOutcome, CompleteOutcome};
use crate::resolver::NameResolver;
use crate::{FlowError, Result};

/// Pull-on-demand view of the work queue for one station. The caller
/// decides refresh cadence; nothing here polls.
#[derive(Debug, Clone)]
pub struct WorkQueueSnapshot {
    /// Records this station may claim or resume, in offer order.
    pub claimable: Vec<PatientRecord>,
    /// Rows the adapter quarantined on the last read. Non-zero means the
    /// shared sheet needs attention.
    pub quarantined_rows: usize,
}

pub struct AssignmentCoordinator<S, R, C = SystemClock> {
    store: S,
    resolver: R,
    options: CoordinatorOptions,
    clock: C,
}

impl<S: RecordStore, R: NameResolver> AssignmentCoordinator<S, R> {
    pub fn new(store: S, resolver: R, options: CoordinatorOptions) -> Self {
        Self::with_clock(store, resolver, options, SystemClock)
    }
}

impl<S: RecordStore, R: NameResolver, C: Clock> AssignmentCoordinator<S, R, C> {
    pub fn with_clock(store: S, resolver: R, options: CoordinatorOptions, clock: C) -> Self {
        Self {
            store,
            resolver,
            options,
            clock,
        }
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Register a new PID.
    ///
    /// The name is resolved first; any resolver failure aborts the
    /// registration and nothing is written. Under the `Reject` duplicate
    /// policy an existing record for the PID fails the registration; under
    /// `Surface` the duplicate is appended and flagged in listings.
    ///
    /// The `Reject` check is read-then-append and appends carry no
    /// revision guard, so two registrations racing on the same PID can
    /// both land; the extra instance then surfaces in listings like any
    /// other duplicate.
    pub fn register(&self, ctx: &SessionContext, pid: Pid, priority: bool) -> Result<PatientRecord> {
        let name = self
            .resolver
            .resolve(&pid)
            .map_err(|source| FlowError::NameUnresolved {
                pid: pid.clone(),
                source,
            })?;

        let snapshot = self.store.read_all(TableId::Patients)?;
        let decoded = decode_patients(&snapshot)?;
        let existing = decoded
            .records
            .iter()
            .filter(|(_, record)| record.pid == pid)
            .count();
        if existing > 0 {
            match self.options.duplicate_policy {
                DuplicatePidPolicy::Reject => {
                    return Err(FlowError::DuplicatePid { pid });
                }
                DuplicatePidPolicy::Surface => {
                    warn!(%pid, instances = existing + 1, "duplicate PID registered");
                }
            }
        }

        let record = PatientRecord::registered(
            pid,
            name,
            self.clock.now(),
            ctx.staff_id.clone(),
            priority,
        );
        self.store
            .append_rows(TableId::Patients, vec![encode_patient(&record)])?;
        info!(pid = %record.pid, staff = %ctx.staff_id, "registered");
        Ok(record)
    }

    /// Records offered to this station, in claim-eligibility order:
    /// anything still `Registered`, plus records already claimed by this
    /// staff member (so a station can resume its own work), never
    /// completed records. Priority and duplicate-PID records come first,
    /// then ascending received-at.
    pub fn list_claimable(&self, ctx: &SessionContext) -> Result<Vec<PatientRecord>> {
        Ok(self.claimable_view(ctx)?.claimable)
    }

    /// On-demand snapshot of the queue plus adapter health.
    pub fn snapshot(&self, ctx: &SessionContext) -> Result<WorkQueueSnapshot> {
        self.claimable_view(ctx)
    }

    fn claimable_view(&self, ctx: &SessionContext) -> Result<WorkQueueSnapshot> {
        let snapshot = self.store.read_all(TableId::Patients)?;
        let decoded = decode_patients(&snapshot)?;
        let duplicates = duplicate_pids(&decoded.records);

        let mut visible: Vec<(usize, &PatientRecord)> = decoded
            .records
            .iter()
            .map(|(row_index, record)| (*row_index, record))
            .filter(|(_, record)| !record.draw_completed)
            .filter(|(_, record)| {
                record.drawn_at.is_none() || record.drawn_by.as_ref() == Some(&ctx.staff_id)
            })
            .collect();

        // Non-privileged stations see one instance of a duplicated PID:
        // the earliest.
        if !self.options.privileged_stations.contains(&ctx.station) {
            let mut earliest: BTreeMap<&Pid, (usize, &PatientRecord)> = BTreeMap::new();
            for &(row_index, record) in &visible {
                earliest
                    .entry(&record.pid)
                    .and_modify(|kept| {
                        if (record.received_at, row_index) < (kept.1.received_at, kept.0) {
                            *kept = (row_index, record);
                        }
                    })
                    .or_insert((row_index, record));
            }
            visible.retain(|&(row_index, record)| {
                !duplicates.contains_key(&record.pid)
                    || earliest.get(&record.pid).map(|kept| kept.0) == Some(row_index)
            });
        }

        visible.sort_by(|(_, a), (_, b)| {
            let a_front = a.priority || duplicates.contains_key(&a.pid);
            let b_front = b.priority || duplicates.contains_key(&b.pid);
            b_front
                .cmp(&a_front)
                .then_with(|| a.received_at.cmp(&b.received_at))
                .then_with(|| a.pid.cmp(&b.pid))
        });

        debug!(
            station = %ctx.station,
            claimable = visible.len(),
            quarantined = decoded.quarantined.len(),
            "work queue snapshot"
        );
        Ok(WorkQueueSnapshot {
            claimable: visible.into_iter().map(|(_, record)| record.clone()).collect(),
            quarantined_rows: decoded.quarantined.len(),
        })
    }

    /// Claim a PID for this station.
    ///
    /// Compare-and-set against a fresh read: the claim stamps draw time,
    /// staff, and station together, and a concurrent writer forces a
    /// re-read rather than a lost update. Claiming a record this staff
    /// member already holds returns it unchanged.
    pub fn claim(&self, ctx: &SessionContext, pid: &Pid) -> Result<PatientRecord> {
        let attempts = self.options.max_claim_attempts;
        for attempt in 1..=attempts {
            let snapshot = self.store.read_all(TableId::Patients)?;
            let (row_index, mut record) = self.claim_target(&snapshot, ctx, pid)?;

            let outcome = machine::claim(&mut record, &ctx.staff_id, ctx.station, self.clock.now())?;
            if outcome == ClaimOutcome::AlreadyOurs {
                debug!(%pid, staff = %ctx.staff_id, "claim retry detected as already ours");
                return Ok(record);
            }

            match self.write_row(&snapshot, row_index, &record) {
                Ok(()) => {
                    info!(%pid, staff = %ctx.staff_id, station = %ctx.station, "claimed");
                    return Ok(record);
                }
                Err(FlowError::Store(err)) if err.is_retryable() => {
                    warn!(%pid, attempt, "claim lost a write race; re-reading");
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
        Err(FlowError::ClaimContention {
            pid: pid.clone(),
            attempts,
        })
    }

    /// Mark the draw for a PID as completed.
    pub fn complete_draw(&self, ctx: &SessionContext, pid: &Pid) -> Result<PatientRecord> {
        let attempts = self.options.max_claim_attempts;
        for attempt in 1..=attempts {
            let snapshot = self.store.read_all(TableId::Patients)?;
            let (row_index, mut record) = self.complete_target(&snapshot, ctx, pid)?;

            if machine::complete(&mut record)? == CompleteOutcome::AlreadyDone {
                return Ok(record);
            }

            match self.write_row(&snapshot, row_index, &record) {
                Ok(()) => {
                    info!(%pid, staff = %ctx.staff_id, "draw completed");
                    return Ok(record);
                }
                Err(FlowError::Store(err)) if err.is_retryable() => {
                    warn!(%pid, attempt, "completion lost a write race; re-reading");
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
        Err(FlowError::ClaimContention {
            pid: pid.clone(),
            attempts,
        })
    }

    /// Pick the row a claim should target: a row this staff member
    /// already holds wins (retry detection), otherwise the earliest
    /// unclaimed row; otherwise the PID is fully held by others.
    fn claim_target(
        &self,
        snapshot: &TableSnapshot,
        ctx: &SessionContext,
        pid: &Pid,
    ) -> Result<(usize, PatientRecord)> {
        let decoded = decode_patients(snapshot)?;
        let mut instances: Vec<(usize, PatientRecord)> = decoded
            .records
            .into_iter()
            .filter(|(_, record)| &record.pid == pid)
            .collect();
        if instances.is_empty() {
            return Err(FlowError::UnknownPid { pid: pid.clone() });
        }
        instances.sort_by(|(_, a), (_, b)| a.received_at.cmp(&b.received_at));

        if let Some(own) = instances
            .iter()
            .find(|(_, record)| record.drawn_by.as_ref() == Some(&ctx.staff_id))
            .cloned()
        {
            return Ok(own);
        }
        if let Some(open) = instances
            .iter()
            .find(|(_, record)| record.drawn_at.is_none())
            .cloned()
        {
            return Ok(open);
        }
        // Every instance is held by others; return the earliest so the
        // state machine reports the conflict.
        Ok(instances.remove(0))
    }

    /// Pick the row a completion should target: a row claimed by this
    /// staff member first, otherwise the earliest claimed row.
    fn complete_target(
        &self,
        snapshot: &TableSnapshot,
        ctx: &SessionContext,
        pid: &Pid,
    ) -> Result<(usize, PatientRecord)> {
        let decoded = decode_patients(snapshot)?;
        let mut instances: Vec<(usize, PatientRecord)> = decoded
            .records
            .into_iter()
            .filter(|(_, record)| &record.pid == pid)
            .collect();
        if instances.is_empty() {
            return Err(FlowError::UnknownPid { pid: pid.clone() });
        }
        instances.sort_by(|(_, a), (_, b)| a.received_at.cmp(&b.received_at));

        if let Some(own) = instances
            .iter()
            .find(|(_, record)| record.drawn_by.as_ref() == Some(&ctx.staff_id))
            .cloned()
        {
            return Ok(own);
        }
        if let Some(claimed) = instances
            .iter()
            .find(|(_, record)| record.drawn_at.is_some())
            .cloned()
        {
            return Ok(claimed);
        }
        Ok(instances.remove(0))
    }

    /// Write one mutated row back, preserving every other row (including
    /// quarantined ones) verbatim. Fails with a retryable store error if
    /// the table moved since `snapshot` was read.
    fn write_row(
        &self,
        snapshot: &TableSnapshot,
        row_index: usize,
        record: &PatientRecord,
    ) -> Result<()> {
        let mut rows = snapshot.rows.clone();
        let patched = patch_patient_row(&snapshot.columns, &rows[row_index], record);
        rows[row_index] = patched;
        self.store
            .overwrite_all(
                TableId::Patients,
                snapshot.columns.clone(),
                rows,
                &snapshot.revision,
            )
            .map(|_| ())
            .map_err(FlowError::from)
    }
}

/// PIDs appearing more than once, with their instance counts.
fn duplicate_pids(records: &[(usize, PatientRecord)]) -> BTreeMap<Pid, usize> {
    let mut counts: BTreeMap<Pid, usize> = BTreeMap::new();
    for (_, record) in records {
        *counts.entry(record.pid.clone()).or_default() += 1;
    }
    counts.retain(|_, count| *count > 1);
    counts
}
