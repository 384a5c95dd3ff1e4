#![deny(unsafe_code)]

//! Station lease management over the shared session log.
//!
//! Stations are physical, exclusive resources; the lease keeps two staff
//! members from being "at" the same desk, because claims stamp the
//! claimer's station onto patient records. The backing store is not
//! transactional, so exclusion is best-effort: two acquires racing on the
//! same availability snapshot can both land, and [`StationLeaseManager::conflicts`]
//! exists to surface exactly that for reconciliation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use clinic_model::{StaffId, StationId, StationSession};
use clinic_store::{RecordStore, TableId, decode_sessions, encode_session, patch_session_row};

use crate::clock::{Clock, SystemClock};
use crate::{FlowError, Result};

const RELEASE_ATTEMPTS: u32 = 4;

pub struct StationLeaseManager<S, C = SystemClock> {
    store: S,
    stations: BTreeSet<StationId>,
    clock: C,
}

impl<S: RecordStore> StationLeaseManager<S> {
    pub fn new(store: S, stations: impl IntoIterator<Item = StationId>) -> Self {
        Self::with_clock(store, stations, SystemClock)
    }
}

impl<S: RecordStore, C: Clock> StationLeaseManager<S, C> {
    pub fn with_clock(
        store: S,
        stations: impl IntoIterator<Item = StationId>,
        clock: C,
    ) -> Self {
        Self {
            store,
            stations: stations.into_iter().collect(),
            clock,
        }
    }

    fn open_sessions(&self) -> Result<Vec<(usize, StationSession)>> {
        let snapshot = self.store.read_all(TableId::Sessions)?;
        let decoded = decode_sessions(&snapshot)?;
        Ok(decoded
            .records
            .into_iter()
            .filter(|(_, session)| session.is_open())
            .collect())
    }

    /// Configured stations with no open session.
    pub fn list_available(&self) -> Result<BTreeSet<StationId>> {
        let occupied: BTreeSet<StationId> = self
            .open_sessions()?
            .into_iter()
            .map(|(_, session)| session.station)
            .collect();
        Ok(self
            .stations
            .iter()
            .copied()
            .filter(|station| !occupied.contains(station))
            .collect())
    }

    /// Open a session at `station`, failing if one is already open there.
    ///
    /// The session table is re-read immediately before the check to keep
    /// the race window small; it cannot be eliminated on this store.
    pub fn acquire(
        &self,
        station: StationId,
        staff_id: &StaffId,
        staff_name: &str,
    ) -> Result<StationSession> {
        if !self.stations.contains(&station) {
            return Err(FlowError::UnknownStation { station });
        }
        let open = self.open_sessions()?;
        if open.iter().any(|(_, session)| session.station == station) {
            return Err(FlowError::StationOccupied { station });
        }
        let session = StationSession::open(
            station,
            staff_id.clone(),
            staff_name,
            self.clock.now(),
        );
        self.store
            .append_rows(TableId::Sessions, vec![encode_session(&session)])?;
        info!(%station, staff = %staff_id, "station acquired");
        Ok(session)
    }

    /// Stamp `logout_at` on the most recent open session for `station`
    /// held by `staff_id`. Returns `false` (a no-op) when none exists, so
    /// releasing twice is safe.
    pub fn release(&self, station: StationId, staff_id: &StaffId) -> Result<bool> {
        for _ in 0..RELEASE_ATTEMPTS {
            let snapshot = self.store.read_all(TableId::Sessions)?;
            let decoded = decode_sessions(&snapshot)?;
            let target = decoded
                .records
                .iter()
                .filter(|(_, session)| {
                    session.is_open()
                        && session.station == station
                        && &session.staff_id == staff_id
                })
                .max_by_key(|(row_index, _)| *row_index)
                .cloned();
            let Some((row_index, mut session)) = target else {
                return Ok(false);
            };
            session.logout_at = Some(self.clock.now());

            let mut rows = snapshot.rows.clone();
            let patched = patch_session_row(&snapshot.columns, &rows[row_index], &session);
            rows[row_index] = patched;
            match self.store.overwrite_all(
                TableId::Sessions,
                snapshot.columns.clone(),
                rows,
                &snapshot.revision,
            ) {
                Ok(_) => {
                    info!(%station, staff = %staff_id, "station released");
                    return Ok(true);
                }
                Err(err) if err.is_retryable() => {
                    warn!(%station, "session table moved during release; retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(FlowError::LeaseContention {
            station,
            attempts: RELEASE_ATTEMPTS,
        })
    }

    /// Stations currently holding more than one open session, which is
    /// the acquire/acquire race the store permits. Surfaced for
    /// reconciliation rather than silently ignored.
    pub fn conflicts(&self) -> Result<BTreeMap<StationId, Vec<StationSession>>> {
        let mut by_station: BTreeMap<StationId, Vec<StationSession>> = BTreeMap::new();
        for (_, session) in self.open_sessions()? {
            by_station.entry(session.station).or_default().push(session);
        }
        by_station.retain(|_, sessions| sessions.len() > 1);
        if !by_station.is_empty() {
            warn!(stations = by_station.len(), "station lease conflicts detected");
        }
        Ok(by_station)
    }
}
