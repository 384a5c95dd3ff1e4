//! Configuration options for the assignment workflow.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::StationId;

/// Policy for a PID that is registered more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePidPolicy {
    /// Reject the second registration outright.
    Reject,
    /// Accept the registration and surface every instance to privileged
    /// stations; non-privileged stations see only the earliest.
    #[default]
    Surface,
}

/// Options controlling assignment coordinator behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorOptions {
    /// How duplicate PID registrations are handled.
    pub duplicate_policy: DuplicatePidPolicy,

    /// Stations that see all records, including every instance of a
    /// duplicated PID.
    pub privileged_stations: BTreeSet<StationId>,

    /// Upper bound on optimistic-concurrency retries for a single claim
    /// or completion before giving up with a retryable error.
    pub max_claim_attempts: u32,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePidPolicy::default(),
            privileged_stations: BTreeSet::from([StationId::Intake]),
            max_claim_attempts: 4,
        }
    }
}

impl CoordinatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePidPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_privileged_stations(
        mut self,
        stations: impl IntoIterator<Item = StationId>,
    ) -> Self {
        self.privileged_stations = stations.into_iter().collect();
        self
    }

    pub fn with_max_claim_attempts(mut self, attempts: u32) -> Self {
        self.max_claim_attempts = attempts.max(1);
        self
    }
}
