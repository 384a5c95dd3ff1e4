#![deny(unsafe_code)]

use clinic_model::{Pid, StaffId, StationId};
use clinic_store::StoreError;

use crate::credentials::CredentialError;
use crate::resolver::ResolverError;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("station {station} is already occupied")]
    StationOccupied { station: StationId },

    #[error("station {station} is not configured for this clinic")]
    UnknownStation { station: StationId },

    #[error("record {pid} is already claimed by {holder}")]
    AlreadyClaimed { pid: Pid, holder: StaffId },

    #[error("record {pid} has not been claimed; nothing to complete")]
    NotClaimed { pid: Pid },

    #[error("PID {pid} is already registered")]
    DuplicatePid { pid: Pid },

    #[error("no record exists for PID {pid}")]
    UnknownPid { pid: Pid },

    #[error("could not resolve a name for {pid}: {source}")]
    NameUnresolved {
        pid: Pid,
        #[source]
        source: ResolverError,
    },

    #[error("gave up claiming {pid} after {attempts} contended attempts")]
    ClaimContention { pid: Pid, attempts: u32 },

    #[error("gave up updating the session log for {station} after {attempts} contended attempts")]
    LeaseContention { station: StationId, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    CredentialStore(#[from] CredentialError),
}

impl FlowError {
    /// True for transient infrastructure failures worth retrying;
    /// false for outcomes the user must react to (pick another record,
    /// pick another station, fix the input).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(source) => source.is_retryable(),
            Self::CredentialStore(_) => true,
            Self::ClaimContention { .. } => true,
            Self::LeaseContention { .. } => true,
            Self::NameUnresolved { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
