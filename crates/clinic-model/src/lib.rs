pub mod credential;
pub mod error;
pub mod ids;
pub mod options;
pub mod record;
pub mod session;
pub mod time;

pub use credential::StaffCredential;
pub use error::{ModelError, Result};
pub use ids::{Pid, StaffId, StationId};
pub use options::{CoordinatorOptions, DuplicatePidPolicy};
pub use record::{DrawState, PatientRecord};
pub use session::{SessionContext, StationSession};
pub use time::{TIMESTAMP_FORMAT, format_timestamp, parse_timestamp};
