pub mod clock;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod lease;
pub mod machine;
pub mod resolver;

pub use clock::{Clock, FixedClock, SystemClock};
pub use coordinator::{AssignmentCoordinator, WorkQueueSnapshot};
pub use credentials::{CredentialError, CredentialStore, MemoryCredentials, authenticate};
pub use error::{FlowError, Result};
pub use lease::StationLeaseManager;
pub use machine::{ClaimOutcome, CompleteOutcome};
pub use resolver::{NameResolver, ResolverError, StaticResolver};
