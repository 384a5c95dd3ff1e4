#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::StaffId;

/// Read-only staff reference data returned by the credential store.
///
/// Passwords stay inside the credential-store collaborator; they are
/// deliberately not part of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffCredential {
    pub username: String,
    pub staff_id: StaffId,
    pub display_name: String,
}
