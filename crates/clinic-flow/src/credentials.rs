#![deny(unsafe_code)]

//! Credential lookup contract.
//!
//! The staff directory is external reference data. Lookups are
//! exact-match, but both inputs are trimmed first: the directory is
//! maintained by hand and stray whitespace around usernames is routine.

use clinic_model::StaffCredential;
use tracing::debug;

use crate::{FlowError, Result};

/// Transport failure talking to the credential store.
#[derive(Debug, thiserror::Error)]
#[error("credential store unavailable: {0}")]
pub struct CredentialError(pub String);

/// External staff directory.
pub trait CredentialStore: Send + Sync {
    /// Exact-match lookup. `None` means no matching staff entry; errors
    /// are reserved for the store itself being unreachable.
    fn lookup(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<Option<StaffCredential>, CredentialError>;
}

/// Trim both inputs, look the user up, and map a miss to
/// [`FlowError::InvalidCredentials`].
pub fn authenticate(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<StaffCredential> {
    let username = username.trim();
    let password = password.trim();
    match store.lookup(username, password)? {
        Some(credential) => {
            debug!(username, staff_id = %credential.staff_id, "login");
            Ok(credential)
        }
        None => Err(FlowError::InvalidCredentials),
    }
}

/// Fixed credential table, for tests and offline embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentials {
    entries: Vec<(String, String, StaffCredential)>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        credential: StaffCredential,
    ) -> Self {
        self.entries
            .push((username.into().trim().to_string(), password.into().trim().to_string(), credential));
        self
    }
}

impl CredentialStore for MemoryCredentials {
    fn lookup(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<Option<StaffCredential>, CredentialError> {
        Ok(self
            .entries
            .iter()
            .find(|(u, p, _)| u == username && p == password)
            .map(|(_, _, credential)| credential.clone()))
    }
}
