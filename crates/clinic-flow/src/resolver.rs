#![deny(unsafe_code)]

//! Patient name resolution contract.
//!
//! The clinic's patient index is an external HTTP lookup and treated as
//! unreliable: a non-2xx status, a malformed payload, and a transport
//! failure are distinct, reportable failure kinds. Registration aborts on
//! any of them rather than substituting a placeholder name.

use std::collections::BTreeMap;

use clinic_model::Pid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    #[error("no patient found for this PID")]
    NotFound,
    #[error("patient lookup returned HTTP status {0}")]
    Status(u16),
    #[error("patient lookup returned a malformed payload: {0}")]
    Malformed(String),
    #[error("patient lookup transport failure: {0}")]
    Transport(String),
    #[error("patient lookup timed out")]
    TimedOut,
}

impl ResolverError {
    /// True when retrying the lookup later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Status(_) | Self::Transport(_) | Self::TimedOut)
    }
}

/// Resolves a PID to a patient display name.
pub trait NameResolver: Send + Sync {
    fn resolve(&self, pid: &Pid) -> Result<String, ResolverError>;
}

/// Fixed name table, for tests and offline embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    names: BTreeMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, pid: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(pid.into(), name.into());
        self
    }
}

impl NameResolver for StaticResolver {
    fn resolve(&self, pid: &Pid) -> Result<String, ResolverError> {
        self.names
            .get(pid.as_str())
            .cloned()
            .ok_or(ResolverError::NotFound)
    }
}
