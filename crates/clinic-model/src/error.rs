use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid PID: {0:?}")]
    InvalidPid(String),
    #[error("invalid staff id: {0:?}")]
    InvalidStaffId(String),
    #[error("invalid station id: {0:?}")]
    InvalidStationId(String),
    #[error("invalid timestamp {value:?}: expected {format}")]
    InvalidTimestamp { value: String, format: &'static str },
    #[error("record {pid} violates invariant: {message}")]
    InvariantViolation { pid: String, message: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
