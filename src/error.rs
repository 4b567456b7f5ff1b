use std::collections::TryReserveError;
use std::time::Duration;
use thiserror::Error;

/// Result of a single non-blocking step (accept, recv, read, write, list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The step completed (connection accepted, data received, end of file or listing reached).
    Ok,
    /// Nothing happened yet, call again on a later tick.
    Continue,
    Failed,
}

#[derive(Error, Debug)]
pub enum FtpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path rejected: {0}")]
    PathRejected(String),

    #[error("Path too long: {0}")]
    PathTooLong(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to allocate session buffers: {0}")]
    Alloc(#[from] TryReserveError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn server task: {0}")]
    Spawn(String),

    #[error("Server task did not finish within {0:?}")]
    StopTimeout(Duration),
}

impl FtpError {
    pub fn to_ftp_response(&self) -> (u32, &'static str) {
        match self {
            FtpError::PathRejected(_) | FtpError::PathTooLong(_) => {
                (550, "Requested action not taken (invalid path).")
            }
            FtpError::StorageUnavailable(_) => (550, "Requested action not taken (storage unavailable)."),
            FtpError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (550, "Requested action not taken (file unavailable).")
            }
            FtpError::Io(_) => (550, "Requested action not taken."),
            _ => (451, "Requested action aborted. Local error in processing."),
        }
    }
}
