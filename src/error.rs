//! Error types for process enumeration
//!
//! Only snapshot and enumeration failures are hard errors. A failed path
//! query is reported inline through [`ProcessData`](crate::ProcessData) and
//! never shows up here.

use std::fmt;

/// Hard failures from a listing call or from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PsError {
    /// The kernel refused to create a process snapshot
    Snapshot { code: u32 },
    /// The first iteration step against a fresh snapshot failed
    Enumeration { code: u32 },
    /// A later iteration step failed with something other than "no more entries"
    Iteration { code: u32 },
    /// Configuration value out of range
    InvalidConfig(String),
}

impl PsError {
    /// Kernel last-error code carried by the failure, if any.
    pub fn code(&self) -> Option<u32> {
        match self {
            PsError::Snapshot { code }
            | PsError::Enumeration { code }
            | PsError::Iteration { code } => Some(*code),
            PsError::InvalidConfig(_) => None,
        }
    }
}

impl fmt::Display for PsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsError::Snapshot { code } => {
                write!(f, "Unable to create process snapshot (kernel error {})", code)
            }
            PsError::Enumeration { code } => {
                write!(f, "Error retrieving process info (kernel error {})", code)
            }
            PsError::Iteration { code } => {
                write!(f, "Process iteration aborted (kernel error {})", code)
            }
            PsError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for PsError {}

/// Result type alias for listing operations.
pub type PsResult<T> = Result<T, PsError>;
