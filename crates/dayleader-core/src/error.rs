use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Failure kinds surfaced to callers. None of them are retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Precondition,
    NotEligible,
    AlreadyAssigned,
    CapReached,
    BackupNotNeeded,
    UnsupportedPolicy,
    Storage,
}

#[derive(Error, Debug)]
pub enum AssignmentError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("Already assigned: {0}")]
    AlreadyAssigned(String),

    #[error("Leadership cap reached: {0}")]
    CapReached(String),

    #[error("Backup not needed: {0}")]
    BackupNotNeeded(String),

    #[error("Unsupported assignment policy: {0}")]
    UnsupportedPolicy(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl AssignmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssignmentError::Precondition(_) => ErrorKind::Precondition,
            AssignmentError::NotEligible(_) => ErrorKind::NotEligible,
            AssignmentError::AlreadyAssigned(_) => ErrorKind::AlreadyAssigned,
            AssignmentError::CapReached(_) => ErrorKind::CapReached,
            AssignmentError::BackupNotNeeded(_) => ErrorKind::BackupNotNeeded,
            AssignmentError::UnsupportedPolicy(_) => ErrorKind::UnsupportedPolicy,
            AssignmentError::Store(_) => ErrorKind::Storage,
        }
    }

    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Structured failure payload: a kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AssignmentError> for Failure {
    fn from(err: &AssignmentError) -> Self {
        err.to_failure()
    }
}
