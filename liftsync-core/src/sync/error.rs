use thiserror::Error;

use crate::store::{DecodeError, StoreError};

/// Failure branch of a coordinator completion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Malformed input, rejected before the store is contacted.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Store(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("{0}")]
    Decode(String),
}

impl SyncError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::Store(e.to_string())
    }
}

impl From<DecodeError> for SyncError {
    fn from(e: DecodeError) -> Self {
        SyncError::Decode(e.to_string())
    }
}
