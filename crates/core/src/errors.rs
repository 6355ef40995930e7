//! Error types for the scorekeep core.

use thiserror::Error;

use crate::sync::{SyncRetryClass, TransportError};

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the reconciliation engine.
///
/// Remote failures never escape `record_*` calls; they are recorded as
/// events and the submission stays queued. Only storage failures and invalid
/// input reach the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Persisted state could not be decrypted or deserialized.
    #[error("Persisted state is corrupt: {0}")]
    PersistenceCorrupt(String),

    /// Persisted state could not be written (disk full, permissions, ...).
    #[error("Failed to write persisted state: {0}")]
    PersistenceWriteFailed(String),

    /// The remote service could not be reached or timed out.
    #[error("Remote service unreachable: {0}")]
    RemoteUnreachable(String),

    /// The remote service answered but refused the request.
    #[error("Remote service rejected request: {0}")]
    RemoteRejected(String),

    /// No authenticated player; remote operations are skipped.
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::PersistenceCorrupt(message.into())
    }

    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::PersistenceWriteFailed(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// True for failures that leave a submission queued for a later drain.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnreachable(_) | Self::RemoteRejected(_) | Self::AuthenticationRequired
        )
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err.retry_class {
            SyncRetryClass::Retryable => Self::RemoteUnreachable(err.message),
            SyncRetryClass::Permanent => Self::RemoteRejected(err.message),
            SyncRetryClass::ReauthRequired => Self::AuthenticationRequired,
        }
    }
}
