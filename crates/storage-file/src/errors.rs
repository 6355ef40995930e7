//! Error types for the file store.

use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key derivation, encryption or authentication failure.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// The file is not a sealed state file.
    #[error("Invalid state file: {0}")]
    Format(String),

    #[error("Unsupported state version {found} (newest known is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

impl StorageError {
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Maps a failure while reading state. Anything unreadable counts as corrupt.
    pub fn into_load_error(self) -> scorekeep_core::Error {
        scorekeep_core::Error::corrupt(self.to_string())
    }

    pub fn into_save_error(self) -> scorekeep_core::Error {
        scorekeep_core::Error::write_failed(self.to_string())
    }
}
