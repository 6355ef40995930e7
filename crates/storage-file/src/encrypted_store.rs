//! File-backed implementation of the `StateStore` port.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use scorekeep_core::config::default_data_path;
use scorekeep_core::sync::{PersistedState, StateStore, PERSISTED_STATE_VERSION};
use scorekeep_core::ScorekeepConfig;

use crate::crypto::StateCipher;
use crate::errors::{Result, StorageError};

/// Encrypted, atomically replaced state file.
///
/// The key is derived from a secret shipped with the client, so the
/// encryption keeps casual readers out but is not a security boundary.
pub struct EncryptedFileStore {
    path: PathBuf,
    cipher: StateCipher,
}

impl std::fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>, secret: &str) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            cipher: StateCipher::from_secret(secret)?,
        })
    }

    pub fn from_config(config: &ScorekeepConfig) -> Result<Self> {
        Self::new(config.data_path.clone(), &config.encryption_secret)
    }

    /// Per-user default location of the state file.
    pub fn default_path() -> scorekeep_core::Result<PathBuf> {
        default_data_path()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decodes the state file. `None` when it does not exist yet.
    async fn read_state(&self) -> Result<Option<PersistedState>> {
        let sealed = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let plaintext = self.cipher.open(&sealed)?;
        let state: PersistedState = serde_json::from_slice(&plaintext)?;
        if state.version > PERSISTED_STATE_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: state.version,
                supported: PERSISTED_STATE_VERSION,
            });
        }
        Ok(Some(state))
    }

    async fn write_state(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let payload = serde_json::to_vec(state)?;
        let sealed = self.cipher.seal(&payload)?;

        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        if let Err(err) = write_synced(&temp_path, &sealed).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err);
        }
        if let Err(err) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        Ok(())
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

#[async_trait]
impl StateStore for EncryptedFileStore {
    async fn load(&self) -> scorekeep_core::Result<PersistedState> {
        match self.read_state().await {
            Ok(Some(state)) => {
                debug!(
                    "[Scorekeep] Loaded state from {} ({} partitions)",
                    self.path.display(),
                    state.players.len()
                );
                Ok(state)
            }
            Ok(None) => {
                debug!(
                    "[Scorekeep] No state file at {}; starting fresh",
                    self.path.display()
                );
                Ok(PersistedState::default())
            }
            Err(err) => {
                warn!(
                    "[Scorekeep] Could not read state file {}: {}",
                    self.path.display(),
                    err
                );
                Err(err.into_load_error())
            }
        }
    }

    async fn save(&self, state: &PersistedState) -> scorekeep_core::Result<()> {
        self.write_state(state)
            .await
            .map_err(StorageError::into_save_error)
    }
}
