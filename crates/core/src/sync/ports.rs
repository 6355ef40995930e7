//! Collaborator contracts the sync manager is built on.
//!
//! Each trait is a narrow seam so runtimes (and tests) can swap the remote
//! service, identity source, reachability probe and storage independently.

use std::collections::HashMap;

use async_trait::async_trait;

use super::models::PersistedState;
use super::scheduler::SyncRetryClass;
use crate::errors::Result;

/// Failure reported by a remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
    pub retry_class: SyncRetryClass,
}

impl TransportError {
    pub fn new(message: impl Into<String>, retry_class: SyncRetryClass) -> Self {
        Self {
            message: message.into(),
            retry_class,
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(message, SyncRetryClass::Retryable)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(message, SyncRetryClass::Permanent)
    }

    pub fn reauth(message: impl Into<String>) -> Self {
        Self::new(message, SyncRetryClass::ReauthRequired)
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.message, self.retry_class)
    }
}

impl std::error::Error for TransportError {}

/// Opaque scoring/achievement service. Calls may be slow and always fallible.
#[async_trait]
pub trait RemoteScoreService: Send + Sync {
    async fn submit_score(
        &self,
        player_id: &str,
        leaderboard_id: &str,
        value: i64,
    ) -> std::result::Result<(), TransportError>;

    async fn submit_achievement(
        &self,
        player_id: &str,
        achievement_id: &str,
        percent_complete: f64,
    ) -> std::result::Result<(), TransportError>;

    async fn fetch_remote_scores(
        &self,
        player_id: &str,
        leaderboard_ids: &[String],
    ) -> std::result::Result<HashMap<String, i64>, TransportError>;

    async fn fetch_remote_achievements(
        &self,
        player_id: &str,
        achievement_ids: &[String],
    ) -> std::result::Result<HashMap<String, f64>, TransportError>;
}

/// Player identity source.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Establishes identity and returns the authenticated player id.
    async fn authenticate(&self) -> std::result::Result<String, TransportError>;

    /// Currently authenticated player, or [`super::UNKNOWN_PLAYER_ID`].
    fn current_player_id(&self) -> String;
}

/// Network reachability check feeding the connectivity monitor.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Durable storage for [`PersistedState`].
///
/// `load` returns an empty state when nothing was saved yet and
/// `Error::PersistenceCorrupt` when stored bytes cannot be read back.
/// `save` must replace the stored state atomically.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<PersistedState>;
    async fn save(&self, state: &PersistedState) -> Result<()>;
}

/// Probe that always reports the same level. Useful for hosts that feed
/// reachability through [`super::SyncManager::on_reachability_changed`].
#[derive(Debug, Clone, Copy)]
pub struct StaticReachabilityProbe(pub bool);

#[async_trait]
impl ReachabilityProbe for StaticReachabilityProbe {
    async fn probe(&self) -> bool {
        self.0
    }
}
