//! Bearer-token identity provider.

use std::sync::RwLock;

use async_trait::async_trait;
use log::{debug, info};

use scorekeep_core::sync::{IdentityProvider, TransportError, UNKNOWN_PLAYER_ID};

use crate::client::ScoreServiceClient;

/// Resolves the player behind the client's token by opening a session.
///
/// Until [`IdentityProvider::authenticate`] succeeds the current player is
/// [`UNKNOWN_PLAYER_ID`].
#[derive(Debug)]
pub struct TokenIdentityProvider {
    client: ScoreServiceClient,
    player_id: RwLock<Option<String>>,
}

impl TokenIdentityProvider {
    pub fn new(client: ScoreServiceClient) -> Self {
        Self {
            client,
            player_id: RwLock::new(None),
        }
    }

    /// Forgets the authenticated player.
    pub fn sign_out(&self) {
        *self
            .player_id
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentityProvider {
    async fn authenticate(&self) -> Result<String, TransportError> {
        debug!("[Scorekeep] Opening session at {}", self.client.base_url());
        let session = self.client.create_session().await?;
        if session.player_id.trim().is_empty() || session.player_id == UNKNOWN_PLAYER_ID {
            return Err(TransportError::reauth("session did not identify a player"));
        }
        info!("[Scorekeep] Session opened for player {}", session.player_id);
        *self
            .player_id
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session.player_id.clone());
        Ok(session.player_id)
    }

    fn current_player_id(&self) -> String {
        self.player_id
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .unwrap_or_else(|| UNKNOWN_PLAYER_ID.to_string())
    }
}
