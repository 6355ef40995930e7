//! JSON client for the remote score service.
//!
//! Endpoints (all under `{base_url}/api/v1`):
//!
//! - `POST /players/{playerId}/scores`
//! - `POST /players/{playerId}/achievements`
//! - `GET  /players/{playerId}/scores?ids=a,b`
//! - `GET  /players/{playerId}/achievements?ids=a,b`
//! - `POST /session`
//! - `GET  /health`

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use scorekeep_core::sync::{RemoteScoreService, TransportError};
use scorekeep_core::ScorekeepConfig;

use crate::error::{RemoteClientError, Result};
use crate::types::*;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct ScoreServiceClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ScoreServiceClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Builds a client from `api_base_url` and `api_token`; both are required.
    pub fn from_config(config: &ScorekeepConfig) -> Result<Self> {
        let base_url = config
            .api_base_url
            .as_deref()
            .ok_or_else(|| RemoteClientError::invalid_request("API base URL is not configured"))?;
        let token = config
            .api_token
            .as_deref()
            .ok_or_else(|| RemoteClientError::auth("API token is not configured"))?;
        Self::new(base_url, token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Scorekeep] API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Scorekeep] API response error ({}): {}", status, preview);
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| RemoteClientError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    fn player_url(&self, player_id: &str, resource: &str) -> Result<String> {
        if player_id.trim().is_empty() {
            return Err(RemoteClientError::invalid_request("player id must not be empty"));
        }
        Ok(format!(
            "{}/api/v1/players/{}/{}",
            self.base_url,
            urlencoding::encode(player_id),
            resource
        ))
    }

    fn api_error(status: reqwest::StatusCode, body: &str) -> RemoteClientError {
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(body) {
            return RemoteClientError::api(
                status.as_u16(),
                format!("{}: {}", error.code, error.message),
            );
        }
        RemoteClientError::api(status.as_u16(), format!("Request failed: {}", body))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "[Scorekeep] Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            RemoteClientError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Checks the status of a response whose body is irrelevant.
    async fn expect_success(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Submissions
    // ─────────────────────────────────────────────────────────────────────

    /// POST /api/v1/players/{playerId}/scores
    pub async fn post_score(&self, player_id: &str, request: &SubmitScoreRequest) -> Result<()> {
        let url = self.player_url(player_id, "scores")?;
        debug!(
            "[Scorekeep] Submitting score {} to {}",
            request.value, request.leaderboard_id
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    /// POST /api/v1/players/{playerId}/achievements
    pub async fn post_achievement(
        &self,
        player_id: &str,
        request: &SubmitAchievementRequest,
    ) -> Result<()> {
        let url = self.player_url(player_id, "achievements")?;
        debug!(
            "[Scorekeep] Submitting {}% for {}",
            request.percent_complete, request.achievement_id
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// GET /api/v1/players/{playerId}/scores?ids=a,b
    pub async fn get_scores(&self, player_id: &str, ids: &[String]) -> Result<ScoresResponse> {
        if ids.is_empty() {
            return Ok(ScoresResponse::default());
        }
        let url = self.player_url(player_id, "scores")?;
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("ids", ids.join(","))])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// GET /api/v1/players/{playerId}/achievements?ids=a,b
    pub async fn get_achievements(
        &self,
        player_id: &str,
        ids: &[String],
    ) -> Result<AchievementsResponse> {
        if ids.is_empty() {
            return Ok(AchievementsResponse::default());
        }
        let url = self.player_url(player_id, "achievements")?;
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("ids", ids.join(","))])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────

    /// Exchanges the bearer token for the player it belongs to.
    ///
    /// POST /api/v1/session
    pub async fn create_session(&self) -> Result<SessionResponse> {
        let url = format!("{}/api/v1/session", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        Self::parse_response(response).await
    }
}

#[async_trait]
impl RemoteScoreService for ScoreServiceClient {
    async fn submit_score(
        &self,
        player_id: &str,
        leaderboard_id: &str,
        value: i64,
    ) -> std::result::Result<(), TransportError> {
        let request = SubmitScoreRequest {
            leaderboard_id: leaderboard_id.to_string(),
            value,
        };
        Ok(self.post_score(player_id, &request).await?)
    }

    async fn submit_achievement(
        &self,
        player_id: &str,
        achievement_id: &str,
        percent_complete: f64,
    ) -> std::result::Result<(), TransportError> {
        let request = SubmitAchievementRequest {
            achievement_id: achievement_id.to_string(),
            percent_complete,
        };
        Ok(self.post_achievement(player_id, &request).await?)
    }

    async fn fetch_remote_scores(
        &self,
        player_id: &str,
        leaderboard_ids: &[String],
    ) -> std::result::Result<HashMap<String, i64>, TransportError> {
        let response = self.get_scores(player_id, leaderboard_ids).await?;
        Ok(response
            .scores
            .into_iter()
            .map(|s| (s.leaderboard_id, s.value))
            .collect())
    }

    async fn fetch_remote_achievements(
        &self,
        player_id: &str,
        achievement_ids: &[String],
    ) -> std::result::Result<HashMap<String, f64>, TransportError> {
        let response = self.get_achievements(player_id, achievement_ids).await?;
        Ok(response
            .achievements
            .into_iter()
            .map(|a| (a.achievement_id, a.percent_complete))
            .collect())
    }
}
