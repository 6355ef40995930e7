//! Score/achievement domain models and the persisted state layout.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player id used while nobody is authenticated.
pub const UNKNOWN_PLAYER_ID: &str = "unknownPlayer";

/// Current on-disk layout version of [`PersistedState`].
pub const PERSISTED_STATE_VERSION: u32 = 1;

/// Lowest and highest valid achievement completion.
pub const MIN_PERCENT: f64 = 0.0;
pub const MAX_PERCENT: f64 = 100.0;

/// Best known value for one leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub leaderboard_id: String,
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn new(leaderboard_id: impl Into<String>, value: i64) -> Self {
        Self {
            leaderboard_id: leaderboard_id.into(),
            value,
            timestamp: Utc::now(),
        }
    }
}

/// Best known completion for one achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRecord {
    pub achievement_id: String,
    pub percent_complete: f64,
}

impl AchievementRecord {
    /// Builds a record with `percent` clamped into `[0, 100]`.
    pub fn new(achievement_id: impl Into<String>, percent: f64) -> Self {
        Self {
            achievement_id: achievement_id.into(),
            percent_complete: clamp_percent(percent),
        }
    }
}

pub fn clamp_percent(percent: f64) -> f64 {
    percent.clamp(MIN_PERCENT, MAX_PERCENT)
}

/// Which collaborator call delivers a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Score,
    Achievement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum SubmissionPayload {
    Score(ScoreRecord),
    Achievement(AchievementRecord),
}

/// A remote submission that has not been confirmed delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub id: Uuid,
    pub payload: SubmissionPayload,
    pub created_at: DateTime<Utc>,
}

impl PendingSubmission {
    pub fn score(record: ScoreRecord) -> Self {
        Self::with_payload(SubmissionPayload::Score(record))
    }

    pub fn achievement(record: AchievementRecord) -> Self {
        Self::with_payload(SubmissionPayload::Achievement(record))
    }

    fn with_payload(payload: SubmissionPayload) -> Self {
        Self {
            id: Uuid::now_v7(),
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> SubmissionKind {
        match self.payload {
            SubmissionPayload::Score(_) => SubmissionKind::Score,
            SubmissionPayload::Achievement(_) => SubmissionKind::Achievement,
        }
    }

    /// Leaderboard or achievement identifier this submission targets.
    pub fn target_id(&self) -> &str {
        match &self.payload {
            SubmissionPayload::Score(record) => &record.leaderboard_id,
            SubmissionPayload::Achievement(record) => &record.achievement_id,
        }
    }
}

/// Everything persisted for a single player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    #[serde(default)]
    pub scores: BTreeMap<String, ScoreRecord>,
    #[serde(default)]
    pub achievements: BTreeMap<String, AchievementRecord>,
    #[serde(default)]
    pub pending: Vec<PendingSubmission>,
}

impl PlayerState {
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty() && self.achievements.is_empty() && self.pending.is_empty()
    }
}

/// Serialized union of cache and queue state, partitioned by player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub version: u32,
    #[serde(default)]
    pub players: BTreeMap<String, PlayerState>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: PERSISTED_STATE_VERSION,
            players: BTreeMap::new(),
        }
    }
}

/// Result of a `record_*` call on the sync manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Value did not beat the cached best; nothing was written or queued.
    Unchanged,
    /// Accepted locally and confirmed by the remote service.
    Delivered,
    /// Accepted locally and left queued for a later drain.
    Queued,
    /// Accepted locally, then removed by an achievement reset while its
    /// delivery was in flight.
    Discarded,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub succeeded: Vec<PendingSubmission>,
    pub still_pending: Vec<PendingSubmission>,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.still_pending.len()
    }
}

/// Counters from one remote reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// Cache entries raised to a higher remote value.
    pub adopted_remote: usize,
    /// Local values queued because the remote copy was lower or missing.
    pub requeued_local: usize,
    /// Queued submissions dropped because the remote already had more.
    pub superseded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achievement_percent_is_clamped() {
        assert_eq!(AchievementRecord::new("a", 140.0).percent_complete, 100.0);
        assert_eq!(AchievementRecord::new("a", -3.0).percent_complete, 0.0);
        assert_eq!(AchievementRecord::new("a", 42.5).percent_complete, 42.5);
    }

    #[test]
    fn pending_submission_serialization_is_tagged() {
        let pending = PendingSubmission::score(ScoreRecord::new("daily", 10));
        let json = serde_json::to_value(&pending).expect("serialize pending");
        assert_eq!(json["payload"]["kind"], "score");
        assert_eq!(json["payload"]["record"]["leaderboardId"], "daily");
        assert_eq!(pending.kind(), SubmissionKind::Score);
        assert_eq!(pending.target_id(), "daily");
    }

    #[test]
    fn persisted_state_tolerates_missing_sections() {
        let state: PersistedState =
            serde_json::from_str(r#"{"version":1,"players":{"p1":{}}}"#).expect("parse state");
        assert!(state.players["p1"].is_empty());
    }
}
