//! In-memory best-known values for the active player.

use std::collections::{BTreeMap, HashMap};

use super::models::{clamp_percent, AchievementRecord, ScoreRecord};

/// Max-wins cache of leaderboard scores and achievement progress.
///
/// Scores only go up. Achievement progress only goes up until
/// [`LocalCache::reset_all`] clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalCache {
    scores: BTreeMap<String, ScoreRecord>,
    achievements: BTreeMap<String, AchievementRecord>,
}

impl LocalCache {
    pub fn new(
        scores: BTreeMap<String, ScoreRecord>,
        achievements: BTreeMap<String, AchievementRecord>,
    ) -> Self {
        Self {
            scores,
            achievements,
        }
    }

    /// Returns true when `value` beat the cached best and was stored.
    pub fn record_score(&mut self, leaderboard_id: &str, value: i64) -> bool {
        if let Some(current) = self.scores.get(leaderboard_id) {
            if value <= current.value {
                return false;
            }
        }
        self.scores.insert(
            leaderboard_id.to_string(),
            ScoreRecord::new(leaderboard_id, value),
        );
        true
    }

    /// Returns true when the clamped `percent` beat the cached progress.
    pub fn record_achievement(&mut self, achievement_id: &str, percent: f64) -> bool {
        if percent.is_nan() {
            return false;
        }
        let percent = clamp_percent(percent);
        match self.achievements.get(achievement_id) {
            Some(current) if percent <= current.percent_complete => false,
            // A fresh 0% entry carries no information.
            None if percent <= 0.0 => false,
            _ => {
                self.achievements.insert(
                    achievement_id.to_string(),
                    AchievementRecord::new(achievement_id, percent),
                );
                true
            }
        }
    }

    pub fn best_score(&self, leaderboard_id: &str) -> Option<i64> {
        self.scores.get(leaderboard_id).map(|record| record.value)
    }

    pub fn best_scores<S: AsRef<str>>(&self, leaderboard_ids: &[S]) -> HashMap<String, i64> {
        leaderboard_ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                self.best_score(id).map(|value| (id.to_string(), value))
            })
            .collect()
    }

    pub fn score_record(&self, leaderboard_id: &str) -> Option<&ScoreRecord> {
        self.scores.get(leaderboard_id)
    }

    pub fn progress(&self, achievement_id: &str) -> Option<f64> {
        self.achievements
            .get(achievement_id)
            .map(|record| record.percent_complete)
    }

    pub fn progress_all<S: AsRef<str>>(&self, achievement_ids: &[S]) -> HashMap<String, f64> {
        achievement_ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                self.progress(id).map(|percent| (id.to_string(), percent))
            })
            .collect()
    }

    /// Clears all achievement progress. Scores are untouched.
    pub fn reset_all(&mut self) {
        self.achievements.clear();
    }

    /// Adopts a remote score if it beats the local one.
    pub fn apply_remote_score(&mut self, leaderboard_id: &str, remote_value: i64) -> bool {
        self.record_score(leaderboard_id, remote_value)
    }

    /// Adopts remote achievement progress if it beats the local one.
    pub fn apply_remote_achievement(&mut self, achievement_id: &str, remote_percent: f64) -> bool {
        self.record_achievement(achievement_id, remote_percent)
    }

    pub fn leaderboard_ids(&self) -> impl Iterator<Item = &String> {
        self.scores.keys()
    }

    pub fn achievement_ids(&self) -> impl Iterator<Item = &String> {
        self.achievements.keys()
    }

    pub fn scores(&self) -> &BTreeMap<String, ScoreRecord> {
        &self.scores
    }

    pub fn achievements(&self) -> &BTreeMap<String, AchievementRecord> {
        &self.achievements
    }
}
