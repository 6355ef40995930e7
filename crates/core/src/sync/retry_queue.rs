//! Durable FIFO of submissions awaiting remote confirmation.

use std::collections::HashSet;
use std::future::Future;

use uuid::Uuid;

use super::models::{DrainReport, PendingSubmission, SubmissionKind, SubmissionPayload};

/// What happened to an entry when its remote attempt finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Delivered and removed from the queue.
    Removed,
    /// Failed; kept in place for the next drain.
    Retained,
    /// The entry left the queue while in flight (reset or superseded);
    /// the result is dropped.
    Discarded,
}

/// Pending submissions plus the set currently out on the network.
///
/// Entries are only removed on confirmed delivery, on achievement reset, or
/// when a remote sync supersedes them. An entry in flight is never handed out
/// a second time until it settles.
#[derive(Debug, Clone, Default)]
pub struct RetryQueue {
    entries: Vec<PendingSubmission>,
    in_flight: HashSet<Uuid>,
}

impl RetryQueue {
    pub fn new(entries: Vec<PendingSubmission>) -> Self {
        Self {
            entries,
            in_flight: HashSet::new(),
        }
    }

    pub fn enqueue(&mut self, submission: PendingSubmission) {
        self.entries.push(submission);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PendingSubmission] {
        &self.entries
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Snapshots every entry not already in flight and marks them in flight.
    pub fn begin_drain(&mut self) -> Vec<PendingSubmission> {
        let batch: Vec<PendingSubmission> = self
            .entries
            .iter()
            .filter(|entry| !self.in_flight.contains(&entry.id))
            .cloned()
            .collect();
        self.in_flight.extend(batch.iter().map(|entry| entry.id));
        batch
    }

    /// Marks a single entry in flight, e.g. for an immediate submission.
    pub fn claim(&mut self, id: Uuid) -> Option<PendingSubmission> {
        if self.in_flight.contains(&id) {
            return None;
        }
        let entry = self.entries.iter().find(|entry| entry.id == id)?.clone();
        self.in_flight.insert(id);
        Some(entry)
    }

    /// Records the result of a remote attempt for `id`.
    pub fn settle(&mut self, id: Uuid, delivered: bool) -> SettleOutcome {
        self.in_flight.remove(&id);
        let Some(position) = self.entries.iter().position(|entry| entry.id == id) else {
            return SettleOutcome::Discarded;
        };
        if delivered {
            self.entries.remove(position);
            SettleOutcome::Removed
        } else {
            SettleOutcome::Retained
        }
    }

    /// Drops every queued achievement submission. Returns how many were removed.
    pub fn remove_achievements(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.kind() != SubmissionKind::Achievement);
        before - self.entries.len()
    }

    /// Drops queued scores for `leaderboard_id` that do not exceed `remote_value`.
    pub fn supersede_scores(&mut self, leaderboard_id: &str, remote_value: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| match &entry.payload {
            SubmissionPayload::Score(record) => {
                record.leaderboard_id != leaderboard_id || record.value > remote_value
            }
            SubmissionPayload::Achievement(_) => true,
        });
        before - self.entries.len()
    }

    /// Drops queued progress for `achievement_id` that does not exceed `remote_percent`.
    pub fn supersede_achievements(&mut self, achievement_id: &str, remote_percent: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| match &entry.payload {
            SubmissionPayload::Achievement(record) => {
                record.achievement_id != achievement_id
                    || record.percent_complete > remote_percent
            }
            SubmissionPayload::Score(_) => true,
        });
        before - self.entries.len()
    }

    pub fn has_pending_score(&self, leaderboard_id: &str, value: i64) -> bool {
        self.entries.iter().any(|entry| {
            matches!(&entry.payload, SubmissionPayload::Score(record)
                if record.leaderboard_id == leaderboard_id && record.value >= value)
        })
    }

    pub fn has_pending_achievement(&self, achievement_id: &str, percent: f64) -> bool {
        self.entries.iter().any(|entry| {
            matches!(&entry.payload, SubmissionPayload::Achievement(record)
                if record.achievement_id == achievement_id && record.percent_complete >= percent)
        })
    }

    /// Attempts every entry once, in order, removing those `submit` confirms.
    ///
    /// For queues shared behind a lock, drive [`RetryQueue::begin_drain`] and
    /// [`RetryQueue::settle`] directly so the lock is not held across calls.
    pub async fn drain<F, Fut>(&mut self, mut submit: F) -> DrainReport
    where
        F: FnMut(PendingSubmission) -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut report = DrainReport::default();
        for entry in self.begin_drain() {
            let delivered = submit(entry.clone()).await;
            match self.settle(entry.id, delivered) {
                SettleOutcome::Removed => report.succeeded.push(entry),
                SettleOutcome::Retained => report.still_pending.push(entry),
                SettleOutcome::Discarded => {}
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::models::{AchievementRecord, ScoreRecord};

    fn score(id: &str, value: i64) -> PendingSubmission {
        PendingSubmission::score(ScoreRecord::new(id, value))
    }

    fn achievement(id: &str, percent: f64) -> PendingSubmission {
        PendingSubmission::achievement(AchievementRecord::new(id, percent))
    }

    #[tokio::test]
    async fn drain_removes_only_successful_entries_and_keeps_order() {
        let mut queue = RetryQueue::default();
        queue.enqueue(score("a", 1));
        queue.enqueue(score("b", 2));
        queue.enqueue(score("c", 3));
        queue.enqueue(score("d", 4));

        let report = queue
            .drain(|entry| async move { entry.target_id() == "b" || entry.target_id() == "d" })
            .await;

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.still_pending.len(), 2);
        let remaining: Vec<&str> = queue.entries().iter().map(|e| e.target_id()).collect();
        assert_eq!(remaining, vec!["a", "c"]);
        assert_eq!(queue.in_flight_count(), 0);
    }

    #[test]
    fn in_flight_entries_are_not_handed_out_twice() {
        let mut queue = RetryQueue::default();
        queue.enqueue(score("a", 1));
        let first = queue.begin_drain();
        assert_eq!(first.len(), 1);

        queue.enqueue(score("b", 2));
        let second = queue.begin_drain();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].target_id(), "b");
        assert!(queue.claim(first[0].id).is_none());
    }

    #[test]
    fn entry_added_mid_drain_survives() {
        let mut queue = RetryQueue::default();
        queue.enqueue(score("a", 1));
        let batch = queue.begin_drain();
        queue.enqueue(score("late", 9));
        assert_eq!(queue.settle(batch[0].id, true), SettleOutcome::Removed);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.entries()[0].target_id(), "late");
    }

    #[test]
    fn reset_mid_flight_discards_late_result() {
        let mut queue = RetryQueue::default();
        queue.enqueue(achievement("explorer", 50.0));
        queue.enqueue(score("a", 1));
        let batch = queue.begin_drain();

        assert_eq!(queue.remove_achievements(), 1);
        let achievement_id = batch
            .iter()
            .find(|e| e.kind() == SubmissionKind::Achievement)
            .map(|e| e.id)
            .expect("achievement in batch");
        assert_eq!(queue.settle(achievement_id, true), SettleOutcome::Discarded);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.entries()[0].kind(), SubmissionKind::Score);
    }

    #[test]
    fn supersede_drops_only_lower_or_equal_scores() {
        let mut queue = RetryQueue::default();
        queue.enqueue(score("a", 50));
        queue.enqueue(score("a", 90));
        queue.enqueue(score("b", 10));
        assert_eq!(queue.supersede_scores("a", 80), 1);
        assert!(queue.has_pending_score("a", 90));
        assert!(!queue.has_pending_score("a", 91));
        assert!(queue.has_pending_score("b", 10));
    }
}
