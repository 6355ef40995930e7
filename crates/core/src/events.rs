//! Typed events emitted by the sync manager.
//!
//! Presentation layers subscribe through a [`SyncEventSink`]; events are
//! emitted in the order the underlying operations complete.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::sync::SyncSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    AuthenticationSucceeded {
        player_id: String,
    },
    AuthenticationFailed {
        message: String,
    },
    ScoreReportSucceeded {
        leaderboard_id: String,
        value: i64,
    },
    ScoreReportFailed {
        leaderboard_id: String,
        value: i64,
        reason: String,
    },
    AchievementReportSucceeded {
        achievement_id: String,
        percent_complete: f64,
    },
    AchievementReportFailed {
        achievement_id: String,
        percent_complete: f64,
        reason: String,
    },
    AchievementsReset {
        removed_pending: usize,
    },
    SyncCompleted {
        player_id: String,
        summary: SyncSummary,
    },
    ReachabilityChanged {
        available: bool,
    },
    /// Stored state was unreadable and the manager started from empty state.
    PersistenceRecovered {
        message: String,
    },
}

/// Receives events after the operation that produced them completes.
pub trait SyncEventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSyncEventSink;

impl SyncEventSink for NoOpSyncEventSink {
    fn emit(&self, _event: SyncEvent) {}
}

/// Forwards events into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSyncEventSink {
    sender: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelSyncEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl SyncEventSink for ChannelSyncEventSink {
    fn emit(&self, event: SyncEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("[Scorekeep] Event receiver dropped; discarding event");
        }
    }
}
