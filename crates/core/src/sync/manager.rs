//! Public orchestrator tying cache, queue, storage and remote together.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::cache::LocalCache;
use super::connectivity::{ConnectivityMonitor, ReachabilityTransition};
use super::models::{
    DrainReport, PendingSubmission, PersistedState, PlayerState, RecordOutcome,
    SubmissionPayload, SyncSummary, PERSISTED_STATE_VERSION, UNKNOWN_PLAYER_ID,
};
use super::ports::{IdentityProvider, ReachabilityProbe, RemoteScoreService, StateStore};
use super::retry_queue::{RetryQueue, SettleOutcome};
use super::scheduler::{compute_jitter_ms, next_probe_delay_ms, DEFAULT_PROBE_INTERVAL_SECS};
use crate::config::ScorekeepConfig;
use crate::errors::{Error, Result};
use crate::events::{NoOpSyncEventSink, SyncEvent, SyncEventSink};

/// External collaborators injected into the manager.
#[derive(Clone)]
pub struct SyncCollaborators {
    pub store: Arc<dyn StateStore>,
    pub remote: Arc<dyn RemoteScoreService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub events: Arc<dyn SyncEventSink>,
}

impl SyncCollaborators {
    pub fn new(
        store: Arc<dyn StateStore>,
        remote: Arc<dyn RemoteScoreService>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            remote,
            identity,
            events: Arc::new(NoOpSyncEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn SyncEventSink>) -> Self {
        self.events = events;
        self
    }
}

/// Tuning knobs for a manager instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub tracked_leaderboards: Vec<String>,
    pub tracked_achievements: Vec<String>,
    pub probe_interval_secs: u64,
    /// Reachability assumed before the first probe result arrives.
    pub initially_reachable: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            tracked_leaderboards: Vec::new(),
            tracked_achievements: Vec::new(),
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            initially_reachable: false,
        }
    }
}

impl From<&ScorekeepConfig> for SyncOptions {
    fn from(config: &ScorekeepConfig) -> Self {
        Self {
            tracked_leaderboards: config.tracked_leaderboards.clone(),
            tracked_achievements: config.tracked_achievements.clone(),
            probe_interval_secs: config.probe_interval_secs,
            initially_reachable: false,
        }
    }
}

/// Mutable state guarded by the manager's single lock.
struct EngineState {
    player_id: String,
    /// Partitions of players that are not currently active.
    other_players: BTreeMap<String, PlayerState>,
    cache: LocalCache,
    queue: RetryQueue,
}

impl EngineState {
    fn from_persisted(mut persisted: PersistedState, player_id: String) -> Self {
        let current = persisted.players.remove(&player_id).unwrap_or_default();
        let mut state = Self {
            player_id,
            other_players: persisted.players,
            cache: LocalCache::new(current.scores, current.achievements),
            queue: RetryQueue::new(current.pending),
        };
        state.absorb_guest_partition();
        state
    }

    fn is_authenticated(&self) -> bool {
        self.player_id != UNKNOWN_PLAYER_ID
    }

    fn player_state(&self) -> PlayerState {
        PlayerState {
            scores: self.cache.scores().clone(),
            achievements: self.cache.achievements().clone(),
            pending: self.queue.entries().to_vec(),
        }
    }

    fn to_persisted(&self) -> PersistedState {
        let mut players = self.other_players.clone();
        let current = self.player_state();
        if !current.is_empty() {
            players.insert(self.player_id.clone(), current);
        }
        PersistedState {
            version: PERSISTED_STATE_VERSION,
            players,
        }
    }

    /// Activates `player_id`. Returns how many submissions recorded before
    /// authentication were carried over to that player.
    fn switch_player(&mut self, player_id: &str) -> usize {
        let current = self.player_state();
        let previous = std::mem::replace(&mut self.player_id, player_id.to_string());
        if !current.is_empty() {
            self.other_players.insert(previous, current);
        }
        let next = self.other_players.remove(player_id).unwrap_or_default();
        self.cache = LocalCache::new(next.scores, next.achievements);
        self.queue = RetryQueue::new(next.pending);
        self.absorb_guest_partition()
    }

    /// Merges the unauthenticated partition into the active player, max wins.
    ///
    /// Guest submissions are re-homed unless the merged cache already holds a
    /// higher value or an equal-or-higher submission is queued.
    fn absorb_guest_partition(&mut self) -> usize {
        if !self.is_authenticated() {
            return 0;
        }
        let Some(guest) = self.other_players.remove(UNKNOWN_PLAYER_ID) else {
            return 0;
        };

        for record in guest.scores.into_values() {
            self.cache.record_score(&record.leaderboard_id, record.value);
        }
        for record in guest.achievements.into_values() {
            self.cache
                .record_achievement(&record.achievement_id, record.percent_complete);
        }

        let mut rehomed = 0;
        for entry in guest.pending {
            let keep = match &entry.payload {
                SubmissionPayload::Score(r) => {
                    self.cache.best_score(&r.leaderboard_id) == Some(r.value)
                        && !self.queue.has_pending_score(&r.leaderboard_id, r.value)
                }
                SubmissionPayload::Achievement(r) => {
                    self.cache.progress(&r.achievement_id) == Some(r.percent_complete)
                        && !self
                            .queue
                            .has_pending_achievement(&r.achievement_id, r.percent_complete)
                }
            };
            if keep {
                self.queue.enqueue(entry);
                rehomed += 1;
            }
        }
        rehomed
    }

    /// Settles an attempt, even if its player is no longer the active one.
    fn settle(&mut self, player_id: &str, entry: &PendingSubmission, delivered: bool) -> SettleOutcome {
        if player_id == self.player_id {
            return self.queue.settle(entry.id, delivered);
        }
        let Some(partition) = self.other_players.get_mut(player_id) else {
            return SettleOutcome::Discarded;
        };
        let Some(position) = partition.pending.iter().position(|p| p.id == entry.id) else {
            return SettleOutcome::Discarded;
        };
        if delivered {
            partition.pending.remove(position);
            SettleOutcome::Removed
        } else {
            SettleOutcome::Retained
        }
    }
}

#[derive(Debug, Default)]
struct DrainGate {
    running: bool,
    rerun: bool,
}

/// Explicitly owned reconciliation engine.
///
/// All mutations go through one async lock. Remote calls are made with the
/// lock released: snapshot under the lock, call, then re-lock to settle.
pub struct SyncManager {
    state: Mutex<EngineState>,
    store: Arc<dyn StateStore>,
    remote: Arc<dyn RemoteScoreService>,
    identity: Arc<dyn IdentityProvider>,
    events: Arc<dyn SyncEventSink>,
    connectivity: ConnectivityMonitor,
    drain_gate: std::sync::Mutex<DrainGate>,
    drain_passes: AtomicUsize,
    options: SyncOptions,
    load_warning: Option<String>,
}

impl SyncManager {
    /// Loads persisted state and builds the manager.
    ///
    /// Unreadable state never fails construction: the manager starts empty,
    /// logs the problem, emits [`SyncEvent::PersistenceRecovered`] and exposes
    /// the message through [`SyncManager::load_warning`].
    pub async fn open(collaborators: SyncCollaborators, options: SyncOptions) -> Self {
        let SyncCollaborators {
            store,
            remote,
            identity,
            events,
        } = collaborators;

        let (persisted, load_warning) = match store.load().await {
            Ok(persisted) => (persisted, None),
            Err(err) => {
                warn!(
                    "[Scorekeep] Persisted state unreadable, starting from empty state: {}",
                    err
                );
                events.emit(SyncEvent::PersistenceRecovered {
                    message: err.to_string(),
                });
                (PersistedState::default(), Some(err.to_string()))
            }
        };

        let player_id = identity.current_player_id();
        debug!(
            "[Scorekeep] Opened state for player={} partitions={}",
            player_id,
            persisted.players.len()
        );

        Self {
            state: Mutex::new(EngineState::from_persisted(persisted, player_id)),
            store,
            remote,
            identity,
            events,
            connectivity: ConnectivityMonitor::new(options.initially_reachable),
            drain_gate: std::sync::Mutex::new(DrainGate::default()),
            drain_passes: AtomicUsize::new(0),
            options,
            load_warning,
        }
    }

    /// Message of the load failure recovered from at startup, if any.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Number of drain passes that actually ran.
    pub fn drain_pass_count(&self) -> usize {
        self.drain_passes.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Recording
    // ─────────────────────────────────────────────────────────────────────

    /// Records a score locally and tries to deliver it.
    ///
    /// A failed save does not stop the delivery attempt: the cache and queue
    /// keep the value in memory, the attempt and its report event still
    /// happen, and `PersistenceWriteFailed` is returned afterwards.
    pub async fn record_score(&self, value: i64, leaderboard_id: &str) -> Result<RecordOutcome> {
        validate_id(leaderboard_id)?;
        self.accept(Delivery::Immediate, |cache| accept_score(cache, leaderboard_id, value))
            .await
    }

    /// Records achievement progress locally and tries to deliver it.
    pub async fn record_achievement(
        &self,
        achievement_id: &str,
        percent: f64,
    ) -> Result<RecordOutcome> {
        validate_percent(achievement_id, percent)?;
        self.accept(Delivery::Immediate, |cache| accept_achievement(cache, achievement_id, percent))
            .await
    }

    /// Records a score and leaves it queued for the next drain.
    pub async fn queue_score(&self, value: i64, leaderboard_id: &str) -> Result<RecordOutcome> {
        validate_id(leaderboard_id)?;
        self.accept(Delivery::Deferred, |cache| accept_score(cache, leaderboard_id, value))
            .await
    }

    /// Records achievement progress and leaves it queued for the next drain.
    pub async fn queue_achievement(
        &self,
        achievement_id: &str,
        percent: f64,
    ) -> Result<RecordOutcome> {
        validate_percent(achievement_id, percent)?;
        self.accept(Delivery::Deferred, |cache| accept_achievement(cache, achievement_id, percent))
            .await
    }

    /// Applies `update` to the cache and queues the submission it yields.
    async fn accept<F>(&self, delivery: Delivery, update: F) -> Result<RecordOutcome>
    where
        F: FnOnce(&mut LocalCache) -> Option<PendingSubmission>,
    {
        let (claimed, saved) = {
            let mut state = self.state.lock().await;
            let Some(pending) = update(&mut state.cache) else {
                debug!("[Scorekeep] Value does not beat cached best; ignored");
                return Ok(RecordOutcome::Unchanged);
            };
            let pending_id = pending.id;
            state.queue.enqueue(pending);
            let saved = self.persist(&state).await;
            let claimed = match delivery {
                Delivery::Immediate => Some(self.claim_for_immediate_send(&mut state, pending_id)),
                Delivery::Deferred => None,
            };
            (claimed, saved)
        };

        let outcome = match claimed {
            Some(claimed) => self.send_claimed(claimed).await,
            None => RecordOutcome::Queued,
        };
        saved?;
        Ok(outcome)
    }

    /// Clears achievement progress and every queued achievement submission.
    ///
    /// Submissions already on the network are not cancelled; their results
    /// are discarded when they come back.
    pub async fn reset_achievements(&self) -> Result<()> {
        let removed_pending = {
            let mut state = self.state.lock().await;
            state.cache.reset_all();
            let removed = state.queue.remove_achievements();
            self.persist(&state).await?;
            removed
        };
        info!(
            "[Scorekeep] Achievements reset; dropped {} queued submissions",
            removed_pending
        );
        self.events
            .emit(SyncEvent::AchievementsReset { removed_pending });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    pub async fn best_score(&self, leaderboard_id: &str) -> Option<i64> {
        self.state.lock().await.cache.best_score(leaderboard_id)
    }

    pub async fn best_scores<S: AsRef<str>>(
        &self,
        leaderboard_ids: &[S],
    ) -> std::collections::HashMap<String, i64> {
        self.state.lock().await.cache.best_scores(leaderboard_ids)
    }

    pub async fn progress(&self, achievement_id: &str) -> Option<f64> {
        self.state.lock().await.cache.progress(achievement_id)
    }

    pub async fn progress_all<S: AsRef<str>>(
        &self,
        achievement_ids: &[S],
    ) -> std::collections::HashMap<String, f64> {
        self.state.lock().await.cache.progress_all(achievement_ids)
    }

    pub async fn pending_submissions(&self) -> Vec<PendingSubmission> {
        self.state.lock().await.queue.entries().to_vec()
    }

    /// Active player, or [`UNKNOWN_PLAYER_ID`] before authentication.
    pub async fn local_player_id(&self) -> String {
        self.state.lock().await.player_id.clone()
    }

    /// True when a player is authenticated and the service is reachable.
    pub async fn is_remote_available(&self) -> bool {
        self.connectivity.is_available() && self.state.lock().await.is_authenticated()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Identity and reconciliation
    // ─────────────────────────────────────────────────────────────────────

    /// Authenticates through the identity provider, activates that player's
    /// partition and reconciles it with the remote service.
    pub async fn authenticate(&self) -> Result<String> {
        let player_id = match self.identity.authenticate().await {
            Ok(player_id) => player_id,
            Err(err) => {
                warn!("[Scorekeep] Authentication failed: {}", err);
                self.events.emit(SyncEvent::AuthenticationFailed {
                    message: err.message.clone(),
                });
                return Err(err.into());
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.player_id != player_id {
                info!(
                    "[Scorekeep] Switching active player {} -> {}",
                    state.player_id, player_id
                );
                let rehomed = state.switch_player(&player_id);
                if rehomed > 0 {
                    info!(
                        "[Scorekeep] Carried {} guest submissions over to {}",
                        rehomed, player_id
                    );
                }
                if let Err(err) = self.persist(&state).await {
                    warn!("[Scorekeep] Could not persist player switch: {}", err);
                }
            }
        }
        self.events.emit(SyncEvent::AuthenticationSucceeded {
            player_id: player_id.clone(),
        });

        match self.sync().await {
            Err(err) if err.is_remote() => {
                info!("[Scorekeep] Post-authentication sync deferred: {}", err);
            }
            Err(err) => warn!("[Scorekeep] Post-authentication sync failed: {}", err),
            Ok(_) => {}
        }
        Ok(player_id)
    }

    /// Pulls remote values and reconciles them into the cache, max wins.
    ///
    /// A higher remote value replaces the local one and drops queued
    /// submissions it supersedes. A higher (or remotely missing) local value
    /// is queued for delivery if it is not already.
    pub async fn sync(&self) -> Result<SyncSummary> {
        let (player_id, leaderboard_ids, achievement_ids) = {
            let state = self.state.lock().await;
            if !state.is_authenticated() {
                return Err(Error::AuthenticationRequired);
            }
            let mut leaderboards: BTreeSet<String> =
                state.cache.leaderboard_ids().cloned().collect();
            let mut achievements: BTreeSet<String> =
                state.cache.achievement_ids().cloned().collect();
            leaderboards.extend(self.options.tracked_leaderboards.iter().cloned());
            achievements.extend(self.options.tracked_achievements.iter().cloned());
            for entry in state.queue.entries() {
                match &entry.payload {
                    SubmissionPayload::Score(r) => leaderboards.insert(r.leaderboard_id.clone()),
                    SubmissionPayload::Achievement(r) => {
                        achievements.insert(r.achievement_id.clone())
                    }
                };
            }
            (
                state.player_id.clone(),
                leaderboards.into_iter().collect::<Vec<_>>(),
                achievements.into_iter().collect::<Vec<_>>(),
            )
        };

        let (remote_scores, remote_achievements) = tokio::join!(
            self.remote.fetch_remote_scores(&player_id, &leaderboard_ids),
            self.remote.fetch_remote_achievements(&player_id, &achievement_ids),
        );
        let remote_scores = remote_scores?;
        let remote_achievements = remote_achievements?;

        let summary = {
            let mut state = self.state.lock().await;
            if state.player_id != player_id {
                debug!(
                    "[Scorekeep] Player changed during sync ({} -> {}); dropping fetched values",
                    player_id, state.player_id
                );
                return Ok(SyncSummary::default());
            }
            let mut summary = SyncSummary::default();

            for id in &leaderboard_ids {
                let remote = remote_scores.get(id).copied();
                if let Some(remote_value) = remote {
                    if state.cache.apply_remote_score(id, remote_value) {
                        summary.adopted_remote += 1;
                    }
                    summary.superseded += state.queue.supersede_scores(id, remote_value);
                }
                let Some(record) = state.cache.score_record(id).cloned() else {
                    continue;
                };
                let remote_is_lower = remote.map_or(true, |r| record.value > r);
                if remote_is_lower && !state.queue.has_pending_score(id, record.value) {
                    state.queue.enqueue(PendingSubmission::score(record));
                    summary.requeued_local += 1;
                }
            }

            for id in &achievement_ids {
                let remote = remote_achievements.get(id).copied().filter(|p| !p.is_nan());
                if let Some(remote_percent) = remote {
                    if state.cache.apply_remote_achievement(id, remote_percent) {
                        summary.adopted_remote += 1;
                    }
                    summary.superseded += state.queue.supersede_achievements(id, remote_percent);
                }
                let Some(record) = state.cache.achievements().get(id).cloned() else {
                    continue;
                };
                let remote_is_lower = remote.map_or(true, |r| record.percent_complete > r);
                if remote_is_lower
                    && !state
                        .queue
                        .has_pending_achievement(id, record.percent_complete)
                {
                    state.queue.enqueue(PendingSubmission::achievement(record));
                    summary.requeued_local += 1;
                }
            }

            self.persist(&state).await?;
            summary
        };

        info!(
            "[Scorekeep] Sync complete player={} adopted={} requeued={} superseded={}",
            player_id, summary.adopted_remote, summary.requeued_local, summary.superseded
        );
        self.events.emit(SyncEvent::SyncCompleted {
            player_id,
            summary: summary.clone(),
        });

        if self.connectivity.is_available() {
            if let Err(err) = self.request_drain().await {
                warn!("[Scorekeep] Drain after sync failed: {}", err);
            }
        }
        Ok(summary)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Draining
    // ─────────────────────────────────────────────────────────────────────

    /// Drains the retry queue regardless of the reachability signal.
    ///
    /// If a drain is already running, the request is folded into a single
    /// follow-up pass of that drain and an empty report is returned here.
    pub async fn flush_pending(&self) -> Result<DrainReport> {
        self.request_drain().await
    }

    /// Feeds a reachability level. A transition to available triggers one
    /// coalesced drain; repeated levels are ignored.
    pub async fn on_reachability_changed(&self, available: bool) -> Result<Option<DrainReport>> {
        let Some(transition) = self.connectivity.observe(available) else {
            return Ok(None);
        };
        self.events
            .emit(SyncEvent::ReachabilityChanged { available });
        if transition != ReachabilityTransition::BecameAvailable {
            return Ok(None);
        }
        if self.state.lock().await.queue.is_empty() {
            return Ok(None);
        }
        self.request_drain().await.map(Some)
    }

    /// Spawns the probe loop feeding the connectivity monitor.
    ///
    /// While reachable with work queued, the loop keeps retrying on the probe
    /// cadence, backing off after consecutive passes that left entries queued.
    /// Abort the returned handle to stop it.
    pub fn spawn_connectivity_loop(
        self: &Arc<Self>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut consecutive_failures: i32 = 0;
            loop {
                let available = probe.probe().await;
                let outcome = match manager.on_reachability_changed(available).await {
                    Ok(Some(report)) => Some(Ok(report)),
                    Ok(None) if available && manager.has_pending().await => {
                        Some(manager.request_drain().await)
                    }
                    Ok(None) => None,
                    Err(err) => Some(Err(err)),
                };
                match outcome {
                    Some(Ok(report)) if report.still_pending.is_empty() => {
                        consecutive_failures = 0;
                    }
                    Some(Ok(report)) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        debug!(
                            "[Scorekeep] Background drain left {} pending (failures={})",
                            report.still_pending.len(),
                            consecutive_failures
                        );
                    }
                    Some(Err(err)) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        warn!("[Scorekeep] Background drain failed: {}", err);
                    }
                    None => {}
                }

                let delay_ms = next_probe_delay_ms(
                    manager.options.probe_interval_secs,
                    consecutive_failures,
                    compute_jitter_ms(),
                );
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
        })
    }

    async fn has_pending(&self) -> bool {
        !self.state.lock().await.queue.is_empty()
    }

    async fn request_drain(&self) -> Result<DrainReport> {
        {
            let mut gate = self.lock_gate();
            if gate.running {
                gate.rerun = true;
                debug!("[Scorekeep] Drain already running; coalescing request");
                return Ok(DrainReport::default());
            }
            gate.running = true;
        }

        let mut report = DrainReport::default();
        loop {
            let pass = self.drain_pass().await;
            let rerun = {
                let mut gate = self.lock_gate();
                let rerun = gate.rerun && pass.is_ok();
                gate.rerun = false;
                if !rerun {
                    gate.running = false;
                }
                rerun
            };
            let pass = pass?;
            report.succeeded.extend(pass.succeeded);
            report.still_pending = pass.still_pending;
            if !rerun {
                return Ok(report);
            }
        }
    }

    fn lock_gate(&self) -> std::sync::MutexGuard<'_, DrainGate> {
        self.drain_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn drain_pass(&self) -> Result<DrainReport> {
        let (player_id, batch) = {
            let mut state = self.state.lock().await;
            if !state.is_authenticated() {
                debug!("[Scorekeep] Drain skipped: no authenticated player");
                return Ok(DrainReport {
                    succeeded: Vec::new(),
                    still_pending: state.queue.entries().to_vec(),
                });
            }
            let batch = state.queue.begin_drain();
            debug!(
                "[Scorekeep] Drain pass started player={} batch={} in_flight={}",
                state.player_id,
                batch.len(),
                state.queue.in_flight_count()
            );
            (state.player_id.clone(), batch)
        };
        self.drain_passes.fetch_add(1, Ordering::SeqCst);

        let mut report = DrainReport::default();
        if batch.is_empty() {
            return Ok(report);
        }
        for entry in batch {
            match self.deliver_and_settle(&player_id, &entry).await {
                SettleOutcome::Removed => report.succeeded.push(entry),
                SettleOutcome::Retained => report.still_pending.push(entry),
                SettleOutcome::Discarded => {}
            }
        }

        let state = self.state.lock().await;
        self.persist(&state).await?;
        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Delivery helpers
    // ─────────────────────────────────────────────────────────────────────

    fn claim_for_immediate_send(
        &self,
        state: &mut EngineState,
        pending_id: uuid::Uuid,
    ) -> ClaimedSend {
        if !state.is_authenticated() {
            return ClaimedSend::Skipped {
                entry: state.queue.entries().iter().find(|e| e.id == pending_id).cloned(),
                reason: Error::AuthenticationRequired.to_string(),
            };
        }
        if !self.connectivity.is_available() {
            return ClaimedSend::Skipped {
                entry: state.queue.entries().iter().find(|e| e.id == pending_id).cloned(),
                reason: Error::RemoteUnreachable("connectivity unavailable".to_string())
                    .to_string(),
            };
        }
        match state.queue.claim(pending_id) {
            Some(entry) => ClaimedSend::Claimed {
                player_id: state.player_id.clone(),
                entry,
            },
            None => ClaimedSend::Skipped {
                entry: None,
                reason: String::new(),
            },
        }
    }

    async fn send_claimed(&self, claimed: ClaimedSend) -> RecordOutcome {
        match claimed {
            ClaimedSend::Claimed { player_id, entry } => {
                match self.deliver_and_settle(&player_id, &entry).await {
                    SettleOutcome::Removed => {
                        let state = self.state.lock().await;
                        if let Err(err) = self.persist(&state).await {
                            warn!("[Scorekeep] Could not persist delivery of {}: {}", entry.id, err);
                        }
                        RecordOutcome::Delivered
                    }
                    SettleOutcome::Retained => RecordOutcome::Queued,
                    SettleOutcome::Discarded => RecordOutcome::Discarded,
                }
            }
            ClaimedSend::Skipped { entry, reason } => {
                if let Some(entry) = entry {
                    debug!(
                        "[Scorekeep] Queued {} for later delivery: {}",
                        entry.target_id(),
                        reason
                    );
                    self.emit_report(&entry, Err(reason));
                }
                RecordOutcome::Queued
            }
        }
    }

    /// Makes one remote attempt (lock released) and records its outcome.
    async fn deliver_and_settle(&self, player_id: &str, entry: &PendingSubmission) -> SettleOutcome {
        let result = match &entry.payload {
            SubmissionPayload::Score(record) => {
                self.remote
                    .submit_score(player_id, &record.leaderboard_id, record.value)
                    .await
            }
            SubmissionPayload::Achievement(record) => {
                self.remote
                    .submit_achievement(player_id, &record.achievement_id, record.percent_complete)
                    .await
            }
        };
        let delivered = result.is_ok();
        let outcome = {
            let mut state = self.state.lock().await;
            state.settle(player_id, entry, delivered)
        };

        match (outcome, result) {
            (SettleOutcome::Discarded, _) => {
                debug!(
                    "[Scorekeep] Result for {} discarded; entry left the queue while in flight",
                    entry.id
                );
            }
            (_, Ok(())) => self.emit_report(entry, Ok(())),
            (_, Err(err)) => {
                let err = Error::from(err);
                warn!(
                    "[Scorekeep] Submission for {} failed, keeping it queued: {}",
                    entry.target_id(),
                    err
                );
                self.emit_report(entry, Err(err.to_string()));
            }
        }
        outcome
    }

    fn emit_report(&self, entry: &PendingSubmission, result: std::result::Result<(), String>) {
        let event = match (&entry.payload, result) {
            (SubmissionPayload::Score(r), Ok(())) => SyncEvent::ScoreReportSucceeded {
                leaderboard_id: r.leaderboard_id.clone(),
                value: r.value,
            },
            (SubmissionPayload::Score(r), Err(reason)) => SyncEvent::ScoreReportFailed {
                leaderboard_id: r.leaderboard_id.clone(),
                value: r.value,
                reason,
            },
            (SubmissionPayload::Achievement(r), Ok(())) => SyncEvent::AchievementReportSucceeded {
                achievement_id: r.achievement_id.clone(),
                percent_complete: r.percent_complete,
            },
            (SubmissionPayload::Achievement(r), Err(reason)) => {
                SyncEvent::AchievementReportFailed {
                    achievement_id: r.achievement_id.clone(),
                    percent_complete: r.percent_complete,
                    reason,
                }
            }
        };
        self.events.emit(event);
    }

    async fn persist(&self, state: &EngineState) -> Result<()> {
        self.store.save(&state.to_persisted()).await.map_err(|err| {
            warn!("[Scorekeep] Failed to persist state: {}", err);
            match err {
                Error::PersistenceWriteFailed(_) => err,
                other => Error::write_failed(other.to_string()),
            }
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Delivery {
    Immediate,
    Deferred,
}

enum ClaimedSend {
    Claimed {
        player_id: String,
        entry: PendingSubmission,
    },
    Skipped {
        entry: Option<PendingSubmission>,
        reason: String,
    },
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::invalid_input("identifier must not be empty"));
    }
    Ok(())
}

fn accept_score(cache: &mut LocalCache, leaderboard_id: &str, value: i64) -> Option<PendingSubmission> {
    if !cache.record_score(leaderboard_id, value) {
        return None;
    }
    cache
        .score_record(leaderboard_id)
        .cloned()
        .map(PendingSubmission::score)
}

fn accept_achievement(
    cache: &mut LocalCache,
    achievement_id: &str,
    percent: f64,
) -> Option<PendingSubmission> {
    if !cache.record_achievement(achievement_id, percent) {
        return None;
    }
    cache
        .achievements()
        .get(achievement_id)
        .cloned()
        .map(PendingSubmission::achievement)
}

fn validate_percent(achievement_id: &str, percent: f64) -> Result<()> {
    validate_id(achievement_id)?;
    if percent.is_nan() {
        return Err(Error::invalid_input("achievement percent must be a number"));
    }
    Ok(())
}
