//! Reachability flag with edge-triggered change notifications.

use log::debug;
use tokio::sync::watch;

/// A change in reachability level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilityTransition {
    BecameAvailable,
    BecameUnavailable,
}

/// Tracks whether the remote service is reachable.
///
/// Probe results are fed through [`ConnectivityMonitor::observe`]; only level
/// changes produce a transition or wake subscribers, so a flapping probe that
/// keeps reporting "available" yields a single notification.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    available: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_available: bool) -> Self {
        let (available, _) = watch::channel(initially_available);
        Self { available }
    }

    pub fn is_available(&self) -> bool {
        *self.available.borrow()
    }

    /// Records a probe result. Returns the transition if the level changed.
    pub fn observe(&self, available: bool) -> Option<ReachabilityTransition> {
        let changed = self.available.send_if_modified(|current| {
            if *current == available {
                return false;
            }
            *current = available;
            true
        });
        if !changed {
            return None;
        }
        debug!("[Scorekeep] Reachability changed: available={}", available);
        Some(if available {
            ReachabilityTransition::BecameAvailable
        } else {
            ReachabilityTransition::BecameUnavailable
        })
    }

    /// Receiver woken on transitions only.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.available.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
