//! Offline-first reconciliation of game scores and achievements.
//!
//! The [`sync::SyncManager`] keeps a max-wins local cache, persists it through
//! a [`sync::StateStore`], and delivers queued submissions to a
//! [`sync::RemoteScoreService`] whenever the service is reachable.

pub mod config;
pub mod errors;
pub mod events;
pub mod sync;

pub use config::ScorekeepConfig;
pub use errors::{Error, Result};
