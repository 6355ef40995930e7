//! Runtime configuration, read from the environment.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::errors::{Error, Result};
use crate::sync::DEFAULT_PROBE_INTERVAL_SECS;

/// File name of the encrypted state inside the data directory.
pub const STATE_FILE_NAME: &str = "scorekeep.state";

const ENV_DATA_PATH: &str = "SCOREKEEP_DATA_PATH";
const ENV_SECRET: &str = "SCOREKEEP_SECRET";
const ENV_API_URL: &str = "SCOREKEEP_API_URL";
const ENV_API_TOKEN: &str = "SCOREKEEP_API_TOKEN";
const ENV_PROBE_INTERVAL: &str = "SCOREKEEP_PROBE_INTERVAL_SECS";
const ENV_LEADERBOARDS: &str = "SCOREKEEP_LEADERBOARDS";
const ENV_ACHIEVEMENTS: &str = "SCOREKEEP_ACHIEVEMENTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorekeepConfig {
    /// Location of the encrypted state file.
    pub data_path: PathBuf,
    /// Deployment secret the storage key is derived from.
    ///
    /// Shipped with the client, so encryption only obfuscates data at rest.
    pub encryption_secret: String,
    /// Base URL of the remote score service; remote calls are disabled when unset.
    pub api_base_url: Option<String>,
    /// Bearer token presented to the remote score service.
    pub api_token: Option<String>,
    pub probe_interval_secs: u64,
    /// Leaderboards to fetch during sync even if nothing was recorded locally.
    pub tracked_leaderboards: Vec<String>,
    pub tracked_achievements: Vec<String>,
}

impl ScorekeepConfig {
    pub fn new(data_path: impl Into<PathBuf>, encryption_secret: impl Into<String>) -> Self {
        Self {
            data_path: data_path.into(),
            encryption_secret: encryption_secret.into(),
            api_base_url: None,
            api_token: None,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            tracked_leaderboards: Vec::new(),
            tracked_achievements: Vec::new(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let encryption_secret = non_empty(ENV_SECRET)
            .ok_or_else(|| Error::Config(format!("{} is not configured", ENV_SECRET)))?;

        let data_path = match non_empty(ENV_DATA_PATH) {
            Some(path) => PathBuf::from(path),
            None => default_data_path()?,
        };

        let probe_interval_secs = match non_empty(ENV_PROBE_INTERVAL) {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                Error::Config(format!("{} must be a number of seconds: {}", ENV_PROBE_INTERVAL, e))
            })?,
            None => DEFAULT_PROBE_INTERVAL_SECS,
        };

        Ok(Self {
            data_path,
            encryption_secret,
            api_base_url: non_empty(ENV_API_URL).map(|v| v.trim_end_matches('/').to_string()),
            api_token: non_empty(ENV_API_TOKEN),
            probe_interval_secs: probe_interval_secs.max(1),
            tracked_leaderboards: split_ids(non_empty(ENV_LEADERBOARDS)),
            tracked_achievements: split_ids(non_empty(ENV_ACHIEVEMENTS)),
        })
    }
}

/// Per-user location of the state file.
pub fn default_data_path() -> Result<PathBuf> {
    ProjectDirs::from("app", "scorekeep", "scorekeep")
        .map(|dirs| dirs.data_local_dir().join(STATE_FILE_NAME))
        .ok_or_else(|| Error::Config("Could not resolve a home directory".to_string()))
}

fn split_ids(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
