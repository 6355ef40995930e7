//! Reachability probe against the service health endpoint.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use scorekeep_core::sync::ReachabilityProbe;

use crate::error::Result;

const PROBE_TIMEOUT_SECS: u64 = 5;

/// Reports the service reachable when `GET /api/v1/health` answers 2xx.
#[derive(Debug, Clone)]
pub struct HttpReachabilityProbe {
    client: reqwest::Client,
    health_url: String,
}

impl HttpReachabilityProbe {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            health_url: format!("{}/api/v1/health", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachabilityProbe {
    async fn probe(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("[Scorekeep] Health probe failed: {}", err);
                false
            }
        }
    }
}
