//! Retry policy and background cadence helpers.

use serde::{Deserialize, Serialize};

/// Default reachability probe cadence in seconds.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Maximum jitter (milliseconds) added to background loop sleeps.
pub const PROBE_INTERVAL_JITTER_MS: u64 = 2_000;

/// Retry policy classification for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> SyncRetryClass {
    match status {
        401 | 403 => SyncRetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => SyncRetryClass::Retryable,
        500..=599 => SyncRetryClass::Retryable,
        _ => SyncRetryClass::Permanent,
    }
}

/// Exponential backoff in seconds with cap.
pub fn backoff_seconds(consecutive_failures: i32) -> i64 {
    const MAX_EXPONENT: i32 = 8;
    const BASE_DELAY_SECONDS: i64 = 5;

    let capped = i64::from(consecutive_failures.clamp(0, MAX_EXPONENT));
    2_i64.pow(capped as u32) * BASE_DELAY_SECONDS
}

/// Delay before the next background probe.
///
/// Healthy loops use the configured interval; after failed drains the delay
/// grows with `backoff_seconds` but never drops below the interval.
pub fn next_probe_delay_ms(interval_secs: u64, consecutive_failures: i32, jitter_ms: u64) -> u64 {
    let base_ms = interval_secs.saturating_mul(1000);
    if consecutive_failures <= 0 {
        return base_ms.saturating_add(jitter_ms);
    }
    let backoff_ms = (backoff_seconds(consecutive_failures) as u64).saturating_mul(1000);
    base_ms.max(backoff_ms).saturating_add(jitter_ms)
}

pub(crate) fn compute_jitter_ms() -> u64 {
    chrono::Utc::now().timestamp_subsec_millis() as u64 % PROBE_INTERVAL_JITTER_MS.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_http_status_for_retry_policy() {
        assert_eq!(classify_http_status(500), SyncRetryClass::Retryable);
        assert_eq!(classify_http_status(429), SyncRetryClass::Retryable);
        assert_eq!(classify_http_status(401), SyncRetryClass::ReauthRequired);
        assert_eq!(classify_http_status(400), SyncRetryClass::Permanent);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert_eq!(backoff_seconds(0), 5);
        assert_eq!(backoff_seconds(1), 10);
        assert_eq!(backoff_seconds(2), 20);
        assert_eq!(backoff_seconds(9), backoff_seconds(8));
    }

    #[test]
    fn probe_delay_uses_interval_until_failures_accumulate() {
        assert_eq!(next_probe_delay_ms(30, 0, 0), 30_000);
        assert_eq!(next_probe_delay_ms(30, 1, 0), 30_000);
        assert_eq!(next_probe_delay_ms(30, 3, 0), 40_000);
        assert_eq!(next_probe_delay_ms(30, 0, 250), 30_250);
    }
}
