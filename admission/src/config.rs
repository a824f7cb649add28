//! Configuration for the admission pipeline.
//!
//! Loads from environment variables (prefix `PRESENCE_`) with sensible
//! defaults; every tunable maps to a knob of the lock, idempotency or
//! emitter layers.

use presence_core::DEFAULT_PRESENCE_TOPIC;
use presence_core::lock::LockRetry;
use std::env;
use std::time::Duration;

/// Admission pipeline configuration.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Lock TTL and acquisition retry/backoff parameters
    pub lock_retry: LockRetry,
    /// Lifetime of memoized admission outcomes (order of an hour)
    pub idempotency_ttl: Duration,
    /// Topic presence transition events are published to
    pub topic: String,
    /// Capacity of the emitter's bounded handoff channel
    pub emitter_buffer: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            lock_retry: LockRetry::default(),
            idempotency_ttl: Duration::from_secs(3600),
            topic: DEFAULT_PRESENCE_TOPIC.to_string(),
            emitter_buffer: 1024,
        }
    }
}

impl AdmissionConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `PRESENCE_LOCK_TTL_MS` | 5000 |
    /// | `PRESENCE_LOCK_MAX_RETRIES` | 5 |
    /// | `PRESENCE_LOCK_BACKOFF_MS` | 50 |
    /// | `PRESENCE_LOCK_BACKOFF_MAX_MS` | 1000 |
    /// | `PRESENCE_IDEMPOTENCY_TTL_SECS` | 3600 |
    /// | `PRESENCE_TOPIC` | `presence-transitions` |
    /// | `PRESENCE_EMITTER_BUFFER` | 1024 |
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Config durations fit comfortably in u64/usize
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lock_retry: LockRetry {
                ttl: Duration::from_millis(env_u64(
                    "PRESENCE_LOCK_TTL_MS",
                    defaults.lock_retry.ttl.as_millis() as u64,
                )),
                max_retries: env_u32(
                    "PRESENCE_LOCK_MAX_RETRIES",
                    defaults.lock_retry.max_retries,
                ),
                initial_backoff: Duration::from_millis(env_u64(
                    "PRESENCE_LOCK_BACKOFF_MS",
                    defaults.lock_retry.initial_backoff.as_millis() as u64,
                )),
                max_backoff: Duration::from_millis(env_u64(
                    "PRESENCE_LOCK_BACKOFF_MAX_MS",
                    defaults.lock_retry.max_backoff.as_millis() as u64,
                )),
            },
            idempotency_ttl: Duration::from_secs(env_u64(
                "PRESENCE_IDEMPOTENCY_TTL_SECS",
                defaults.idempotency_ttl.as_secs(),
            )),
            topic: env::var("PRESENCE_TOPIC").unwrap_or(defaults.topic),
            emitter_buffer: env_u64("PRESENCE_EMITTER_BUFFER", defaults.emitter_buffer as u64)
                .max(1) as usize,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AdmissionConfig::default();
        assert_eq!(config.idempotency_ttl, Duration::from_secs(3600));
        assert_eq!(config.topic, DEFAULT_PRESENCE_TOPIC);
        assert!(config.emitter_buffer >= 1);
        assert!(config.lock_retry.max_total_wait() < Duration::from_secs(30));
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        // No PRESENCE_* variables are set in the test environment
        let config = AdmissionConfig::from_env();
        assert_eq!(config.lock_retry, LockRetry::default());
        assert_eq!(config.topic, DEFAULT_PRESENCE_TOPIC);
    }
}
