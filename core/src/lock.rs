//! Distributed mutual exclusion with scoped acquisition.
//!
//! A TTL lock keyed by (person, room) serializes admission attempts on the
//! client side. Every acquired lock carries a bounded lifetime so a crashed
//! holder cannot wedge the resource, and release is holder-verified: a lock
//! may only be deleted by the token that created it.
//!
//! Acquisition retries are an explicit loop with exponential backoff and a
//! hard ceiling — the worst-case wait is a deterministic function of
//! [`LockRetry`], never unbounded recursion.

use crate::error::{PresenceError, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Random token identifying one lock acquisition.
///
/// Release presents this token; a mismatch (the lock expired and someone
/// else re-acquired it) makes release a no-op instead of deleting another
/// holder's lock.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HolderToken(String);

impl HolderToken {
    /// Generate a fresh random holder token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The token value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TTL-based mutual exclusion shared across process instances.
pub trait DistributedLock: Send + Sync {
    /// Try to take the lock once. `Some(token)` on success, `None` if the
    /// key is currently held.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lock backend is unreachable.
    fn acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<Option<HolderToken>>> + Send;

    /// Release the lock if and only if `holder` still owns it, as an atomic
    /// compare-and-delete. Returns `true` if the lock was deleted, `false`
    /// on token mismatch or if the lock already expired.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lock backend is unreachable.
    fn release(
        &self,
        key: &str,
        holder: &HolderToken,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Retry/backoff parameters for lock acquisition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRetry {
    /// Lifetime of an acquired lock
    pub ttl: Duration,
    /// Re-acquisition attempts after the first try
    pub max_retries: u32,
    /// Backoff before the first retry
    pub initial_backoff: Duration,
    /// Ceiling the doubling backoff saturates at
    pub max_backoff: Duration,
}

impl Default for LockRetry {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            max_retries: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl LockRetry {
    /// The exact sleep schedule between attempts: one entry per retry,
    /// doubling from `initial_backoff` and saturating at `max_backoff`.
    #[must_use]
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let mut schedule = Vec::with_capacity(self.max_retries as usize);
        let mut backoff = self.initial_backoff.min(self.max_backoff);
        for _ in 0..self.max_retries {
            schedule.push(backoff);
            backoff = backoff.saturating_mul(2).min(self.max_backoff);
        }
        schedule
    }

    /// Deterministic worst-case time spent sleeping before [`with_lock`]
    /// gives up with `LockTimeout`.
    #[must_use]
    pub fn max_total_wait(&self) -> Duration {
        self.backoff_schedule().iter().sum()
    }
}

/// Acquire `key`, retrying per `retry`, without running any critical
/// section.
///
/// # Errors
///
/// Returns [`PresenceError::LockTimeout`] once the schedule is exhausted,
/// or a storage error if the lock backend fails.
pub async fn acquire_with_retry<L>(lock: &L, key: &str, retry: &LockRetry) -> Result<HolderToken>
where
    L: DistributedLock + ?Sized,
{
    let schedule = retry.backoff_schedule();
    let mut attempt: usize = 0;
    loop {
        if let Some(holder) = lock.acquire(key, retry.ttl).await? {
            if attempt > 0 {
                tracing::debug!(key, attempt, "acquired lock after contention");
            }
            return Ok(holder);
        }
        let Some(backoff) = schedule.get(attempt) else {
            tracing::warn!(key, attempts = attempt + 1, "lock acquisition exhausted retries");
            return Err(PresenceError::LockTimeout {
                key: key.to_owned(),
            });
        };
        tokio::time::sleep(*backoff).await;
        attempt += 1;
    }
}

/// Run `f` under the lock for `key`: acquire with bounded retry, run,
/// release.
///
/// Release happens whether `f` succeeds or fails, and is holder-verified so
/// an expired-and-stolen lock is never deleted out from under its new
/// owner. If acquisition times out, `f` is never run.
///
/// # Errors
///
/// Returns [`PresenceError::LockTimeout`] if acquisition exhausts its
/// retries, or whatever `f` returns.
pub async fn with_lock<L, F, Fut, T>(lock: &L, key: &str, retry: &LockRetry, f: F) -> Result<T>
where
    L: DistributedLock + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let holder = acquire_with_retry(lock, key, retry).await?;
    let result = f().await;
    match lock.release(key, &holder).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!(key, "lock expired before release"),
        Err(e) => tracing::warn!(key, error = %e, "failed to release lock"),
    }
    result
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Minimal lock backend for exercising the acquisition loop. No TTL
    /// expiry; held keys stay held until released.
    #[derive(Clone, Default)]
    struct TestLock {
        held: Arc<Mutex<HashMap<String, HolderToken>>>,
    }

    impl DistributedLock for TestLock {
        async fn acquire(&self, key: &str, _ttl: Duration) -> Result<Option<HolderToken>> {
            let mut held = self
                .held
                .lock()
                .map_err(|_| PresenceError::Storage("poisoned".into()))?;
            if held.contains_key(key) {
                return Ok(None);
            }
            let holder = HolderToken::generate();
            held.insert(key.to_owned(), holder.clone());
            Ok(Some(holder))
        }

        async fn release(&self, key: &str, holder: &HolderToken) -> Result<bool> {
            let mut held = self
                .held
                .lock()
                .map_err(|_| PresenceError::Storage("poisoned".into()))?;
            let owned = held.get(key).is_some_and(|current| current == holder);
            if owned {
                held.remove(key);
            }
            Ok(owned)
        }
    }

    fn fast_retry(max_retries: u32) -> LockRetry {
        LockRetry {
            ttl: Duration::from_secs(1),
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn with_lock_runs_the_closure_and_releases() {
        let lock = TestLock::default();
        let result = with_lock(&lock, "checkin:p:r", &fast_retry(0), || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert!(lock.held.lock().unwrap().is_empty(), "lock must be released");
    }

    #[tokio::test]
    async fn with_lock_releases_when_the_closure_fails() {
        let lock = TestLock::default();
        let result: Result<()> = with_lock(&lock, "checkin:p:r", &fast_retry(0), || async {
            Err(PresenceError::Storage("boom".into()))
        })
        .await;
        assert!(matches!(result, Err(PresenceError::Storage(_))));
        assert!(lock.held.lock().unwrap().is_empty(), "lock must be released");
    }

    #[tokio::test]
    async fn contended_lock_times_out_without_running_the_closure() {
        let lock = TestLock::default();
        let _holder = lock
            .acquire("checkin:p:r", Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        let ran = Arc::new(Mutex::new(false));
        let ran_flag = Arc::clone(&ran);
        let result: Result<()> = with_lock(&lock, "checkin:p:r", &fast_retry(2), move || {
            let ran_flag = Arc::clone(&ran_flag);
            async move {
                *ran_flag.lock().unwrap() = true;
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(PresenceError::LockTimeout { .. })));
        assert!(!*ran.lock().unwrap(), "critical section must not run");
    }

    #[tokio::test]
    async fn release_requires_the_matching_holder_token() {
        let lock = TestLock::default();
        let holder = lock
            .acquire("checkin:p:r", Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        let stranger = HolderToken::generate();
        assert!(!lock.release("checkin:p:r", &stranger).await.unwrap());
        assert!(lock.release("checkin:p:r", &holder).await.unwrap());
    }

    #[test]
    fn backoff_schedule_doubles_and_saturates() {
        let retry = LockRetry {
            ttl: Duration::from_secs(5),
            max_retries: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(300),
        };
        let schedule = retry.backoff_schedule();
        assert_eq!(
            schedule,
            vec![
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(300),
            ]
        );
        assert_eq!(retry.max_total_wait(), Duration::from_millis(950));
    }

    mod schedule_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn schedule_is_monotone_and_capped(
                retries in 0u32..16,
                initial_ms in 1u64..1_000,
                max_ms in 1u64..5_000,
            ) {
                let retry = LockRetry {
                    ttl: Duration::from_secs(5),
                    max_retries: retries,
                    initial_backoff: Duration::from_millis(initial_ms),
                    max_backoff: Duration::from_millis(max_ms),
                };
                let schedule = retry.backoff_schedule();
                prop_assert_eq!(schedule.len(), retries as usize);
                for window in schedule.windows(2) {
                    prop_assert!(window[0] <= window[1]);
                }
                for backoff in &schedule {
                    prop_assert!(*backoff <= Duration::from_millis(max_ms));
                }
                prop_assert_eq!(
                    retry.max_total_wait(),
                    schedule.iter().sum::<Duration>()
                );
            }
        }
    }
}
