//! In-memory TTL lock.
//!
//! Same contract as the Redis lock: create-if-absent with an expiry, and
//! holder-verified release. Expired entries are reclaimed lazily on the
//! next acquire, like a Redis key TTL would.

use presence_core::lock::{DistributedLock, HolderToken};
use presence_core::{PresenceError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Mutex-guarded lock table for tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLock {
    held: Arc<Mutex<HashMap<String, (HolderToken, Instant)>>>,
}

impl InMemoryLock {
    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (HolderToken, Instant)>>> {
        self.held
            .lock()
            .map_err(|_| PresenceError::Storage("mutex poisoned".into()))
    }
}

impl DistributedLock for InMemoryLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<HolderToken>> {
        let mut held = self.guard()?;
        let now = Instant::now();

        let still_held = held.get(key).is_some_and(|(_, expiry)| *expiry > now);
        if still_held {
            return Ok(None);
        }

        let holder = HolderToken::generate();
        held.insert(key.to_owned(), (holder.clone(), now + ttl));
        Ok(Some(holder))
    }

    async fn release(&self, key: &str, holder: &HolderToken) -> Result<bool> {
        let mut held = self.guard()?;
        let now = Instant::now();

        let entry = held
            .get(key)
            .map(|(current, expiry)| (current.clone(), *expiry));
        match entry {
            Some((current, expiry)) if current == *holder => {
                // Remove even a lapsed lease, but report a lapsed one as a
                // failed release, the way an expired Redis key would read
                held.remove(key);
                Ok(expiry > now)
            }
            _ => Ok(false),
        }
    }
}
