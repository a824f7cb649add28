//! In-memory idempotency store.
//!
//! First-writer-wins with lazy TTL expiry, plus a programmable failure
//! flag so tests can exercise the orchestrator's fail-open path.

use presence_core::providers::IdempotencyStore;
use presence_core::{CheckInOutcome, IdempotencyToken, PresenceError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Mutex-guarded token → outcome store for tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryIdempotencyStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, (CheckInOutcome, Instant)>,
    fail: bool,
}

impl InMemoryIdempotencyStore {
    /// Make every store operation fail with a storage error.
    pub fn set_fail(&self, fail: bool) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail = fail;
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, StoreState>> {
        self.inner
            .lock()
            .map_err(|_| PresenceError::Storage("mutex poisoned".into()))
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, token: &IdempotencyToken) -> Result<Option<CheckInOutcome>> {
        let mut state = self.guard()?;
        if state.fail {
            return Err(PresenceError::Storage("mock idempotency store down".into()));
        }

        let now = Instant::now();
        let entry = state
            .entries
            .get(token.as_str())
            .map(|(outcome, expiry)| (outcome.clone(), *expiry));
        match entry {
            Some((outcome, expiry)) if expiry > now => Ok(Some(outcome)),
            Some(_) => {
                state.entries.remove(token.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put_if_absent(
        &self,
        token: &IdempotencyToken,
        outcome: &CheckInOutcome,
        ttl: Duration,
    ) -> Result<bool> {
        let mut state = self.guard()?;
        if state.fail {
            return Err(PresenceError::Storage("mock idempotency store down".into()));
        }

        let now = Instant::now();
        let live = state
            .entries
            .get(token.as_str())
            .is_some_and(|(_, expiry)| *expiry > now);
        if live {
            return Ok(false);
        }
        state
            .entries
            .insert(token.as_str().to_owned(), (outcome.clone(), now + ttl));
        Ok(true)
    }
}
