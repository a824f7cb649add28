//! Redis-based idempotency store.
//!
//! Memoizes the final outcome of a completed admission request under its
//! idempotency token, JSON-serialized, with a TTL on the order of an hour.
//!
//! `SET NX EX` gives first-writer-wins in one atomic command: concurrent
//! completions of the same token store exactly one outcome, and later
//! writers observe that they lost without clobbering it.

use crate::storage_err;
use presence_core::providers::IdempotencyStore;
use presence_core::{CheckInOutcome, IdempotencyToken, PresenceError, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// `Redis`-based token → outcome store with TTL expiry.
///
/// # Thread Safety
///
/// This type is `Clone`; each clone shares the same `ConnectionManager`
/// (connection pool).
#[derive(Clone)]
pub struct RedisIdempotencyStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisIdempotencyStore {
    /// Create a new `Redis` idempotency store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    ///
    /// # Errors
    ///
    /// Returns a storage error if the client cannot be created or the
    /// connection to `Redis` fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| storage_err("failed to create Redis client", &e))?;
        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| storage_err("failed to create Redis connection manager", &e))?;
        Ok(Self { conn_manager })
    }

    /// Get the `Redis` key for a token.
    fn entry_key(token: &IdempotencyToken) -> String {
        format!("presence:idem:{}", token.as_str())
    }
}

impl IdempotencyStore for RedisIdempotencyStore {
    async fn get(&self, token: &IdempotencyToken) -> Result<Option<CheckInOutcome>> {
        let mut conn = self.conn_manager.clone();
        let entry_key = Self::entry_key(token);

        let json: Option<String> = conn
            .get(&entry_key)
            .await
            .map_err(|e| storage_err("failed to read idempotency entry", &e))?;

        json.map(|j| {
            serde_json::from_str(&j).map_err(|e| {
                PresenceError::Serialization(format!("stored idempotency entry is invalid: {e}"))
            })
        })
        .transpose()
    }

    async fn put_if_absent(
        &self,
        token: &IdempotencyToken,
        outcome: &CheckInOutcome,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let entry_key = Self::entry_key(token);

        let json = serde_json::to_string(outcome)
            .map_err(|e| PresenceError::Serialization(e.to_string()))?;
        let ttl_secs = ttl.as_secs().max(1);

        // SET NX EX: store-if-absent with expiry, one atomic command
        let reply: Option<String> = redis::cmd("SET")
            .arg(&entry_key)
            .arg(json)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| storage_err("failed to store idempotency entry", &e))?;

        let created = reply.is_some();
        tracing::debug!(
            token = token.as_str(),
            created,
            ttl_secs,
            "memoized admission outcome"
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use presence_core::RecordId;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    async fn store() -> RedisIdempotencyStore {
        RedisIdempotencyStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap()
    }

    fn fresh_token() -> IdempotencyToken {
        IdempotencyToken::new(format!("test:{}", uuid::Uuid::new_v4())).unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn first_writer_wins() {
        let store = store().await;
        let token = fresh_token();

        let first = CheckInOutcome::Accepted {
            record_id: RecordId::new(),
        };
        let second = CheckInOutcome::Accepted {
            record_id: RecordId::new(),
        };

        assert!(
            store
                .put_if_absent(&token, &first, Duration::from_secs(60))
                .await
                .unwrap()
        );
        assert!(
            !store
                .put_if_absent(&token, &second, Duration::from_secs(60))
                .await
                .unwrap()
        );

        assert_eq!(store.get(&token).await.unwrap(), Some(first));
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn missing_token_reads_as_none() {
        let store = store().await;
        assert_eq!(store.get(&fresh_token()).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn entries_expire_with_their_ttl() {
        let store = store().await;
        let token = fresh_token();
        let outcome = CheckInOutcome::Accepted {
            record_id: RecordId::new(),
        };

        store
            .put_if_absent(&token, &outcome, Duration::from_secs(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(store.get(&token).await.unwrap(), None);
    }
}
