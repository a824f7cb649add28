//! Redis-based distributed lock.
//!
//! # Algorithm
//!
//! - **Acquire**: `SET key holder NX PX ttl` — one round trip, atomic
//!   create-if-absent with a millisecond lifetime. The holder value is a
//!   random token generated per acquisition.
//! - **Release**: Lua compare-and-delete — `GET` and `DEL` in one script so
//!   a holder whose lock expired (and was re-acquired by someone else)
//!   cannot delete the new owner's lock.
//!
//! The TTL bounds how long a crashed holder can wedge a (person, room)
//! pair; the transactional ledger stays correct even if the lock expires
//! mid-admission.

use crate::storage_err;
use presence_core::lock::{DistributedLock, HolderToken};
use presence_core::Result;
use redis::aio::ConnectionManager;
use redis::Client;
use std::time::Duration;

/// Atomic compare-and-delete: delete the key only if the stored holder
/// matches the caller's token.
const RELEASE_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end";

/// `Redis`-based TTL lock with holder-verified release.
///
/// # Thread Safety
///
/// This type is `Clone`; each clone shares the same `ConnectionManager`
/// (connection pool).
#[derive(Clone)]
pub struct RedisLockManager {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisLockManager {
    /// Create a new `Redis` lock manager.
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

    /// Get the `Redis` key for a lock.
    fn lock_key(key: &str) -> String {
        format!("presence:lock:{key}")
    }
}

impl DistributedLock for RedisLockManager {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<HolderToken>> {
        let mut conn = self.conn_manager.clone();
        let lock_key = Self::lock_key(key);
        let holder = HolderToken::generate();

        #[allow(clippy::cast_possible_truncation)] // Lock TTLs are a few seconds
        let ttl_ms = (ttl.as_millis() as u64).max(1);

        // SET NX PX: create-if-absent with expiry, one atomic command
        let reply: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg(holder.as_str())
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| storage_err("failed to acquire lock", &e))?;

        if reply.is_some() {
            tracing::debug!(key, ttl_ms, "acquired lock");
            Ok(Some(holder))
        } else {
            tracing::debug!(key, "lock contended");
            Ok(None)
        }
    }

    async fn release(&self, key: &str, holder: &HolderToken) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let lock_key = Self::lock_key(key);

        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&lock_key)
            .arg(holder.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| storage_err("failed to release lock", &e))?;

        if deleted == 1 {
            tracing::debug!(key, "released lock");
            Ok(true)
        } else {
            tracing::debug!(key, "release skipped, holder mismatch or expired");
            Ok(false)
        }
    }
}
