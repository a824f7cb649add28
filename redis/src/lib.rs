//! Redis-backed coordination stores for the presence admission pipeline.
//!
//! Two providers live here, both built on the atomic set-if-not-present
//! primitives Redis gives us:
//!
//! - [`RedisLockManager`] — the distributed (person, room) lock: `SET NX PX`
//!   acquisition with a random holder token and a Lua compare-and-delete
//!   release, so an expired-and-reacquired lock is never deleted by its old
//!   holder.
//! - [`RedisIdempotencyStore`] — memoized admission outcomes: `SET NX EX`
//!   first-writer-wins with a TTL on the order of an hour.
//!
//! Both types share a [`ConnectionManager`](redis::aio::ConnectionManager)
//! per instance and are `Clone`; clones share the underlying pool.
//!
//! # Key namespacing
//!
//! All keys are prefixed (`presence:lock:`, `presence:idem:`) to avoid
//! collisions on shared Redis instances.

pub mod idempotency;
pub mod lock;

pub use idempotency::RedisIdempotencyStore;
pub use lock::RedisLockManager;

use presence_core::PresenceError;

pub(crate) fn storage_err(context: &str, e: &redis::RedisError) -> PresenceError {
    PresenceError::Storage(format!("{context}: {e}"))
}
