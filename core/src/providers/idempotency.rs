//! The idempotency store: token → memoized admission outcome.
//!
//! First writer for a token wins; later writers observe the first outcome
//! and perform no side effects. Entries expire on their own (TTL on the
//! order of an hour), independent of the attendance record's lifetime.
//!
//! The orchestrator fails open on this store: an unavailable idempotency
//! store degrades deduplication, it never blocks admission.

use crate::error::Result;
use crate::types::{CheckInOutcome, IdempotencyToken};
use std::future::Future;
use std::time::Duration;

/// Key/TTL store of completed admission outcomes.
pub trait IdempotencyStore: Send + Sync {
    /// The memoized outcome for `token`, if the request was already
    /// processed and the entry has not expired.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend is unreachable; the caller
    /// treats that as a miss (fail-open).
    fn get(
        &self,
        token: &IdempotencyToken,
    ) -> impl Future<Output = Result<Option<CheckInOutcome>>> + Send;

    /// Record `outcome` for `token` unless an outcome is already present.
    ///
    /// Returns `true` if this call created the entry, `false` if an earlier
    /// writer won. Implementations must provide atomic set-if-not-present
    /// semantics — both correctness properties rest on that primitive.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend is unreachable; the caller
    /// logs and continues (the committed admission outcome stands).
    fn put_if_absent(
        &self,
        token: &IdempotencyToken,
        outcome: &CheckInOutcome,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool>> + Send;
}
