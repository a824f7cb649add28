//! Event publisher trait: one-way handoff to the event log/broker.
//!
//! Fire-and-forget from this core's perspective. A publish failure is the
//! publisher's problem to report and the caller's to log; it never changes
//! a committed admission outcome.

use crate::error::Result;
use std::future::Future;

/// One-way event publication to downstream consumers.
pub trait EventPublisher: Send + Sync {
    /// Publish `payload` under `key` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PresenceError::Publish`] if the broker rejects or
    /// times out the delivery.
    fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<()>> + Send;
}
