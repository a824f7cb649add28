//! Error taxonomy for the admission pipeline.
//!
//! Two strictly separated families:
//!
//! - [`PresenceError`] — infrastructure failures. These are `Err` values:
//!   lock timeouts, storage faults, serialization problems, malformed
//!   input. Most are retryable; callers retry with the same idempotency
//!   token.
//! - [`RejectReason`] — business rejections. These are *data*, carried
//!   inside `Ok` outcomes with a stable reason code, never raised as
//!   errors: a full room or an ineligible person is an expected answer.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for admission operations.
pub type Result<T> = std::result::Result<T, PresenceError>;

/// Infrastructure failures of the admission pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresenceError {
    /// Lock acquisition exhausted its bounded retries.
    ///
    /// Retryable, and distinct from a business rejection: the admission was
    /// never decided.
    #[error("lock acquisition timed out for key {key}")]
    LockTimeout {
        /// The contended lock key
        key: String,
    },

    /// A storage backend (ledger, lock store, idempotency store) failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The transaction lost a serialization conflict or deadlock and should
    /// be retried by the caller.
    #[error("storage conflict: {0}")]
    Conflict(String),

    /// Payload or memoized-outcome (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Event publish failed.
    #[error("publish error: {0}")]
    Publish(String),

    /// Malformed input, rejected before any side effect.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PresenceError {
    /// Returns `true` if the caller may safely retry the whole request with
    /// the same idempotency token.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockTimeout { .. } | Self::Storage(_) | Self::Conflict(_)
        )
    }
}

/// Business rejection reasons, exposed to callers as stable codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Person is unknown to the directory or not in an eligible state
    PersonIneligible,
    /// Room is unknown to the directory or not in an available state
    RoomUnavailable,
    /// Person already has an active presence today in a different room
    AlreadyPresentElsewhere,
    /// Room occupancy has reached its capacity for today
    CapacityExceeded,
    /// No active presence record exists to release
    NoActivePresence,
    /// The active record is not from today and cannot be checked out
    NotEligibleForCheckout,
}

impl RejectReason {
    /// The stable wire code for this rejection.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PersonIneligible => "person_ineligible",
            Self::RoomUnavailable => "room_unavailable",
            Self::AlreadyPresentElsewhere => "already_present_elsewhere",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::NoActivePresence => "no_active_presence",
            Self::NotEligibleForCheckout => "not_eligible_for_checkout",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(
            PresenceError::LockTimeout {
                key: "checkin:a:b".into()
            }
            .is_retryable()
        );
        assert!(PresenceError::Storage("connection reset".into()).is_retryable());
        assert!(PresenceError::Conflict("40001".into()).is_retryable());
        assert!(!PresenceError::InvalidInput("empty identifier".into()).is_retryable());
        assert!(!PresenceError::Serialization("bad json".into()).is_retryable());
    }

    #[test]
    fn reason_codes_match_wire_format() {
        let json = serde_json::to_string(&RejectReason::AlreadyPresentElsewhere).unwrap();
        assert_eq!(json, "\"already_present_elsewhere\"");
        assert_eq!(
            RejectReason::AlreadyPresentElsewhere.to_string(),
            "already_present_elsewhere"
        );
    }
}
