//! Presence transition events.
//!
//! One event per accepted transition, published to a topic dedicated to
//! presence transitions and consumed asynchronously downstream (analytics
//! read models, dashboards). Delivery is best-effort, at-least-once at
//! most: publish failures never roll back the admission decision, and
//! downstream consumers perform their own deduplication by event key.

use crate::error::{PresenceError, Result};
use crate::types::{PersonId, RecordId, RoomId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default topic for presence transition events.
pub const DEFAULT_PRESENCE_TOPIC: &str = "presence-transitions";

/// A presence transition: someone entered or left a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    /// A person was admitted into a room
    CheckedIn {
        /// Ledger record created by the admission
        record_id: RecordId,
        /// Admitted person
        person_id: PersonId,
        /// Room entered
        room_id: RoomId,
        /// When the admission was recorded
        check_in_time: DateTime<Utc>,
    },
    /// A person released their presence; the record was removed
    CheckedOut {
        /// Ledger record that was removed
        record_id: RecordId,
        /// Released person
        person_id: PersonId,
        /// Room left
        room_id: RoomId,
        /// Original admission time (the record itself is gone)
        check_in_time: DateTime<Utc>,
        /// When the release happened
        check_out_time: DateTime<Utc>,
    },
}

impl PresenceEvent {
    /// The record this transition refers to.
    #[must_use]
    pub const fn record_id(&self) -> RecordId {
        match self {
            Self::CheckedIn { record_id, .. } | Self::CheckedOut { record_id, .. } => *record_id,
        }
    }

    /// Partition/deduplication key: the record id.
    #[must_use]
    pub fn key(&self) -> String {
        self.record_id().to_string()
    }

    /// JSON wire payload.
    ///
    /// # Errors
    ///
    /// Returns [`PresenceError::Serialization`] if encoding fails.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PresenceError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn checked_out_payload_carries_both_timestamps() {
        let check_in = Utc.with_ymd_and_hms(2026, 3, 9, 8, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2026, 3, 9, 17, 30, 0).unwrap();
        let event = PresenceEvent::CheckedOut {
            record_id: RecordId::new(),
            person_id: PersonId::new(),
            room_id: RoomId::new(),
            check_in_time: check_in,
            check_out_time: check_out,
        };

        let payload = event.to_payload().unwrap();
        let back: PresenceEvent = serde_json::from_slice(&payload).unwrap();
        assert_eq!(event, back);

        let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(json["type"], "checked_out");
        assert!(json["check_in_time"].is_string());
        assert!(json["check_out_time"].is_string());
    }

    #[test]
    fn event_key_is_the_record_id() {
        let record_id = RecordId::new();
        let event = PresenceEvent::CheckedIn {
            record_id,
            person_id: PersonId::new(),
            room_id: RoomId::new(),
            check_in_time: Utc::now(),
        };
        assert_eq!(event.key(), record_id.to_string());
    }
}
