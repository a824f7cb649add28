//! Domain types for the room-presence admission system.
//!
//! Value objects and entities shared by the orchestrators and every store
//! implementation. Identifiers are UUID newtypes; the attendance record
//! exposes an explicit persistence snapshot instead of public mutable
//! fields, so stores serialize through a stable contract.

use crate::error::{PresenceError, RejectReason, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a person
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonId(Uuid);

impl PersonId {
    /// Creates a new random `PersonId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PersonId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a room
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(Uuid);

impl RoomId {
    /// Creates a new random `RoomId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RoomId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an attendance record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random `RecordId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RecordId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Person references
// ============================================================================

/// External identification method presented at the door.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentMethod {
    /// Physical badge / card token value
    Badge,
    /// Government or institution ID number
    IdNumber,
}

impl fmt::Display for IdentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Badge => write!(f, "badge"),
            Self::IdNumber => write!(f, "id_number"),
        }
    }
}

/// How the caller refers to a person: either the internal id directly or an
/// external identification token to be resolved against the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonRef {
    /// Already-known internal person id
    Id(PersonId),
    /// External identifier requiring directory resolution
    Identifier {
        /// Identification method tag
        method: IdentMethod,
        /// Raw identifier value
        value: String,
    },
}

// ============================================================================
// Collaborator snapshots
// ============================================================================

/// Person snapshot as supplied by the person directory collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonProfile {
    /// Internal person id
    pub id: PersonId,
    /// Whether the person is in an active/eligible state
    pub eligible: bool,
}

/// Room snapshot as supplied by the room directory collaborator.
///
/// Capacity is read from this snapshot at admission time; it is owned by the
/// room master-data service, not by this core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Room id
    pub id: RoomId,
    /// Maximum simultaneous presences the room permits
    pub capacity: u32,
    /// Whether the room is in an active/available state
    pub eligible: bool,
}

// ============================================================================
// Idempotency token
// ============================================================================

/// Maximum accepted length for a caller-supplied idempotency token.
pub const MAX_TOKEN_LEN: usize = 128;

/// Caller- or system-derived key guaranteeing a repeated admission request
/// produces the same outcome exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    /// Wrap a caller-supplied token value.
    ///
    /// # Errors
    ///
    /// Returns [`PresenceError::InvalidInput`] if the value is empty or
    /// longer than [`MAX_TOKEN_LEN`] characters. Malformed input is rejected
    /// here, before any side effect.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_TOKEN_LEN {
            return Err(PresenceError::InvalidInput(format!(
                "idempotency token must be 1..={MAX_TOKEN_LEN} characters, got {}",
                value.len()
            )));
        }
        Ok(Self(value))
    }

    /// Derive a deterministic check-in token from `(person, room, hour
    /// bucket)`.
    ///
    /// Requests without a caller-supplied token still deduplicate within the
    /// same hour: the derived key is stable for the bucket, so a retry hits
    /// the memoized outcome.
    #[must_use]
    pub fn derive_check_in(person_id: &PersonId, room_id: &RoomId, now: DateTime<Utc>) -> Self {
        Self(format!(
            "ci:{person_id}:{room_id}:{}",
            now.format("%Y%m%d%H")
        ))
    }

    /// The token value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Attendance record
// ============================================================================

/// One physical presence interval: a person admitted into a room.
///
/// Fields are private; stores persist through [`AttendanceRecord::snapshot`]
/// and rehydrate through [`AttendanceRecord::from_snapshot`]. There is no
/// checked-out state — removal from the ledger *is* the check-out signal,
/// propagated via the [`crate::event::PresenceEvent::CheckedOut`] event.
#[derive(Clone, Debug, PartialEq)]
pub struct AttendanceRecord {
    id: RecordId,
    person_id: PersonId,
    room_id: RoomId,
    check_in_time: DateTime<Utc>,
    idempotency_token: Option<IdempotencyToken>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Create a new record for a successful admission.
    ///
    /// Generates the record id; creation/update timestamps are set to the
    /// check-in time.
    #[must_use]
    pub fn admit(
        person_id: PersonId,
        room_id: RoomId,
        check_in_time: DateTime<Utc>,
        idempotency_token: Option<IdempotencyToken>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            person_id,
            room_id,
            check_in_time,
            idempotency_token,
            created_at: check_in_time,
            updated_at: check_in_time,
        }
    }

    /// Record id
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// Person this record belongs to
    #[must_use]
    pub const fn person_id(&self) -> PersonId {
        self.person_id
    }

    /// Room this record belongs to
    #[must_use]
    pub const fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// When the person checked in
    #[must_use]
    pub const fn check_in_time(&self) -> DateTime<Utc> {
        self.check_in_time
    }

    /// The idempotency token this record was admitted under, if any
    #[must_use]
    pub const fn idempotency_token(&self) -> Option<&IdempotencyToken> {
        self.idempotency_token.as_ref()
    }

    /// Calendar day (UTC) of the check-in; the unit of the "single active
    /// presence" and capacity invariants.
    #[must_use]
    pub fn check_in_date(&self) -> NaiveDate {
        self.check_in_time.date_naive()
    }

    /// Explicit persistence contract: the full record state as a plain
    /// serializable row.
    #[must_use]
    pub fn snapshot(&self) -> AttendanceSnapshot {
        AttendanceSnapshot {
            id: self.id,
            person_id: self.person_id,
            room_id: self.room_id,
            check_in_time: self.check_in_time,
            idempotency_token: self
                .idempotency_token
                .as_ref()
                .map(|t| t.as_str().to_owned()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rehydrate a record from a persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PresenceError::InvalidInput`] if the stored idempotency
    /// token violates the token length contract.
    pub fn from_snapshot(snapshot: AttendanceSnapshot) -> Result<Self> {
        let idempotency_token = snapshot.idempotency_token.map(IdempotencyToken::new).transpose()?;
        Ok(Self {
            id: snapshot.id,
            person_id: snapshot.person_id,
            room_id: snapshot.room_id,
            check_in_time: snapshot.check_in_time,
            idempotency_token,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }
}

/// Plain serializable row form of an [`AttendanceRecord`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSnapshot {
    /// Record id
    pub id: RecordId,
    /// Person id
    pub person_id: PersonId,
    /// Room id
    pub room_id: RoomId,
    /// Check-in timestamp
    pub check_in_time: DateTime<Utc>,
    /// Idempotency token value, unique when present
    pub idempotency_token: Option<String>,
    /// Row creation timestamp
    pub created_at: DateTime<Utc>,
    /// Row update timestamp
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a check-in request. Rejections are data, not errors; this is
/// also exactly what the idempotency store memoizes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckInOutcome {
    /// Admission accepted; a ledger record exists
    Accepted {
        /// Id of the (possibly pre-existing, on idempotent replay) record
        record_id: RecordId,
    },
    /// Admission rejected with a stable reason code
    Rejected {
        /// Why the admission was refused
        reason: RejectReason,
    },
}

/// Result of a check-out request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutOutcome {
    /// The active record was removed and its capacity slot reopened
    Released {
        /// Id of the removed record
        record_id: RecordId,
    },
    /// Check-out rejected with a stable reason code
    Rejected {
        /// Why the release was refused
        reason: RejectReason,
    },
}
