//! The attendance ledger: the capacity-checked transactional store.
//!
//! `insert_if_under_capacity` is the single source of truth for the
//! capacity invariant. Implementations must make the token-check /
//! person-check / count / insert sequence atomic with respect to concurrent
//! writers on the same room — SERIALIZABLE isolation in PostgreSQL, a mutex
//! in the in-memory test ledger. The distributed lock in front of it only
//! reduces contention; correctness never depends on it.

use crate::error::Result;
use crate::types::{AttendanceRecord, PersonId, RecordId, RoomId};
use chrono::NaiveDate;
use std::future::Future;

/// Outcome of the atomic admission write.
#[derive(Clone, Debug, PartialEq)]
pub enum InsertOutcome {
    /// The record was inserted; the admission is committed
    Inserted(AttendanceRecord),
    /// A record with the same idempotency token already exists — the
    /// request was already processed; no new row was written
    DuplicateToken(AttendanceRecord),
    /// The person already has a record for this day (any room); no new row
    /// was written. The orchestrator decides whether that is an idempotent
    /// re-entry (same room) or a rejection (different room).
    PersonPresent(AttendanceRecord),
    /// The room is at capacity for this day; no new row was written
    CapacityExceeded {
        /// Occupancy observed inside the transaction
        occupancy: u64,
    },
}

/// The attendance ledger.
pub trait AttendanceLedger: Send + Sync {
    /// Atomically admit `record` into its room if, at the instant of
    /// insertion, today's occupancy is strictly below `capacity`.
    ///
    /// Inside one atomic unit: (a) report an existing record with the same
    /// idempotency token, (b) report an existing same-day record for the
    /// person, (c) count the room's records for the record's check-in day,
    /// (d) reject if `count >= capacity`, (e) otherwise insert.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PresenceError::Conflict`] when the transaction
    /// loses a serialization conflict (the caller retries), or
    /// [`crate::PresenceError::Storage`] on other storage faults.
    fn insert_if_under_capacity(
        &self,
        record: &AttendanceRecord,
        capacity: u32,
    ) -> impl Future<Output = Result<InsertOutcome>> + Send;

    /// The person's record for `day`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend faults.
    fn find_today_for_person(
        &self,
        person_id: PersonId,
        day: NaiveDate,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>>> + Send;

    /// The person's most recent remaining record regardless of day.
    ///
    /// Check-out resolves through this: a record from a previous day that
    /// was never released still exists and must be reported as not eligible
    /// for checkout.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend faults.
    fn find_open_for_person(
        &self,
        person_id: PersonId,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>>> + Send;

    /// Number of records for `room_id` on `day` (the room's occupancy).
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend faults.
    fn count_for_room(
        &self,
        room_id: RoomId,
        day: NaiveDate,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Remove a record; `false` if it was already gone.
    ///
    /// Removal is the check-out signal — there is no persisted
    /// checked-out state.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend faults.
    fn remove(&self, record_id: RecordId) -> impl Future<Output = Result<bool>> + Send;
}
