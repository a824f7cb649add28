//! In-memory attendance ledger.
//!
//! The admission write holds one mutex across the token check, the person
//! check, the occupancy count, and the insert — the same atomicity the
//! `PostgreSQL` implementation gets from SERIALIZABLE isolation, which is
//! exactly what the concurrency tests need to exercise the orchestrator.

use chrono::NaiveDate;
use presence_core::providers::{AttendanceLedger, InsertOutcome};
use presence_core::{AttendanceRecord, PersonId, PresenceError, RecordId, Result, RoomId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mutex-guarded ledger for tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    records: Arc<Mutex<HashMap<RecordId, AttendanceRecord>>>,
}

impl InMemoryLedger {
    /// Total number of stored records (all rooms, all days).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the internal mutex is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.guard()?.len())
    }

    /// `true` if no records are stored.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the internal mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.guard()?.is_empty())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, HashMap<RecordId, AttendanceRecord>>> {
        self.records
            .lock()
            .map_err(|_| PresenceError::Storage("mutex poisoned".into()))
    }
}

impl AttendanceLedger for InMemoryLedger {
    async fn insert_if_under_capacity(
        &self,
        record: &AttendanceRecord,
        capacity: u32,
    ) -> Result<InsertOutcome> {
        let mut records = self.guard()?;

        if let Some(token) = record.idempotency_token() {
            if let Some(existing) = records
                .values()
                .find(|r| r.idempotency_token() == Some(token))
            {
                return Ok(InsertOutcome::DuplicateToken(existing.clone()));
            }
        }

        let day = record.check_in_date();
        if let Some(existing) = records
            .values()
            .filter(|r| r.person_id() == record.person_id() && r.check_in_date() == day)
            .max_by_key(|r| r.check_in_time())
        {
            return Ok(InsertOutcome::PersonPresent(existing.clone()));
        }

        let occupancy = records
            .values()
            .filter(|r| r.room_id() == record.room_id() && r.check_in_date() == day)
            .count() as u64;
        if occupancy >= u64::from(capacity) {
            return Ok(InsertOutcome::CapacityExceeded { occupancy });
        }

        records.insert(record.id(), record.clone());
        Ok(InsertOutcome::Inserted(record.clone()))
    }

    async fn find_today_for_person(
        &self,
        person_id: PersonId,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let records = self.guard()?;
        Ok(records
            .values()
            .filter(|r| r.person_id() == person_id && r.check_in_date() == day)
            .max_by_key(|r| r.check_in_time())
            .cloned())
    }

    async fn find_open_for_person(&self, person_id: PersonId) -> Result<Option<AttendanceRecord>> {
        let records = self.guard()?;
        Ok(records
            .values()
            .filter(|r| r.person_id() == person_id)
            .max_by_key(|r| r.check_in_time())
            .cloned())
    }

    async fn count_for_room(&self, room_id: RoomId, day: NaiveDate) -> Result<u64> {
        let records = self.guard()?;
        Ok(records
            .values()
            .filter(|r| r.room_id() == room_id && r.check_in_date() == day)
            .count() as u64)
    }

    async fn remove(&self, record_id: RecordId) -> Result<bool> {
        let mut records = self.guard()?;
        Ok(records.remove(&record_id).is_some())
    }
}
