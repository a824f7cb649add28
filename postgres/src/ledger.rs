//! The SERIALIZABLE count-then-insert admission write.
//!
//! # Why a transaction and not just the lock
//!
//! The distributed (person, room) lock reduces contention, but its TTL can
//! expire mid-admission and callers can bypass it. The transaction is the
//! single source of truth: inside one SERIALIZABLE unit it re-checks the
//! idempotency token, re-checks the person's same-day presence, counts the
//! room's occupancy, and inserts. Two such transactions racing on the same
//! room cannot both commit an over-capacity insert — one loses the
//! serialization conflict (SQLSTATE 40001) and surfaces as a retryable
//! [`PresenceError::Conflict`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use presence_core::providers::{AttendanceLedger, InsertOutcome};
use presence_core::{
    AttendanceRecord, AttendanceSnapshot, PersonId, PresenceError, RecordId, Result, RoomId,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "id, person_id, room_id, check_in_time, idempotency_token, created_at, updated_at";

/// `PostgreSQL`-backed attendance ledger.
///
/// # Thread Safety
///
/// This type is `Clone`; each clone shares the same connection pool.
#[derive(Clone)]
pub struct PostgresAttendanceLedger {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

/// Row form of an attendance record.
#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    person_id: Uuid,
    room_id: Uuid,
    check_in_time: DateTime<Utc>,
    idempotency_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LedgerRow {
    fn into_record(self) -> Result<AttendanceRecord> {
        AttendanceRecord::from_snapshot(AttendanceSnapshot {
            id: RecordId::from_uuid(self.id),
            person_id: PersonId::from_uuid(self.person_id),
            room_id: RoomId::from_uuid(self.room_id),
            check_in_time: self.check_in_time,
            idempotency_token: self.idempotency_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// UTC day bounds `[start, end)` for the ledger's "today" queries.
fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

/// Map a sqlx error onto the pipeline taxonomy: serialization failures and
/// deadlocks are retryable conflicts, everything else is a storage fault.
fn map_db_err(context: &str, e: &sqlx::Error) -> PresenceError {
    if let sqlx::Error::Database(db_err) = e {
        if matches!(db_err.code().as_deref(), Some("40001" | "40P01")) {
            return PresenceError::Conflict(format!("{context}: {db_err}"));
        }
    }
    PresenceError::Storage(format!("{context}: {e}"))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

impl PostgresAttendanceLedger {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `PostgreSQL` and build a pooled ledger.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_db_err("failed to connect to PostgreSQL", &e))?;
        Ok(Self::new(pool))
    }

    /// Run the embedded ledger migrations.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PresenceError::Storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<AttendanceRecord>> {
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM attendance_records WHERE idempotency_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_err("failed to look up record by token", &e))?;

        row.map(LedgerRow::into_record).transpose()
    }
}

impl AttendanceLedger for PostgresAttendanceLedger {
    #[tracing::instrument(skip(self, record), fields(room_id = %record.room_id(), person_id = %record.person_id()))]
    async fn insert_if_under_capacity(
        &self,
        record: &AttendanceRecord,
        capacity: u32,
    ) -> Result<InsertOutcome> {
        let snapshot = record.snapshot();
        let (day_start, day_end) = day_bounds(record.check_in_date());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_err("failed to begin admission transaction", &e))?;

        // Must be the first statement of the transaction
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_err("failed to set isolation level", &e))?;

        // (a) a record with this token means the request was already processed
        if let Some(token) = &snapshot.idempotency_token {
            let existing = sqlx::query_as::<_, LedgerRow>(&format!(
                "SELECT {SELECT_COLUMNS} FROM attendance_records WHERE idempotency_token = $1"
            ))
            .bind(token)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_db_err("failed to check idempotency token", &e))?;

            if let Some(row) = existing {
                let _ = tx.rollback().await;
                return Ok(InsertOutcome::DuplicateToken(row.into_record()?));
            }
        }

        // (a') the per-(person, room) lock cannot serialize one person racing
        // into two different rooms; this read closes that window
        let present = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM attendance_records \
             WHERE person_id = $1 AND check_in_time >= $2 AND check_in_time < $3 \
             ORDER BY check_in_time DESC LIMIT 1"
        ))
        .bind(snapshot.person_id.as_uuid())
        .bind(day_start)
        .bind(day_end)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_db_err("failed to check active presence", &e))?;

        if let Some(row) = present {
            let _ = tx.rollback().await;
            return Ok(InsertOutcome::PersonPresent(row.into_record()?));
        }

        // (b) count today's occupancy for the room
        let (occupancy,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM attendance_records \
             WHERE room_id = $1 AND check_in_time >= $2 AND check_in_time < $3",
        )
        .bind(snapshot.room_id.as_uuid())
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_err("failed to count room occupancy", &e))?;

        #[allow(clippy::cast_sign_loss)] // COUNT(*) is never negative
        let occupancy = occupancy.max(0) as u64;

        // (c) reject at capacity
        if occupancy >= u64::from(capacity) {
            let _ = tx.rollback().await;
            tracing::info!(occupancy, capacity, "admission rejected at capacity");
            return Ok(InsertOutcome::CapacityExceeded { occupancy });
        }

        // (d) insert and commit
        let inserted = sqlx::query(
            "INSERT INTO attendance_records \
             (id, person_id, room_id, check_in_time, idempotency_token, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(snapshot.id.as_uuid())
        .bind(snapshot.person_id.as_uuid())
        .bind(snapshot.room_id.as_uuid())
        .bind(snapshot.check_in_time)
        .bind(&snapshot.idempotency_token)
        .bind(snapshot.created_at)
        .bind(snapshot.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit()
                    .await
                    .map_err(|e| map_db_err("failed to commit admission", &e))?;
                tracing::info!(
                    record_id = %record.id(),
                    occupancy = occupancy + 1,
                    capacity,
                    "admission committed"
                );
                Ok(InsertOutcome::Inserted(record.clone()))
            }
            Err(e) => {
                let _ = tx.rollback().await;
                // A concurrent writer with the same token won the unique
                // index race; report their record instead of an error.
                if is_unique_violation(&e) {
                    if let Some(token) = &snapshot.idempotency_token {
                        if let Some(existing) = self.find_by_token(token).await? {
                            return Ok(InsertOutcome::DuplicateToken(existing));
                        }
                    }
                }
                Err(map_db_err("failed to insert attendance record", &e))
            }
        }
    }

    async fn find_today_for_person(
        &self,
        person_id: PersonId,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let (day_start, day_end) = day_bounds(day);
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM attendance_records \
             WHERE person_id = $1 AND check_in_time >= $2 AND check_in_time < $3 \
             ORDER BY check_in_time DESC LIMIT 1"
        ))
        .bind(person_id.as_uuid())
        .bind(day_start)
        .bind(day_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_err("failed to find today's record", &e))?;

        row.map(LedgerRow::into_record).transpose()
    }

    async fn find_open_for_person(&self, person_id: PersonId) -> Result<Option<AttendanceRecord>> {
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM attendance_records \
             WHERE person_id = $1 ORDER BY check_in_time DESC LIMIT 1"
        ))
        .bind(person_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_err("failed to find open record", &e))?;

        row.map(LedgerRow::into_record).transpose()
    }

    async fn count_for_room(&self, room_id: RoomId, day: NaiveDate) -> Result<u64> {
        let (day_start, day_end) = day_bounds(day);
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM attendance_records \
             WHERE room_id = $1 AND check_in_time >= $2 AND check_in_time < $3",
        )
        .bind(room_id.as_uuid())
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err("failed to count room occupancy", &e))?;

        #[allow(clippy::cast_sign_loss)] // COUNT(*) is never negative
        Ok(count.max(0) as u64)
    }

    async fn remove(&self, record_id: RecordId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attendance_records WHERE id = $1")
            .bind(record_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err("failed to remove record", &e))?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(record_id = %record_id, "attendance record removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_bounds_cover_exactly_one_utc_day() {
        let day = chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap_or_default();
        let (start, end) = day_bounds(day);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).single().unwrap_or_default());
        assert_eq!(end - start, chrono::Duration::days(1));
    }
}
