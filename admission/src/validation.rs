//! Admission validation.
//!
//! Stateless, ordered checks with short-circuit on first failure. The
//! occupancy check here is the advisory fast path: it turns away requests
//! for obviously-full rooms without taking a transaction, while the
//! authoritative capacity decision stays inside the ledger's transactional
//! write.

use presence_core::providers::{AttendanceLedger, RoomDirectory};
use presence_core::{
    AttendanceRecord, PersonProfile, RejectReason, Result, RoomId, RoomSnapshot,
};
use chrono::NaiveDate;

/// Outcome of validation.
#[derive(Clone, Debug, PartialEq)]
pub enum Validation {
    /// All checks passed; proceed to the transactional insert with this
    /// room snapshot
    Admit(RoomSnapshot),
    /// The person already holds a today-record in this same room —
    /// idempotent re-entry, not a conflict
    Reentry(AttendanceRecord),
    /// A check failed
    Reject(RejectReason),
}

/// Run the admission checks in order:
///
/// 1. person eligible → else `PersonIneligible`
/// 2. room exists and eligible → else `RoomUnavailable`
/// 3. no active today-record in a *different* room → else
///    `AlreadyPresentElsewhere` (same room → [`Validation::Reentry`])
/// 4. advisory: today's occupancy strictly below capacity → else
///    `CapacityExceeded`
///
/// No side effects.
///
/// # Errors
///
/// Returns a storage error if the room directory or ledger is unreachable.
pub async fn validate_admission<R, G>(
    rooms: &R,
    ledger: &G,
    person: &PersonProfile,
    room_id: RoomId,
    day: NaiveDate,
) -> Result<Validation>
where
    R: RoomDirectory,
    G: AttendanceLedger,
{
    if !person.eligible {
        return Ok(Validation::Reject(RejectReason::PersonIneligible));
    }

    let Some(room) = rooms.get_room(room_id).await? else {
        return Ok(Validation::Reject(RejectReason::RoomUnavailable));
    };
    if !room.eligible {
        return Ok(Validation::Reject(RejectReason::RoomUnavailable));
    }

    if let Some(existing) = ledger.find_today_for_person(person.id, day).await? {
        if existing.room_id() == room_id {
            return Ok(Validation::Reentry(existing));
        }
        return Ok(Validation::Reject(RejectReason::AlreadyPresentElsewhere));
    }

    let occupancy = ledger.count_for_room(room_id, day).await?;
    if occupancy >= u64::from(room.capacity) {
        tracing::debug!(room_id = %room_id, occupancy, capacity = room.capacity, "fast-path capacity rejection");
        return Ok(Validation::Reject(RejectReason::CapacityExceeded));
    }

    Ok(Validation::Admit(room))
}
