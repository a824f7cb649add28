//! The release orchestrator: `perform_check_out`.
//!
//! Resolves the person's remaining record, removes it, and emits a
//! `CheckedOut` event carrying both the original check-in time and the
//! release time — removal is the only persisted check-out signal.
//!
//! No lock is taken here: release observes a single record it will itself
//! delete, and no second writer races to *decrease* the same person's
//! occupancy. A concurrent double-release loses the `remove` race and
//! reports `NoActivePresence`.

use crate::environment::AdmissionEnvironment;
use crate::identity::resolve_person;
use presence_core::clock::Clock;
use presence_core::lock::DistributedLock;
use presence_core::providers::{
    AttendanceLedger, IdempotencyStore, PersonDirectory, RoomDirectory,
};
use presence_core::{CheckOutOutcome, PersonRef, PresenceEvent, RejectReason, Result};

/// Perform a check-out.
///
/// Returns `Ok(CheckOutOutcome)` for every decided request: released with
/// the removed record's id, or rejected with `NoActivePresence` /
/// `NotEligibleForCheckout`.
///
/// # Errors
///
/// Returns retryable storage errors if the ledger is unreachable, or
/// [`presence_core::PresenceError::InvalidInput`] for a malformed person
/// reference.
#[tracing::instrument(skip(env, person))]
pub async fn perform_check_out<P, R, G, I, L, C>(
    env: &AdmissionEnvironment<P, R, G, I, L, C>,
    person: PersonRef,
) -> Result<CheckOutOutcome>
where
    P: PersonDirectory + Clone,
    R: RoomDirectory + Clone,
    G: AttendanceLedger + Clone,
    I: IdempotencyStore + Clone,
    L: DistributedLock + Clone,
    C: Clock + Clone,
{
    // An unknown person has nothing to release
    let Some(profile) = resolve_person(&env.persons, &person).await? else {
        return Ok(CheckOutOutcome::Rejected {
            reason: RejectReason::NoActivePresence,
        });
    };

    let Some(record) = env.ledger.find_open_for_person(profile.id).await? else {
        return Ok(CheckOutOutcome::Rejected {
            reason: RejectReason::NoActivePresence,
        });
    };

    let now = env.clock.now();
    if record.check_in_date() != now.date_naive() {
        tracing::info!(
            record_id = %record.id(),
            check_in_date = %record.check_in_date(),
            "stale record is not eligible for checkout"
        );
        return Ok(CheckOutOutcome::Rejected {
            reason: RejectReason::NotEligibleForCheckout,
        });
    }

    if !env.ledger.remove(record.id()).await? {
        // Lost the race against a concurrent release
        return Ok(CheckOutOutcome::Rejected {
            reason: RejectReason::NoActivePresence,
        });
    }

    env.emitter.emit(PresenceEvent::CheckedOut {
        record_id: record.id(),
        person_id: record.person_id(),
        room_id: record.room_id(),
        check_in_time: record.check_in_time(),
        check_out_time: now,
    });
    tracing::info!(record_id = %record.id(), "check-out released");

    Ok(CheckOutOutcome::Released {
        record_id: record.id(),
    })
}
