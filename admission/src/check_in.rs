//! The admission orchestrator: `perform_check_in`.
//!
//! Composes identity resolution, the idempotency short-circuit, the
//! distributed (person, room) lock, validation, the capacity-checked
//! transactional insert, the fire-and-forget event handoff, and final
//! memoization.
//!
//! The lock is a contention reducer; every correctness decision is made by
//! the ledger's transaction. Idempotency-store reads fail open and writes
//! are log-and-continue: a degraded store weakens deduplication, it never
//! blocks admission.

use crate::environment::AdmissionEnvironment;
use crate::identity::resolve_person;
use crate::validation::{Validation, validate_admission};
use presence_core::clock::Clock;
use presence_core::lock::{DistributedLock, with_lock};
use presence_core::providers::{
    AttendanceLedger, IdempotencyStore, InsertOutcome, PersonDirectory, RoomDirectory,
};
use presence_core::{
    AttendanceRecord, CheckInOutcome, IdempotencyToken, PersonProfile, PresenceEvent,
    RejectReason, Result, RoomId,
};
use serde::{Deserialize, Serialize};

/// A check-in request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckInRequest {
    /// Who is checking in (internal id or external identifier)
    pub person: presence_core::PersonRef,
    /// Room to enter
    pub room_id: RoomId,
    /// Caller-supplied idempotency token; derived from
    /// `(operation, person, room, hour bucket)` when absent
    pub idempotency_token: Option<IdempotencyToken>,
}

/// Perform a check-in.
///
/// Returns `Ok(CheckInOutcome)` for every decided request — accepted or
/// rejected with a stable reason code. Retried requests with the same
/// idempotency token return the original outcome without side effects.
///
/// # Errors
///
/// - [`presence_core::PresenceError::LockTimeout`] — lock acquisition
///   exhausted its retries; the admission was never decided and the caller
///   may retry with the same token.
/// - [`presence_core::PresenceError::Storage`] /
///   [`presence_core::PresenceError::Conflict`] — ledger or directory
///   faults, also retryable.
/// - [`presence_core::PresenceError::InvalidInput`] — malformed request,
///   rejected before any side effect.
#[tracing::instrument(skip(env, request), fields(room_id = %request.room_id))]
pub async fn perform_check_in<P, R, G, I, L, C>(
    env: &AdmissionEnvironment<P, R, G, I, L, C>,
    request: CheckInRequest,
) -> Result<CheckInOutcome>
where
    P: PersonDirectory + Clone,
    R: RoomDirectory + Clone,
    G: AttendanceLedger + Clone,
    I: IdempotencyStore + Clone,
    L: DistributedLock + Clone,
    C: Clock + Clone,
{
    // Identity: an unknown person is a rejection, not a fault
    let Some(profile) = resolve_person(&env.persons, &request.person).await? else {
        return Ok(CheckInOutcome::Rejected {
            reason: RejectReason::PersonIneligible,
        });
    };

    let token = match request.idempotency_token {
        Some(token) => token,
        None => IdempotencyToken::derive_check_in(&profile.id, &request.room_id, env.clock.now()),
    };

    // Idempotency short-circuit, fail-open on store errors
    match env.idempotency.get(&token).await {
        Ok(Some(outcome)) => {
            tracing::info!(token = token.as_str(), "replaying memoized admission outcome");
            return Ok(outcome);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "idempotency store read failed, proceeding without dedup");
        }
    }

    // Serialize attempts per (person, room); the ledger transaction stays
    // authoritative even if this lock expires mid-flight
    let lock_key = format!("checkin:{}:{}", profile.id, request.room_id);
    let room_id = request.room_id;
    let outcome = with_lock(&env.lock, &lock_key, &env.config.lock_retry, || {
        admit_under_lock(env, profile, room_id, &token)
    })
    .await?;

    // Memoize the decided outcome; the committed decision stands even if
    // this write fails
    if let Err(e) = env
        .idempotency
        .put_if_absent(&token, &outcome, env.config.idempotency_ttl)
        .await
    {
        tracing::warn!(error = %e, token = token.as_str(), "failed to memoize admission outcome");
    }

    Ok(outcome)
}

/// Validation plus the transactional insert; runs inside the lock.
async fn admit_under_lock<P, R, G, I, L, C>(
    env: &AdmissionEnvironment<P, R, G, I, L, C>,
    profile: PersonProfile,
    room_id: RoomId,
    token: &IdempotencyToken,
) -> Result<CheckInOutcome>
where
    P: PersonDirectory + Clone,
    R: RoomDirectory + Clone,
    G: AttendanceLedger + Clone,
    I: IdempotencyStore + Clone,
    L: DistributedLock + Clone,
    C: Clock + Clone,
{
    let today = env.clock.today();

    let room = match validate_admission(&env.rooms, &env.ledger, &profile, room_id, today).await? {
        Validation::Admit(room) => room,
        Validation::Reentry(existing) => {
            tracing::info!(record_id = %existing.id(), "idempotent re-entry into the same room");
            return Ok(CheckInOutcome::Accepted {
                record_id: existing.id(),
            });
        }
        Validation::Reject(reason) => {
            tracing::info!(%reason, "admission rejected by validation");
            return Ok(CheckInOutcome::Rejected { reason });
        }
    };

    let record = AttendanceRecord::admit(
        profile.id,
        room_id,
        env.clock.now(),
        Some(token.clone()),
    );

    match env
        .ledger
        .insert_if_under_capacity(&record, room.capacity)
        .await?
    {
        InsertOutcome::Inserted(record) => {
            env.emitter.emit(PresenceEvent::CheckedIn {
                record_id: record.id(),
                person_id: record.person_id(),
                room_id: record.room_id(),
                check_in_time: record.check_in_time(),
            });
            tracing::info!(record_id = %record.id(), "check-in accepted");
            Ok(CheckInOutcome::Accepted {
                record_id: record.id(),
            })
        }
        InsertOutcome::DuplicateToken(existing) => {
            tracing::info!(record_id = %existing.id(), "already admitted under this token");
            Ok(CheckInOutcome::Accepted {
                record_id: existing.id(),
            })
        }
        InsertOutcome::PersonPresent(existing) => {
            if existing.room_id() == room_id {
                // Validation raced with another writer; still a re-entry
                Ok(CheckInOutcome::Accepted {
                    record_id: existing.id(),
                })
            } else {
                Ok(CheckInOutcome::Rejected {
                    reason: RejectReason::AlreadyPresentElsewhere,
                })
            }
        }
        InsertOutcome::CapacityExceeded { occupancy } => {
            tracing::info!(occupancy, capacity = room.capacity, "admission rejected at capacity");
            Ok(CheckInOutcome::Rejected {
                reason: RejectReason::CapacityExceeded,
            })
        }
    }
}
