//! Shared test harness: a fully mock-wired admission environment.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{TimeZone, Utc};
use presence_admission::mocks::{
    InMemoryIdempotencyStore, InMemoryLedger, InMemoryLock, MockClock, MockPersonDirectory,
    MockRoomDirectory, RecordingPublisher,
};
use presence_admission::{AdmissionConfig, AdmissionEnvironment, CheckInRequest, EventEmitter};
use presence_core::lock::LockRetry;
use presence_core::{
    IdempotencyToken, PersonId, PersonProfile, PersonRef, PresenceEvent, RoomId, RoomSnapshot,
};
use std::time::Duration;

pub type MockEnvironment = AdmissionEnvironment<
    MockPersonDirectory,
    MockRoomDirectory,
    InMemoryLedger,
    InMemoryIdempotencyStore,
    InMemoryLock,
    MockClock,
>;

pub struct Harness {
    pub env: MockEnvironment,
    pub persons: MockPersonDirectory,
    pub rooms: MockRoomDirectory,
    pub ledger: InMemoryLedger,
    pub idempotency: InMemoryIdempotencyStore,
    pub lock: InMemoryLock,
    pub clock: MockClock,
    pub publisher: RecordingPublisher,
}

/// Harness with fast lock backoff (tests should not sleep for real).
pub fn harness() -> Harness {
    harness_with_retry(LockRetry {
        ttl: Duration::from_secs(5),
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
    })
}

/// Harness with patient lock acquisition, for contention-heavy tests.
pub fn patient_harness() -> Harness {
    harness_with_retry(LockRetry {
        ttl: Duration::from_secs(5),
        max_retries: 200,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    })
}

pub fn harness_with_retry(lock_retry: LockRetry) -> Harness {
    let persons = MockPersonDirectory::default();
    let rooms = MockRoomDirectory::default();
    let ledger = InMemoryLedger::default();
    let idempotency = InMemoryIdempotencyStore::default();
    let lock = InMemoryLock::default();
    let clock = MockClock::at(Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).single().unwrap());
    let publisher = RecordingPublisher::default();

    let config = AdmissionConfig {
        lock_retry,
        ..AdmissionConfig::default()
    };
    let emitter = EventEmitter::spawn(publisher.clone(), config.topic.clone(), config.emitter_buffer);

    let env = AdmissionEnvironment::new(
        persons.clone(),
        rooms.clone(),
        ledger.clone(),
        idempotency.clone(),
        lock.clone(),
        clock.clone(),
        emitter,
        config,
    );

    Harness {
        env,
        persons,
        rooms,
        ledger,
        idempotency,
        lock,
        clock,
        publisher,
    }
}

impl Harness {
    /// Register an eligible person and return their id.
    pub fn eligible_person(&self) -> PersonId {
        let profile = PersonProfile {
            id: PersonId::new(),
            eligible: true,
        };
        self.persons.insert(profile);
        profile.id
    }

    /// Register an open room with the given capacity and return its id.
    pub fn open_room(&self, capacity: u32) -> RoomId {
        let room = RoomSnapshot {
            id: RoomId::new(),
            capacity,
            eligible: true,
        };
        self.rooms.insert(room);
        room.id
    }
}

/// A check-in request by internal id without a caller-supplied token.
pub fn request(person_id: PersonId, room_id: RoomId) -> CheckInRequest {
    CheckInRequest {
        person: PersonRef::Id(person_id),
        room_id,
        idempotency_token: None,
    }
}

/// A check-in request with an explicit idempotency token.
pub fn request_with_token(person_id: PersonId, room_id: RoomId, token: &str) -> CheckInRequest {
    CheckInRequest {
        person: PersonRef::Id(person_id),
        room_id,
        idempotency_token: Some(IdempotencyToken::new(token).unwrap()),
    }
}

/// Poll the recording publisher until `n` events arrived (the emitter is a
/// background task).
pub async fn wait_for_events(publisher: &RecordingPublisher, n: usize) -> Vec<PresenceEvent> {
    for _ in 0..200 {
        let events = publisher.events();
        if events.len() >= n {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "timed out waiting for {n} events, have {}",
        publisher.events().len()
    );
}
