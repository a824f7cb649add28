//! Concurrency stress tests for the admission pipeline.
//!
//! These tests verify that under concurrent load the capacity and
//! single-record invariants hold regardless of interleaving.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

mod common;

use common::{patient_harness, request, request_with_token, wait_for_events};
use futures::future::join_all;
use presence_admission::perform_check_in;
use presence_core::{CheckInOutcome, PresenceEvent, RejectReason};
use std::collections::HashSet;
use std::time::Duration;

/// The last-seat race: room capacity 5, 10 concurrent check-ins for 10
/// distinct persons → exactly 5 accepted, 5 rejected with
/// `CapacityExceeded`, ledger count 5.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ten_concurrent_check_ins_into_a_five_seat_room() {
    let h = patient_harness();
    let room = h.open_room(5);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let person = h.eligible_person();
        let env = h.env.clone();
        handles.push(tokio::spawn(async move {
            perform_check_in(&env, request(person, room)).await
        }));
    }

    let outcomes: Vec<CheckInOutcome> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked").expect("admission errored"))
        .collect();

    let accepted: Vec<_> = outcomes
        .iter()
        .filter(|o| matches!(o, CheckInOutcome::Accepted { .. }))
        .collect();
    let rejected: Vec<_> = outcomes
        .iter()
        .filter(|o| {
            matches!(
                o,
                CheckInOutcome::Rejected {
                    reason: RejectReason::CapacityExceeded
                }
            )
        })
        .collect();

    assert_eq!(accepted.len(), 5, "outcomes: {outcomes:?}");
    assert_eq!(rejected.len(), 5, "outcomes: {outcomes:?}");
    assert_eq!(h.ledger.len().unwrap(), 5);

    // Every admission emitted exactly one event
    let events = wait_for_events(&h.publisher, 5).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.publisher.events().len(), 5);
    assert!(
        events
            .iter()
            .all(|e| matches!(e, PresenceEvent::CheckedIn { .. }))
    );
}

/// A retry storm: many concurrent submissions of the *same* request with
/// the same token create exactly one record and all observe the same id.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_token_storm_creates_exactly_one_record() {
    let h = patient_harness();
    let person = h.eligible_person();
    let room = h.open_room(5);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let env = h.env.clone();
        handles.push(tokio::spawn(async move {
            perform_check_in(&env, request_with_token(person, room, "k1")).await
        }));
    }

    let outcomes: Vec<CheckInOutcome> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked").expect("admission errored"))
        .collect();

    let record_ids: HashSet<_> = outcomes
        .iter()
        .map(|o| match o {
            CheckInOutcome::Accepted { record_id } => *record_id,
            other => panic!("expected acceptance, got {other:?}"),
        })
        .collect();

    assert_eq!(record_ids.len(), 1, "every retry must observe the same record");
    assert_eq!(h.ledger.len().unwrap(), 1);

    // One admission, one event
    wait_for_events(&h.publisher, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.publisher.events().len(), 1);
}

/// Attempts on different rooms proceed in parallel: two full fan-ins on
/// two rooms admit everyone.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_rooms_admit_independently() {
    let h = patient_harness();
    let room_a = h.open_room(5);
    let room_b = h.open_room(5);

    let mut handles = Vec::new();
    for room in [room_a, room_b] {
        for _ in 0..5 {
            let person = h.eligible_person();
            let env = h.env.clone();
            handles.push(tokio::spawn(async move {
                perform_check_in(&env, request(person, room)).await
            }));
        }
    }

    let outcomes: Vec<CheckInOutcome> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked").expect("admission errored"))
        .collect();

    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, CheckInOutcome::Accepted { .. })),
        "outcomes: {outcomes:?}"
    );
    assert_eq!(h.ledger.len().unwrap(), 10);
}
