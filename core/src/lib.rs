//! # Presence Core
//!
//! Core domain types and provider traits for the room-presence admission
//! system.
//!
//! This crate defines WHAT the admission pipeline works with; the sibling
//! crates provide the infrastructure HOW:
//!
//! - **Domain model**: [`types`] — person/room/record identifiers, the
//!   attendance record and its persistence snapshot, admission outcomes.
//! - **Error taxonomy**: [`error`] — retryable infrastructure failures
//!   (`PresenceError`) kept strictly apart from business rejections
//!   (`RejectReason`), which travel inside ordinary `Ok` outcomes.
//! - **Domain events**: [`event`] — the check-in / check-out transitions
//!   published to downstream consumers.
//! - **Provider traits**: [`providers`] — the ports this core consumes:
//!   person/room directories, the capacity-checked attendance ledger, the
//!   idempotency store, and the event publisher.
//! - **Distributed lock**: [`lock`] — the TTL lock trait plus the scoped
//!   `with_lock` acquisition helper with bounded retry/backoff.
//! - **Clock**: [`clock`] — injectable time source so "today" is testable.
//!
//! ## Architecture Principles
//!
//! - Traits at the seams: every external collaborator is a trait, so the
//!   orchestrators are testable against in-memory implementations.
//! - The transactional ledger is the single source of truth for the
//!   capacity invariant; the distributed lock only reduces contention.
//! - Business rejections are data, not errors: a full room is an expected
//!   answer, not a fault.

pub mod clock;
pub mod error;
pub mod event;
pub mod lock;
pub mod providers;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use error::{PresenceError, RejectReason, Result};
pub use event::{DEFAULT_PRESENCE_TOPIC, PresenceEvent};
pub use lock::{DistributedLock, HolderToken, LockRetry, with_lock};
pub use providers::{
    AttendanceLedger, EventPublisher, IdempotencyStore, InsertOutcome, PersonDirectory,
    RoomDirectory,
};
pub use types::{
    AttendanceRecord, AttendanceSnapshot, CheckInOutcome, CheckOutOutcome, IdempotencyToken,
    IdentMethod, PersonId, PersonProfile, PersonRef, RecordId, RoomId, RoomSnapshot,
};
