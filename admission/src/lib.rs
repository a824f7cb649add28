//! # Presence Admission
//!
//! The check-in / check-out admission pipeline: validation, distributed
//! locking, idempotent request handling, and the capacity-checked atomic
//! write, plus the symmetric release path and the domain events emitted on
//! each transition.
//!
//! ## Check-in state machine
//!
//! ```text
//! START → IDEMPOTENCY_CHECK ─ hit ──────────────────────────→ DONE
//!              │
//!              ▼
//!         LOCK_ACQUIRE ─ retries exhausted → Err(LockTimeout)
//!              │
//!              ▼
//!          VALIDATE ─ reject ──────────────────────────────→ DONE
//!              │
//!              ▼
//!     TRANSACTIONAL_INSERT ─ reject ───────────────────────→ DONE
//!              │
//!              ▼
//!        EVENT_PUBLISH (fire-and-forget)
//!              │
//!              ▼
//!           MEMOIZE ───────────────────────────────────────→ DONE
//! ```
//!
//! Business rejections come back as `Ok(CheckInOutcome::Rejected { .. })`
//! with a stable reason code; only infrastructure failures are `Err`, and
//! those are retryable with the same idempotency token.
//!
//! ## Wiring
//!
//! [`AdmissionEnvironment`] injects every collaborator as a trait: person
//! and room directories, the attendance ledger, the idempotency store, the
//! distributed lock, and the clock. Production wiring uses
//! `presence-redis`, `presence-postgres` and `presence-redpanda`; the
//! [`mocks`] module (feature `test-utils`, on by default) provides
//! in-memory implementations of all of them.

pub mod check_in;
pub mod check_out;
pub mod config;
pub mod emitter;
pub mod environment;
pub mod identity;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use check_in::{CheckInRequest, perform_check_in};
pub use check_out::perform_check_out;
pub use config::AdmissionConfig;
pub use emitter::EventEmitter;
pub use environment::AdmissionEnvironment;
pub use identity::resolve_person;
pub use validation::{Validation, validate_admission};
