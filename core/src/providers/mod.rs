//! Provider traits: the ports this core consumes.
//!
//! Every external collaborator is a trait so the orchestrators can be
//! wired against production backends (Redis, PostgreSQL, Redpanda) or
//! in-memory test implementations interchangeably.

pub mod directory;
pub mod idempotency;
pub mod ledger;
pub mod publisher;

pub use directory::{PersonDirectory, RoomDirectory};
pub use idempotency::IdempotencyStore;
pub use ledger::{AttendanceLedger, InsertOutcome};
pub use publisher::EventPublisher;
