//! In-memory mock providers for testing.
//!
//! One mock per provider trait, behaving like its production counterpart
//! at the contract level: the ledger's admission write is atomic (under a
//! mutex instead of a SERIALIZABLE transaction), the lock honors TTLs and
//! holder-verified release, the idempotency store is first-writer-wins
//! with expiry, and the publisher records what it is given.
//!
//! Available by default via the `test-utils` feature.

pub mod clock;
pub mod directory;
pub mod idempotency;
pub mod ledger;
pub mod lock;
pub mod publisher;

pub use clock::MockClock;
pub use directory::{MockPersonDirectory, MockRoomDirectory};
pub use idempotency::InMemoryIdempotencyStore;
pub use ledger::InMemoryLedger;
pub use lock::InMemoryLock;
pub use publisher::{PublishedEvent, RecordingPublisher};
