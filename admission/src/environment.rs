//! Admission environment.
//!
//! Dependency injection aggregate for the orchestrators: every external
//! collaborator enters as a trait-bound type parameter, so production
//! backends and in-memory mocks wire identically.

use crate::config::AdmissionConfig;
use crate::emitter::EventEmitter;
use presence_core::clock::Clock;
use presence_core::lock::DistributedLock;
use presence_core::providers::{
    AttendanceLedger, IdempotencyStore, PersonDirectory, RoomDirectory,
};

/// Everything the check-in and check-out orchestrators need.
///
/// # Type Parameters
///
/// - `P`: person directory
/// - `R`: room directory
/// - `G`: attendance ledger (the capacity-checked transactional store)
/// - `I`: idempotency store
/// - `L`: distributed lock
/// - `C`: clock
#[derive(Clone)]
pub struct AdmissionEnvironment<P, R, G, I, L, C>
where
    P: PersonDirectory + Clone,
    R: RoomDirectory + Clone,
    G: AttendanceLedger + Clone,
    I: IdempotencyStore + Clone,
    L: DistributedLock + Clone,
    C: Clock + Clone,
{
    /// Person master data (external collaborator).
    pub persons: P,

    /// Room master data (external collaborator).
    pub rooms: R,

    /// The attendance ledger (`PostgreSQL` in production).
    pub ledger: G,

    /// Memoized admission outcomes (`Redis` in production).
    pub idempotency: I,

    /// Per-(person, room) mutual exclusion (`Redis` in production).
    pub lock: L,

    /// Injected time source.
    pub clock: C,

    /// Handoff to the background event sender.
    pub emitter: EventEmitter,

    /// Lock, TTL and topic tunables.
    pub config: AdmissionConfig,
}

impl<P, R, G, I, L, C> AdmissionEnvironment<P, R, G, I, L, C>
where
    P: PersonDirectory + Clone,
    R: RoomDirectory + Clone,
    G: AttendanceLedger + Clone,
    I: IdempotencyStore + Clone,
    L: DistributedLock + Clone,
    C: Clock + Clone,
{
    /// Create a new admission environment.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        persons: P,
        rooms: R,
        ledger: G,
        idempotency: I,
        lock: L,
        clock: C,
        emitter: EventEmitter,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            persons,
            rooms,
            ledger,
            idempotency,
            lock,
            clock,
            emitter,
            config,
        }
    }
}
