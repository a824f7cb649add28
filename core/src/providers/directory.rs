//! Master-data directory traits.
//!
//! Person and room master data are owned by external services; this core
//! only reads eligibility snapshots from them at admission time.

use crate::error::Result;
use crate::types::{IdentMethod, PersonId, PersonProfile, RoomId, RoomSnapshot};
use std::future::Future;

/// Read-only view of the person master-data service.
pub trait PersonDirectory: Send + Sync {
    /// Resolve an external identification token (badge value, ID number) to
    /// a person profile.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory is unreachable; the
    /// identity resolver treats that as "not found" rather than failing the
    /// request.
    fn lookup_by_identifier(
        &self,
        method: IdentMethod,
        value: &str,
    ) -> impl Future<Output = Result<Option<PersonProfile>>> + Send;

    /// Fetch a person profile by internal id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory is unreachable.
    fn get(&self, person_id: PersonId)
    -> impl Future<Output = Result<Option<PersonProfile>>> + Send;
}

/// Read-only view of the room master-data service.
pub trait RoomDirectory: Send + Sync {
    /// Fetch the current room snapshot (capacity, availability).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory is unreachable.
    fn get_room(&self, room_id: RoomId) -> impl Future<Output = Result<Option<RoomSnapshot>>> + Send;
}
