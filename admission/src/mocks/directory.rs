//! Mock person and room directories.

use presence_core::providers::{PersonDirectory, RoomDirectory};
use presence_core::{
    IdentMethod, PersonId, PersonProfile, PresenceError, Result, RoomId, RoomSnapshot,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory person directory with programmable failure.
#[derive(Clone, Debug, Default)]
pub struct MockPersonDirectory {
    inner: Arc<Mutex<PersonDirectoryState>>,
}

#[derive(Debug, Default)]
struct PersonDirectoryState {
    by_id: HashMap<PersonId, PersonProfile>,
    by_identifier: HashMap<(IdentMethod, String), PersonId>,
    fail: bool,
}

impl MockPersonDirectory {
    /// Register a person profile.
    pub fn insert(&self, profile: PersonProfile) {
        if let Ok(mut state) = self.inner.lock() {
            state.by_id.insert(profile.id, profile);
        }
    }

    /// Link an external identifier to a registered person.
    pub fn link_identifier(&self, method: IdentMethod, value: impl Into<String>, person_id: PersonId) {
        if let Ok(mut state) = self.inner.lock() {
            state.by_identifier.insert((method, value.into()), person_id);
        }
    }

    /// Make every lookup fail with a storage error.
    pub fn set_fail(&self, fail: bool) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail = fail;
        }
    }
}

impl PersonDirectory for MockPersonDirectory {
    async fn lookup_by_identifier(
        &self,
        method: IdentMethod,
        value: &str,
    ) -> Result<Option<PersonProfile>> {
        let state = self
            .inner
            .lock()
            .map_err(|_| PresenceError::Storage("mutex poisoned".into()))?;
        if state.fail {
            return Err(PresenceError::Storage("mock person directory down".into()));
        }
        let person_id = state.by_identifier.get(&(method, value.to_owned()));
        Ok(person_id.and_then(|id| state.by_id.get(id)).copied())
    }

    async fn get(&self, person_id: PersonId) -> Result<Option<PersonProfile>> {
        let state = self
            .inner
            .lock()
            .map_err(|_| PresenceError::Storage("mutex poisoned".into()))?;
        if state.fail {
            return Err(PresenceError::Storage("mock person directory down".into()));
        }
        Ok(state.by_id.get(&person_id).copied())
    }
}

/// In-memory room directory with programmable failure.
#[derive(Clone, Debug, Default)]
pub struct MockRoomDirectory {
    inner: Arc<Mutex<RoomDirectoryState>>,
}

#[derive(Debug, Default)]
struct RoomDirectoryState {
    rooms: HashMap<RoomId, RoomSnapshot>,
    fail: bool,
}

impl MockRoomDirectory {
    /// Register a room snapshot.
    pub fn insert(&self, room: RoomSnapshot) {
        if let Ok(mut state) = self.inner.lock() {
            state.rooms.insert(room.id, room);
        }
    }

    /// Make every lookup fail with a storage error.
    pub fn set_fail(&self, fail: bool) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail = fail;
        }
    }
}

impl RoomDirectory for MockRoomDirectory {
    async fn get_room(&self, room_id: RoomId) -> Result<Option<RoomSnapshot>> {
        let state = self
            .inner
            .lock()
            .map_err(|_| PresenceError::Storage("mutex poisoned".into()))?;
        if state.fail {
            return Err(PresenceError::Storage("mock room directory down".into()));
        }
        Ok(state.rooms.get(&room_id).copied())
    }
}
