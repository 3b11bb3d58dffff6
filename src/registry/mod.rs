//! Room registry: keyed rooms with one lock per room.
//!
//! Commands for different rooms run in parallel; commands for the same room are
//! serialized by that room's mutex. The map lock is only held to look up, insert or
//! remove handles, never while a command runs. Lock order is always map, then room.

pub mod code;
mod command;
pub mod store;

pub use command::{Command, Outcome};
pub use store::{JsonDirStore, MemoryStore, RoomStore, StoreError};

use crate::logic::{Permuter, RngPermuter};
use crate::models::{Participant, ParticipantId, Room, RoomCode, RoomError, RoomSnapshot};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// A room plus a tombstone set once it has been removed from the map.
#[derive(Debug)]
struct RoomSlot {
    room: Room,
    closed: bool,
}

type RoomHandle = Arc<Mutex<RoomSlot>>;

/// All live rooms of this process.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,
    permuter: Mutex<Box<dyn Permuter>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_permuter(RngPermuter::from_entropy())
    }

    /// Use `permuter` for every bracket this registry generates.
    pub fn with_permuter(permuter: impl Permuter + 'static) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            permuter: Mutex::new(Box::new(permuter)),
        }
    }

    /// Create a room with `admin_id` as its admin and only participant.
    pub fn create(
        &self,
        capacity: usize,
        admin_id: ParticipantId,
        name: impl Into<String>,
        avatar: impl Into<String>,
    ) -> Result<RoomSnapshot, RoomError> {
        let admin = Participant::admin(admin_id, name, avatar);
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let code = code::generate_unique(&mut rand::thread_rng(), |c| rooms.contains_key(c));
        let room = Room::new(code.clone(), capacity, admin, Utc::now())?;
        let snapshot = room.snapshot();
        rooms.insert(
            code.clone(),
            Arc::new(Mutex::new(RoomSlot {
                room,
                closed: false,
            })),
        );
        log::info!("Room {code} created (capacity {capacity}, {} live)", rooms.len());
        Ok(snapshot)
    }

    /// Run `command` against room `code` under that room's lock.
    ///
    /// The command works on a draft that replaces the room only on success, so a
    /// failure leaves nothing half-applied.
    pub fn execute(&self, code: &str, command: Command) -> Result<Outcome, RoomError> {
        let code = code::normalize(code);
        let missing = |command: &Command| {
            if command.tolerates_missing_room() {
                Ok(Outcome::Unchanged)
            } else {
                Err(RoomError::NotFound(code.clone()))
            }
        };
        let Some(handle) = self.handle(&code) else {
            return missing(&command);
        };

        let name = command.name();
        let outcome = {
            let mut slot = lock(&handle);
            if slot.closed {
                return missing(&command);
            }
            let mut draft = slot.room.clone();
            let changed = command.apply(&mut draft, &self.permuter).inspect_err(|e| {
                log::warn!("Room {code}: {name} rejected: {e}");
            })?;
            if !changed {
                return Ok(Outcome::Unchanged);
            }
            draft.revision += 1;
            draft.last_activity = Utc::now();
            slot.room = draft;
            if slot.room.is_empty() {
                slot.closed = true;
                Outcome::Closed
            } else {
                Outcome::Updated(slot.room.snapshot())
            }
        };

        if matches!(outcome, Outcome::Closed) {
            self.forget(&code, &handle);
            log::info!("Room {code} removed: last participant left");
        }
        Ok(outcome)
    }

    /// Current snapshot of a live room.
    pub fn snapshot(&self, code: &str) -> Option<RoomSnapshot> {
        let handle = self.handle(&code::normalize(code))?;
        let slot = lock(&handle);
        (!slot.closed).then(|| slot.room.snapshot())
    }

    /// Register a room from a persisted snapshot. A room already live under that code
    /// wins and its current snapshot is returned.
    pub fn restore(&self, snapshot: RoomSnapshot) -> Result<RoomSnapshot, RoomError> {
        let room = Room::try_from(snapshot)?;
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = rooms.get(&room.code) {
            let slot = lock(handle);
            if !slot.closed {
                return Ok(slot.room.snapshot());
            }
        }
        let code = room.code.clone();
        let snapshot = room.snapshot();
        rooms.insert(
            code.clone(),
            Arc::new(Mutex::new(RoomSlot {
                room,
                closed: false,
            })),
        );
        log::info!("Room {code} restored at revision {}", snapshot.revision);
        Ok(snapshot)
    }

    /// Remove rooms whose last activity is older than `max_idle` before `now`.
    /// Returns the removed codes. Scheduling is left to the caller.
    pub fn purge_inactive(&self, now: DateTime<Utc>, max_idle: Duration) -> Vec<RoomCode> {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = Vec::new();
        rooms.retain(|code, handle| {
            let mut slot = lock(handle);
            if now - slot.room.last_activity > max_idle {
                slot.closed = true;
                removed.push(code.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            log::info!("Removed {} inactive room(s)", removed.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn codes(&self) -> Vec<RoomCode> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.keys().cloned().collect()
    }

    fn handle(&self, code: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(code).cloned()
    }

    /// Drop `handle` from the map unless the code has been reused since.
    fn forget(&self, code: &str, handle: &RoomHandle) {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if rooms.get(code).is_some_and(|h| Arc::ptr_eq(h, handle)) {
            rooms.remove(code);
        }
    }
}

/// Commits are all-or-nothing, so a poisoned room still holds consistent state.
fn lock(handle: &RoomHandle) -> MutexGuard<'_, RoomSlot> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
