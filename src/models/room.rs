//! Room aggregate: roster, admin, pairing and lifecycle flags.

use crate::models::bracket::{Bracket, MatchId};
use crate::models::error::RoomError;
use crate::models::legacy::Pairing;
use crate::models::participant::{Participant, ParticipantId};
use crate::models::snapshot::RoomSnapshot;
use chrono::{DateTime, Utc};

/// Short room token shared with participants (e.g. "K7QX3M").
pub type RoomCode = String;

pub const MIN_CAPACITY: usize = 2;
pub const MAX_CAPACITY: usize = 20;

/// Result of a join.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Joined {
    New,
    /// Id already on the roster: profile refreshed, flags kept.
    Reconnected,
}

/// One tournament session.
#[derive(Clone, Debug, PartialEq)]
pub struct Room {
    pub code: RoomCode,
    pub capacity: usize,
    /// Ordered by join time; the front is the longest-standing participant.
    pub participants: Vec<Participant>,
    pub admin_id: ParticipantId,
    pub pairing: Option<Pairing>,
    pub started: bool,
    pub finished: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Incremented on every committed mutation.
    pub revision: u64,
}

impl Room {
    /// Create a room with `admin` as its only participant.
    pub fn new(
        code: impl Into<RoomCode>,
        capacity: usize,
        mut admin: Participant,
        now: DateTime<Utc>,
    ) -> Result<Self, RoomError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(RoomError::InvalidCapacity(capacity));
        }
        admin.is_admin = true;
        Ok(Self {
            code: code.into(),
            capacity,
            admin_id: admin.id,
            participants: vec![admin],
            pairing: None,
            started: false,
            finished: false,
            created_at: now,
            last_activity: now,
            revision: 0,
        })
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity
    }

    /// Checked against the current admin at execution time, not what the client last saw.
    pub fn require_admin(&self, requester: ParticipantId) -> Result<(), RoomError> {
        if requester == self.admin_id {
            Ok(())
        } else {
            Err(RoomError::Unauthorized)
        }
    }

    pub fn bracket(&self) -> Option<&Bracket> {
        self.pairing.as_ref().and_then(Pairing::as_bracket)
    }

    pub fn active_match_id(&self) -> Option<MatchId> {
        self.pairing.as_ref().and_then(Pairing::active_match_id)
    }

    /// Add a participant, or refresh one already on the roster.
    pub fn join(
        &mut self,
        id: ParticipantId,
        name: impl Into<String>,
        avatar: impl Into<String>,
    ) -> Result<Joined, RoomError> {
        if let Some(existing) = self.participant_mut(id) {
            existing.refresh(name, avatar);
            return Ok(Joined::Reconnected);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        if self.started {
            return Err(RoomError::AlreadyStarted);
        }
        self.participants.push(Participant::new(id, name, avatar));
        Ok(Joined::New)
    }

    /// Remove a participant. Returns false if they were not on the roster.
    /// The admin flag passes to the longest-standing remaining participant.
    pub fn leave(&mut self, id: ParticipantId) -> bool {
        let Some(idx) = self.participants.iter().position(|p| p.id == id) else {
            return false;
        };
        self.participants.remove(idx);
        if id == self.admin_id {
            if let Some(next) = self.participants.first_mut() {
                next.is_admin = true;
                self.admin_id = next.id;
            }
        }
        true
    }

    /// Returns false if the participant is unknown or already in that state.
    pub fn set_connected(&mut self, id: ParticipantId, connected: bool) -> bool {
        match self.participant_mut(id) {
            Some(p) if p.is_connected != connected => {
                p.is_connected = connected;
                true
            }
            _ => false,
        }
    }

    /// Immutable copy for broadcasting and persistence.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            capacity: self.capacity,
            participants: self.participants.clone(),
            admin_id: self.admin_id,
            pairing: self.pairing.clone(),
            pairs: Vec::new(),
            started: self.started,
            finished: self.finished,
            active_match_id: self.active_match_id(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            revision: self.revision,
        }
    }
}
