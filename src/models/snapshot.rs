//! Serializable room snapshot pushed to observers and written to stores.

use crate::models::bracket::MatchId;
use crate::models::error::RoomError;
use crate::models::legacy::{LegacyPairing, Pair, Pairing};
use crate::models::participant::{Participant, ParticipantId};
use crate::models::room::{Room, RoomCode, MAX_CAPACITY, MIN_CAPACITY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub capacity: usize,
    pub participants: Vec<Participant>,
    pub admin_id: ParticipantId,
    #[serde(default)]
    pub pairing: Option<Pairing>,
    /// Flat pair list written by old versions. Read only when `pairing` is absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<Pair>,
    pub started: bool,
    pub finished: bool,
    #[serde(default)]
    pub active_match_id: Option<MatchId>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl TryFrom<RoomSnapshot> for Room {
    type Error = RoomError;

    /// Rebuild a room from a persisted snapshot, settling on a single pairing form.
    fn try_from(snapshot: RoomSnapshot) -> Result<Self, Self::Error> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&snapshot.capacity) {
            return Err(RoomError::InvalidCapacity(snapshot.capacity));
        }
        if snapshot.participants.is_empty() {
            return Err(RoomError::InvalidSnapshot("room has no participants"));
        }
        if snapshot.participants.len() > snapshot.capacity {
            return Err(RoomError::InvalidSnapshot("roster exceeds capacity"));
        }
        let mut seen = HashSet::new();
        if !snapshot.participants.iter().all(|p| seen.insert(p.id)) {
            return Err(RoomError::InvalidSnapshot("duplicate participant id"));
        }

        let pairing = match (snapshot.pairing, snapshot.pairs) {
            (Some(pairing), _) => Some(pairing),
            (None, pairs) if pairs.is_empty() => None,
            (None, pairs) => {
                let current = pairs.iter().position(|p| p.is_active);
                Some(Pairing::Legacy(LegacyPairing { pairs, current }))
            }
        };
        if let Some(pairing) = &pairing {
            check_pairing(pairing)?;
        }

        let mut participants = snapshot.participants;
        let admin_id = if participants.iter().any(|p| p.id == snapshot.admin_id) {
            snapshot.admin_id
        } else {
            participants[0].id
        };
        for p in &mut participants {
            p.is_admin = p.id == admin_id;
        }

        Ok(Room {
            code: snapshot.code,
            capacity: snapshot.capacity,
            participants,
            admin_id,
            pairing,
            started: snapshot.started,
            finished: snapshot.finished,
            created_at: snapshot.created_at,
            last_activity: snapshot.last_activity,
            revision: snapshot.revision,
        })
    }
}

/// Structural checks on a restored pairing. Slots may name participants who have
/// since left, so they are not matched against the roster.
fn check_pairing(pairing: &Pairing) -> Result<(), RoomError> {
    match pairing {
        Pairing::Bracket(bracket) => {
            if bracket.rounds.is_empty() {
                return Err(RoomError::InvalidSnapshot("bracket has no rounds"));
            }
            if bracket
                .matches()
                .any(|m| m.winner.is_some_and(|w| !m.contains(w)))
            {
                return Err(RoomError::InvalidSnapshot("match winner is not in its slots"));
            }
            if bracket.matches().filter(|m| m.is_active).count() > 1 {
                return Err(RoomError::InvalidSnapshot("more than one active match"));
            }
            if bracket.active.is_some() && !bracket.active_match().is_some_and(|m| m.is_active) {
                return Err(RoomError::InvalidSnapshot("active pointer does not match"));
            }
        }
        Pairing::Legacy(legacy) => {
            if legacy
                .pairs
                .iter()
                .any(|p| p.winner.is_some_and(|w| !p.contains(w)))
            {
                return Err(RoomError::InvalidSnapshot("pair winner is not in the pair"));
            }
            if legacy.pairs.iter().filter(|p| p.is_active).count() > 1 {
                return Err(RoomError::InvalidSnapshot("more than one active pair"));
            }
        }
    }
    Ok(())
}
