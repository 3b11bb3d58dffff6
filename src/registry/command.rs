//! Commands accepted for an existing room and the outcome of running them.

use crate::logic::{self, OrganizeOptions, Permuter};
use crate::models::{MatchId, ParticipantId, Room, RoomError, RoomSnapshot};
use std::sync::{Mutex, PoisonError};

/// A mutating request against one room. Creating a room is `RoomRegistry::create`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Join {
        participant_id: ParticipantId,
        name: String,
        avatar: String,
    },
    Leave {
        participant_id: ParticipantId,
    },
    SetConnected {
        participant_id: ParticipantId,
        connected: bool,
    },
    Organize {
        requester: ParticipantId,
        options: OrganizeOptions,
    },
    Shuffle {
        requester: ParticipantId,
    },
    Start {
        requester: ParticipantId,
    },
    ReportWinner {
        requester: ParticipantId,
        match_id: MatchId,
        winner_id: ParticipantId,
    },
}

/// What a successful command did.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// State changed; broadcast this snapshot.
    Updated(RoomSnapshot),
    /// Nothing to do (unknown participant, flag already set, room already gone).
    Unchanged,
    /// The last participant left and the room was removed.
    Closed,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Join { .. } => "join",
            Command::Leave { .. } => "leave",
            Command::SetConnected { .. } => "set_connected",
            Command::Organize { .. } => "organize",
            Command::Shuffle { .. } => "shuffle",
            Command::Start { .. } => "start",
            Command::ReportWinner { .. } => "report_winner",
        }
    }

    /// Commands that succeed as no-ops when their room no longer exists.
    pub(crate) fn tolerates_missing_room(&self) -> bool {
        matches!(self, Command::Leave { .. } | Command::SetConnected { .. })
    }

    /// Apply to `room`. Returns whether anything changed.
    pub(crate) fn apply(
        self,
        room: &mut Room,
        permuter: &Mutex<Box<dyn Permuter>>,
    ) -> Result<bool, RoomError> {
        match self {
            Command::Join {
                participant_id,
                name,
                avatar,
            } => {
                let joined = room.join(participant_id, name, avatar)?;
                log::debug!("Room {}: {} joined ({:?})", room.code, participant_id, joined);
                Ok(true)
            }
            Command::Leave { participant_id } => {
                let left = room.leave(participant_id);
                if left {
                    log::debug!("Room {}: {} left", room.code, participant_id);
                }
                Ok(left)
            }
            Command::SetConnected {
                participant_id,
                connected,
            } => Ok(room.set_connected(participant_id, connected)),
            Command::Organize { requester, options } => {
                let mut permuter = permuter.lock().unwrap_or_else(PoisonError::into_inner);
                logic::organize(room, requester, options, &mut **permuter)?;
                Ok(true)
            }
            Command::Shuffle { requester } => {
                let mut permuter = permuter.lock().unwrap_or_else(PoisonError::into_inner);
                logic::shuffle(room, requester, &mut **permuter)?;
                Ok(true)
            }
            Command::Start { requester } => {
                logic::start(room, requester)?;
                Ok(true)
            }
            Command::ReportWinner {
                requester,
                match_id,
                winner_id,
            } => {
                logic::report_winner(room, requester, match_id, winner_id)?;
                Ok(true)
            }
        }
    }
}
