//! Setup phase: organize or reshuffle the bracket, then start the tournament.

use crate::logic::{bracket, legacy, permute::Permuter};
use crate::models::{Mode, Pairing, ParticipantId, Room, RoomError};
use serde::{Deserialize, Serialize};

/// How the admin wants the bracket built.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrganizeOptions {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub double_duty_bye: bool,
}

/// (Re)generate the bracket from the current roster. Admin only, before start or once
/// the previous tournament has finished; the room returns to setup.
pub fn organize(
    room: &mut Room,
    requester: ParticipantId,
    options: OrganizeOptions,
    permuter: &mut dyn Permuter,
) -> Result<(), RoomError> {
    room.require_admin(requester)?;
    if room.started && !room.finished {
        return Err(RoomError::AlreadyStarted);
    }
    let count = room.participants.len();
    if count < 2 {
        return Err(RoomError::NotEnoughParticipants(count));
    }
    let generated = bracket::generate(
        &room.participant_ids(),
        options.mode,
        options.double_duty_bye,
        permuter,
    )?;
    room.pairing = Some(Pairing::Bracket(generated));
    room.started = false;
    room.finished = false;
    log::debug!("Room {}: organized {} participants ({:?})", room.code, count, options.mode);
    Ok(())
}

/// Regenerate with the settings of the current bracket. A legacy pairing is replaced
/// by a default bracket.
pub fn shuffle(
    room: &mut Room,
    requester: ParticipantId,
    permuter: &mut dyn Permuter,
) -> Result<(), RoomError> {
    room.require_admin(requester)?;
    let options = match &room.pairing {
        Some(Pairing::Bracket(b)) => OrganizeOptions {
            mode: b.mode,
            double_duty_bye: b.double_duty_bye,
        },
        Some(Pairing::Legacy(_)) => OrganizeOptions::default(),
        None => return Err(RoomError::NothingToShuffle),
    };
    organize(room, requester, options, permuter)
}

/// Start the tournament: activate the first playable match, resolving leading byes.
pub fn start(room: &mut Room, requester: ParticipantId) -> Result<(), RoomError> {
    room.require_admin(requester)?;
    if room.started {
        return Err(RoomError::AlreadyStarted);
    }
    let finished = match room.pairing.as_mut() {
        None => return Err(RoomError::NothingToStart),
        Some(Pairing::Bracket(b)) => {
            *b = bracket::activate(b);
            bracket::is_complete(b)
        }
        Some(Pairing::Legacy(l)) => {
            legacy::start(l)?;
            legacy::is_finished(l)
        }
    };
    room.started = true;
    room.finished = finished;
    log::info!("Room {}: tournament started", room.code);
    Ok(())
}
