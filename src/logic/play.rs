//! Running tournament: report match winners.

use crate::logic::{bracket, legacy};
use crate::models::{MatchId, Pairing, ParticipantId, Room, RoomError};

/// Record the winner of the active match and advance. Admin only.
///
/// A match that is already resolved fails with `MatchNotActive`, so a retried report
/// never advances the bracket twice.
pub fn report_winner(
    room: &mut Room,
    requester: ParticipantId,
    match_id: MatchId,
    winner: ParticipantId,
) -> Result<(), RoomError> {
    room.require_admin(requester)?;
    if !room.started {
        return Err(RoomError::NotStarted);
    }
    let finished = match room.pairing.as_mut() {
        None => return Err(RoomError::MatchNotFound(match_id)),
        Some(Pairing::Bracket(b)) => {
            let m = b
                .get_by_id(match_id)
                .ok_or(RoomError::MatchNotFound(match_id))?;
            if !m.is_active {
                return Err(RoomError::MatchNotActive);
            }
            if !m.contains(winner) {
                return Err(RoomError::InvalidWinner);
            }
            *b = bracket::advance(b, match_id, winner);
            bracket::is_complete(b)
        }
        Some(Pairing::Legacy(l)) => {
            legacy::report_winner(l, match_id, winner)?;
            legacy::is_finished(l)
        }
    };
    log::debug!("Room {}: match {} won by {}", room.code, match_id, winner);
    if finished && !room.finished {
        log::info!("Room {}: tournament finished", room.code);
    }
    room.finished = finished;
    Ok(())
}
