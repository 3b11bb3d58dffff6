//! Sequential play over a flat pairing list (rooms restored from old snapshots).

use crate::models::{LegacyPairing, MatchId, ParticipantId, RoomError};

/// Activate the first pair still to be played. Byes resolve on the way.
pub fn start(pairing: &mut LegacyPairing) -> Result<(), RoomError> {
    if pairing.pairs.is_empty() {
        return Err(RoomError::NothingToStart);
    }
    open_from(pairing, 0);
    Ok(())
}

/// Resolve the active pair and open the next one.
pub fn report_winner(
    pairing: &mut LegacyPairing,
    pair_id: MatchId,
    winner: ParticipantId,
) -> Result<(), RoomError> {
    let idx = pairing
        .pairs
        .iter()
        .position(|p| p.id == pair_id)
        .ok_or(RoomError::MatchNotFound(pair_id))?;
    let pair = &mut pairing.pairs[idx];
    if !pair.is_active {
        return Err(RoomError::MatchNotActive);
    }
    if !pair.contains(winner) {
        return Err(RoomError::InvalidWinner);
    }
    pair.winner = Some(winner);
    pair.is_active = false;
    open_from(pairing, idx + 1);
    Ok(())
}

pub fn is_finished(pairing: &LegacyPairing) -> bool {
    !pairing.pairs.is_empty() && pairing.pairs.iter().all(|p| p.winner.is_some())
}

fn open_from(pairing: &mut LegacyPairing, from: usize) {
    pairing.current = None;
    for (i, pair) in pairing.pairs.iter_mut().enumerate().skip(from) {
        if pair.winner.is_some() {
            continue;
        }
        if pair.is_bye() {
            pair.winner = Some(pair.participant1);
            continue;
        }
        pair.is_active = true;
        pairing.current = Some(i);
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pair;
    use uuid::Uuid;

    fn pair(a: ParticipantId, b: Option<ParticipantId>) -> Pair {
        Pair {
            id: Uuid::new_v4(),
            participant1: a,
            participant2: b,
            winner: None,
            is_active: false,
        }
    }

    #[test]
    fn byes_are_skipped_and_finish_is_detected() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut pairing = LegacyPairing {
            pairs: vec![pair(c, None), pair(a, Some(b))],
            current: None,
        };
        start(&mut pairing).unwrap();
        assert_eq!(pairing.pairs[0].winner, Some(c));
        assert_eq!(pairing.current, Some(1));

        let id = pairing.pairs[1].id;
        assert_eq!(report_winner(&mut pairing, id, c), Err(RoomError::InvalidWinner));
        report_winner(&mut pairing, id, b).unwrap();
        assert!(is_finished(&pairing));
        assert_eq!(pairing.current, None);
        assert_eq!(report_winner(&mut pairing, id, b), Err(RoomError::MatchNotActive));
    }
}
