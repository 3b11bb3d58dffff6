//! Bracket engine: build an elimination bracket and advance it as results come in.
//!
//! All functions are pure. `advance` and `activate` return a new bracket that shares
//! untouched rounds with the input; the input itself is never modified.

use crate::logic::permute::{permuted, Permuter};
use crate::models::{Bracket, BracketError, Match, MatchId, MatchPointer, Mode, ParticipantId, Round};
use std::sync::Arc;

/// Build a bracket from `participants`.
///
/// 1. Shuffle the participants with `permuter` to get the seed order.
/// 2. Round 1: consecutive groups of 2 (pairwise) or 4 (quad); a group holding a
///    single participant is a bye and resolves immediately.
/// 3. With `double_duty_bye` in an odd pairwise draw, the unpaired participant instead
///    plays two qualifier matches (placed first) against two distinct paired participants.
/// 4. Later rounds are created empty, each with `ceil(previous / branching)` matches.
/// 5. The first playable match is activated.
pub fn generate(
    participants: &[ParticipantId],
    mode: Mode,
    double_duty_bye: bool,
    permuter: &mut dyn Permuter,
) -> Result<Bracket, BracketError> {
    let count = participants.len();
    if count < 2 {
        return Err(BracketError::TooFewParticipants(count));
    }
    let double_duty_bye = double_duty_bye && mode == Mode::Pairwise;
    if double_duty_bye && count < 3 {
        return Err(BracketError::DoubleDutyNeedsThree(count));
    }

    let seeded = permuted(permuter, participants);
    let branching = mode.branching();
    let first_round = if double_duty_bye && count % 2 == 1 {
        double_duty_round(&seeded, permuter)
    } else {
        seeded
            .chunks(branching)
            .enumerate()
            .map(|(i, group)| Match::new(i + 1, padded(group.iter().copied().map(Some), branching)))
            .collect()
    };

    let mut sizes = Vec::new();
    let mut entrants = advancing(&first_round).len();
    while entrants > 1 {
        entrants = entrants.div_ceil(branching);
        sizes.push(entrants);
    }
    let total_rounds = sizes.len() + 1;

    let mut rounds = Vec::with_capacity(total_rounds);
    rounds.push(Arc::new(Round::new(1, total_rounds, first_round)));
    for (i, &size) in sizes.iter().enumerate() {
        let matches = (1..=size).map(|n| Match::empty(n, branching)).collect();
        rounds.push(Arc::new(Round::new(i + 2, total_rounds, matches)));
    }

    let mut bracket = Bracket {
        rounds,
        total_participants: count,
        mode,
        double_duty_bye,
        active: None,
    };
    settle(&mut bracket);
    log::debug!(
        "Generated {:?} bracket: {} participants, {} rounds",
        mode,
        count,
        total_rounds
    );
    Ok(bracket)
}

/// Record `winner` for `match_id` and move the bracket forward.
///
/// An unknown `match_id` returns the bracket unchanged. The caller is responsible for
/// checking that the match is active and that `winner` occupies one of its slots.
pub fn advance(bracket: &Bracket, match_id: MatchId, winner: ParticipantId) -> Bracket {
    let Some(at) = bracket.find(match_id) else {
        return bracket.clone();
    };
    let mut next = bracket.clone();
    {
        let round = Arc::make_mut(&mut next.rounds[at.round]);
        let m = &mut round.matches[at.position];
        m.winner = Some(winner);
        m.is_active = false;
    }
    if next.active == Some(at) {
        next.active = None;
    }
    settle(&mut next);
    next
}

/// Make sure a playable match is active, resolving byes and propagating completed rounds.
pub fn activate(bracket: &Bracket) -> Bracket {
    let mut next = bracket.clone();
    settle(&mut next);
    next
}

/// True once the final round's only match has a winner.
pub fn is_complete(bracket: &Bracket) -> bool {
    bracket
        .final_round()
        .is_some_and(|r| r.is_complete && r.matches.first().is_some_and(Match::is_resolved))
}

pub fn winner(bracket: &Bracket) -> Option<ParticipantId> {
    if !is_complete(bracket) {
        return None;
    }
    bracket.final_round()?.matches.first()?.winner
}

fn double_duty_round(seeded: &[ParticipantId], permuter: &mut dyn Permuter) -> Vec<Match> {
    let (paired, unpaired) = seeded.split_at(seeded.len() - 1);
    let challenger = unpaired[0];
    let opponents = permuted(permuter, paired);

    let mut matches = vec![
        Match::qualifier(1, challenger, opponents[0]),
        Match::qualifier(2, challenger, opponents[1]),
    ];
    matches.extend(
        paired
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| Match::new(i + 3, pair.iter().copied().map(Some).collect())),
    );
    matches
}

fn padded(group: impl Iterator<Item = Option<ParticipantId>>, width: usize) -> Vec<Option<ParticipantId>> {
    let mut slots: Vec<_> = group.collect();
    slots.resize(width, None);
    slots
}

/// Who moves on from a round, in slot order for the next round.
/// Qualifier matches collapse into one leading entry: the challenger if they won them all.
fn advancing(matches: &[Match]) -> Vec<Option<ParticipantId>> {
    let mut entries = Vec::with_capacity(matches.len());
    let mut qualifiers = matches.iter().filter(|m| m.qualifier).peekable();
    if let Some(first) = qualifiers.peek() {
        let challenger = first.slots.first().copied().flatten();
        let cleared = challenger.is_some() && qualifiers.all(|m| m.winner == challenger);
        entries.push(if cleared { challenger } else { None });
    }
    entries.extend(matches.iter().filter(|m| !m.qualifier).map(|m| m.winner));
    entries
}

fn is_unfilled(round: &Round) -> bool {
    round.matches.iter().all(|m| m.participants().next().is_none())
}

/// Bring completion flags, propagation and the active pointer up to date.
///
/// Walks rounds in order: complete rounds are flagged and feed the next round once;
/// the first incomplete round keeps its active match or activates its first playable one.
fn settle(bracket: &mut Bracket) {
    let branching = bracket.mode.branching();
    for r in 0..bracket.rounds.len() {
        let complete = bracket.rounds[r].matches.iter().all(Match::is_resolved);
        if !complete {
            let current = bracket.rounds[r].active_position();
            let position = current.or_else(|| {
                let position = bracket.rounds[r].matches.iter().position(Match::is_playable)?;
                let round = Arc::make_mut(&mut bracket.rounds[r]);
                round.matches[position].is_active = true;
                round.is_complete = false;
                Some(position)
            });
            bracket.active = position.map(|position| MatchPointer { round: r, position });
            return;
        }

        if !bracket.rounds[r].is_complete {
            Arc::make_mut(&mut bracket.rounds[r]).is_complete = true;
        }
        if r + 1 < bracket.rounds.len() && is_unfilled(&bracket.rounds[r + 1]) {
            let entries = advancing(&bracket.rounds[r].matches);
            let next = Arc::make_mut(&mut bracket.rounds[r + 1]);
            for (m, group) in next.matches.iter_mut().zip(entries.chunks(branching)) {
                m.fill(padded(group.iter().copied(), branching));
            }
            next.refresh_complete();
        }
    }
    bracket.active = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::permute::Identity;
    use uuid::Uuid;

    fn ids(n: usize) -> Vec<ParticipantId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn advancing_collapses_qualifiers_into_leading_entry() {
        let p = ids(3);
        let mut q1 = Match::qualifier(1, p[0], p[1]);
        let mut q2 = Match::qualifier(2, p[0], p[2]);
        let mut r = Match::new(3, vec![Some(p[1]), Some(p[2])]);
        q1.winner = Some(p[0]);
        q2.winner = Some(p[2]);
        r.winner = Some(p[1]);
        assert_eq!(advancing(&[q1.clone(), q2, r.clone()]), vec![None, Some(p[1])]);

        let mut q2_won = Match::qualifier(2, p[0], p[2]);
        q2_won.winner = Some(p[0]);
        assert_eq!(advancing(&[q1, q2_won, r]), vec![Some(p[0]), Some(p[1])]);
    }

    #[test]
    fn advance_shares_untouched_rounds() {
        let p = ids(8);
        let bracket = generate(&p, Mode::Pairwise, false, &mut Identity).unwrap();
        let first = bracket.active_match().unwrap().clone();
        let next = advance(&bracket, first.id, p[0]);
        assert!(Arc::ptr_eq(&bracket.rounds[2], &next.rounds[2]));
        assert!(!Arc::ptr_eq(&bracket.rounds[0], &next.rounds[0]));
    }
}
