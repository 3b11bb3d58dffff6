//! Bracket, Round, Match and elimination Mode.

use crate::models::participant::ParticipantId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Elimination format: how many participant slots each match has.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Two slots per match.
    #[default]
    Pairwise,
    /// Up to four slots per match; one advances.
    Quad,
}

impl Mode {
    /// Slots per match, which is also how many matches feed one match of the next round.
    pub fn branching(self) -> usize {
        match self {
            Mode::Pairwise => 2,
            Mode::Quad => 4,
        }
    }
}

/// A single match. Empty slots are byes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// 1-based ordinal within its round.
    pub number: usize,
    pub slots: Vec<Option<ParticipantId>>,
    /// None until resolved.
    pub winner: Option<ParticipantId>,
    pub is_active: bool,
    /// Double-duty qualifier: the unpaired participant against an already paired one.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub qualifier: bool,
}

impl Match {
    /// Create a match from its slots. A single real participant wins immediately.
    pub fn new(number: usize, slots: Vec<Option<ParticipantId>>) -> Self {
        let mut m = Self::empty(number, slots.len());
        m.fill(slots);
        m
    }

    /// Create a match whose slots are filled later by winner propagation.
    pub fn empty(number: usize, slot_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            slots: vec![None; slot_count],
            winner: None,
            is_active: false,
            qualifier: false,
        }
    }

    /// Create a qualifier match between the double-duty participant and an opponent.
    pub fn qualifier(number: usize, challenger: ParticipantId, opponent: ParticipantId) -> Self {
        Self {
            qualifier: true,
            ..Self::new(number, vec![Some(challenger), Some(opponent)])
        }
    }

    /// Place participants into the slots, auto-resolving a lone participant.
    pub fn fill(&mut self, slots: Vec<Option<ParticipantId>>) {
        self.slots = slots;
        let lone = {
            let mut real = self.participants();
            match (real.next(), real.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        };
        if lone.is_some() {
            self.winner = lone;
        }
    }

    /// Real participants in slot order.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants().any(|p| p == id)
    }

    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }

    /// Unresolved with at least two real participants.
    pub fn is_playable(&self) -> bool {
        self.winner.is_none() && self.participants().nth(1).is_some()
    }
}

/// One round of the bracket.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based.
    pub number: usize,
    pub label: String,
    pub matches: Vec<Match>,
    pub is_complete: bool,
}

impl Round {
    pub fn new(number: usize, total_rounds: usize, matches: Vec<Match>) -> Self {
        let mut round = Self {
            number,
            label: Self::label(number, total_rounds),
            matches,
            is_complete: false,
        };
        round.refresh_complete();
        round
    }

    /// Human-readable name from the distance to the final round.
    pub fn label(number: usize, total_rounds: usize) -> String {
        match total_rounds.saturating_sub(number) {
            0 => "Final".to_string(),
            1 => "Semifinals".to_string(),
            2 => "Quarterfinals".to_string(),
            3 => "Eighthfinals".to_string(),
            _ => format!("Round {number}"),
        }
    }

    /// Recompute the completion flag: every match has a winner.
    pub fn refresh_complete(&mut self) -> bool {
        self.is_complete = self.matches.iter().all(Match::is_resolved);
        self.is_complete
    }

    pub fn active_position(&self) -> Option<usize> {
        self.matches.iter().position(|m| m.is_active)
    }
}

/// Position of a match inside a bracket (0-based round and match indexes).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct MatchPointer {
    pub round: usize,
    pub position: usize,
}

/// Full elimination bracket. Rounds are shared copy-on-write between versions.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub rounds: Vec<Arc<Round>>,
    pub total_participants: usize,
    pub mode: Mode,
    #[serde(default)]
    pub double_duty_bye: bool,
    /// Currently active match, if any.
    pub active: Option<MatchPointer>,
}

impl Bracket {
    pub fn final_round(&self) -> Option<&Round> {
        self.rounds.last().map(Arc::as_ref)
    }

    /// Locate a match by id.
    pub fn find(&self, match_id: MatchId) -> Option<MatchPointer> {
        self.rounds.iter().enumerate().find_map(|(r, round)| {
            round
                .matches
                .iter()
                .position(|m| m.id == match_id)
                .map(|position| MatchPointer { round: r, position })
        })
    }

    pub fn get(&self, at: MatchPointer) -> Option<&Match> {
        self.rounds.get(at.round)?.matches.get(at.position)
    }

    pub fn get_by_id(&self, match_id: MatchId) -> Option<&Match> {
        self.find(match_id).and_then(|at| self.get(at))
    }

    pub fn active_match(&self) -> Option<&Match> {
        self.active.and_then(|at| self.get(at))
    }

    /// Every match across all rounds, in round order.
    pub fn matches(&self) -> impl Iterator<Item = &Match> + '_ {
        self.rounds.iter().flat_map(|r| r.matches.iter())
    }
}
