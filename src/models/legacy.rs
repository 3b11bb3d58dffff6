//! Flat sequential pairing list kept for rooms persisted before round brackets existed.

use crate::models::bracket::{Bracket, MatchId};
use crate::models::participant::ParticipantId;
use serde::{Deserialize, Serialize};

/// One pairing of the flat list. A missing second participant is a bye.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub id: MatchId,
    pub participant1: ParticipantId,
    pub participant2: Option<ParticipantId>,
    pub winner: Option<ParticipantId>,
    pub is_active: bool,
}

impl Pair {
    pub fn is_bye(&self) -> bool {
        self.participant2.is_none()
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participant1 == id || self.participant2 == Some(id)
    }
}

/// Pairs played one after another; `current` indexes the active pair.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LegacyPairing {
    pub pairs: Vec<Pair>,
    #[serde(default)]
    pub current: Option<usize>,
}

/// What a room plays: the deprecated flat list or a round bracket. Never both.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum Pairing {
    Legacy(LegacyPairing),
    Bracket(Bracket),
}

impl Pairing {
    /// Id of the match currently open for a result.
    pub fn active_match_id(&self) -> Option<MatchId> {
        match self {
            Pairing::Legacy(legacy) => legacy
                .current
                .and_then(|i| legacy.pairs.get(i))
                .filter(|p| p.is_active)
                .map(|p| p.id),
            Pairing::Bracket(bracket) => bracket.active_match().map(|m| m.id),
        }
    }

    pub fn as_bracket(&self) -> Option<&Bracket> {
        match self {
            Pairing::Bracket(bracket) => Some(bracket),
            Pairing::Legacy(_) => None,
        }
    }
}
