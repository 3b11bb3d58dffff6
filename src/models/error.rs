//! Errors returned by the bracket engine and at the room registry boundary.

use crate::models::bracket::MatchId;
use crate::models::room::RoomCode;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by bracket generation.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum BracketError {
    #[error("need at least 2 participants to build a bracket (got {0})")]
    TooFewParticipants(usize),
    #[error("a double-duty bye needs at least 3 participants (got {0})")]
    DoubleDutyNeedsThree(usize),
}

/// Errors from room operations. None of them is fatal; each leaves the room untouched.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RoomError {
    #[error("room capacity must be between 2 and 20 (got {0})")]
    InvalidCapacity(usize),
    #[error(transparent)]
    Bracket(#[from] BracketError),
    #[error("invalid room snapshot: {0}")]
    InvalidSnapshot(&'static str),
    #[error("room {0} not found")]
    NotFound(RoomCode),
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("only the room admin can do that")]
    Unauthorized,
    #[error("room is full")]
    RoomFull,
    #[error("the tournament has already started")]
    AlreadyStarted,
    #[error("the tournament has not started yet")]
    NotStarted,
    #[error("need at least 2 participants (have {0})")]
    NotEnoughParticipants(usize),
    #[error("organize the matches before starting")]
    NothingToStart,
    #[error("nothing to shuffle, organize the matches first")]
    NothingToShuffle,
    #[error("this match is not active")]
    MatchNotActive,
    #[error("the winner is not a participant of this match")]
    InvalidWinner,
}

/// Coarse error class shown to clients.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    State,
    InvalidWinner,
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        use RoomError::*;
        match self {
            InvalidCapacity(_) | Bracket(_) | InvalidSnapshot(_) | NotEnoughParticipants(_) => {
                ErrorKind::Validation
            }
            NotFound(_) | MatchNotFound(_) => ErrorKind::NotFound,
            Unauthorized => ErrorKind::Authorization,
            RoomFull | AlreadyStarted | NotStarted | NothingToStart | NothingToShuffle
            | MatchNotActive => ErrorKind::State,
            InvalidWinner => ErrorKind::InvalidWinner,
        }
    }
}
