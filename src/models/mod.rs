//! Data structures for bracket rooms: participants, matches, rounds, brackets, rooms.

mod bracket;
mod error;
mod legacy;
mod participant;
mod room;
mod snapshot;

pub use bracket::{Bracket, Match, MatchId, MatchPointer, Mode, Round};
pub use error::{BracketError, ErrorKind, RoomError};
pub use legacy::{LegacyPairing, Pair, Pairing};
pub use participant::{Participant, ParticipantId};
pub use room::{Joined, Room, RoomCode, MAX_CAPACITY, MIN_CAPACITY};
pub use snapshot::RoomSnapshot;
