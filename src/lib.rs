//! Live elimination-bracket rooms: bracket engine, room aggregate and room registry.

pub mod logic;
pub mod models;
pub mod registry;

pub use logic::{
    activate, advance, generate, is_complete, organize, report_winner, shuffle, start, winner,
    Identity, OrganizeOptions, Permuter, RngPermuter,
};
pub use models::{
    Bracket, BracketError, ErrorKind, Joined, LegacyPairing, Match, MatchId, MatchPointer, Mode,
    Pair, Pairing, Participant, ParticipantId, Room, RoomCode, RoomError, RoomSnapshot, Round,
    MAX_CAPACITY, MIN_CAPACITY,
};
pub use registry::{
    Command, JsonDirStore, MemoryStore, Outcome, RoomRegistry, RoomStore, StoreError,
};
