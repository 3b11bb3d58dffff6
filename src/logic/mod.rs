//! Bracket and room business logic: bracket engine, setup, play.

pub mod bracket;
mod legacy;
pub mod permute;
mod play;
mod setup;

pub use bracket::{activate, advance, generate, is_complete, winner};
pub use permute::{Identity, Permuter, RngPermuter};
pub use play::report_winner;
pub use setup::{organize, shuffle, start, OrganizeOptions};
