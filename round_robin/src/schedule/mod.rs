//! Round-robin schedules.

pub mod generator;
pub mod models;

pub use generator::{MIN_PLAYERS, generate};
pub use models::{Pairing, Round, RoundEntry, Schedule};
