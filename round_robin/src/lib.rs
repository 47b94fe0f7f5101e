//! # Round Robin
//!
//! Rating-cohort round-robin chess tournaments: players register into a
//! rating band, fill small tournaments, play every other member once and
//! report their games by URL from Lichess or Chess.com.
//!
//! ## Architecture
//!
//! The tournament aggregate moves through three states:
//!
//! - **Waiting**: filling up, no schedule yet
//! - **Running**: full (or started early), paired with the circle method
//! - **Closed**: final standings and winners frozen
//!
//! All rules are pure functions over the aggregate. [`TournamentManager`]
//! wraps them in read, transform and conditional-write cycles against the
//! injected stores, so concurrent registrations never overfill a tournament.
//!
//! ## Core Modules
//!
//! - [`cohort`]: rating bands, time controls and platform rating mapping
//! - [`schedule`]: round-robin pairing generation
//! - [`standings`]: crosstable, score ledger and tiebreaks
//! - [`tournament`]: aggregate, lifecycle, result ingest and the manager
//! - [`providers`]: Lichess and Chess.com lookups
//! - [`db`]: Postgres and in-memory stores
//!
//! ## Example
//!
//! ```
//! use round_robin::{Cohort, schedule};
//! use round_robin::player::PlayerId;
//!
//! let roster: Vec<PlayerId> = ["ann", "bob", "cy", "dee"]
//!     .into_iter()
//!     .map(|id| PlayerId::new(id).unwrap())
//!     .collect();
//! let plan = schedule::generate(&roster).unwrap();
//! assert_eq!(plan.rounds().len(), 3);
//! assert_eq!(Cohort::containing(1234).unwrap().display_name(), "1200-1300");
//! ```

/// Rating bands and their time controls.
pub mod cohort;
pub use cohort::{COHORTS, Cohort, TimeControl};

/// Persistence: Postgres repositories and in-memory stores.
pub mod db;

/// Error taxonomy shared by every operation.
pub mod errors;
pub use errors::{ErrorKind, TournamentError, TournamentResult};

pub mod player;
pub use player::{Platform, Player, PlayerId};

/// Chess-platform game lookups and challenge links.
pub mod providers;

/// Round-robin pairing generation.
pub mod schedule;

/// Crosstable, score ledger and tiebreaks.
pub mod standings;

/// Tournament aggregate, lifecycle rules and orchestration.
pub mod tournament;
pub use tournament::{
    ManagerConfig, Tournament, TournamentId, TournamentManager, TournamentStatus,
};
