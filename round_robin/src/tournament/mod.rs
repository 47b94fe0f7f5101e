//! Tournament aggregate and the operations over it.
//!
//! - [`lifecycle`]: join, start, withdraw and close
//! - [`ingest`]: applying reported game results
//! - [`matcher`]: choosing a WAITING tournament for a new registrant
//! - [`manager`]: the same rules against the stores, with conflict retries
//!
//! ## Example
//!
//! ```no_run
//! use round_robin::db::{MemoryPlayerStore, MemoryTournamentStore};
//! use round_robin::player::{Platform, Player, PlayerId};
//! use round_robin::providers::ProviderRegistry;
//! use round_robin::tournament::{ManagerConfig, TournamentManager};
//! use round_robin::Cohort;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(
//!         Arc::new(MemoryTournamentStore::new()),
//!         Arc::new(MemoryPlayerStore::new()),
//!         ProviderRegistry::new(),
//!         ManagerConfig::default(),
//!     );
//!
//!     let player = Player::new(
//!         PlayerId::new("magnus")?,
//!         "Magnus",
//!         BTreeMap::from([(Platform::Lichess, "DrNykterstein".to_string())]),
//!     )?;
//!     let placed = manager.register(player, Cohort::containing(2850).ok_or("no cohort")?).await?;
//!     println!("Joined {}", placed.tournament.name);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod ingest;
pub mod lifecycle;
pub mod manager;
pub mod matcher;
pub mod models;

pub use config::{DEFAULT_CAPACITY, ManagerConfig};
pub use ingest::{GameOutcome, GameResult, IngestOutcome};
pub use lifecycle::{CloseOutcome, JoinOutcome, WithdrawOutcome};
pub use manager::{RegisterOutcome, SubmitOutcome, TournamentManager, WithdrawReport};
pub use models::{
    MAX_CAPACITY, MIN_CAPACITY, Tournament, TournamentId, TournamentStandings, TournamentStatus,
    TournamentSummary,
};
