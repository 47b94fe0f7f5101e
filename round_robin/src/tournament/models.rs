//! Tournament aggregate and its read models.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::cohort::{Cohort, TimeControl};
use crate::errors::{TournamentError, TournamentResult};
use crate::player::PlayerId;
use crate::schedule::Schedule;
use crate::standings::{
    Crosstable, CrosstableSnapshot, Ledger, PlayerStats, Standing, compute_stats,
};

/// Tournament ID type
pub type TournamentId = Uuid;

/// Smallest allowed tournament capacity
pub const MIN_CAPACITY: usize = 4;

/// Largest allowed tournament capacity
pub const MAX_CAPACITY: usize = 10;

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    /// Accepting registrations, no schedule yet
    Waiting,
    /// Schedule generated, results being reported
    Running,
    /// Finished; no further mutation
    Closed,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Waiting => "WAITING",
            TournamentStatus::Running => "RUNNING",
            TournamentStatus::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TournamentStatus {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WAITING" => Ok(TournamentStatus::Waiting),
            "RUNNING" => Ok(TournamentStatus::Running),
            "CLOSED" => Ok(TournamentStatus::Closed),
            other => Err(TournamentError::Validation(format!(
                "unknown tournament status: {other}"
            ))),
        }
    }
}

/// One cohort tournament
///
/// Roster, crosstable and ledger are only changed through the lifecycle and
/// ingest functions, which keep them aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub cohort: Cohort,
    /// Per-cohort tournament number
    pub sequence: u32,
    pub capacity: usize,
    /// Create challenge links for pairings
    pub automode: bool,
    /// Optimistic concurrency counter, bumped by every committed write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub(crate) status: TournamentStatus,
    pub(crate) roster: Vec<PlayerId>,
    pub(crate) schedule: Schedule,
    pub(crate) crosstable: Crosstable,
    pub(crate) ledger: Ledger,
    pub(crate) submitted_results: BTreeSet<String>,
    pub(crate) start_date: Option<DateTime<Utc>>,
    pub(crate) end_date: Option<DateTime<Utc>>,
    pub(crate) winners: Vec<PlayerId>,
}

impl Tournament {
    /// Create an empty WAITING tournament
    pub fn new(
        cohort: Cohort,
        sequence: u32,
        capacity: usize,
        automode: bool,
    ) -> TournamentResult<Self> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(TournamentError::Validation(format!(
                "capacity must be between {MIN_CAPACITY} and {MAX_CAPACITY}, got {capacity}"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name: waiting_name(cohort, sequence),
            cohort,
            sequence,
            capacity,
            automode,
            version: 0,
            created_at: Utc::now(),
            status: TournamentStatus::Waiting,
            roster: Vec::new(),
            schedule: Schedule::default(),
            crosstable: Crosstable::default(),
            ledger: Ledger::default(),
            submitted_results: BTreeSet::new(),
            start_date: None,
            end_date: None,
            winners: Vec::new(),
        })
    }

    pub fn status(&self) -> TournamentStatus {
        self.status
    }

    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn crosstable(&self) -> &Crosstable {
        &self.crosstable
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn submitted_results(&self) -> &BTreeSet<String> {
        &self.submitted_results
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    pub fn time_control(&self) -> TimeControl {
        self.cohort.time_control()
    }

    pub fn is_member(&self, player: &PlayerId) -> bool {
        self.roster.contains(player)
    }

    pub fn position_of(&self, player: &PlayerId) -> Option<usize> {
        self.roster.iter().position(|p| p == player)
    }

    pub fn is_full(&self) -> bool {
        self.roster.len() >= self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.status == TournamentStatus::Closed
    }

    /// Whether a new registrant may be placed here
    pub fn accepts(&self, player: &PlayerId) -> bool {
        self.status == TournamentStatus::Waiting && !self.is_full() && !self.is_member(player)
    }

    /// Check the aggregate's structural invariants
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.roster.len() > self.capacity {
            return Err(format!(
                "roster size {} exceeds capacity {}",
                self.roster.len(),
                self.capacity
            ));
        }
        let unique: BTreeSet<&PlayerId> = self.roster.iter().collect();
        if unique.len() != self.roster.len() {
            return Err("roster contains duplicates".to_string());
        }
        if self.crosstable.size() != self.roster.len() || !self.crosstable.is_consistent() {
            return Err("crosstable does not match roster".to_string());
        }
        if !self.ledger.matches_roster(&self.roster) {
            return Err("ledger does not match roster".to_string());
        }
        if self.status == TournamentStatus::Waiting && !self.schedule.is_empty() {
            return Err("waiting tournament has a schedule".to_string());
        }
        Ok(())
    }

    pub fn crosstable_snapshot(&self) -> CrosstableSnapshot {
        self.crosstable.snapshot(&self.roster)
    }

    /// Full standings read model
    pub fn standings(&self) -> TournamentStandings {
        TournamentStandings {
            tournament_id: self.id,
            name: self.name.clone(),
            cohort: self.cohort,
            status: self.status,
            ranking: self.ledger.rank(),
            stats: compute_stats(&self.roster, &self.crosstable, &self.ledger),
            crosstable: self.crosstable_snapshot(),
            winners: self.winners.clone(),
        }
    }

    pub fn summary(&self) -> TournamentSummary {
        TournamentSummary {
            id: self.id,
            name: self.name.clone(),
            cohort: self.cohort,
            status: self.status,
            capacity: self.capacity,
            players: self.roster.len(),
            time_control: self.time_control(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Ranked standings with the crosstable behind them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentStandings {
    pub tournament_id: TournamentId,
    pub name: String,
    pub cohort: Cohort,
    pub status: TournamentStatus,
    pub ranking: Vec<Standing>,
    pub stats: Vec<PlayerStats>,
    pub crosstable: CrosstableSnapshot,
    pub winners: Vec<PlayerId>,
}

/// Tournament listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentSummary {
    pub id: TournamentId,
    pub name: String,
    pub cohort: Cohort,
    pub status: TournamentStatus,
    pub capacity: usize,
    pub players: usize,
    pub time_control: TimeControl,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Name used while a tournament is filling up
pub fn waiting_name(cohort: Cohort, sequence: u32) -> String {
    format!("{} #{sequence}", cohort.display_name())
}

/// Seasonal name assigned at start, e.g. `Winter 2026 #3`
pub fn seasonal_name(date: DateTime<Utc>, sequence: u32) -> String {
    let season = match date.month() {
        12 | 1 | 2 => "Winter",
        3..=5 => "Spring",
        6..=8 => "Summer",
        _ => "Fall",
    };
    format!("{season} {} #{sequence}", date.year())
}
