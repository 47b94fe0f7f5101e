//! Tournament state machine: WAITING → RUNNING → CLOSED.
//!
//! Every transition validates first and then applies to a staged copy of the
//! roster, crosstable and ledger, so a failed call leaves the tournament as it
//! was.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::models::{Tournament, TournamentStatus, seasonal_name};
use crate::errors::{TournamentError, TournamentResult};
use crate::player::PlayerId;
use crate::schedule::{self, MIN_PLAYERS, Schedule};
use crate::standings::{Crosstable, Ledger, Points, compute_stats, inactive_players, pick_winners};

/// Result of a successful join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    /// Added to a WAITING tournament that still has seats
    Joined,
    /// Filled the tournament, which is now RUNNING; the cohort needs a new WAITING sibling
    Started,
    /// Late join into a RUNNING tournament; the schedule was regenerated
    Rescheduled,
}

impl JoinOutcome {
    pub fn needs_sibling(&self) -> bool {
        matches!(self, JoinOutcome::Started)
    }
}

/// Result of a successful withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schedule", rename_all = "snake_case")]
pub enum WithdrawOutcome {
    /// Removed from a WAITING tournament
    Removed,
    /// Removed from a RUNNING tournament and the schedule regenerated
    Rescheduled,
    /// Removed from a RUNNING tournament whose roster is now too small to schedule
    ScheduleCleared { needed: usize, current: usize },
}

impl WithdrawOutcome {
    /// The pairing failure behind a cleared schedule
    pub fn schedule_error(&self) -> Option<TournamentError> {
        match *self {
            WithdrawOutcome::ScheduleCleared { needed, current } => {
                Some(TournamentError::InsufficientPlayers { needed, current })
            }
            _ => None,
        }
    }
}

/// Winners and inactive players determined at close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOutcome {
    pub winners: Vec<PlayerId>,
    /// Members who never completed a game
    pub inactive: Vec<PlayerId>,
}

fn require_open(tournament: &Tournament) -> TournamentResult<()> {
    if tournament.status == TournamentStatus::Closed {
        return Err(TournamentError::InvalidState {
            expected: TournamentStatus::Running,
            actual: TournamentStatus::Closed,
        });
    }
    Ok(())
}

/// Schedule for `roster`, or an empty one when it is too small
fn reschedule(roster: &[PlayerId]) -> TournamentResult<Option<Schedule>> {
    match schedule::generate(roster) {
        Ok(s) => Ok(Some(s)),
        Err(TournamentError::InsufficientPlayers { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Add `player` to the roster
///
/// A WAITING tournament that reaches capacity starts; a RUNNING tournament
/// folds the late joiner into a regenerated schedule.
pub fn join(
    tournament: &mut Tournament,
    player: PlayerId,
    now: DateTime<Utc>,
) -> TournamentResult<JoinOutcome> {
    require_open(tournament)?;
    if tournament.is_member(&player) {
        return Err(TournamentError::DuplicateMembership {
            player,
            tournament: tournament.id,
        });
    }
    if tournament.is_full() {
        return Err(TournamentError::CapacityExhausted {
            searched: vec![tournament.cohort],
        });
    }

    let mut roster = tournament.roster.clone();
    roster.push(player.clone());
    let mut crosstable = tournament.crosstable.clone();
    crosstable.insert_player();
    let mut ledger = tournament.ledger.clone();
    ledger.add_player(player.clone(), Points::ZERO)?;

    let outcome = match tournament.status {
        TournamentStatus::Running => {
            let new_schedule = reschedule(&roster)?.unwrap_or_default();
            tournament.schedule = new_schedule;
            JoinOutcome::Rescheduled
        }
        _ if roster.len() == tournament.capacity => JoinOutcome::Started,
        _ => JoinOutcome::Joined,
    };

    tournament.roster = roster;
    tournament.crosstable = crosstable;
    tournament.ledger = ledger;
    debug!(
        "Player {} joined tournament {} ({}/{})",
        player,
        tournament.id,
        tournament.roster.len(),
        tournament.capacity
    );

    if outcome == JoinOutcome::Started {
        start(tournament, now)?;
    }
    Ok(outcome)
}

/// Start a WAITING tournament with at least four players
pub fn start(tournament: &mut Tournament, now: DateTime<Utc>) -> TournamentResult<()> {
    if tournament.status != TournamentStatus::Waiting {
        return Err(TournamentError::InvalidState {
            expected: TournamentStatus::Waiting,
            actual: tournament.status,
        });
    }
    let schedule = schedule::generate(&tournament.roster)?;
    let weeks = tournament.roster.len() as i64 + 1;

    tournament.schedule = schedule;
    tournament.crosstable = Crosstable::initialize(tournament.roster.len());
    tournament.ledger = Ledger::initialize(&tournament.roster);
    tournament.status = TournamentStatus::Running;
    tournament.start_date = Some(now);
    tournament.end_date = Some(now + Duration::weeks(weeks));
    tournament.name = seasonal_name(now, tournament.sequence);

    info!(
        "Tournament {} ({}) started with {} players",
        tournament.id,
        tournament.name,
        tournament.roster.len()
    );
    Ok(())
}

/// Remove `player` from the roster
///
/// Withdrawing from a RUNNING tournament credits every remaining member with
/// one point and regenerates the schedule. When fewer than four players remain
/// the schedule is cleared and the outcome says so.
pub fn withdraw(tournament: &mut Tournament, player: &PlayerId) -> TournamentResult<WithdrawOutcome> {
    require_open(tournament)?;
    let index = tournament
        .position_of(player)
        .ok_or_else(|| TournamentError::UnknownMember(player.clone()))?;

    let mut roster = tournament.roster.clone();
    roster.remove(index);
    let mut crosstable = tournament.crosstable.clone();
    let mut ledger = tournament.ledger.clone();

    if tournament.status == TournamentStatus::Waiting {
        crosstable.discard_player(index)?;
        ledger.remove_player(player)?;
        tournament.roster = roster;
        tournament.crosstable = crosstable;
        tournament.ledger = ledger;
        debug!("Player {} left waiting tournament {}", player, tournament.id);
        return Ok(WithdrawOutcome::Removed);
    }

    crosstable.remove_player(index)?;
    ledger.remove_player(player)?;
    ledger.compensate_withdrawal();
    let new_schedule = reschedule(&roster)?;

    let outcome = match &new_schedule {
        Some(_) => WithdrawOutcome::Rescheduled,
        None => WithdrawOutcome::ScheduleCleared {
            needed: MIN_PLAYERS,
            current: roster.len(),
        },
    };

    tournament.roster = roster;
    tournament.crosstable = crosstable;
    tournament.ledger = ledger;
    tournament.schedule = new_schedule.unwrap_or_default();

    info!(
        "Player {} withdrew from tournament {}, {} players remain",
        player,
        tournament.id,
        tournament.roster.len()
    );
    Ok(outcome)
}

/// Close the tournament and record its winners
pub fn close(tournament: &mut Tournament) -> TournamentResult<CloseOutcome> {
    require_open(tournament)?;

    let stats = compute_stats(&tournament.roster, &tournament.crosstable, &tournament.ledger);
    let winners = if tournament.status == TournamentStatus::Running {
        pick_winners(&stats)
    } else {
        Vec::new()
    };
    let inactive = if tournament.status == TournamentStatus::Running {
        inactive_players(&stats)
    } else {
        Vec::new()
    };

    tournament.status = TournamentStatus::Closed;
    tournament.winners = winners.clone();

    info!(
        "Tournament {} closed, winners: {:?}",
        tournament.id,
        winners.iter().map(PlayerId::as_str).collect::<Vec<_>>()
    );
    Ok(CloseOutcome { winners, inactive })
}
