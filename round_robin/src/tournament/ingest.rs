//! Applying externally reported game results.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::models::{Tournament, TournamentStatus};
use crate::errors::{TournamentError, TournamentResult};
use crate::player::PlayerId;
use crate::standings::{Outcome, Points};

/// Game outcome from the platform's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl From<GameOutcome> for Outcome {
    fn from(outcome: GameOutcome) -> Self {
        match outcome {
            GameOutcome::WhiteWins => Outcome::FirstWins,
            GameOutcome::BlackWins => Outcome::SecondWins,
            GameOutcome::Draw => Outcome::Draw,
        }
    }
}

/// A finished game between two roster members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub white: PlayerId,
    pub black: PlayerId,
    pub outcome: GameOutcome,
}

/// Scores of both players after an applied result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub white_score: Points,
    pub black_score: Points,
}

/// Apply `result` once per `game_id`
///
/// Either the crosstable cell pair, both ledger entries and the game id are
/// all updated, or nothing is.
pub fn ingest(
    tournament: &mut Tournament,
    game_id: &str,
    result: &GameResult,
) -> TournamentResult<IngestOutcome> {
    if tournament.status != TournamentStatus::Running {
        return Err(TournamentError::InvalidState {
            expected: TournamentStatus::Running,
            actual: tournament.status,
        });
    }
    if tournament.submitted_results.contains(game_id) {
        debug!("Game {game_id} already applied to tournament {}", tournament.id);
        return Err(TournamentError::AlreadySubmitted(game_id.to_string()));
    }

    let white = tournament
        .position_of(&result.white)
        .ok_or_else(|| TournamentError::UnverifiedParticipant(result.white.to_string()))?;
    let black = tournament
        .position_of(&result.black)
        .ok_or_else(|| TournamentError::UnverifiedParticipant(result.black.to_string()))?;
    if white == black {
        return Err(TournamentError::SelfPlay);
    }

    let outcome = Outcome::from(result.outcome);
    let (white_delta, black_delta) = outcome.points();

    let mut crosstable = tournament.crosstable.clone();
    crosstable.record(white, black, outcome)?;
    let mut ledger = tournament.ledger.clone();
    ledger.adjust_pair((&result.white, white_delta), (&result.black, black_delta))?;

    if tournament.schedule.find_pairing(&result.white, &result.black).is_none() {
        warn!(
            "Game {game_id} between {} and {} is not in the schedule of tournament {}",
            result.white, result.black, tournament.id
        );
    }

    tournament.crosstable = crosstable;
    tournament.ledger = ledger;
    tournament.submitted_results.insert(game_id.to_string());

    Ok(IngestOutcome {
        white_score: tournament.ledger.score(&result.white).unwrap_or_default(),
        black_score: tournament.ledger.score(&result.black).unwrap_or_default(),
    })
}
