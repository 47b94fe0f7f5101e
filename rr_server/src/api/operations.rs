//! The round-robin operation endpoint.
//!
//! A single `POST /api/v1/round-robin` accepts every player-facing operation,
//! selected by the `operation` field:
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/round-robin \
//!   -H "Content-Type: application/json" \
//!   -d '{"operation": "register", "player_id": "anna", "rating": 1530, "lichess": "anna_plays"}'
//!
//! curl -X POST http://localhost:8080/api/v1/round-robin \
//!   -H "Content-Type: application/json" \
//!   -d '{"operation": "submit-game", "player_id": "anna", "game_url": "https://lichess.org/abcdEFGH"}'
//! ```
//!
//! Successful responses carry a `kind` naming what happened, a readable
//! `message` and the operation's `data`; failures carry an error `kind`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use round_robin::tournament::{
    GameOutcome, JoinOutcome, RegisterOutcome, SubmitOutcome, WithdrawOutcome, WithdrawReport,
};
use round_robin::{Cohort, Platform, Player, PlayerId, TournamentError, TournamentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AppState;
use super::error::ApiError;
use super::request_id::RequestId;
use crate::metrics;

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum RoundRobinRequest {
    Register(RegisterRequest),
    Withdraw { player_id: String },
    SubmitGame { player_id: String, game_url: String },
}

impl RoundRobinRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            RoundRobinRequest::Register(_) => "register",
            RoundRobinRequest::Withdraw { .. } => "withdraw",
            RoundRobinRequest::SubmitGame { .. } => "submit-game",
        }
    }

    fn player_id(&self) -> &str {
        match self {
            RoundRobinRequest::Register(register) => &register.player_id,
            RoundRobinRequest::Withdraw { player_id }
            | RoundRobinRequest::SubmitGame { player_id, .. } => player_id,
        }
    }
}

/// Registration; the cohort is given directly or derived from a rating
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub player_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub cohort: Option<Cohort>,
    #[serde(default)]
    pub rating: Option<u32>,
    /// Platform the rating comes from, Lichess when omitted
    #[serde(default)]
    pub rating_platform: Option<Platform>,
    #[serde(default)]
    pub lichess: Option<String>,
    #[serde(default)]
    pub chesscom: Option<String>,
}

impl RegisterRequest {
    fn cohort(&self) -> TournamentResult<Cohort> {
        if let Some(cohort) = self.cohort {
            return Ok(cohort);
        }
        let rating = self.rating.ok_or_else(|| {
            TournamentError::Validation("either cohort or rating is required".to_string())
        })?;
        let cohort = match self.rating_platform.unwrap_or(Platform::Lichess) {
            Platform::Lichess => Cohort::for_lichess_rating(rating),
            Platform::Chesscom => Cohort::for_chesscom_rating(rating),
        };
        cohort.ok_or_else(|| {
            TournamentError::Validation(format!("rating {rating} is outside every cohort"))
        })
    }

    fn into_player(self) -> TournamentResult<(Player, Cohort)> {
        let cohort = self.cohort()?;
        let handles: BTreeMap<Platform, String> = [
            (Platform::Lichess, self.lichess),
            (Platform::Chesscom, self.chesscom),
        ]
        .into_iter()
        .filter_map(|(platform, handle)| handle.map(|h| (platform, h)))
        .collect();

        let player = Player::new(
            PlayerId::new(self.player_id)?,
            self.display_name.unwrap_or_default(),
            handles,
        )?;
        Ok((player, cohort))
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Registered(RegisterOutcome),
    Withdrawn(WithdrawReport),
    Recorded(SubmitOutcome),
}

#[derive(Debug, Serialize)]
pub struct RoundRobinResponse {
    pub kind: &'static str,
    pub message: String,
    pub data: ResponseData,
}

/// Handle a round-robin operation.
///
/// # Errors
///
/// Every failure is rendered by [`ApiError`] with the status of its kind;
/// malformed bodies are `validation` errors.
pub async fn handle_operation(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<RoundRobinRequest>, JsonRejection>,
) -> Result<Json<RoundRobinResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::new(
            "parse",
            TournamentError::Validation(rejection.body_text()),
        )
    })?;
    let operation = request.operation();

    tracing::info!(
        request_id = request_id.as_str(),
        operation = operation,
        player_id = request.player_id(),
        "Handling round-robin operation"
    );

    let response = match request {
        RoundRobinRequest::Register(register) => {
            let (player, cohort) = register.into_player().map_err(ApiError::during(operation))?;
            let placed = state
                .manager
                .register(player, cohort)
                .await
                .map_err(ApiError::during(operation))?;
            registered(placed)
        }
        RoundRobinRequest::Withdraw { player_id } => {
            let player_id = PlayerId::new(player_id).map_err(ApiError::during(operation))?;
            let report = state
                .manager
                .withdraw(&player_id)
                .await
                .map_err(ApiError::during(operation))?;
            withdrawn(&player_id, report)
        }
        RoundRobinRequest::SubmitGame {
            player_id,
            game_url,
        } => {
            let player_id = PlayerId::new(player_id).map_err(ApiError::during(operation))?;
            let submitted = state
                .manager
                .submit_game(&player_id, &game_url)
                .await
                .map_err(ApiError::during(operation))?;
            recorded(submitted)
        }
    };

    Ok(Json(response))
}

fn registered(placed: RegisterOutcome) -> RoundRobinResponse {
    let t = &placed.tournament;
    let (kind, message) = match placed.outcome {
        JoinOutcome::Joined => (
            "joined",
            format!(
                "Registered in {} ({}/{} players, {})",
                t.name, t.players, t.capacity, t.time_control
            ),
        ),
        JoinOutcome::Started => (
            "started",
            format!("{} is full and has started; pairings are ready", t.name),
        ),
        JoinOutcome::Rescheduled => (
            "rescheduled",
            format!("Joined {} in progress; the pairings were regenerated", t.name),
        ),
    };
    metrics::registrations_total(kind);

    RoundRobinResponse {
        kind,
        message,
        data: ResponseData::Registered(placed),
    }
}

fn withdrawn(player_id: &PlayerId, report: WithdrawReport) -> RoundRobinResponse {
    let name = &report.tournament.name;
    let message = match report.outcome {
        WithdrawOutcome::Removed => format!("{player_id} left {name}"),
        WithdrawOutcome::Rescheduled => format!(
            "{player_id} withdrew from {name}; remaining players receive one point and new pairings"
        ),
        WithdrawOutcome::ScheduleCleared { needed, current } => format!(
            "{player_id} withdrew from {name}; {current} players remain, fewer than the {needed} needed for pairings"
        ),
    };
    metrics::withdrawals_total(matches!(
        report.outcome,
        WithdrawOutcome::ScheduleCleared { .. }
    ));

    RoundRobinResponse {
        kind: "withdrawn",
        message,
        data: ResponseData::Withdrawn(report),
    }
}

fn recorded(submitted: SubmitOutcome) -> RoundRobinResponse {
    let score = match submitted.result.outcome {
        GameOutcome::WhiteWins => "1-0",
        GameOutcome::BlackWins => "0-1",
        GameOutcome::Draw => "1/2-1/2",
    };
    let message = format!(
        "Recorded {} {score} {} in {}",
        submitted.result.white, submitted.result.black, submitted.tournament.name
    );
    let platform = submitted.game_id.split(':').next().unwrap_or_default();
    metrics::games_recorded_total(platform);

    RoundRobinResponse {
        kind: "recorded",
        message,
        data: ResponseData::Recorded(submitted),
    }
}
