//! Tournament read endpoints and the admin close.
//!
//! # Examples
//!
//! List the running tournaments of one cohort:
//! ```bash
//! curl "http://localhost:8080/api/v1/tournaments?cohort=1200-1300&status=running"
//! ```
//!
//! Close a tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/ID/close \
//!   -H "Authorization: Bearer ADMIN_TOKEN"
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
};
use round_robin::tournament::{
    CloseOutcome, Tournament, TournamentId, TournamentStandings, TournamentStatus,
    TournamentSummary,
};
use round_robin::{Cohort, TournamentError, TournamentResult};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub cohort: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    fn filters(&self) -> TournamentResult<(Option<Cohort>, Option<TournamentStatus>)> {
        let cohort = self
            .cohort
            .as_deref()
            .map(|c| c.parse::<Cohort>())
            .transpose()
            .map_err(|e| TournamentError::Validation(e.to_string()))?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<TournamentStatus>)
            .transpose()?;
        Ok((cohort, status))
    }
}

/// List tournaments, optionally filtered by cohort and status.
///
/// # Response
///
/// Returns `200 OK` with tournament summaries, oldest first.
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TournamentSummary>>, ApiError> {
    let (cohort, status) = query.filters().map_err(ApiError::during("list"))?;
    let tournaments = state
        .manager
        .list(cohort, status)
        .await
        .map_err(ApiError::during("list"))?;
    Ok(Json(tournaments))
}

/// Full tournament: roster, schedule, crosstable and ledger.
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    let tournament = state.manager.get(id).await.map_err(ApiError::during("get"))?;
    Ok(Json(tournament))
}

/// Ranked standings with tiebreaks and the labelled crosstable.
pub async fn get_standings(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<TournamentStandings>, ApiError> {
    let standings = state
        .manager
        .standings(id)
        .await
        .map_err(ApiError::during("standings"))?;
    Ok(Json(standings))
}

/// Close a tournament and freeze its winners (admin).
pub async fn close_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<CloseOutcome>, ApiError> {
    let outcome = state
        .manager
        .close(id)
        .await
        .map_err(ApiError::during("close"))?;
    metrics::tournaments_closed_total();
    tracing::info!(
        tournament_id = %id,
        winners = outcome.winners.len(),
        inactive = outcome.inactive.len(),
        "Tournament closed"
    );
    Ok(Json(outcome))
}
