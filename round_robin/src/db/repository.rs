//! Store trait definitions and their PostgreSQL implementations.
//!
//! The manager only talks to these traits, so tests and the development
//! server can swap in the in-memory stores from [`super::memory`].

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::time::Duration;

use super::timeouts::with_timeout;
use super::{StoreError, StoreResult};
use crate::cohort::Cohort;
use crate::player::{Platform, Player, PlayerId};
use crate::tournament::models::{Tournament, TournamentId, TournamentStatus};

/// Repository over tournament aggregates
#[async_trait]
pub trait TournamentStore: Send + Sync {
    async fn get(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Store a new tournament as-is
    async fn insert(&self, tournament: &Tournament) -> StoreResult<()>;

    /// Tournaments of a cohort in a given status, oldest first
    async fn find_by_cohort_and_status(
        &self,
        cohort: Cohort,
        status: TournamentStatus,
    ) -> StoreResult<Vec<Tournament>>;

    /// Tournaments whose roster contains `player`, oldest first
    async fn find_by_member(&self, player: &PlayerId) -> StoreResult<Vec<Tournament>>;

    /// All tournaments matching the optional filters, oldest first
    async fn list(
        &self,
        cohort: Option<Cohort>,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>>;

    /// Highest tournament sequence number used in `cohort`, 0 if none
    async fn max_sequence(&self, cohort: Cohort) -> StoreResult<u32>;

    /// Write `tournament` if the stored version still equals `expected_version`
    ///
    /// # Arguments
    ///
    /// * `tournament` - Aggregate after the transformation
    /// * `expected_version` - Version the transformation started from
    ///
    /// # Returns
    ///
    /// The stored tournament with its version bumped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if another writer got there first.
    async fn compare_and_swap(
        &self,
        tournament: &Tournament,
        expected_version: i64,
    ) -> StoreResult<Tournament>;
}

/// Repository over registered players
#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn get(&self, id: &PlayerId) -> StoreResult<Option<Player>>;

    /// Player owning `handle` on `platform`, matched case-insensitively
    async fn find_by_platform_handle(
        &self,
        platform: Platform,
        handle: &str,
    ) -> StoreResult<Option<Player>>;

    /// Insert the player or replace their display name and handles
    ///
    /// # Errors
    ///
    /// Returns `StoreError::HandleTaken` if another player owns one of the
    /// handles.
    async fn upsert(&self, player: &Player) -> StoreResult<()>;
}

/// PostgreSQL implementation of `TournamentStore`
pub struct PgTournamentStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgTournamentStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    fn members(tournament: &Tournament) -> Vec<String> {
        tournament
            .roster()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect()
    }
}

fn decode_tournament(row: &sqlx::postgres::PgRow) -> StoreResult<Tournament> {
    let Json(mut tournament): Json<Tournament> = row.try_get("body")?;
    tournament.version = row.try_get("version")?;
    Ok(tournament)
}

fn decode_all(rows: &[sqlx::postgres::PgRow]) -> StoreResult<Vec<Tournament>> {
    rows.iter().map(decode_tournament).collect()
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    async fn get(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = with_timeout(
            self.timeout,
            sqlx::query("SELECT body, version FROM rr_tournaments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(decode_tournament).transpose()
    }

    async fn insert(&self, tournament: &Tournament) -> StoreResult<()> {
        let result = with_timeout(
            self.timeout,
            sqlx::query(
                r#"
                INSERT INTO rr_tournaments (id, cohort_start, sequence, status, version, members, body, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(tournament.id)
            .bind(tournament.cohort.start() as i32)
            .bind(tournament.sequence as i32)
            .bind(tournament.status().as_str())
            .bind(tournament.version)
            .bind(Self::members(tournament))
            .bind(Json(tournament))
            .bind(tournament.created_at)
            .execute(&self.pool),
        )
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(StoreError::Database(e)) if is_unique_violation(&e) => {
                Err(StoreError::Duplicate(tournament.id))
            }
            Err(e) => Err(e),
        }
    }

    async fn find_by_cohort_and_status(
        &self,
        cohort: Cohort,
        status: TournamentStatus,
    ) -> StoreResult<Vec<Tournament>> {
        let rows = with_timeout(
            self.timeout,
            sqlx::query(
                "SELECT body, version FROM rr_tournaments WHERE cohort_start = $1 AND status = $2 ORDER BY seq",
            )
            .bind(cohort.start() as i32)
            .bind(status.as_str())
            .fetch_all(&self.pool),
        )
        .await?;

        decode_all(&rows)
    }

    async fn find_by_member(&self, player: &PlayerId) -> StoreResult<Vec<Tournament>> {
        let rows = with_timeout(
            self.timeout,
            sqlx::query(
                "SELECT body, version FROM rr_tournaments WHERE members @> ARRAY[$1]::TEXT[] ORDER BY seq",
            )
            .bind(player.as_str())
            .fetch_all(&self.pool),
        )
        .await?;

        decode_all(&rows)
    }

    async fn list(
        &self,
        cohort: Option<Cohort>,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        let rows = with_timeout(
            self.timeout,
            sqlx::query(
                r#"
                SELECT body, version FROM rr_tournaments
                WHERE ($1::INTEGER IS NULL OR cohort_start = $1)
                  AND ($2::TEXT IS NULL OR status = $2)
                ORDER BY seq
                "#,
            )
            .bind(cohort.map(|c| c.start() as i32))
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool),
        )
        .await?;

        decode_all(&rows)
    }

    async fn max_sequence(&self, cohort: Cohort) -> StoreResult<u32> {
        let row = with_timeout(
            self.timeout,
            sqlx::query(
                "SELECT COALESCE(MAX(sequence), 0) AS max_sequence FROM rr_tournaments WHERE cohort_start = $1",
            )
            .bind(cohort.start() as i32)
            .fetch_one(&self.pool),
        )
        .await?;

        let max: i32 = row.try_get("max_sequence")?;
        Ok(max.max(0) as u32)
    }

    async fn compare_and_swap(
        &self,
        tournament: &Tournament,
        expected_version: i64,
    ) -> StoreResult<Tournament> {
        let mut stored = tournament.clone();
        stored.version = expected_version + 1;

        let result = with_timeout(
            self.timeout,
            sqlx::query(
                r#"
                UPDATE rr_tournaments
                SET status = $3, version = $4, members = $5, body = $6
                WHERE id = $1 AND version = $2
                "#,
            )
            .bind(stored.id)
            .bind(expected_version)
            .bind(stored.status().as_str())
            .bind(stored.version)
            .bind(Self::members(&stored))
            .bind(Json(&stored))
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 1 {
            return Ok(stored);
        }

        let exists = with_timeout(
            self.timeout,
            sqlx::query("SELECT 1 FROM rr_tournaments WHERE id = $1")
                .bind(stored.id)
                .fetch_optional(&self.pool),
        )
        .await?;

        match exists {
            Some(_) => Err(StoreError::Conflict {
                id: stored.id,
                expected: expected_version,
            }),
            None => Err(StoreError::Missing(stored.id)),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}

/// PostgreSQL implementation of `PlayerStore`
pub struct PgPlayerStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgPlayerStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

fn decode_player(row: &sqlx::postgres::PgRow) -> StoreResult<Player> {
    let id: String = row.try_get("id")?;
    let lichess: Option<String> = row.try_get("lichess_handle")?;
    let chesscom: Option<String> = row.try_get("chesscom_handle")?;

    let mut handles = BTreeMap::new();
    if let Some(handle) = lichess {
        handles.insert(Platform::Lichess, handle);
    }
    if let Some(handle) = chesscom {
        handles.insert(Platform::Chesscom, handle);
    }

    Ok(Player {
        id: PlayerId::from_stored(id),
        display_name: row.try_get("display_name")?,
        handles,
    })
}

#[async_trait]
impl PlayerStore for PgPlayerStore {
    async fn get(&self, id: &PlayerId) -> StoreResult<Option<Player>> {
        let row = with_timeout(
            self.timeout,
            sqlx::query(
                "SELECT id, display_name, lichess_handle, chesscom_handle FROM rr_players WHERE id = $1",
            )
            .bind(id.as_str())
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(decode_player).transpose()
    }

    async fn find_by_platform_handle(
        &self,
        platform: Platform,
        handle: &str,
    ) -> StoreResult<Option<Player>> {
        let query = match platform {
            Platform::Lichess => {
                "SELECT id, display_name, lichess_handle, chesscom_handle FROM rr_players WHERE LOWER(lichess_handle) = LOWER($1)"
            }
            Platform::Chesscom => {
                "SELECT id, display_name, lichess_handle, chesscom_handle FROM rr_players WHERE LOWER(chesscom_handle) = LOWER($1)"
            }
        };

        let row = with_timeout(
            self.timeout,
            sqlx::query(query).bind(handle).fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(decode_player).transpose()
    }

    async fn upsert(&self, player: &Player) -> StoreResult<()> {
        let result = with_timeout(
            self.timeout,
            sqlx::query(
                r#"
                INSERT INTO rr_players (id, display_name, lichess_handle, chesscom_handle, updated_at)
                VALUES ($1, $2, $3, $4, NOW())
                ON CONFLICT (id) DO UPDATE
                SET display_name = EXCLUDED.display_name,
                    lichess_handle = EXCLUDED.lichess_handle,
                    chesscom_handle = EXCLUDED.chesscom_handle,
                    updated_at = NOW()
                "#,
            )
            .bind(player.id.as_str())
            .bind(&player.display_name)
            .bind(player.handle(Platform::Lichess))
            .bind(player.handle(Platform::Chesscom))
            .execute(&self.pool),
        )
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(StoreError::Database(e)) if is_unique_violation(&e) => {
                let platform = match e.as_database_error().and_then(|db| db.constraint()) {
                    Some(name) if name.contains("chesscom") => Platform::Chesscom,
                    _ => Platform::Lichess,
                };
                Err(StoreError::HandleTaken {
                    platform,
                    handle: player.handle(platform).unwrap_or_default().to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}
