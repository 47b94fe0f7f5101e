//! Chess.com results through the public monthly game archives.
//!
//! Chess.com has no single-game endpoint, so the submitting player's
//! archives are searched month by month for the game URL.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Months, Utc};
use serde::Deserialize;

use super::{GameResultProvider, PlatformGame, ProviderError, ProviderResult, SearchWindow};
use crate::player::Platform;
use crate::tournament::ingest::GameOutcome;

const CHESSCOM_API_URL: &str = "https://api.chess.com";

/// Most archive months searched for one game
const MAX_MONTHS: usize = 3;

#[derive(Debug, Deserialize)]
struct Archive {
    #[serde(default)]
    games: Vec<ArchivedGame>,
}

#[derive(Debug, Deserialize)]
struct ArchivedGame {
    url: String,
    end_time: Option<i64>,
    white: ArchivedPlayer,
    black: ArchivedPlayer,
}

#[derive(Debug, Deserialize)]
struct ArchivedPlayer {
    username: String,
    result: String,
}

/// Numeric game id from a Chess.com game URL
pub fn parse_game_id(game_url: &str) -> Option<String> {
    let rest = game_url
        .trim()
        .strip_prefix("https://")
        .or_else(|| game_url.trim().strip_prefix("http://"))?;
    let mut parts = rest.split(['?', '#']).next()?.split('/');
    let host = parts.next()?.to_ascii_lowercase();
    if host != "chess.com" && host != "www.chess.com" {
        return None;
    }
    let path: Vec<&str> = parts.filter(|p| !p.is_empty()).collect();
    if !path.contains(&"game") {
        return None;
    }
    path.last()
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .map(|id| id.to_string())
}

/// Archive months to search, newest first
fn months_to_search(window: &SearchWindow, now: DateTime<Utc>) -> Vec<(i32, u32)> {
    let end = window.end.map_or(now, |e| e.min(now));
    let start = window
        .start
        .unwrap_or_else(|| end.checked_sub_months(Months::new(1)).unwrap_or(end));

    let mut months = Vec::new();
    let mut cursor = end;
    while months.len() < MAX_MONTHS {
        months.push((cursor.year(), cursor.month()));
        if (cursor.year(), cursor.month()) <= (start.year(), start.month()) {
            break;
        }
        match cursor.checked_sub_months(Months::new(1)) {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    months
}

fn outcome_of(game: &ArchivedGame) -> GameOutcome {
    if game.white.result == "win" {
        GameOutcome::WhiteWins
    } else if game.black.result == "win" {
        GameOutcome::BlackWins
    } else {
        GameOutcome::Draw
    }
}

fn find_game(archive: Archive, game_id: &str) -> Option<PlatformGame> {
    let suffix = format!("/{game_id}");
    archive
        .games
        .into_iter()
        .find(|g| g.url.ends_with(&suffix))
        .map(|g| PlatformGame {
            game_id: game_id.to_string(),
            outcome: outcome_of(&g),
            played_at: g.end_time.and_then(|t| DateTime::<Utc>::from_timestamp(t, 0)),
            white: g.white.username,
            black: g.black.username,
        })
}

/// Result lookups through the Chess.com published-data API
pub struct ChesscomProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ChesscomProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, CHESSCOM_API_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_archive(&self, handle: &str, year: i32, month: u32) -> ProviderResult<Option<Archive>> {
        let response = self
            .client
            .get(format!(
                "{}/pub/player/{}/games/{year}/{month:02}",
                self.base_url,
                handle.to_ascii_lowercase()
            ))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                platform: Platform::Chesscom,
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl GameResultProvider for ChesscomProvider {
    fn platform(&self) -> Platform {
        Platform::Chesscom
    }

    async fn fetch_result(
        &self,
        game_url: &str,
        player_handle: &str,
        window: &SearchWindow,
    ) -> ProviderResult<Option<PlatformGame>> {
        let game_id = parse_game_id(game_url)
            .ok_or_else(|| ProviderError::UnsupportedUrl(game_url.to_string()))?;

        for (year, month) in months_to_search(window, Utc::now()) {
            let Some(archive) = self.fetch_archive(player_handle, year, month).await? else {
                continue;
            };
            if let Some(game) = find_game(archive, &game_id) {
                let in_window = game.played_at.is_none_or(|at| window.contains(at));
                return Ok(in_window.then_some(game));
            }
        }
        Ok(None)
    }
}
