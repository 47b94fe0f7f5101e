//! Lichess game export and open challenges.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{
    ChallengeLinkProvider, ChallengeRequest, GameResultProvider, PlatformGame, ProviderError,
    ProviderResult, SearchWindow,
};
use crate::player::Platform;
use crate::tournament::ingest::GameOutcome;

const LICHESS_BASE_URL: &str = "https://lichess.org";

/// Length of a Lichess game id; longer path segments carry a player suffix
const GAME_ID_LEN: usize = 8;

/// Statuses of games that never produced a result
const UNFINISHED: [&str; 4] = ["created", "started", "aborted", "noStart"];

#[derive(Debug, Deserialize)]
struct ExportedGame {
    id: String,
    status: String,
    #[serde(default)]
    winner: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<i64>,
    players: ExportedPlayers,
}

#[derive(Debug, Deserialize)]
struct ExportedPlayers {
    white: ExportedPlayer,
    black: ExportedPlayer,
}

#[derive(Debug, Deserialize)]
struct ExportedPlayer {
    user: Option<ExportedUser>,
}

#[derive(Debug, Deserialize)]
struct ExportedUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OpenChallenge {
    url: Option<String>,
}

/// Game id from a Lichess game URL
pub fn parse_game_id(game_url: &str) -> Option<String> {
    let rest = game_url
        .trim()
        .strip_prefix("https://")
        .or_else(|| game_url.trim().strip_prefix("http://"))?;
    let mut parts = rest.split('/');
    let host = parts.next()?.to_ascii_lowercase();
    if host != "lichess.org" && host != "www.lichess.org" {
        return None;
    }

    let segment = parts.next()?.split(['?', '#']).next()?;
    let id: String = segment.chars().take(GAME_ID_LEN).collect();
    (id.len() == GAME_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())).then_some(id)
}

fn to_platform_game(game: ExportedGame) -> ProviderResult<Option<PlatformGame>> {
    if UNFINISHED.contains(&game.status.as_str()) {
        return Ok(None);
    }

    let white = game
        .players
        .white
        .user
        .map(|u| u.name)
        .ok_or_else(|| ProviderError::Malformed("white player is anonymous".to_string()))?;
    let black = game
        .players
        .black
        .user
        .map(|u| u.name)
        .ok_or_else(|| ProviderError::Malformed("black player is anonymous".to_string()))?;

    let outcome = match game.winner.as_deref() {
        Some("white") => GameOutcome::WhiteWins,
        Some("black") => GameOutcome::BlackWins,
        None => GameOutcome::Draw,
        Some(other) => {
            return Err(ProviderError::Malformed(format!("unknown winner {other}")));
        }
    };

    Ok(Some(PlatformGame {
        game_id: game.id,
        white,
        black,
        outcome,
        played_at: game.created_at.and_then(DateTime::<Utc>::from_timestamp_millis),
    }))
}

/// Result lookups through the Lichess game export API
pub struct LichessProvider {
    client: reqwest::Client,
    base_url: String,
}

impl LichessProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, LICHESS_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GameResultProvider for LichessProvider {
    fn platform(&self) -> Platform {
        Platform::Lichess
    }

    async fn fetch_result(
        &self,
        game_url: &str,
        _player_handle: &str,
        window: &SearchWindow,
    ) -> ProviderResult<Option<PlatformGame>> {
        let game_id = parse_game_id(game_url)
            .ok_or_else(|| ProviderError::UnsupportedUrl(game_url.to_string()))?;

        let response = self
            .client
            .get(format!("{}/game/export/{game_id}", self.base_url))
            .query(&[("moves", "false"), ("clocks", "false"), ("evals", "false")])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                platform: Platform::Lichess,
                status: response.status().as_u16(),
            });
        }

        let game: ExportedGame = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let game = to_platform_game(game)?;
        Ok(game.filter(|g| g.played_at.is_none_or(|at| window.contains(at))))
    }
}

/// Open challenges restricted to the two paired players
pub struct LichessChallengeProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl LichessChallengeProvider {
    pub fn new(client: reqwest::Client, api_token: Option<String>) -> Self {
        Self {
            client,
            base_url: LICHESS_BASE_URL.to_string(),
            api_token,
        }
    }
}

#[async_trait]
impl ChallengeLinkProvider for LichessChallengeProvider {
    fn platform(&self) -> Platform {
        Platform::Lichess
    }

    async fn create_challenge(&self, request: &ChallengeRequest) -> ProviderResult<Option<String>> {
        let limit = (request.time_control.minutes * 60).to_string();
        let increment = request.time_control.increment_secs.to_string();
        let users = format!("{},{}", request.white_handle, request.black_handle);
        let form = [
            ("clock.limit", limit.as_str()),
            ("clock.increment", increment.as_str()),
            ("name", request.tournament_name.as_str()),
            ("users", users.as_str()),
            ("rated", "true"),
        ];

        let mut builder = self
            .client
            .post(format!("{}/api/challenge/open", self.base_url))
            .form(&form);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                platform: Platform::Lichess,
                status: response.status().as_u16(),
            });
        }

        let challenge: OpenChallenge = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(challenge.url)
    }
}
