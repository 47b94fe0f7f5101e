//! Player identity and linked chess-platform accounts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{TournamentError, TournamentResult};

/// Canonical player id (stable username)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a player id, rejecting blank names
    pub fn new(id: impl Into<String>) -> TournamentResult<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(TournamentError::Validation(
                "player id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Rebuild an id that was validated before it was stored
    pub(crate) fn from_stored(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported chess platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Lichess,
    Chesscom,
}

impl Platform {
    /// Platform hosting a game URL, if supported
    pub fn from_game_url(url: &str) -> Option<Platform> {
        let rest = url
            .trim()
            .strip_prefix("https://")
            .or_else(|| url.trim().strip_prefix("http://"))?;
        let host = rest.split('/').next()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        match host {
            "lichess.org" => Some(Platform::Lichess),
            "chess.com" => Some(Platform::Chesscom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Lichess => "lichess",
            Platform::Chesscom => "chesscom",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    /// Platform account handles; at least one is present
    pub handles: BTreeMap<Platform, String>,
}

impl Player {
    /// Create a player with at least one linked platform handle
    pub fn new(
        id: PlayerId,
        display_name: impl Into<String>,
        handles: BTreeMap<Platform, String>,
    ) -> TournamentResult<Self> {
        let handles: BTreeMap<Platform, String> = handles
            .into_iter()
            .map(|(platform, handle)| (platform, handle.trim().to_string()))
            .filter(|(_, handle)| !handle.is_empty())
            .collect();

        if handles.is_empty() {
            return Err(TournamentError::Validation(format!(
                "player {id} must link a Lichess or Chess.com account"
            )));
        }

        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            id.to_string()
        } else {
            display_name.trim().to_string()
        };

        Ok(Self {
            id,
            display_name,
            handles,
        })
    }

    pub fn handle(&self, platform: Platform) -> Option<&str> {
        self.handles.get(&platform).map(String::as_str)
    }

    /// Whether `handle` is this player's account on `platform` (case-insensitive)
    pub fn owns_handle(&self, platform: Platform, handle: &str) -> bool {
        self.handle(platform)
            .is_some_and(|own| own.eq_ignore_ascii_case(handle))
    }
}
