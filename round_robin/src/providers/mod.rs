//! Chess-platform collaborators: game result lookup and challenge links.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod chesscom;
pub mod lichess;
pub mod retry;

pub use chesscom::ChesscomProvider;
pub use lichess::{LichessChallengeProvider, LichessProvider};
pub use retry::RetryPolicy;

use crate::cohort::TimeControl;
use crate::player::Platform;
use crate::tournament::ingest::GameOutcome;

/// Provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {platform}")]
    Status { platform: Platform, status: u16 },

    /// Response did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Game URL the provider cannot handle
    #[error("Unsupported game URL: {0}")]
    UnsupportedUrl(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Unavailable(_) => true,
            ProviderError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Malformed(_) | ProviderError::UnsupportedUrl(_) => false,
        }
    }
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A finished game as reported by a platform, players named by handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformGame {
    /// Platform game id
    pub game_id: String,
    pub white: String,
    pub black: String,
    pub outcome: GameOutcome,
    pub played_at: Option<DateTime<Utc>>,
}

/// Period in which tournament games must have been played
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl SearchWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| at >= s) && self.end.is_none_or(|e| at <= e)
    }
}

/// Looks up finished games on one platform
#[async_trait]
pub trait GameResultProvider: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetch the game at `game_url`; `None` when it does not exist, is not
    /// finished or falls outside `window`
    async fn fetch_result(
        &self,
        game_url: &str,
        player_handle: &str,
        window: &SearchWindow,
    ) -> ProviderResult<Option<PlatformGame>>;
}

/// Everything needed to open a challenge for one pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    pub time_control: TimeControl,
    pub tournament_name: String,
    pub white_handle: String,
    pub black_handle: String,
}

/// Creates open challenge links for scheduled pairings
#[async_trait]
pub trait ChallengeLinkProvider: Send + Sync {
    fn platform(&self) -> Platform;

    /// Challenge URL, or `None` when the platform declined
    async fn create_challenge(&self, request: &ChallengeRequest) -> ProviderResult<Option<String>>;
}

/// Result providers per platform plus the optional challenge provider
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    results: HashMap<Platform, Arc<dyn GameResultProvider>>,
    challenges: Option<Arc<dyn ChallengeLinkProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lichess and Chess.com result providers sharing one HTTP client
    pub fn with_default_platforms(client: reqwest::Client) -> Self {
        Self::new()
            .with_result_provider(Arc::new(LichessProvider::new(client.clone())))
            .with_result_provider(Arc::new(ChesscomProvider::new(client)))
    }

    pub fn with_result_provider(mut self, provider: Arc<dyn GameResultProvider>) -> Self {
        self.results.insert(provider.platform(), provider);
        self
    }

    pub fn with_challenge_provider(mut self, provider: Arc<dyn ChallengeLinkProvider>) -> Self {
        self.challenges = Some(provider);
        self
    }

    pub fn result_provider(&self, platform: Platform) -> Option<Arc<dyn GameResultProvider>> {
        self.results.get(&platform).cloned()
    }

    pub fn challenge_provider(&self) -> Option<Arc<dyn ChallengeLinkProvider>> {
        self.challenges.clone()
    }
}

/// Shared HTTP client with the timeout and user agent platforms expect
pub fn http_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("round_robin/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
