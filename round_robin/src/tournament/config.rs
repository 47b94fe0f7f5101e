//! Tournament manager configuration.

use std::time::Duration;

use super::models::{MAX_CAPACITY, MIN_CAPACITY};
use crate::errors::{TournamentError, TournamentResult};

/// Default number of players per tournament
pub const DEFAULT_CAPACITY: usize = 8;

/// Policy knobs for [`super::TournamentManager`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Seats in newly created tournaments
    pub capacity: usize,
    /// Create challenge links for new tournaments' pairings
    pub automode: bool,
    /// Timeout for a single platform request
    pub provider_timeout: Duration,
    /// Attempts per platform lookup before giving up
    pub provider_attempts: u32,
    /// Delay before the first provider retry, doubled after each attempt
    pub provider_backoff: Duration,
    /// Timeout for a single store call
    pub store_timeout: Duration,
    /// Re-read and re-apply attempts after a lost conditional write
    pub commit_attempts: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            automode: false,
            provider_timeout: Duration::from_secs(10),
            provider_attempts: 3,
            provider_backoff: Duration::from_millis(250),
            store_timeout: Duration::from_secs(5),
            commit_attempts: 3,
        }
    }
}

impl ManagerConfig {
    /// Load from environment variables, falling back to defaults
    ///
    /// - `TOURNAMENT_CAPACITY` (default: 8)
    /// - `TOURNAMENT_AUTOMODE` (default: false)
    /// - `PROVIDER_TIMEOUT_MS` (default: 10000)
    /// - `PROVIDER_ATTEMPTS` (default: 3)
    /// - `PROVIDER_BACKOFF_MS` (default: 250)
    /// - `STORE_TIMEOUT_MS` (default: 5000)
    /// - `COMMIT_ATTEMPTS` (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: parse_env_or("TOURNAMENT_CAPACITY", defaults.capacity),
            automode: parse_env_or("TOURNAMENT_AUTOMODE", defaults.automode),
            provider_timeout: Duration::from_millis(parse_env_or(
                "PROVIDER_TIMEOUT_MS",
                defaults.provider_timeout.as_millis() as u64,
            )),
            provider_attempts: parse_env_or("PROVIDER_ATTEMPTS", defaults.provider_attempts),
            provider_backoff: Duration::from_millis(parse_env_or(
                "PROVIDER_BACKOFF_MS",
                defaults.provider_backoff.as_millis() as u64,
            )),
            store_timeout: Duration::from_millis(parse_env_or(
                "STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )),
            commit_attempts: parse_env_or("COMMIT_ATTEMPTS", defaults.commit_attempts),
        }
    }

    pub fn validate(&self) -> TournamentResult<()> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(TournamentError::Validation(format!(
                "capacity must be between {MIN_CAPACITY} and {MAX_CAPACITY}, got {}",
                self.capacity
            )));
        }
        if self.provider_attempts == 0 || self.commit_attempts == 0 {
            return Err(TournamentError::Validation(
                "attempt counts must be at least 1".to_string(),
            ));
        }
        if self.provider_timeout.is_zero() || self.store_timeout.is_zero() {
            return Err(TournamentError::Validation(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid
pub(crate) fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
