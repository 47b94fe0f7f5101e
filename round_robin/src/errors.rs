//! Tournament error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cohort::Cohort;
use crate::db::StoreError;
use crate::player::PlayerId;
use crate::providers::ProviderError;
use crate::tournament::models::{TournamentId, TournamentStatus};

/// Machine-readable error kind returned alongside every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    CapacityExhausted,
    DuplicateMembership,
    DuplicateMember,
    InsufficientPlayers,
    BelowMinimumRoster,
    UnknownParticipant,
    UnknownMember,
    SelfPlay,
    AlreadyRecorded,
    AlreadySubmitted,
    UnverifiedParticipant,
    ConcurrencyConflict,
    ExternalProvider,
    NotFound,
    InvalidState,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::CapacityExhausted => "capacity_exhausted",
            ErrorKind::DuplicateMembership => "duplicate_membership",
            ErrorKind::DuplicateMember => "duplicate_member",
            ErrorKind::InsufficientPlayers => "insufficient_players",
            ErrorKind::BelowMinimumRoster => "below_minimum_roster",
            ErrorKind::UnknownParticipant => "unknown_participant",
            ErrorKind::UnknownMember => "unknown_member",
            ErrorKind::SelfPlay => "self_play",
            ErrorKind::AlreadyRecorded => "already_recorded",
            ErrorKind::AlreadySubmitted => "already_submitted",
            ErrorKind::UnverifiedParticipant => "unverified_participant",
            ErrorKind::ConcurrencyConflict => "concurrency_conflict",
            ErrorKind::ExternalProvider => "external_provider",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Storage => "storage",
        };
        write!(f, "{name}")
    }
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Missing or contradictory request fields
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No WAITING tournament with a free seat in any searched band
    #[error("No open tournament in cohorts {}", format_bands(.searched))]
    CapacityExhausted { searched: Vec<Cohort> },

    /// Player is already on the roster of a non-closed tournament
    #[error("Player {player} is already registered in tournament {tournament}")]
    DuplicateMembership {
        player: PlayerId,
        tournament: TournamentId,
    },

    /// Ledger already holds an entry for this player
    #[error("Player {0} already has a ledger entry")]
    DuplicateMember(PlayerId),

    #[error("Insufficient players: need {needed}, have {current}")]
    InsufficientPlayers { needed: usize, current: usize },

    #[error("Roster cannot drop below {minimum} players (would have {remaining})")]
    BelowMinimumRoster { minimum: usize, remaining: usize },

    /// Crosstable index outside the current roster
    #[error("Unknown participant at position {index} (roster size {size})")]
    UnknownParticipant { index: usize, size: usize },

    /// Ledger reference to a player who is not on the roster
    #[error("Unknown member: {0}")]
    UnknownMember(PlayerId),

    #[error("A player cannot play against themselves")]
    SelfPlay,

    #[error("Result between positions {first} and {second} is already recorded")]
    AlreadyRecorded { first: usize, second: usize },

    /// Game id was applied before
    #[error("Game already submitted: {0}")]
    AlreadySubmitted(String),

    /// Platform handle or id that does not belong to a verified roster member
    #[error("Unverified participant: {0}")]
    UnverifiedParticipant(String),

    /// Conditional write lost the race
    #[error("Concurrent update of tournament {0}, please retry")]
    ConcurrencyConflict(TournamentId),

    /// Timeout or lookup failure talking to a platform or collaborator
    #[error("External provider error: {0}")]
    ExternalProvider(#[from] ProviderError),

    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    /// Store I/O failure or timeout
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for TournamentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { id, .. } => TournamentError::ConcurrencyConflict(id),
            StoreError::Missing(id) => TournamentError::NotFound(id),
            taken @ StoreError::HandleTaken { .. } => TournamentError::Validation(taken.to_string()),
            other => TournamentError::Storage(other),
        }
    }
}

fn format_bands(bands: &[Cohort]) -> String {
    bands
        .iter()
        .map(|c| c.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl TournamentError {
    /// Machine-distinguishable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::Validation(_) => ErrorKind::Validation,
            TournamentError::CapacityExhausted { .. } => ErrorKind::CapacityExhausted,
            TournamentError::DuplicateMembership { .. } => ErrorKind::DuplicateMembership,
            TournamentError::DuplicateMember(_) => ErrorKind::DuplicateMember,
            TournamentError::InsufficientPlayers { .. } => ErrorKind::InsufficientPlayers,
            TournamentError::BelowMinimumRoster { .. } => ErrorKind::BelowMinimumRoster,
            TournamentError::UnknownParticipant { .. } => ErrorKind::UnknownParticipant,
            TournamentError::UnknownMember(_) => ErrorKind::UnknownMember,
            TournamentError::SelfPlay => ErrorKind::SelfPlay,
            TournamentError::AlreadyRecorded { .. } => ErrorKind::AlreadyRecorded,
            TournamentError::AlreadySubmitted(_) => ErrorKind::AlreadySubmitted,
            TournamentError::UnverifiedParticipant(_) => ErrorKind::UnverifiedParticipant,
            TournamentError::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            TournamentError::ExternalProvider(_) => ErrorKind::ExternalProvider,
            TournamentError::NotFound(_) => ErrorKind::NotFound,
            TournamentError::InvalidState { .. } => ErrorKind::InvalidState,
            TournamentError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether the caller may retry the request (with backoff)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TournamentError::ExternalProvider(_) | TournamentError::Storage(_)
        )
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage errors are sanitized so that SQL details and connection
    /// strings never reach the end user.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Storage(_) => "Temporary server error, please retry".to_string(),
            TournamentError::ExternalProvider(_) => {
                "Unable to reach the chess platform, please retry shortly".to_string()
            }
            TournamentError::CapacityExhausted { searched } => format!(
                "All tournaments in cohorts {} are full, please try again later",
                format_bands(searched)
            ),
            TournamentError::InsufficientPlayers { needed, current } => format!(
                "At least {needed} players are needed to generate pairings, the tournament has {current}"
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_store_conflict_maps_to_concurrency_conflict() {
        let id = Uuid::new_v4();
        let err: TournamentError = StoreError::Conflict { id, expected: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_storage_errors_are_sanitized_and_retryable() {
        let err: TournamentError = StoreError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.is_retryable());
        assert!(!err.client_message().contains("5s"));
    }

    #[test]
    fn test_capacity_exhausted_names_every_band() {
        let searched = vec![
            Cohort::from_start(1000).unwrap(),
            Cohort::from_start(900).unwrap(),
            Cohort::from_start(1100).unwrap(),
        ];
        let msg = TournamentError::CapacityExhausted { searched }.to_string();
        assert!(msg.contains("1000-1100"));
        assert!(msg.contains("900-1000"));
        assert!(msg.contains("1100-1200"));
    }

    #[test]
    fn test_error_kind_display_matches_serde() {
        let json = serde_json::to_string(&ErrorKind::AlreadySubmitted).unwrap();
        assert_eq!(json, format!("\"{}\"", ErrorKind::AlreadySubmitted));
    }
}
