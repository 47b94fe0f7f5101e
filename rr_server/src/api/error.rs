//! Mapping of tournament errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use round_robin::{ErrorKind, TournamentError};
use serde::{Deserialize, Serialize};

use crate::{logging, metrics};

/// Body of every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::UnverifiedParticipant => StatusCode::FORBIDDEN,
        ErrorKind::NotFound | ErrorKind::UnknownMember => StatusCode::NOT_FOUND,
        ErrorKind::CapacityExhausted
        | ErrorKind::DuplicateMembership
        | ErrorKind::DuplicateMember
        | ErrorKind::AlreadyRecorded
        | ErrorKind::AlreadySubmitted
        | ErrorKind::ConcurrencyConflict
        | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::InsufficientPlayers
        | ErrorKind::BelowMinimumRoster
        | ErrorKind::UnknownParticipant
        | ErrorKind::SelfPlay => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ExternalProvider => StatusCode::BAD_GATEWAY,
        ErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// A failed operation, rendered as [`ErrorResponse`]
#[derive(Debug)]
pub struct ApiError {
    pub operation: &'static str,
    pub error: TournamentError,
}

impl ApiError {
    pub fn new(operation: &'static str, error: TournamentError) -> Self {
        Self { operation, error }
    }

    /// Adapter for `map_err`
    pub fn during(operation: &'static str) -> impl Fn(TournamentError) -> Self {
        move |error| Self::new(operation, error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.error.kind();
        let retryable = self.error.is_retryable();
        let kind_label = kind.to_string();

        logging::log_operation_failure(
            self.operation,
            &kind_label,
            retryable,
            &self.error.to_string(),
        );
        metrics::operation_errors_total(self.operation, &kind_label);

        let body = ErrorResponse {
            kind,
            message: self.error.client_message(),
            retryable,
        };
        (status_for(kind), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use round_robin::player::PlayerId;
    use uuid::Uuid;

    #[test]
    fn test_client_errors_are_4xx() {
        let errors = [
            TournamentError::Validation("bad".to_string()),
            TournamentError::CapacityExhausted { searched: vec![] },
            TournamentError::UnknownMember(PlayerId::new("p1").unwrap()),
            TournamentError::SelfPlay,
            TournamentError::ConcurrencyConflict(Uuid::new_v4()),
            TournamentError::UnverifiedParticipant("p1".to_string()),
        ];
        for error in errors {
            assert!(status_for(error.kind()).is_client_error(), "{error}");
        }
    }

    #[test]
    fn test_retryable_errors_are_5xx() {
        assert_eq!(status_for(ErrorKind::ExternalProvider), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::Storage), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_response_status() {
        let response = ApiError::new("withdraw", TournamentError::NotFound(Uuid::new_v4()))
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
