//! Admin authorization for tournament management endpoints.
//!
//! Admin routes expect the configured token as a bearer token:
//!
//! ```text
//! Authorization: Bearer <ADMIN_TOKEN>
//! ```
//!
//! Without a configured token the admin routes answer `403 Forbidden`.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use super::AppState;

/// Middleware that lets only requests carrying the admin token through.
///
/// # Behavior
///
/// - **No token configured**: Returns `403 Forbidden`
/// - **Missing or malformed header**: Returns `401 Unauthorized`
/// - **Wrong token**: Returns `401 Unauthorized`
///
/// # Example
///
/// ```rust,no_run
/// use axum::{Router, routing::post, middleware};
/// # use rr_server::api::middleware::admin_middleware;
/// # use rr_server::api::AppState;
/// # async fn close_tournament() {}
/// # let state: AppState = unimplemented!();
///
/// let admin: Router<AppState> = Router::new()
///     .route("/tournaments/{id}/close", post(close_tournament))
///     .layer(middleware::from_fn_with_state(state, admin_middleware));
/// # let _ = admin;
/// ```
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(StatusCode::FORBIDDEN);
    };

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected);

    if !authorized {
        tracing::warn!(uri = %request.uri(), "Rejected admin request");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}
