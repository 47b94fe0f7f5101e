//! HTTP API for the round-robin tournament server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP
//! - **Tower**: Middleware for request ids, CORS and admin authorization
//! - **TournamentManager**: all rules live in the core crate; handlers only
//!   translate requests and errors
//!
//! # Modules
//!
//! - [`operations`]: register, withdraw and game submission
//! - [`tournaments`]: listings, standings and the admin close
//! - [`error`]: error kind to status code mapping
//! - [`middleware`]: admin authorization
//! - [`request_id`]: request correlation ids and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                             - Health check (public)
//! POST /api/v1/round-robin                 - Register, withdraw, submit a game (public)
//! GET  /api/v1/tournaments                 - List tournaments (public)
//! GET  /api/v1/tournaments/{id}            - Tournament details (public)
//! GET  /api/v1/tournaments/{id}/standings  - Standings and crosstable (public)
//! POST /api/v1/tournaments/{id}/close      - Close a tournament (admin)
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod error;
pub mod middleware;
pub mod operations;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use round_robin::TournamentManager;
use round_robin::db::Database;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    /// Present when the stores are backed by PostgreSQL
    pub database: Option<Database>,
    /// Bearer token for admin routes; `None` disables them
    pub admin_token: Option<Arc<str>>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use rr_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id::request_id_middleware))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/round-robin", post(operations::handle_operation))
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route("/tournaments/{id}/standings", get(tournaments::get_standings));

    let admin_routes = Router::new()
        .route("/tournaments/{id}/close", post(tournaments::close_tournament))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::admin_middleware,
        ));

    Router::new().merge(public_routes).merge(admin_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers (or no database is used), and
/// `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","store":"postgres","database":true,"timestamp":"2026-03-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (store, db_healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store,
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
