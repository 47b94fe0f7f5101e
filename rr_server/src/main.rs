//! Round-robin tournament server.
//!
//! Serves the tournament API over PostgreSQL-backed stores, or in-memory
//! stores when no database is configured.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use round_robin::TournamentManager;
use round_robin::db::{
    Database, MemoryPlayerStore, MemoryTournamentStore, PgPlayerStore, PgTournamentStore,
    PlayerStore, TournamentStore,
};
use round_robin::providers::{self, LichessChallengeProvider, ProviderRegistry};
use rr_server::{api, config::ServerConfig, logging, metrics};
use tracing::{info, warn};

const HELP: &str = "\
Run the round-robin tournament server

USAGE:
  rr_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url        URL      Database connection string  [default: env DATABASE_URL, in-memory if unset]
  --metrics-bind  IP:PORT  Prometheus scrape address   [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  TOURNAMENT_CAPACITY      Players per tournament, 4 to 10 (default 8)
  TOURNAMENT_AUTOMODE      Open Lichess challenges for new pairings (default false)
  LICHESS_API_TOKEN        Token used for automode challenges
  ADMIN_TOKEN              Bearer token for admin endpoints
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    metrics_bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
    };

    let config = ServerConfig::from_env(args.bind, args.database_url, args.metrics_bind)?;
    config.validate()?;

    logging::init();
    info!("Starting round-robin server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics at http://{addr}/metrics");
    }

    let client = providers::http_client(config.manager.provider_timeout)
        .context("Failed to build HTTP client")?;
    let mut registry = ProviderRegistry::with_default_platforms(client.clone());
    if config.manager.automode {
        if config.lichess_token.is_none() {
            warn!("Automode without LICHESS_API_TOKEN, challenges are opened anonymously");
        }
        registry = registry.with_challenge_provider(Arc::new(LichessChallengeProvider::new(
            client,
            config.lichess_token.clone(),
        )));
    }

    let (tournaments, players, database): (
        Arc<dyn TournamentStore>,
        Arc<dyn PlayerStore>,
        Option<Database>,
    ) = match &config.database {
        Some(db_config) => {
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected and migrated");

            let timeout = db_config.query_timeout();
            (
                Arc::new(PgTournamentStore::new(db.pool().clone(), timeout)),
                Arc::new(PgPlayerStore::new(db.pool().clone(), timeout)),
                Some(db),
            )
        }
        None => {
            warn!("No DATABASE_URL configured, state lives in memory and is lost on exit");
            (
                Arc::new(MemoryTournamentStore::new()),
                Arc::new(MemoryPlayerStore::new()),
                None,
            )
        }
    };

    let manager = TournamentManager::new(tournaments, players, registry, config.manager.clone());
    info!(
        "Tournaments seat {} players (automode: {})",
        config.manager.capacity, config.manager.automode
    );

    let state = api::AppState {
        manager: Arc::new(manager),
        database: database.clone(),
        admin_token: config.admin_token.as_deref().map(Arc::from),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
