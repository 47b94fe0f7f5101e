//! HTTP server for cohort round-robin chess tournaments.
//!
//! The binary wires [`config::ServerConfig`] into a
//! [`round_robin::TournamentManager`] and serves [`api::create_router`].

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
