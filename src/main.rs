//! Haven · Mental Health Support Backend
//!
//! - Axum REST API (accounts, assessments, wellness, crisis, guide caseload)
//! - SQLite storage with embedded migrations and seeded instruments
//! - Optional TOML config for extra recommendations, hotlines and challenges
//!
//! Important env variables:
//!   PORT              : u16 (default 8000)
//!   DATABASE_PATH     : SQLite file (default "haven.sqlite3")
//!   HAVEN_CONFIG_PATH : path to TOML config
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod db;
mod scoring;
mod seeds;
mod state;
mod protocol;
mod accounts;
mod assessments;
mod wellness;
mod crisis;
mod guide;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

const DEFAULT_PORT: u16 = 8000;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Open + migrate + seed the database before accepting traffic.
  let state = Arc::new(AppState::from_env()?);

  let app = build_router(state.clone());

  let port = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .unwrap_or(DEFAULT_PORT);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "haven_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "haven_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!(target: "haven_backend", error = %e, "Failed to install Ctrl+C handler");
      std::future::pending::<()>().await;
    }
    info!(target: "haven_backend", "Received Ctrl+C, shutting down");
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
      Ok(mut s) => {
        s.recv().await;
        info!(target: "haven_backend", "Received terminate signal, shutting down");
      }
      Err(e) => {
        error!(target: "haven_backend", error = %e, "Failed to install signal handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
