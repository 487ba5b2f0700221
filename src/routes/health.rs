//! Liveness check.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use tracing::{error, instrument};

use crate::db::ping;
use crate::protocol::HealthOut;
use crate::state::AppState;

#[instrument(level = "debug", skip_all)]
pub async fn http_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthOut>) {
  let db_ok = match state.run(|conn| Ok(ping(conn)?)).await {
    Ok(()) => true,
    Err(e) => {
      error!(target: "haven_backend", error = ?e, "Health check: database unreachable");
      false
    }
  };

  let (status, label, database) = if db_ok {
    (StatusCode::OK, "healthy", "connected")
  } else {
    (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
  };
  let body = HealthOut {
    status: label,
    database,
    version: env!("CARGO_PKG_VERSION"),
    services: json!({ "api": "up", "database": database }),
  };
  (status, Json(body))
}
