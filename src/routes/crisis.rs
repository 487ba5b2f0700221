//! Crisis endpoints. Hotlines are public; alerts and safety plans need a caller.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use chrono::Utc;
use tracing::instrument;

use crate::accounts::Caller;
use crate::crisis as service;
use crate::domain::CrisisHotline;
use crate::error::ApiError;
use crate::protocol::{
  ApiJson, CreateAlertIn, CrisisAlertOut, CrisisStatsOut, MessageOut, RespondAlertIn, SafetyPlanSavedOut,
  SafetyPlanSections, SafetyPlanView,
};
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
pub async fn http_hotlines(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CrisisHotline>>, ApiError> {
  Ok(Json(state.run(|conn| service::list_hotlines(conn)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_list_alerts(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<Vec<CrisisAlertOut>>, ApiError> {
  Ok(Json(state.run(move |conn| service::list_alerts(conn, &user)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, severity = %body.severity_level))]
pub async fn http_create_alert(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<CreateAlertIn>,
) -> Result<(StatusCode, Json<CrisisAlertOut>), ApiError> {
  let out = state.run(move |conn| service::create_alert(conn, &user, &body)).await?;
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, alert_id = id))]
pub async fn http_get_alert(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> Result<Json<CrisisAlertOut>, ApiError> {
  Ok(Json(state.run(move |conn| service::get_alert(conn, &user, id)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, alert_id = id))]
pub async fn http_respond_alert(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
  ApiJson(body): ApiJson<RespondAlertIn>,
) -> Result<Json<MessageOut>, ApiError> {
  Ok(Json(state.run(move |conn| service::respond_to_alert(conn, &user, id, &body)).await?))
}

/// The caller's saved plan, or an empty template when none exists yet.
#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_get_safety_plan(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<SafetyPlanView>, ApiError> {
  let user_id = user.id;
  Ok(Json(state.run(move |conn| service::safety_plan_view(conn, user_id)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_save_safety_plan(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<SafetyPlanSections>,
) -> Result<Json<SafetyPlanSavedOut>, ApiError> {
  let user_id = user.id;
  let now = Utc::now();
  Ok(Json(state.run(move |conn| service::save_safety_plan(conn, user_id, &body, now)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_crisis_stats(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<CrisisStatsOut>, ApiError> {
  let now = Utc::now();
  Ok(Json(state.run(move |conn| service::crisis_stats(conn, &user, now)).await?))
}
