//! Guide caseload endpoints. Every route here is guide-only.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  Json,
};
use chrono::Utc;
use tracing::instrument;

use crate::accounts::{require_guide, Caller};
use crate::crisis::alerts_for_guide;
use crate::domain::{ClientContact, FollowUp};
use crate::error::ApiError;
use crate::guide::{self as service, PERMISSION_DENIED};
use crate::protocol::{
  ApiJson, ApiQuery, AssignClientIn, ClientAssignedOut, ClientUnassignedOut, ClientUpdatedOut, ContactIn,
  ContactLoggedOut, CrisisAlertOut, FollowUpIn, FollowUpScheduledOut, GuideAnalyticsOut, GuideClientOut, RangeQuery,
  UnassignClientIn, UpdateClientIn,
};
use crate::state::AppState;

#[instrument(level = "info", skip_all, fields(guide_id = user.id))]
pub async fn http_list_clients(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<Vec<GuideClientOut>>, ApiError> {
  Ok(Json(state.run(move |conn| service::list_clients(conn, &user)).await?))
}

#[instrument(level = "info", skip_all, fields(guide_id = user.id, client_id = id))]
pub async fn http_get_client(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> Result<Json<GuideClientOut>, ApiError> {
  Ok(Json(state.run(move |conn| service::get_client(conn, &user, id)).await?))
}

#[instrument(level = "info", skip_all, fields(guide_id = user.id, client_id = id))]
pub async fn http_update_client(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
  ApiJson(body): ApiJson<UpdateClientIn>,
) -> Result<Json<ClientUpdatedOut>, ApiError> {
  let now = Utc::now();
  Ok(Json(state.run(move |conn| service::update_client(conn, &user, id, &body, now)).await?))
}

/// The body is optional; a missing one assigns without notes.
#[instrument(level = "info", skip_all, fields(guide_id = user.id, client_id = id))]
pub async fn http_assign_client(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
  body: Option<ApiJson<AssignClientIn>>,
) -> Result<Json<ClientAssignedOut>, ApiError> {
  let body = body.map(|ApiJson(b)| b).unwrap_or_default();
  let now = Utc::now();
  Ok(Json(state.run(move |conn| service::assign_client(conn, &user, id, &body, now)).await?))
}

#[instrument(level = "info", skip_all, fields(guide_id = user.id, client_id = id))]
pub async fn http_unassign_client(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
  body: Option<ApiJson<UnassignClientIn>>,
) -> Result<Json<ClientUnassignedOut>, ApiError> {
  let body = body.map(|ApiJson(b)| b).unwrap_or_default();
  Ok(Json(state.run(move |conn| service::unassign_client(conn, &user, id, &body)).await?))
}

/// Alerts raised by the caller's active clients.
#[instrument(level = "info", skip_all, fields(guide_id = user.id))]
pub async fn http_client_alerts(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<Vec<CrisisAlertOut>>, ApiError> {
  require_guide(&user, PERMISSION_DENIED)?;
  let guide_id = user.id;
  Ok(Json(state.run(move |conn| alerts_for_guide(conn, guide_id)).await?))
}

#[instrument(level = "info", skip_all, fields(guide_id = user.id, range = ?q.range))]
pub async fn http_analytics(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiQuery(q): ApiQuery<RangeQuery>,
) -> Result<Json<GuideAnalyticsOut>, ApiError> {
  let now = Utc::now();
  Ok(Json(state.run(move |conn| service::analytics(conn, &user, q.range.as_deref(), now)).await?))
}

#[instrument(level = "info", skip_all, fields(guide_id = user.id, client_id = body.client_id))]
pub async fn http_log_contact(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<ContactIn>,
) -> Result<Json<ContactLoggedOut>, ApiError> {
  let now = Utc::now();
  Ok(Json(state.run(move |conn| service::log_contact(conn, &user, &body, now)).await?))
}

#[instrument(level = "info", skip_all, fields(guide_id = user.id, client_id = id))]
pub async fn http_list_contacts(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> Result<Json<Vec<ClientContact>>, ApiError> {
  Ok(Json(state.run(move |conn| service::list_contacts(conn, &user, id)).await?))
}

#[instrument(level = "info", skip_all, fields(guide_id = user.id))]
pub async fn http_list_follow_ups(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<Vec<FollowUp>>, ApiError> {
  Ok(Json(state.run(move |conn| service::list_follow_ups(conn, &user)).await?))
}

#[instrument(level = "info", skip_all, fields(guide_id = user.id, client_id = body.client_id))]
pub async fn http_schedule_follow_up(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<FollowUpIn>,
) -> Result<Json<FollowUpScheduledOut>, ApiError> {
  let now = Utc::now();
  Ok(Json(state.run(move |conn| service::schedule_follow_up(conn, &user, &body, now)).await?))
}
