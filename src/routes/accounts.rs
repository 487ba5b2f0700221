//! Account endpoints: registration, profile, onboarding.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument};

use crate::accounts::{complete_onboarding, register_user, update_profile, Caller};
use crate::error::ApiError;
use crate::protocol::{user_out, ApiJson, ProfileUpdateIn, RegisterIn, RegisterOut, UserOut};
use crate::state::AppState;

#[instrument(level = "info", skip_all, fields(username = %body.username))]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<RegisterIn>,
) -> Result<(StatusCode, Json<RegisterOut>), ApiError> {
  let user = state.run(move |conn| register_user(conn, &body)).await?;
  Ok((
    StatusCode::CREATED,
    Json(RegisterOut { detail: "User registered successfully".into(), user: user_out(&user) }),
  ))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_get_profile(Caller(user): Caller) -> Json<UserOut> {
  Json(user_out(&user))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_patch_profile(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<ProfileUpdateIn>,
) -> Result<Json<UserOut>, ApiError> {
  let id = user.id;
  let updated = state.run(move |conn| update_profile(conn, id, &body)).await?;
  info!(target: "accounts", id = user.id, "Profile updated");
  Ok(Json(user_out(&updated)))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_complete_onboarding(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<UserOut>, ApiError> {
  let id = user.id;
  let updated = state.run(move |conn| complete_onboarding(conn, id)).await?;
  info!(target: "accounts", id = user.id, "Onboarding completed");
  Ok(Json(user_out(&updated)))
}
