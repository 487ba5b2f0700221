//! Wellness endpoints: mood log, stats, challenges, points.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::accounts::Caller;
use crate::domain::{DailyChallenge, MoodEntry, UserChallengeCompletion, UserPoints};
use crate::error::ApiError;
use crate::protocol::{
  ApiJson, ApiQuery, ChallengeCompletedOut, CompleteChallengeIn, DaysQuery, MoodEntryCreatedOut, MoodEntryIn,
  MoodEntryPatch, WellnessStatsOut,
};
use crate::state::AppState;
use crate::wellness::{self as service, DEFAULT_STATS_DAYS};

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_list_mood_entries(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<Vec<MoodEntry>>, ApiError> {
  let user_id = user.id;
  Ok(Json(state.run(move |conn| service::list_mood_entries(conn, user_id)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_create_mood_entry(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<MoodEntryIn>,
) -> Result<(StatusCode, Json<MoodEntryCreatedOut>), ApiError> {
  let user_id = user.id;
  let today = Utc::now().date_naive();
  let out = state.run(move |conn| service::create_mood_entry(conn, user_id, &body, today)).await?;
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, entry_id = id))]
pub async fn http_get_mood_entry(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> Result<Json<MoodEntry>, ApiError> {
  let user_id = user.id;
  Ok(Json(state.run(move |conn| service::get_mood_entry(conn, user_id, id)).await?))
}

/// Serves both PUT and PATCH; fields left out of the body are kept.
#[instrument(level = "info", skip_all, fields(user_id = user.id, entry_id = id))]
pub async fn http_update_mood_entry(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
  ApiJson(body): ApiJson<MoodEntryPatch>,
) -> Result<Json<MoodEntry>, ApiError> {
  let user_id = user.id;
  Ok(Json(state.run(move |conn| service::update_mood_entry(conn, user_id, id, &body)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, entry_id = id))]
pub async fn http_delete_mood_entry(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  let user_id = user.id;
  state.run(move |conn| service::delete_mood_entry(conn, user_id, id)).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, days = ?q.days))]
pub async fn http_mood_stats(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiQuery(q): ApiQuery<DaysQuery>,
) -> Result<Json<Value>, ApiError> {
  let user_id = user.id;
  let days = q.days.unwrap_or(DEFAULT_STATS_DAYS);
  let today = Utc::now().date_naive();
  let stats = state.run(move |conn| service::mood_stats(conn, user_id, days, today)).await?;
  let body = match stats {
    Some(stats) => serde_json::to_value(stats).map_err(ApiError::internal)?,
    None => json!({ "message": "No mood entries found for this period", "stats": null }),
  };
  Ok(Json(body))
}

#[instrument(level = "info", skip_all)]
pub async fn http_list_challenges(
  State(state): State<Arc<AppState>>,
  Caller(_user): Caller,
) -> Result<Json<Vec<DailyChallenge>>, ApiError> {
  let challenges = state.run(|conn| service::list_active_challenges(conn)).await?;
  debug!(target: "wellness", count = challenges.len(), "Challenges served");
  Ok(Json(challenges))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, challenge_id = id))]
pub async fn http_complete_challenge(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
  body: Option<ApiJson<CompleteChallengeIn>>,
) -> Result<Json<ChallengeCompletedOut>, ApiError> {
  let input = body.map(|ApiJson(b)| b).unwrap_or_default();
  let user_id = user.id;
  let today = Utc::now().date_naive();
  Ok(Json(state.run(move |conn| service::complete_challenge(conn, user_id, id, &input, today)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_list_completions(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<Vec<UserChallengeCompletion>>, ApiError> {
  let user_id = user.id;
  Ok(Json(state.run(move |conn| service::list_completions(conn, user_id)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_wellness_stats(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
) -> Result<Json<WellnessStatsOut>, ApiError> {
  let user_id = user.id;
  let today = Utc::now().date_naive();
  Ok(Json(state.run(move |conn| service::wellness_stats(conn, user_id, today)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_points(State(state): State<Arc<AppState>>, Caller(user): Caller) -> Result<Json<UserPoints>, ApiError> {
  let user_id = user.id;
  Ok(Json(state.run(move |conn| service::get_points(conn, user_id)).await?))
}
