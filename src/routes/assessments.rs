//! Assessment endpoints. Thin wrappers: run the matching `crate::assessments`
//! call on the connection, wrap the result.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use tracing::{info, instrument};

use crate::accounts::{require_admin, require_onboarded, Caller};
use crate::assessments as service;
use crate::domain::AssessmentRecommendation;
use crate::error::ApiError;
use crate::protocol::{
  AdminStatsOut, ApiJson, ApiQuery, AssessmentHistoryOut, AssessmentOut, AssessmentRequestOut, AssessmentTypeOut,
  AssignmentOut, CreateAssessmentTypeIn, CreateAssignmentIn, CreateRequestIn, GuideStatsOut,
  RecommendationQuery, ReviewRequestIn, ReviewRequestOut, StatusQuery, TakeAssessmentIn, UpdateAssessmentTypeIn,
};
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_list_types(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<Vec<AssessmentTypeOut>> {
  require_onboarded(&user)?;
  Ok(Json(state.run(|conn| service::list_types_out(conn, true)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, id = id))]
pub async fn http_get_type(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> ApiResult<AssessmentTypeOut> {
  require_onboarded(&user)?;
  let out = state
    .run(move |conn| {
      let t = service::get_active_type(conn, id)?.ok_or_else(|| ApiError::not_found("Not found."))?;
      service::type_with_questions(conn, &t)
    })
    .await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, assessment_type_id = body.assessment_type_id, responses = body.responses.len()))]
pub async fn http_take_assessment(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<TakeAssessmentIn>,
) -> Created<AssessmentOut> {
  require_onboarded(&user)?;
  let user_id = user.id;
  let out = state.run(move |conn| service::take_assessment(conn, user_id, &body)).await?;
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_history(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<Vec<AssessmentHistoryOut>> {
  let user_id = user.id;
  Ok(Json(state.run(move |conn| service::history(conn, user_id)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, id = id))]
pub async fn http_get_result(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> ApiResult<AssessmentOut> {
  let user_id = user.id;
  state
    .run(move |conn| service::get_assessment_for_user(conn, user_id, id))
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Not found."))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_recommendations(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiQuery(q): ApiQuery<RecommendationQuery>,
) -> ApiResult<Vec<AssessmentRecommendation>> {
  let recs = state
    .run(move |conn| service::list_recommendations(conn, q.assessment_type.as_deref(), q.risk_level.as_deref()))
    .await?;
  info!(target: "assessment", count = recs.len(), "Recommendations served");
  Ok(Json(recs))
}

//
// Guide
//

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_list_requests(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<Vec<AssessmentRequestOut>> {
  Ok(Json(state.run(move |conn| service::list_requests_visible_to(conn, &user)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_create_request(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<CreateRequestIn>,
) -> Created<AssessmentRequestOut> {
  let out = state.run(move |conn| service::create_request(conn, &user, &body)).await?;
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_list_assignments(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<Vec<AssignmentOut>> {
  Ok(Json(state.run(move |conn| service::list_assignments_for(conn, &user)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_create_assignment(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<CreateAssignmentIn>,
) -> Created<AssignmentOut> {
  let out = state.run(move |conn| service::create_assignment(conn, &user, &body)).await?;
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_guide_stats(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<GuideStatsOut> {
  Ok(Json(state.run(move |conn| service::guide_stats(conn, &user)).await?))
}

//
// Admin
//

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_admin_requests(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiQuery(q): ApiQuery<StatusQuery>,
) -> ApiResult<Vec<AssessmentRequestOut>> {
  Ok(Json(state.run(move |conn| service::admin_list_requests(conn, &user, q.status.as_deref())).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, id = id, action = %body.action))]
pub async fn http_review_request(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
  ApiJson(body): ApiJson<ReviewRequestIn>,
) -> ApiResult<ReviewRequestOut> {
  let out = state
    .run(move |conn| service::review_request(conn, &user, id, &body.action, &body.admin_notes))
    .await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_admin_list_types(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<Vec<AssessmentTypeOut>> {
  require_admin(&user)?;
  Ok(Json(state.run(|conn| service::list_types_out(conn, false)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, name = %body.name))]
pub async fn http_admin_create_type(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  ApiJson(body): ApiJson<CreateAssessmentTypeIn>,
) -> Created<AssessmentTypeOut> {
  let out = state.run(move |conn| service::create_type(conn, &user, &body)).await?;
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, id = id))]
pub async fn http_admin_get_type(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> ApiResult<AssessmentTypeOut> {
  Ok(Json(state.run(move |conn| service::admin_get_type(conn, &user, id)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, id = id))]
pub async fn http_admin_update_type(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
  ApiJson(body): ApiJson<UpdateAssessmentTypeIn>,
) -> ApiResult<AssessmentTypeOut> {
  Ok(Json(state.run(move |conn| service::update_type(conn, &user, id, &body)).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = user.id, id = id))]
pub async fn http_admin_delete_type(
  State(state): State<Arc<AppState>>,
  Caller(user): Caller,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  state.run(move |conn| service::delete_type(conn, &user, id)).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip_all, fields(user_id = user.id))]
pub async fn http_admin_stats(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<AdminStatsOut> {
  Ok(Json(state.run(move |conn| service::admin_stats(conn, &user)).await?))
}
