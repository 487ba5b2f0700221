//! Router assembly: REST endpoints per area, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod accounts;
pub mod assessments;
pub mod crisis;
pub mod guide;
pub mod health;
pub mod wellness;

/// Build the application router with:
/// - `/api/accounts/...`, `/api/assessments/...`, `/api/wellness/...`
/// - `/api/crisis/...` and the guide caseload under `/api/guide/...`
/// - `/health/` liveness check
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health/", get(health::http_health))
        .nest("/api/accounts", accounts_routes())
        .nest("/api/assessments", assessment_routes())
        .nest("/api/wellness", wellness_routes())
        .nest("/api/crisis", crisis_routes())
        .nest("/api/guide", guide_routes())
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn accounts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register/", post(accounts::http_register))
        .route(
            "/profile/",
            get(accounts::http_get_profile).patch(accounts::http_patch_profile),
        )
        .route("/onboarding/", post(accounts::http_complete_onboarding))
}

fn assessment_routes() -> Router<Arc<AppState>> {
    use assessments::*;
    Router::new()
        .route("/types/", get(http_list_types))
        .route("/types/:id/", get(http_get_type))
        .route("/take/", post(http_take_assessment))
        .route("/history/", get(http_history))
        .route("/results/:id/", get(http_get_result))
        .route("/recommendations/", get(http_recommendations))
        .route(
            "/guide/requests/",
            get(http_list_requests).post(http_create_request),
        )
        .route(
            "/guide/assignments/",
            get(http_list_assignments).post(http_create_assignment),
        )
        .route("/guide/stats/", get(http_guide_stats))
        .route("/admin/requests/", get(http_admin_requests))
        .route("/admin/requests/:id/review/", post(http_review_request))
        .route(
            "/admin/types/",
            get(http_admin_list_types).post(http_admin_create_type),
        )
        .route(
            "/admin/types/:id/",
            get(http_admin_get_type)
                .patch(http_admin_update_type)
                .delete(http_admin_delete_type),
        )
        .route("/admin/stats/", get(http_admin_stats))
}

fn wellness_routes() -> Router<Arc<AppState>> {
    use wellness::*;
    Router::new()
        .route(
            "/mood-entries/",
            get(http_list_mood_entries).post(http_create_mood_entry),
        )
        .route(
            "/mood-entries/:id/",
            get(http_get_mood_entry)
                .put(http_update_mood_entry)
                .patch(http_update_mood_entry)
                .delete(http_delete_mood_entry),
        )
        .route("/mood-stats/", get(http_mood_stats))
        .route("/challenges/", get(http_list_challenges))
        .route("/challenges/:id/complete/", post(http_complete_challenge))
        .route("/challenge-completions/", get(http_list_completions))
        .route("/stats/", get(http_wellness_stats))
        .route("/points/", get(http_points))
}

fn crisis_routes() -> Router<Arc<AppState>> {
    use crisis::*;
    Router::new()
        .route("/hotlines/", get(http_hotlines))
        .route("/alerts/", get(http_list_alerts).post(http_create_alert))
        .route("/alerts/:id/", get(http_get_alert))
        .route("/alerts/:id/respond/", post(http_respond_alert))
        .route(
            "/safety-plan/",
            get(http_get_safety_plan).post(http_save_safety_plan),
        )
        .route("/stats/", get(http_crisis_stats))
}

fn guide_routes() -> Router<Arc<AppState>> {
    use guide::*;
    Router::new()
        .route("/clients/", get(http_list_clients))
        .route("/clients/:id/", get(http_get_client))
        .route("/clients/:id/update/", put(http_update_client))
        .route("/clients/:id/assign/", post(http_assign_client))
        .route("/clients/:id/unassign/", post(http_unassign_client))
        .route("/clients/:id/contacts/", get(http_list_contacts))
        .route("/crisis-alerts/", get(http_client_alerts))
        .route("/analytics/", get(http_analytics))
        .route("/client-contact/", post(http_log_contact))
        .route("/follow-ups/", get(http_list_follow_ups))
        .route("/follow-ups/schedule/", post(http_schedule_follow_up))
}
