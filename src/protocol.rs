//! Public request/response DTOs for the HTTP API (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use axum::extract::{FromRequest, FromRequestParts};
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    AlertStatus, AlertType, AnswerOption, AssessmentQuestion, AssessmentType, AssignmentPriority,
    ContactOutcome, ContactType, MoodEntry, RecommendationSnapshot, RequestStatus, RequestType,
    RiskLevel, Role, SafetyPlan, SeverityLevel, User,
};
use crate::error::ApiError;

/// JSON body extractor whose rejections come back as `400 {"error": ...}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with the same `400 {"error": ...}` rejections.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

fn default_true() -> bool {
    true
}

//
// Accounts
//

#[derive(Debug, Deserialize)]
pub struct RegisterIn {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub age: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProfileUpdateIn {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: Role,
    pub age: Option<u32>,
    pub onboarding_completed: bool,
    pub date_joined: DateTime<Utc>,
}

pub fn user_out(u: &User) -> UserOut {
    UserOut {
        id: u.id,
        email: u.email.clone(),
        username: u.username.clone(),
        first_name: u.first_name.clone(),
        last_name: u.last_name.clone(),
        full_name: u.full_name(),
        role: u.role,
        age: u.age,
        onboarding_completed: u.onboarding_completed,
        date_joined: u.date_joined,
    }
}

#[derive(Serialize)]
pub struct RegisterOut {
    pub detail: String,
    pub user: UserOut,
}

//
// Assessments
//

#[derive(Debug, Deserialize)]
pub struct TakeAssessmentIn {
    pub assessment_type_id: i64,
    pub responses: Vec<ResponseIn>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ResponseIn {
    pub question_id: i64,
    pub selected_option_index: i64,
}

#[derive(Debug, Serialize)]
pub struct AssessmentTypeOut {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub instructions: String,
    pub total_questions: u32,
    pub max_score: u32,
    pub is_active: bool,
    pub questions: Vec<AssessmentQuestion>,
}

pub fn type_out(t: &AssessmentType, questions: Vec<AssessmentQuestion>) -> AssessmentTypeOut {
    AssessmentTypeOut {
        id: t.id,
        name: t.name.clone(),
        display_name: t.display_name.clone(),
        description: t.description.clone(),
        instructions: t.instructions.clone(),
        total_questions: t.total_questions,
        max_score: t.max_score,
        is_active: t.is_active,
        questions,
    }
}

#[derive(Debug, Serialize)]
pub struct AssessmentResponseOut {
    pub question: i64,
    pub question_text: String,
    pub selected_option_index: u32,
    pub score: u32,
}

/// Full result of one completed assessment.
#[derive(Debug, Serialize)]
pub struct AssessmentOut {
    pub id: i64,
    pub assessment_type: i64,
    pub assessment_type_name: String,
    pub total_score: u32,
    pub percentage_score: f64,
    pub risk_level: RiskLevel,
    pub interpretation: String,
    pub recommendations: Vec<RecommendationSnapshot>,
    pub completed_at: DateTime<Utc>,
    pub responses: Vec<AssessmentResponseOut>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentHistoryOut {
    pub id: i64,
    pub assessment_type_name: String,
    pub total_score: u32,
    pub percentage_score: f64,
    pub risk_level: RiskLevel,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub assessment_type: Option<String>,
    pub risk_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionIn {
    #[serde(default)]
    pub question_number: Option<u32>,
    pub question_text: String,
    pub options: Vec<AnswerOption>,
    #[serde(default)]
    pub is_reverse_scored: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssessmentTypeIn {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub max_score: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub questions: Vec<QuestionIn>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateAssessmentTypeIn {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub total_questions: Option<u32>,
    pub max_score: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestIn {
    pub request_type: RequestType,
    pub title: String,
    pub description: String,
    pub justification: String,
    #[serde(default)]
    pub target_assessment: Option<i64>,
    #[serde(default)]
    pub proposed_questions: Vec<serde_json::Value>,
    pub expected_outcomes: String,
}

#[derive(Debug, Serialize)]
pub struct AssessmentRequestOut {
    pub id: i64,
    pub requester: i64,
    pub requester_name: String,
    pub request_type: RequestType,
    pub title: String,
    pub description: String,
    pub justification: String,
    pub target_assessment: Option<i64>,
    pub target_assessment_name: Option<String>,
    pub proposed_questions: Vec<serde_json::Value>,
    pub expected_outcomes: String,
    pub status: RequestStatus,
    pub admin_notes: String,
    pub reviewed_by: Option<i64>,
    pub reviewed_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequestIn {
    pub action: String,
    #[serde(default)]
    pub admin_notes: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewRequestOut {
    pub message: String,
    pub status: RequestStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentIn {
    pub client: i64,
    pub assessment_type: i64,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: AssignmentPriority,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct AssignmentOut {
    pub id: i64,
    pub guide: i64,
    pub guide_name: String,
    pub client: i64,
    pub client_name: String,
    pub assessment_type: i64,
    pub assessment_type_name: String,
    pub assigned_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: AssignmentPriority,
    pub notes: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub reminder_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct GuideStatsOut {
    pub total_assignments: i64,
    pub pending_assignments: i64,
    pub completed_assignments: i64,
    pub pending_requests: i64,
    pub recent_assignments: Vec<AssignmentOut>,
}

#[derive(Debug, Serialize)]
pub struct AdminStatsOut {
    pub total_requests: i64,
    pub pending_requests: i64,
    pub approved_requests: i64,
    pub rejected_requests: i64,
    pub total_assessments: i64,
    pub total_assignments: i64,
    pub recent_requests: Vec<AssessmentRequestOut>,
}

//
// Wellness
//

#[derive(Debug, Deserialize)]
pub struct MoodEntryIn {
    pub mood_rating: u8,
    pub energy_level: u8,
    pub anxiety_level: u8,
    pub sleep_quality: u8,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Partial update of a mood entry; absent fields stay as they are.
#[derive(Debug, Deserialize, Default)]
pub struct MoodEntryPatch {
    pub mood_rating: Option<u8>,
    pub energy_level: Option<u8>,
    pub anxiety_level: Option<u8>,
    pub sleep_quality: Option<u8>,
    pub notes: Option<String>,
    pub activities: Option<Vec<String>>,
    pub triggers: Option<Vec<String>>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct MoodEntryCreatedOut {
    pub message: String,
    pub points_earned: u32,
    pub entry: MoodEntry,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MoodTrendPoint {
    pub date: NaiveDate,
    pub mood: u8,
    pub energy: u8,
    pub anxiety: u8,
    pub sleep: u8,
}

#[derive(Debug, Serialize)]
pub struct MoodStatsOut {
    pub average_mood: f64,
    pub average_energy: f64,
    pub average_anxiety: f64,
    pub average_sleep: f64,
    pub total_entries: usize,
    pub current_streak: u32,
    pub mood_trend: Vec<MoodTrendPoint>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CompleteChallengeIn {
    #[serde(default)]
    pub completion_value: Option<u32>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeCompletedOut {
    pub message: String,
    pub points_earned: u32,
    pub completion_id: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WellnessStatsOut {
    pub total_points: u32,
    pub current_level: u32,
    pub challenges_completed_today: i64,
    pub challenges_completed_total: i64,
    pub current_streak: u32,
    pub mood_entries_count: i64,
}

//
// Crisis
//

#[derive(Debug, Deserialize)]
pub struct CreateAlertIn {
    pub alert_type: AlertType,
    pub severity_level: SeverityLevel,
    #[serde(default)]
    pub trigger_content: String,
    #[serde(default)]
    pub context_data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CrisisAlertOut {
    pub id: i64,
    pub user: i64,
    pub user_name: String,
    pub alert_type: AlertType,
    pub severity_level: SeverityLevel,
    pub trigger_content: String,
    pub context_data: serde_json::Value,
    pub status: AlertStatus,
    pub responder: Option<i64>,
    pub responder_name: Option<String>,
    pub response_notes: String,
    pub follow_up_required: bool,
    pub follow_up_completed: bool,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RespondAlertIn {
    pub action: String,
    #[serde(default)]
    pub response_notes: String,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct MessageOut {
    pub message: String,
}

/// The editable sections of a safety plan. Every section defaults to empty.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SafetyPlanSections {
    pub warning_signs: Vec<Value>,
    pub triggers: Vec<Value>,
    pub coping_strategies: Vec<Value>,
    pub distractions: Vec<Value>,
    pub support_contacts: Vec<Value>,
    pub professional_contacts: Vec<Value>,
    pub environment_safety: Vec<Value>,
    pub emergency_contacts: Vec<Value>,
    pub emergency_plan: String,
}

/// Blank plan offered to users who have not saved one yet.
#[derive(Debug, Serialize)]
pub struct SafetyPlanTemplate {
    pub template: bool,
    #[serde(flatten)]
    pub sections: SafetyPlanSections,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SafetyPlanView {
    Saved(SafetyPlan),
    Template(SafetyPlanTemplate),
}

#[derive(Debug, Serialize)]
pub struct SafetyPlanSavedOut {
    pub message: String,
    pub plan_id: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CrisisStatsOut {
    pub total_alerts: i64,
    pub active_alerts: i64,
    pub high_risk_alerts: i64,
    pub resolved_alerts: i64,
    pub users_with_safety_plans: i64,
    pub alerts_this_week: i64,
    /// Mean minutes from creation to acknowledgement; `None` until an alert is acknowledged.
    pub response_time_avg: Option<f64>,
}

//
// Guide caseload
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideClientOut {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    /// `active`, `at_risk` or `inactive`.
    pub status: &'static str,
    pub last_assessment: Option<DateTime<Utc>>,
    pub risk_level: Option<RiskLevel>,
    pub last_contact: Option<DateTime<Utc>>,
    pub assigned_date: DateTime<Utc>,
    pub notes: String,
    pub open_alerts: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct AssignClientIn {
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct ClientAssignedOut {
    pub message: String,
    pub client_id: i64,
    pub guide_id: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct UnassignClientIn {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ClientUnassignedOut {
    pub message: String,
    pub client_id: i64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientIn {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientUpdatedOut {
    pub message: String,
    pub client_id: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ContactIn {
    pub client_id: i64,
    pub contact_type: ContactType,
    pub notes: String,
    pub outcome: ContactOutcome,
}

#[derive(Debug, Serialize)]
pub struct ContactLoggedOut {
    pub message: String,
    pub contact_id: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct FollowUpIn {
    pub client_id: i64,
    pub scheduled_date: DateTime<Utc>,
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct FollowUpScheduledOut {
    pub message: String,
    pub follow_up_id: i64,
    pub scheduled_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideAnalyticsOut {
    pub range: String,
    pub total_clients: i64,
    pub active_clients: i64,
    pub at_risk_clients: i64,
    pub assessments_this_week: i64,
    pub assessments_in_range: i64,
    pub contacts_in_range: i64,
    pub follow_ups_pending: i64,
    /// Latest risk level per active client; clients with no assessment count as `unassessed`.
    pub risk_distribution: BTreeMap<String, i64>,
    pub contact_outcomes: BTreeMap<String, i64>,
}

//
// Health
//

#[derive(Serialize)]
pub struct HealthOut {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
    pub services: serde_json::Value,
}
