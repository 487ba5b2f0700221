//! Assessment instruments, submissions, guide requests and assignments.
//!
//! `take_assessment` is the scoring pipeline: it resolves every response,
//! derives the risk bucket and recommendations, and persists the assessment
//! with its responses inside one transaction.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument, warn};

use crate::accounts::{full_name_of, get_user, require_admin, require_guide};
use crate::db::{count, json_column};
use crate::domain::{
  AssessmentQuestion, AssessmentRecommendation, AssessmentRequest, AssessmentType,
  ClientAssessmentAssignment, RecommendationSnapshot, RequestStatus, RiskLevel, Role, User,
};
use crate::error::ApiError;
use crate::protocol::{
  type_out, AdminStatsOut, AssessmentHistoryOut, AssessmentOut, AssessmentRequestOut,
  AssessmentResponseOut, AssessmentTypeOut, AssignmentOut, CreateAssessmentTypeIn,
  CreateAssignmentIn, CreateRequestIn, GuideStatsOut, ReviewRequestOut, TakeAssessmentIn,
  UpdateAssessmentTypeIn,
};
use crate::scoring::{calculate_risk_level, interpretation, percentage_score, resolve_option_score};
use crate::util::json_list;

pub const TAKE_FAILED: &str = "An error occurred while processing the assessment.";
const SCORE_OUT_OF_RANGE: &str = "Scores exceed the supported range.";
const RECENT_LIMIT: i64 = 5;

//
// Instruments
//

const TYPE_COLUMNS: &str =
  "id, name, display_name, description, instructions, total_questions, max_score, is_active, created_at";

fn type_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssessmentType> {
  Ok(AssessmentType {
    id: row.get(0)?,
    name: row.get(1)?,
    display_name: row.get(2)?,
    description: row.get(3)?,
    instructions: row.get(4)?,
    total_questions: row.get(5)?,
    max_score: row.get(6)?,
    is_active: row.get(7)?,
    created_at: row.get(8)?,
  })
}

fn question_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssessmentQuestion> {
  Ok(AssessmentQuestion {
    id: row.get(0)?,
    assessment_type_id: row.get(1)?,
    question_number: row.get(2)?,
    question_text: row.get(3)?,
    options: json_column(row, 4, "options")?,
    is_reverse_scored: row.get(5)?,
  })
}

pub fn get_type(conn: &Connection, id: i64) -> Result<Option<AssessmentType>, ApiError> {
  let sql = format!("SELECT {TYPE_COLUMNS} FROM assessments_type WHERE id = ?1");
  Ok(conn.query_row(&sql, [id], type_from_row).optional()?)
}

pub fn get_active_type(conn: &Connection, id: i64) -> Result<Option<AssessmentType>, ApiError> {
  Ok(get_type(conn, id)?.filter(|t| t.is_active))
}

pub fn list_types(conn: &Connection, active_only: bool) -> Result<Vec<AssessmentType>, ApiError> {
  let filter = if active_only { "WHERE is_active = 1" } else { "" };
  let sql = format!("SELECT {TYPE_COLUMNS} FROM assessments_type {filter} ORDER BY name");
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map([], type_from_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn questions_for(conn: &Connection, type_id: i64) -> Result<Vec<AssessmentQuestion>, ApiError> {
  let mut stmt = conn.prepare(
    "SELECT id, assessment_type_id, question_number, question_text, options, is_reverse_scored
     FROM assessments_question WHERE assessment_type_id = ?1 ORDER BY question_number",
  )?;
  let rows = stmt.query_map([type_id], question_from_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn get_question(conn: &Connection, id: i64) -> Result<Option<AssessmentQuestion>, ApiError> {
  Ok(
    conn
      .query_row(
        "SELECT id, assessment_type_id, question_number, question_text, options, is_reverse_scored
         FROM assessments_question WHERE id = ?1",
        [id],
        question_from_row,
      )
      .optional()?,
  )
}

pub fn type_with_questions(conn: &Connection, t: &AssessmentType) -> Result<AssessmentTypeOut, ApiError> {
  Ok(type_out(t, questions_for(conn, t.id)?))
}

pub fn list_types_out(conn: &Connection, active_only: bool) -> Result<Vec<AssessmentTypeOut>, ApiError> {
  list_types(conn, active_only)?
    .iter()
    .map(|t| type_with_questions(conn, t))
    .collect()
}

//
// Recommendations
//

const RECOMMENDATION_SELECT: &str =
  "SELECT r.id, r.assessment_type_id, r.risk_level, r.title, r.description, r.action_items, r.resources, r.priority
   FROM assessments_recommendation r JOIN assessments_type t ON t.id = r.assessment_type_id";

fn recommendation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssessmentRecommendation> {
  Ok(AssessmentRecommendation {
    id: row.get(0)?,
    assessment_type_id: row.get(1)?,
    risk_level: row.get(2)?,
    title: row.get(3)?,
    description: row.get(4)?,
    action_items: json_column(row, 5, "action_items")?,
    resources: json_column(row, 6, "resources")?,
    priority: row.get(7)?,
  })
}

pub fn recommendations_for(
  conn: &Connection,
  type_id: i64,
  level: RiskLevel,
) -> Result<Vec<AssessmentRecommendation>, ApiError> {
  let sql = format!("{RECOMMENDATION_SELECT} WHERE r.assessment_type_id = ?1 AND r.risk_level = ?2 ORDER BY r.priority, r.id");
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map(params![type_id, level], recommendation_from_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Recommendations filtered by instrument name and/or risk level string.
pub fn list_recommendations(
  conn: &Connection,
  type_name: Option<&str>,
  risk_level: Option<&str>,
) -> Result<Vec<AssessmentRecommendation>, ApiError> {
  let sql = format!(
    "{RECOMMENDATION_SELECT}
     WHERE (?1 IS NULL OR t.name = ?1) AND (?2 IS NULL OR r.risk_level = ?2)
     ORDER BY r.priority, r.id"
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map(params![type_name, risk_level], recommendation_from_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

//
// Submission pipeline
//

/// Sum of scores, or a 400 when it does not fit the stored integer range.
fn checked_total(mut scores: impl Iterator<Item = u32>) -> Result<u32, ApiError> {
  scores
    .try_fold(0u32, |acc, s| acc.checked_add(s))
    .ok_or_else(|| ApiError::bad_request(SCORE_OUT_OF_RANGE))
}

struct ScoredResponse {
  question_id: i64,
  question_text: String,
  selected_option_index: u32,
  score: u32,
}

/// Score and persist one submission. All writes roll back on any error.
#[instrument(level = "info", skip(conn, input), fields(assessment_type_id = input.assessment_type_id))]
pub fn take_assessment(conn: &mut Connection, user_id: i64, input: &TakeAssessmentIn) -> Result<AssessmentOut, ApiError> {
  take_assessment_tx(conn, user_id, input).map_err(|e| e.with_public_message(TAKE_FAILED))
}

fn take_assessment_tx(conn: &mut Connection, user_id: i64, input: &TakeAssessmentIn) -> Result<AssessmentOut, ApiError> {
  if input.responses.is_empty() {
    return Err(ApiError::bad_request("Responses are required."));
  }

  let tx = conn.transaction()?;

  let atype = get_active_type(&tx, input.assessment_type_id)?
    .ok_or_else(|| ApiError::bad_request("Invalid assessment type."))?;

  let mut seen = HashSet::new();
  let mut scored = Vec::with_capacity(input.responses.len());
  for r in &input.responses {
    if !seen.insert(r.question_id) {
      return Err(ApiError::bad_request("Duplicate response for question."));
    }
    let question = get_question(&tx, r.question_id)?
      .filter(|q| q.assessment_type_id == atype.id)
      .ok_or_else(|| ApiError::bad_request("Invalid question ID."))?;
    let index = u32::try_from(r.selected_option_index)
      .map_err(|_| ApiError::bad_request("Invalid option index for question."))?;
    let score = resolve_option_score(&question.options, index as usize, question.is_reverse_scored).map_err(|e| {
      debug!(target: "assessment", question_id = question.id, ?e, "Rejected option index");
      ApiError::bad_request("Invalid option index for question.")
    })?;
    scored.push(ScoredResponse {
      question_id: question.id,
      question_text: question.question_text,
      selected_option_index: index,
      score,
    });
  }

  let total_score = checked_total(scored.iter().map(|s| s.score))?;
  let risk_level = calculate_risk_level(&atype.name, total_score, atype.max_score);
  let interpretation = interpretation(&atype.name, risk_level, total_score);
  let recommendations: Vec<RecommendationSnapshot> = recommendations_for(&tx, atype.id, risk_level)?
    .iter()
    .map(AssessmentRecommendation::snapshot)
    .collect();
  let completed_at = Utc::now();

  tx.execute(
    "INSERT INTO assessments_assessment
       (user_id, assessment_type_id, total_score, risk_level, interpretation, recommendations, completed_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![user_id, atype.id, total_score, risk_level, interpretation, json_list(&recommendations), completed_at],
  )?;
  let assessment_id = tx.last_insert_rowid();

  {
    let mut stmt = tx.prepare(
      "INSERT INTO assessments_response (assessment_id, question_id, selected_option_index, score)
       VALUES (?1, ?2, ?3, ?4)",
    )?;
    for s in &scored {
      stmt.execute(params![assessment_id, s.question_id, s.selected_option_index, s.score])?;
    }
  }

  let closed = tx.execute(
    "UPDATE assessments_assignment SET is_completed = 1, completed_at = ?3
     WHERE client_id = ?1 AND assessment_type_id = ?2 AND is_completed = 0",
    params![user_id, atype.id, completed_at],
  )?;

  tx.commit()?;

  info!(
    target: "assessment",
    assessment_id,
    instrument = %atype.name,
    total_score,
    %risk_level,
    assignments_closed = closed,
    "Assessment completed"
  );
  if matches!(risk_level, RiskLevel::Severe | RiskLevel::ModeratelySevere) {
    warn!(target: "assessment", assessment_id, user_id, %risk_level, "High risk assessment result");
  }

  Ok(AssessmentOut {
    id: assessment_id,
    assessment_type: atype.id,
    assessment_type_name: atype.display_name,
    total_score,
    percentage_score: percentage_score(total_score, atype.max_score),
    risk_level,
    interpretation,
    recommendations,
    completed_at,
    responses: scored
      .into_iter()
      .map(|s| AssessmentResponseOut {
        question: s.question_id,
        question_text: s.question_text,
        selected_option_index: s.selected_option_index,
        score: s.score,
      })
      .collect(),
  })
}

/// One of the caller's own assessments with its responses; `None` for other users' rows.
pub fn get_assessment_for_user(conn: &Connection, user_id: i64, id: i64) -> Result<Option<AssessmentOut>, ApiError> {
  let found = conn
    .query_row(
      "SELECT a.id, a.assessment_type_id, t.display_name, t.max_score, a.total_score, a.risk_level,
              a.interpretation, a.recommendations, a.completed_at
       FROM assessments_assessment a JOIN assessments_type t ON t.id = a.assessment_type_id
       WHERE a.id = ?1 AND a.user_id = ?2",
      params![id, user_id],
      |row| {
        let max_score: u32 = row.get(3)?;
        let total_score: u32 = row.get(4)?;
        Ok(AssessmentOut {
          id: row.get(0)?,
          assessment_type: row.get(1)?,
          assessment_type_name: row.get(2)?,
          total_score,
          percentage_score: percentage_score(total_score, max_score),
          risk_level: row.get(5)?,
          interpretation: row.get(6)?,
          recommendations: json_column(row, 7, "recommendations")?,
          completed_at: row.get(8)?,
          responses: Vec::new(),
        })
      },
    )
    .optional()?;

  let Some(mut out) = found else { return Ok(None) };

  let mut stmt = conn.prepare(
    "SELECT r.question_id, q.question_text, r.selected_option_index, r.score
     FROM assessments_response r JOIN assessments_question q ON q.id = r.question_id
     WHERE r.assessment_id = ?1 ORDER BY q.question_number",
  )?;
  let rows = stmt.query_map([out.id], |row| {
    Ok(AssessmentResponseOut {
      question: row.get(0)?,
      question_text: row.get(1)?,
      selected_option_index: row.get(2)?,
      score: row.get(3)?,
    })
  })?;
  out.responses = rows.collect::<Result<Vec<_>, _>>()?;
  Ok(Some(out))
}

pub fn history(conn: &Connection, user_id: i64) -> Result<Vec<AssessmentHistoryOut>, ApiError> {
  let mut stmt = conn.prepare(
    "SELECT a.id, t.display_name, a.total_score, t.max_score, a.risk_level, a.completed_at
     FROM assessments_assessment a JOIN assessments_type t ON t.id = a.assessment_type_id
     WHERE a.user_id = ?1 ORDER BY a.completed_at DESC, a.id DESC",
  )?;
  let rows = stmt.query_map([user_id], |row| {
    let total_score: u32 = row.get(2)?;
    let max_score: u32 = row.get(3)?;
    Ok(AssessmentHistoryOut {
      id: row.get(0)?,
      assessment_type_name: row.get(1)?,
      total_score,
      percentage_score: percentage_score(total_score, max_score),
      risk_level: row.get(4)?,
      completed_at: row.get(5)?,
    })
  })?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

//
// Guide requests
//

const REQUEST_COLUMNS: &str = "id, requester_id, request_type, title, description, justification, target_assessment_id,
   proposed_questions, expected_outcomes, status, admin_notes, reviewed_by, created_at, updated_at, reviewed_at";

fn request_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssessmentRequest> {
  Ok(AssessmentRequest {
    id: row.get(0)?,
    requester_id: row.get(1)?,
    request_type: row.get(2)?,
    title: row.get(3)?,
    description: row.get(4)?,
    justification: row.get(5)?,
    target_assessment_id: row.get(6)?,
    proposed_questions: json_column(row, 7, "proposed_questions")?,
    expected_outcomes: row.get(8)?,
    status: row.get(9)?,
    admin_notes: row.get(10)?,
    reviewed_by: row.get(11)?,
    created_at: row.get(12)?,
    updated_at: row.get(13)?,
    reviewed_at: row.get(14)?,
  })
}

fn request_out(conn: &Connection, r: AssessmentRequest) -> Result<AssessmentRequestOut, ApiError> {
  let target_assessment_name = match r.target_assessment_id {
    Some(id) => get_type(conn, id)?.map(|t| t.display_name),
    None => None,
  };
  let reviewed_by_name = match r.reviewed_by {
    Some(id) => Some(full_name_of(conn, id)?),
    None => None,
  };
  Ok(AssessmentRequestOut {
    id: r.id,
    requester: r.requester_id,
    requester_name: full_name_of(conn, r.requester_id)?,
    request_type: r.request_type,
    title: r.title,
    description: r.description,
    justification: r.justification,
    target_assessment: r.target_assessment_id,
    target_assessment_name,
    proposed_questions: r.proposed_questions,
    expected_outcomes: r.expected_outcomes,
    status: r.status,
    admin_notes: r.admin_notes,
    reviewed_by: r.reviewed_by,
    reviewed_by_name,
    created_at: r.created_at,
    updated_at: r.updated_at,
    reviewed_at: r.reviewed_at,
  })
}

fn query_requests(conn: &Connection, clause: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<AssessmentRequestOut>, ApiError> {
  let sql = format!("SELECT {REQUEST_COLUMNS} FROM assessments_request {clause}");
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(args, request_from_row)?
    .collect::<Result<Vec<_>, _>>()?;
  rows.into_iter().map(|r| request_out(conn, r)).collect()
}

fn get_request(conn: &Connection, id: i64) -> Result<Option<AssessmentRequest>, ApiError> {
  let sql = format!("SELECT {REQUEST_COLUMNS} FROM assessments_request WHERE id = ?1");
  Ok(conn.query_row(&sql, [id], request_from_row).optional()?)
}

/// Guides see their own requests, admins see every request, users see none.
pub fn list_requests_visible_to(conn: &Connection, caller: &User) -> Result<Vec<AssessmentRequestOut>, ApiError> {
  match caller.role {
    Role::Guide => query_requests(conn, "WHERE requester_id = ?1 ORDER BY created_at DESC, id DESC", &[&caller.id]),
    Role::Admin => query_requests(conn, "ORDER BY created_at DESC, id DESC", &[]),
    Role::User => Ok(Vec::new()),
  }
}

#[instrument(level = "info", skip(conn, caller, input), fields(guide_id = caller.id))]
pub fn create_request(conn: &Connection, caller: &User, input: &CreateRequestIn) -> Result<AssessmentRequestOut, ApiError> {
  require_guide(caller, "Only guides can create assessment requests")?;
  for (field, value) in [
    ("title", &input.title),
    ("description", &input.description),
    ("justification", &input.justification),
    ("expected_outcomes", &input.expected_outcomes),
  ] {
    if value.trim().is_empty() {
      return Err(ApiError::bad_request(format!("{field} may not be blank.")));
    }
  }
  if let Some(target) = input.target_assessment {
    if get_type(conn, target)?.is_none() {
      return Err(ApiError::bad_request("Invalid target assessment."));
    }
  }

  let now = Utc::now();
  conn.execute(
    "INSERT INTO assessments_request
       (requester_id, request_type, title, description, justification, target_assessment_id,
        proposed_questions, expected_outcomes, status, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
    params![
      caller.id,
      input.request_type,
      input.title.trim(),
      input.description,
      input.justification,
      input.target_assessment,
      json_list(&input.proposed_questions),
      input.expected_outcomes,
      RequestStatus::Pending,
      now,
    ],
  )?;
  let id = conn.last_insert_rowid();
  info!(target: "assessment", id, request_type = %input.request_type, "Assessment request created");
  let row = get_request(conn, id)?.ok_or_else(|| ApiError::internal("created request vanished"))?;
  request_out(conn, row)
}

pub fn admin_list_requests(conn: &Connection, caller: &User, status: Option<&str>) -> Result<Vec<AssessmentRequestOut>, ApiError> {
  require_admin(caller)?;
  match status.filter(|s| !s.is_empty()) {
    Some(s) => query_requests(conn, "WHERE status = ?1 ORDER BY created_at DESC, id DESC", &[&s]),
    None => query_requests(conn, "ORDER BY created_at DESC, id DESC", &[]),
  }
}

#[instrument(level = "info", skip(conn, caller, admin_notes), fields(admin_id = caller.id))]
pub fn review_request(
  conn: &Connection,
  caller: &User,
  request_id: i64,
  action: &str,
  admin_notes: &str,
) -> Result<ReviewRequestOut, ApiError> {
  require_admin(caller)?;
  if get_request(conn, request_id)?.is_none() {
    return Err(ApiError::not_found("Request not found"));
  }
  let (status, message) = match action {
    "approve" => (RequestStatus::Approved, "Request approved successfully"),
    "reject" => (RequestStatus::Rejected, "Request rejected successfully"),
    "request_changes" => (RequestStatus::Pending, "Request returned for changes successfully"),
    _ => return Err(ApiError::bad_request("Invalid action")),
  };
  let now = Utc::now();
  conn.execute(
    "UPDATE assessments_request
     SET status = ?2, admin_notes = ?3, reviewed_by = ?4, reviewed_at = ?5, updated_at = ?5
     WHERE id = ?1",
    params![request_id, status, admin_notes, caller.id, now],
  )?;
  info!(target: "assessment", request_id, %status, "Assessment request reviewed");
  Ok(ReviewRequestOut { message: message.into(), status })
}

//
// Assignments
//

const ASSIGNMENT_COLUMNS: &str = "id, guide_id, client_id, assessment_type_id, assigned_date, due_date, priority, notes,
   is_completed, completed_at, reminder_sent";

fn assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientAssessmentAssignment> {
  Ok(ClientAssessmentAssignment {
    id: row.get(0)?,
    guide_id: row.get(1)?,
    client_id: row.get(2)?,
    assessment_type_id: row.get(3)?,
    assigned_date: row.get(4)?,
    due_date: row.get(5)?,
    priority: row.get(6)?,
    notes: row.get(7)?,
    is_completed: row.get(8)?,
    completed_at: row.get(9)?,
    reminder_sent: row.get(10)?,
  })
}

fn assignment_out(conn: &Connection, a: ClientAssessmentAssignment) -> Result<AssignmentOut, ApiError> {
  let assessment_type_name = get_type(conn, a.assessment_type_id)?
    .map(|t| t.display_name)
    .unwrap_or_default();
  Ok(AssignmentOut {
    id: a.id,
    guide: a.guide_id,
    guide_name: full_name_of(conn, a.guide_id)?,
    client: a.client_id,
    client_name: full_name_of(conn, a.client_id)?,
    assessment_type: a.assessment_type_id,
    assessment_type_name,
    assigned_date: a.assigned_date,
    due_date: a.due_date,
    priority: a.priority,
    notes: a.notes,
    is_completed: a.is_completed,
    completed_at: a.completed_at,
    reminder_sent: a.reminder_sent,
  })
}

fn guide_assignments(conn: &Connection, guide_id: i64, limit: Option<i64>) -> Result<Vec<AssignmentOut>, ApiError> {
  let sql = format!(
    "SELECT {ASSIGNMENT_COLUMNS} FROM assessments_assignment
     WHERE guide_id = ?1 ORDER BY assigned_date DESC, id DESC LIMIT ?2"
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(params![guide_id, limit.unwrap_or(-1)], assignment_from_row)?
    .collect::<Result<Vec<_>, _>>()?;
  rows.into_iter().map(|a| assignment_out(conn, a)).collect()
}

/// A guide's own assignments; any other role gets an empty list.
pub fn list_assignments_for(conn: &Connection, caller: &User) -> Result<Vec<AssignmentOut>, ApiError> {
  if caller.role != Role::Guide {
    return Ok(Vec::new());
  }
  guide_assignments(conn, caller.id, None)
}

#[instrument(level = "info", skip(conn, caller, input), fields(guide_id = caller.id, client_id = input.client))]
pub fn create_assignment(conn: &Connection, caller: &User, input: &CreateAssignmentIn) -> Result<AssignmentOut, ApiError> {
  require_guide(caller, "Only guides can assign assessments")?;
  match get_user(conn, input.client)? {
    Some(client) if client.role == Role::User && client.is_active => {}
    _ => return Err(ApiError::bad_request("Invalid client.")),
  }
  if get_active_type(conn, input.assessment_type)?.is_none() {
    return Err(ApiError::bad_request("Invalid assessment type."));
  }
  let exists: bool = conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM assessments_assignment WHERE guide_id = ?1 AND client_id = ?2 AND assessment_type_id = ?3)",
    params![caller.id, input.client, input.assessment_type],
    |row| row.get(0),
  )?;
  if exists {
    return Err(ApiError::bad_request("This assessment is already assigned to this client."));
  }

  conn.execute(
    "INSERT INTO assessments_assignment (guide_id, client_id, assessment_type_id, assigned_date, due_date, priority, notes)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![caller.id, input.client, input.assessment_type, Utc::now(), input.due_date, input.priority, input.notes],
  )?;
  let id = conn.last_insert_rowid();
  info!(target: "assessment", id, "Assessment assigned");
  let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assessments_assignment WHERE id = ?1");
  let row = conn.query_row(&sql, [id], assignment_from_row)?;
  assignment_out(conn, row)
}

//
// Dashboards
//

pub fn guide_stats(conn: &Connection, caller: &User) -> Result<GuideStatsOut, ApiError> {
  require_guide(caller, "Guide access required")?;
  let g = &caller.id;
  Ok(GuideStatsOut {
    total_assignments: count(conn, "SELECT COUNT(*) FROM assessments_assignment WHERE guide_id = ?1", &[g])?,
    pending_assignments: count(
      conn,
      "SELECT COUNT(*) FROM assessments_assignment WHERE guide_id = ?1 AND is_completed = 0",
      &[g],
    )?,
    completed_assignments: count(
      conn,
      "SELECT COUNT(*) FROM assessments_assignment WHERE guide_id = ?1 AND is_completed = 1",
      &[g],
    )?,
    pending_requests: count(
      conn,
      "SELECT COUNT(*) FROM assessments_request WHERE requester_id = ?1 AND status = 'pending'",
      &[g],
    )?,
    recent_assignments: guide_assignments(conn, caller.id, Some(RECENT_LIMIT))?,
  })
}

pub fn admin_stats(conn: &Connection, caller: &User) -> Result<AdminStatsOut, ApiError> {
  require_admin(caller)?;
  let by_status = |s: RequestStatus| -> Result<i64, ApiError> {
    Ok(count(conn, "SELECT COUNT(*) FROM assessments_request WHERE status = ?1", &[&s])?)
  };
  Ok(AdminStatsOut {
    total_requests: count(conn, "SELECT COUNT(*) FROM assessments_request", &[])?,
    pending_requests: by_status(RequestStatus::Pending)?,
    approved_requests: by_status(RequestStatus::Approved)?,
    rejected_requests: by_status(RequestStatus::Rejected)?,
    total_assessments: count(conn, "SELECT COUNT(*) FROM assessments_assessment", &[])?,
    total_assignments: count(conn, "SELECT COUNT(*) FROM assessments_assignment", &[])?,
    recent_requests: query_requests(conn, "ORDER BY created_at DESC, id DESC LIMIT ?1", &[&RECENT_LIMIT])?,
  })
}

//
// Admin instrument management
//

/// Create an instrument and its questions. Missing totals are derived from the questions.
#[instrument(level = "info", skip(conn, caller, input), fields(name = %input.name))]
pub fn create_type(conn: &mut Connection, caller: &User, input: &CreateAssessmentTypeIn) -> Result<AssessmentTypeOut, ApiError> {
  require_admin(caller)?;
  let name = input.name.trim();
  if name.is_empty() || input.display_name.trim().is_empty() {
    return Err(ApiError::bad_request("name and display_name are required."));
  }

  let derived_max = checked_total(
    input
      .questions
      .iter()
      .map(|q| q.options.iter().map(|o| o.score).max().unwrap_or(0)),
  )?;
  let max_score = input.max_score.unwrap_or(derived_max);
  if max_score == 0 {
    return Err(ApiError::bad_request("max_score must be at least 1."));
  }
  let total_questions = input.total_questions.unwrap_or(input.questions.len() as u32);

  let tx = conn.transaction()?;
  let taken: bool = tx.query_row(
    "SELECT EXISTS(SELECT 1 FROM assessments_type WHERE name = ?1)",
    [name],
    |row| row.get(0),
  )?;
  if taken {
    return Err(ApiError::bad_request("An assessment type with this name already exists."));
  }
  tx.execute(
    "INSERT INTO assessments_type (name, display_name, description, instructions, total_questions, max_score, is_active, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      name,
      input.display_name.trim(),
      input.description,
      input.instructions,
      total_questions,
      max_score,
      input.is_active,
      Utc::now()
    ],
  )?;
  let type_id = tx.last_insert_rowid();

  let mut numbers = HashSet::new();
  for (i, q) in input.questions.iter().enumerate() {
    let number = q.question_number.unwrap_or(i as u32 + 1);
    if !numbers.insert(number) {
      return Err(ApiError::bad_request("Duplicate question_number."));
    }
    tx.execute(
      "INSERT INTO assessments_question (assessment_type_id, question_number, question_text, options, is_reverse_scored)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![type_id, number, q.question_text, json_list(&q.options), q.is_reverse_scored],
    )?;
  }
  tx.commit()?;

  info!(target: "assessment", type_id, questions = input.questions.len(), "Assessment type created");
  let created = get_type(conn, type_id)?.ok_or_else(|| ApiError::internal("created type vanished"))?;
  type_with_questions(conn, &created)
}

pub fn admin_get_type(conn: &Connection, caller: &User, id: i64) -> Result<AssessmentTypeOut, ApiError> {
  require_admin(caller)?;
  let t = get_type(conn, id)?.ok_or_else(|| ApiError::not_found("Not found."))?;
  type_with_questions(conn, &t)
}

pub fn update_type(conn: &Connection, caller: &User, id: i64, patch: &UpdateAssessmentTypeIn) -> Result<AssessmentTypeOut, ApiError> {
  require_admin(caller)?;
  if patch.max_score == Some(0) {
    return Err(ApiError::bad_request("max_score must be at least 1."));
  }
  let changed = conn.execute(
    "UPDATE assessments_type SET
       display_name = COALESCE(?2, display_name),
       description = COALESCE(?3, description),
       instructions = COALESCE(?4, instructions),
       total_questions = COALESCE(?5, total_questions),
       max_score = COALESCE(?6, max_score),
       is_active = COALESCE(?7, is_active)
     WHERE id = ?1",
    params![
      id,
      patch.display_name,
      patch.description,
      patch.instructions,
      patch.total_questions,
      patch.max_score,
      patch.is_active
    ],
  )?;
  if changed == 0 {
    return Err(ApiError::not_found("Not found."));
  }
  info!(target: "assessment", type_id = id, "Assessment type updated");
  admin_get_type(conn, caller, id)
}

pub fn delete_type(conn: &Connection, caller: &User, id: i64) -> Result<(), ApiError> {
  require_admin(caller)?;
  let removed = conn.execute("DELETE FROM assessments_type WHERE id = ?1", [id])?;
  if removed == 0 {
    return Err(ApiError::not_found("Not found."));
  }
  warn!(target: "assessment", type_id = id, "Assessment type deleted");
  Ok(())
}
