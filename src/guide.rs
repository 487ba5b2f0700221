//! Guide caseload: client assignments, contact log, follow-ups and analytics.
//!
//! Every operation is guide-only. A guide works with the clients assigned to
//! them; path-addressed clients outside the caseload read as missing.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument, warn};

use crate::accounts::{full_name_of, get_user, require_guide};
use crate::db::count;
use crate::domain::{ClientAssignment, ClientContact, ContactOutcome, FollowUp, RiskLevel, Role, User};
use crate::error::ApiError;
use crate::protocol::{
  AssignClientIn, ClientAssignedOut, ClientUnassignedOut, ClientUpdatedOut, ContactIn, ContactLoggedOut,
  FollowUpIn, FollowUpScheduledOut, GuideAnalyticsOut, GuideClientOut, UnassignClientIn, UpdateClientIn,
};
use crate::util::trunc_for_log;

pub const PERMISSION_DENIED: &str = "Permission denied";
pub const DEFAULT_RANGE: &str = "30d";
const MAX_RANGE_DAYS: i64 = 365;
const NOT_ASSIGNED: &str = "Client is not assigned to you.";

fn require_caseload_guide(user: &User) -> Result<(), ApiError> {
  require_guide(user, PERMISSION_DENIED)
}

fn client_not_found() -> ApiError {
  ApiError::not_found("Client not found")
}

//
// Assignments
//

const ASSIGNMENT_SELECT: &str =
  "SELECT id, client_id, assigned_date, is_active, notes FROM guide_client_assignment WHERE guide_id = ?1";

fn assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientAssignment> {
  Ok(ClientAssignment {
    id: row.get(0)?,
    client_id: row.get(1)?,
    assigned_date: row.get(2)?,
    is_active: row.get(3)?,
    notes: row.get(4)?,
  })
}

fn assignment(conn: &Connection, guide_id: i64, client_id: i64) -> Result<Option<ClientAssignment>, ApiError> {
  let sql = format!("{ASSIGNMENT_SELECT} AND client_id = ?2");
  Ok(conn.query_row(&sql, params![guide_id, client_id], assignment_from_row).optional()?)
}

fn active_assignment(conn: &Connection, guide_id: i64, client_id: i64) -> Result<ClientAssignment, ApiError> {
  match assignment(conn, guide_id, client_id)? {
    Some(a) if a.is_active => Ok(a),
    _ => Err(ApiError::bad_request(NOT_ASSIGNED)),
  }
}

/// Severe buckets or an unresolved alert mark a client as at risk.
fn is_at_risk(risk: Option<RiskLevel>, open_alerts: i64) -> bool {
  matches!(risk, Some(RiskLevel::Severe | RiskLevel::ModeratelySevere)) || open_alerts > 0
}

fn client_out(conn: &Connection, guide_id: i64, a: ClientAssignment) -> Result<GuideClientOut, ApiError> {
  let client = get_user(conn, a.client_id)?.ok_or_else(client_not_found)?;
  let latest: Option<(DateTime<Utc>, RiskLevel)> = conn
    .query_row(
      "SELECT completed_at, risk_level FROM assessments_assessment
       WHERE user_id = ?1 ORDER BY completed_at DESC, id DESC LIMIT 1",
      [client.id],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?;
  let last_contact: Option<DateTime<Utc>> = conn.query_row(
    "SELECT MAX(timestamp) FROM guide_client_contact WHERE guide_id = ?1 AND client_id = ?2",
    params![guide_id, client.id],
    |row| row.get(0),
  )?;
  let open_alerts = count(
    conn,
    "SELECT COUNT(*) FROM crisis_alert WHERE user_id = ?1 AND status IN ('active', 'acknowledged')",
    &[&client.id],
  )?;

  let risk_level = latest.map(|(_, r)| r);
  let status = if !a.is_active {
    "inactive"
  } else if is_at_risk(risk_level, open_alerts) {
    "at_risk"
  } else {
    "active"
  };
  Ok(GuideClientOut {
    id: client.id,
    name: client.full_name(),
    email: client.email,
    age: client.age,
    status,
    last_assessment: latest.map(|(at, _)| at),
    risk_level,
    last_contact,
    assigned_date: a.assigned_date,
    notes: a.notes,
    open_alerts,
  })
}

fn assignments_of(conn: &Connection, guide_id: i64) -> Result<Vec<ClientAssignment>, ApiError> {
  let sql = format!("{ASSIGNMENT_SELECT} ORDER BY is_active DESC, assigned_date DESC, id DESC");
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map([guide_id], assignment_from_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Active clients first, then past ones; newest assignment first within each group.
pub fn list_clients(conn: &Connection, guide: &User) -> Result<Vec<GuideClientOut>, ApiError> {
  require_caseload_guide(guide)?;
  assignments_of(conn, guide.id)?
    .into_iter()
    .map(|a| client_out(conn, guide.id, a))
    .collect()
}

pub fn get_client(conn: &Connection, guide: &User, client_id: i64) -> Result<GuideClientOut, ApiError> {
  require_caseload_guide(guide)?;
  let a = assignment(conn, guide.id, client_id)?.ok_or_else(client_not_found)?;
  client_out(conn, guide.id, a)
}

#[instrument(level = "info", skip(conn, guide, input), fields(guide_id = guide.id))]
pub fn update_client(
  conn: &Connection,
  guide: &User,
  client_id: i64,
  input: &UpdateClientIn,
  now: DateTime<Utc>,
) -> Result<ClientUpdatedOut, ApiError> {
  require_caseload_guide(guide)?;
  let a = assignment(conn, guide.id, client_id)?.ok_or_else(client_not_found)?;
  if let Some(notes) = &input.notes {
    conn.execute("UPDATE guide_client_assignment SET notes = ?2 WHERE id = ?1", params![a.id, notes])?;
  }
  info!(target: "guide", client_id, "Client notes updated");
  Ok(ClientUpdatedOut { message: "Client updated successfully".into(), client_id, updated_at: now })
}

/// Add a standard user to the caller's caseload, reactivating a past assignment.
#[instrument(level = "info", skip(conn, guide, input), fields(guide_id = guide.id))]
pub fn assign_client(
  conn: &Connection,
  guide: &User,
  client_id: i64,
  input: &AssignClientIn,
  now: DateTime<Utc>,
) -> Result<ClientAssignedOut, ApiError> {
  require_caseload_guide(guide)?;
  let client = get_user(conn, client_id)?.filter(|u| u.is_active).ok_or_else(client_not_found)?;
  if client.role != Role::User {
    return Err(ApiError::bad_request("Only standard users can be assigned as clients."));
  }
  if assignment(conn, guide.id, client_id)?.is_some_and(|a| a.is_active) {
    return Err(ApiError::bad_request("Client is already assigned to you."));
  }
  conn.execute(
    "INSERT INTO guide_client_assignment (guide_id, client_id, assigned_date, is_active, notes)
     VALUES (?1, ?2, ?3, 1, ?4)
     ON CONFLICT(guide_id, client_id) DO UPDATE SET
       assigned_date = excluded.assigned_date,
       is_active = 1,
       notes = excluded.notes",
    params![guide.id, client_id, now, input.notes],
  )?;
  info!(target: "guide", client_id, "Client assigned");
  Ok(ClientAssignedOut { message: "Client assigned successfully".into(), client_id, guide_id: guide.id })
}

#[instrument(level = "info", skip(conn, guide, input), fields(guide_id = guide.id))]
pub fn unassign_client(
  conn: &Connection,
  guide: &User,
  client_id: i64,
  input: &UnassignClientIn,
) -> Result<ClientUnassignedOut, ApiError> {
  require_caseload_guide(guide)?;
  let a = match assignment(conn, guide.id, client_id)? {
    Some(a) if a.is_active => a,
    _ => return Err(client_not_found()),
  };
  conn.execute("UPDATE guide_client_assignment SET is_active = 0 WHERE id = ?1", [a.id])?;
  info!(target: "guide", client_id, reason = %trunc_for_log(&input.reason, 80), "Client unassigned");
  Ok(ClientUnassignedOut {
    message: "Client unassigned successfully".into(),
    client_id,
    reason: input.reason.clone(),
  })
}

//
// Contact log and follow-ups
//

#[instrument(level = "info", skip(conn, guide, input), fields(guide_id = guide.id, client_id = input.client_id))]
pub fn log_contact(
  conn: &Connection,
  guide: &User,
  input: &ContactIn,
  now: DateTime<Utc>,
) -> Result<ContactLoggedOut, ApiError> {
  require_caseload_guide(guide)?;
  if input.notes.trim().is_empty() {
    return Err(ApiError::bad_request("notes is required."));
  }
  active_assignment(conn, guide.id, input.client_id)?;
  conn.execute(
    "INSERT INTO guide_client_contact (guide_id, client_id, contact_type, notes, outcome, timestamp)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![guide.id, input.client_id, input.contact_type, input.notes, input.outcome, now],
  )?;
  let contact_id = conn.last_insert_rowid();
  if input.outcome == ContactOutcome::Concerning {
    warn!(target: "guide", contact_id, contact_type = %input.contact_type, "Concerning client contact logged");
  } else {
    info!(target: "guide", contact_id, contact_type = %input.contact_type, outcome = %input.outcome, "Client contact logged");
  }
  Ok(ContactLoggedOut { message: "Client contact logged successfully".into(), contact_id, timestamp: now })
}

/// The caller's contacts with one client. Newest first.
pub fn list_contacts(conn: &Connection, guide: &User, client_id: i64) -> Result<Vec<ClientContact>, ApiError> {
  require_caseload_guide(guide)?;
  assignment(conn, guide.id, client_id)?.ok_or_else(client_not_found)?;
  let mut stmt = conn.prepare(
    "SELECT id, client_id, contact_type, notes, outcome, timestamp FROM guide_client_contact
     WHERE guide_id = ?1 AND client_id = ?2 ORDER BY timestamp DESC, id DESC",
  )?;
  let rows = stmt.query_map(params![guide.id, client_id], |row| {
    Ok(ClientContact {
      id: row.get(0)?,
      client_id: row.get(1)?,
      contact_type: row.get(2)?,
      notes: row.get(3)?,
      outcome: row.get(4)?,
      timestamp: row.get(5)?,
    })
  })?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[instrument(level = "info", skip(conn, guide, input), fields(guide_id = guide.id, client_id = input.client_id))]
pub fn schedule_follow_up(
  conn: &Connection,
  guide: &User,
  input: &FollowUpIn,
  now: DateTime<Utc>,
) -> Result<FollowUpScheduledOut, ApiError> {
  require_caseload_guide(guide)?;
  if input.notes.trim().is_empty() {
    return Err(ApiError::bad_request("notes is required."));
  }
  active_assignment(conn, guide.id, input.client_id)?;
  conn.execute(
    "INSERT INTO guide_follow_up (guide_id, client_id, scheduled_date, notes, completed, created_at)
     VALUES (?1, ?2, ?3, ?4, 0, ?5)",
    params![guide.id, input.client_id, input.scheduled_date, input.notes, now],
  )?;
  let follow_up_id = conn.last_insert_rowid();
  info!(target: "guide", follow_up_id, scheduled = %input.scheduled_date, "Follow-up scheduled");
  Ok(FollowUpScheduledOut {
    message: "Follow-up scheduled successfully".into(),
    follow_up_id,
    scheduled_date: input.scheduled_date,
  })
}

/// Open follow-ups first, each group in scheduled order.
pub fn list_follow_ups(conn: &Connection, guide: &User) -> Result<Vec<FollowUp>, ApiError> {
  require_caseload_guide(guide)?;
  let mut stmt = conn.prepare(
    "SELECT id, client_id, scheduled_date, notes, completed, created_at FROM guide_follow_up
     WHERE guide_id = ?1 ORDER BY completed, scheduled_date, id",
  )?;
  let rows = stmt
    .query_map([guide.id], |row| {
      Ok(FollowUp {
        id: row.get(0)?,
        client_id: row.get(1)?,
        client_name: String::new(),
        scheduled_date: row.get(2)?,
        notes: row.get(3)?,
        completed: row.get(4)?,
        created_at: row.get(5)?,
      })
    })?
    .collect::<Result<Vec<_>, _>>()?;
  rows
    .into_iter()
    .map(|mut f| {
      f.client_name = full_name_of(conn, f.client_id)?;
      Ok(f)
    })
    .collect()
}

//
// Analytics
//

/// Parse a `<N>d` window such as `7d` or `90d`.
pub fn parse_range(range: &str) -> Result<i64, ApiError> {
  range
    .strip_suffix('d')
    .and_then(|n| n.parse::<i64>().ok())
    .filter(|n| (1..=MAX_RANGE_DAYS).contains(n))
    .ok_or_else(|| ApiError::bad_request("Invalid range. Use a value like 7d, 30d or 90d (at most 365d)."))
}

pub fn analytics(
  conn: &Connection,
  guide: &User,
  range: Option<&str>,
  now: DateTime<Utc>,
) -> Result<GuideAnalyticsOut, ApiError> {
  require_caseload_guide(guide)?;
  let range = range.unwrap_or(DEFAULT_RANGE);
  let since = now - Duration::days(parse_range(range)?);
  let week_ago = now - Duration::days(7);
  let g = &guide.id;

  let clients = assignments_of(conn, guide.id)?
    .into_iter()
    .filter(|a| a.is_active)
    .map(|a| client_out(conn, guide.id, a))
    .collect::<Result<Vec<_>, _>>()?;
  let mut risk_distribution = BTreeMap::new();
  for c in &clients {
    let key = c.risk_level.map_or("unassessed", |r| r.as_str());
    *risk_distribution.entry(key.to_string()).or_insert(0) += 1;
  }

  let assessments_since = |from: &DateTime<Utc>| -> Result<i64, ApiError> {
    Ok(count(
      conn,
      "SELECT COUNT(*) FROM assessments_assessment
       WHERE completed_at >= ?2
         AND user_id IN (SELECT client_id FROM guide_client_assignment WHERE guide_id = ?1 AND is_active = 1)",
      &[g, from],
    )?)
  };

  let mut contact_outcomes = BTreeMap::new();
  {
    let mut stmt = conn.prepare(
      "SELECT outcome, COUNT(*) FROM guide_client_contact WHERE guide_id = ?1 AND timestamp >= ?2 GROUP BY outcome",
    )?;
    let rows = stmt.query_map(params![guide.id, since], |row| Ok((row.get::<_, ContactOutcome>(0)?, row.get(1)?)))?;
    for row in rows {
      let (outcome, n): (ContactOutcome, i64) = row?;
      contact_outcomes.insert(outcome.to_string(), n);
    }
  }

  Ok(GuideAnalyticsOut {
    range: range.to_string(),
    total_clients: count(conn, "SELECT COUNT(*) FROM guide_client_assignment WHERE guide_id = ?1", &[g])?,
    active_clients: clients.len() as i64,
    at_risk_clients: clients.iter().filter(|c| c.status == "at_risk").count() as i64,
    assessments_this_week: assessments_since(&week_ago)?,
    assessments_in_range: assessments_since(&since)?,
    contacts_in_range: count(
      conn,
      "SELECT COUNT(*) FROM guide_client_contact WHERE guide_id = ?1 AND timestamp >= ?2",
      &[g, &since],
    )?,
    follow_ups_pending: count(
      conn,
      "SELECT COUNT(*) FROM guide_follow_up WHERE guide_id = ?1 AND completed = 0",
      &[g],
    )?,
    risk_distribution,
    contact_outcomes,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::accounts::tests::register;
  use crate::config::AppConfig;
  use crate::crisis::{alerts_for_guide, create_alert};
  use crate::db::open_memory_database;
  use crate::domain::{AlertType, ContactType, SeverityLevel};
  use crate::protocol::CreateAlertIn;
  use crate::seeds::apply_seeds;

  fn seeded() -> Connection {
    let mut conn = open_memory_database().unwrap();
    apply_seeds(&mut conn, &AppConfig::default()).unwrap();
    conn
  }

  fn assign(conn: &Connection, guide: &User, client: &User) {
    assign_client(conn, guide, client.id, &AssignClientIn { notes: "intake".into() }, Utc::now()).unwrap();
  }

  fn contact(client_id: i64, outcome: ContactOutcome) -> ContactIn {
    ContactIn { client_id, contact_type: ContactType::Phone, notes: "weekly check-in".into(), outcome }
  }

  #[test]
  fn caseload_is_guide_only() {
    let conn = seeded();
    let user = register(&conn, "ana", Role::User);
    let admin = register(&conn, "boss", Role::Admin);
    for caller in [&user, &admin] {
      let err = list_clients(&conn, caller).unwrap_err();
      assert!(matches!(err, ApiError::Forbidden(_)));
      assert_eq!(err.to_string(), "Permission denied");
      assert!(list_follow_ups(&conn, caller).is_err());
      assert!(analytics(&conn, caller, None, Utc::now()).is_err());
    }
  }

  #[test]
  fn assign_list_and_unassign() {
    let conn = seeded();
    let guide = register(&conn, "gina", Role::Guide);
    let other_guide = register(&conn, "gus", Role::Guide);
    let ana = register(&conn, "ana", Role::User);

    let out = assign_client(&conn, &guide, ana.id, &AssignClientIn::default(), Utc::now()).unwrap();
    assert_eq!((out.client_id, out.guide_id), (ana.id, guide.id));
    let again = assign_client(&conn, &guide, ana.id, &AssignClientIn::default(), Utc::now()).unwrap_err();
    assert_eq!(again.to_string(), "Client is already assigned to you.");
    assert!(matches!(
      assign_client(&conn, &guide, other_guide.id, &AssignClientIn::default(), Utc::now()),
      Err(ApiError::BadRequest(_))
    ));
    assert!(matches!(
      assign_client(&conn, &guide, 9999, &AssignClientIn::default(), Utc::now()),
      Err(ApiError::NotFound(_))
    ));

    let clients = list_clients(&conn, &guide).unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "ana Tester");
    assert_eq!(clients[0].status, "active");
    assert!(clients[0].risk_level.is_none());
    assert!(list_clients(&conn, &other_guide).unwrap().is_empty());
    assert!(matches!(get_client(&conn, &other_guide, ana.id), Err(ApiError::NotFound(_))));

    let reason = UnassignClientIn { reason: "moved schools".into() };
    let out = unassign_client(&conn, &guide, ana.id, &reason).unwrap();
    assert_eq!(out.reason, "moved schools");
    assert_eq!(get_client(&conn, &guide, ana.id).unwrap().status, "inactive");
    assert!(matches!(unassign_client(&conn, &guide, ana.id, &reason), Err(ApiError::NotFound(_))));

    assign_client(&conn, &guide, ana.id, &AssignClientIn { notes: "back".into() }, Utc::now()).unwrap();
    let back = get_client(&conn, &guide, ana.id).unwrap();
    assert_eq!((back.status, back.notes.as_str()), ("active", "back"));
  }

  #[test]
  fn open_alert_marks_client_at_risk_and_reaches_guide() {
    let conn = seeded();
    let guide = register(&conn, "gina", Role::Guide);
    let ana = register(&conn, "ana", Role::User);
    let ben = register(&conn, "ben", Role::User);
    assign(&conn, &guide, &ana);

    let input = CreateAlertIn {
      alert_type: AlertType::SelfReported,
      severity_level: SeverityLevel::High,
      trigger_content: String::new(),
      context_data: None,
    };
    create_alert(&conn, &ana, &input).unwrap();
    create_alert(&conn, &ben, &input).unwrap();

    let client = get_client(&conn, &guide, ana.id).unwrap();
    assert_eq!(client.status, "at_risk");
    assert_eq!(client.open_alerts, 1);
    let alerts = alerts_for_guide(&conn, guide.id).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].user, ana.id);
  }

  #[test]
  fn contacts_and_follow_ups_need_an_active_client() {
    let conn = seeded();
    let guide = register(&conn, "gina", Role::Guide);
    let ana = register(&conn, "ana", Role::User);
    let ben = register(&conn, "ben", Role::User);
    assign(&conn, &guide, &ana);

    assert_eq!(
      log_contact(&conn, &guide, &contact(ben.id, ContactOutcome::Neutral), Utc::now()).unwrap_err().to_string(),
      "Client is not assigned to you."
    );
    let mut blank = contact(ana.id, ContactOutcome::Neutral);
    blank.notes = "  ".into();
    assert!(matches!(log_contact(&conn, &guide, &blank, Utc::now()), Err(ApiError::BadRequest(_))));

    let t0 = Utc::now();
    log_contact(&conn, &guide, &contact(ana.id, ContactOutcome::Positive), t0).unwrap();
    let second = log_contact(&conn, &guide, &contact(ana.id, ContactOutcome::Concerning), t0 + Duration::hours(1)).unwrap();
    assert_eq!(second.message, "Client contact logged successfully");

    let history = list_contacts(&conn, &guide, ana.id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.contact_id);
    assert_eq!(history[0].outcome, ContactOutcome::Concerning);
    assert_eq!(get_client(&conn, &guide, ana.id).unwrap().last_contact, Some(t0 + Duration::hours(1)));
    assert!(matches!(list_contacts(&conn, &guide, ben.id), Err(ApiError::NotFound(_))));

    let later = FollowUpIn { client_id: ana.id, scheduled_date: t0 + Duration::days(3), notes: "check sleep".into() };
    let sooner = FollowUpIn { client_id: ana.id, scheduled_date: t0 + Duration::days(1), notes: "call back".into() };
    schedule_follow_up(&conn, &guide, &later, t0).unwrap();
    let out = schedule_follow_up(&conn, &guide, &sooner, t0).unwrap();
    assert_eq!(out.scheduled_date, sooner.scheduled_date);
    let stray = FollowUpIn { client_id: ben.id, ..sooner };
    assert!(matches!(schedule_follow_up(&conn, &guide, &stray, t0), Err(ApiError::BadRequest(_))));

    let follow_ups = list_follow_ups(&conn, &guide).unwrap();
    assert_eq!(follow_ups.iter().map(|f| f.notes.as_str()).collect::<Vec<_>>(), vec!["call back", "check sleep"]);
    assert_eq!(follow_ups[0].client_name, "ana Tester");
    assert!(!follow_ups[0].completed);
  }

  #[test]
  fn range_parsing() {
    assert_eq!(parse_range("7d").unwrap(), 7);
    assert_eq!(parse_range("365d").unwrap(), 365);
    for bad in ["0d", "366d", "30", "d", "-5d", "abc"] {
      assert!(matches!(parse_range(bad), Err(ApiError::BadRequest(_))), "{bad}");
    }
  }

  #[test]
  fn analytics_counts_the_caseload() {
    let conn = seeded();
    let guide = register(&conn, "gina", Role::Guide);
    let ana = register(&conn, "ana", Role::User);
    let ben = register(&conn, "ben", Role::User);
    let cy = register(&conn, "cy", Role::User);
    assign(&conn, &guide, &ana);
    assign(&conn, &guide, &ben);
    assign(&conn, &guide, &cy);
    unassign_client(&conn, &guide, cy.id, &UnassignClientIn::default()).unwrap();

    conn
      .execute(
        "INSERT INTO assessments_assessment (user_id, assessment_type_id, total_score, risk_level, interpretation, completed_at)
         SELECT ?1, id, 25, 'severe', '', ?2 FROM assessments_type WHERE name = 'PHQ9'",
        params![ana.id, Utc::now()],
      )
      .unwrap();
    let now = Utc::now();
    log_contact(&conn, &guide, &contact(ben.id, ContactOutcome::Positive), now).unwrap();
    log_contact(&conn, &guide, &contact(ben.id, ContactOutcome::Positive), now - Duration::days(20)).unwrap();
    let f = FollowUpIn { client_id: ben.id, scheduled_date: now + Duration::days(2), notes: "check in".into() };
    schedule_follow_up(&conn, &guide, &f, now).unwrap();

    let week = analytics(&conn, &guide, Some("7d"), now).unwrap();
    assert_eq!(week.range, "7d");
    assert_eq!((week.total_clients, week.active_clients, week.at_risk_clients), (3, 2, 1));
    assert_eq!((week.assessments_this_week, week.assessments_in_range), (1, 1));
    assert_eq!(week.contacts_in_range, 1);
    assert_eq!(week.follow_ups_pending, 1);
    assert_eq!(week.risk_distribution.get("severe"), Some(&1));
    assert_eq!(week.risk_distribution.get("unassessed"), Some(&1));
    assert_eq!(week.contact_outcomes.get("positive"), Some(&1));

    let month = analytics(&conn, &guide, None, now).unwrap();
    assert_eq!(month.range, "30d");
    assert_eq!(month.contacts_in_range, 2);
    assert!(matches!(analytics(&conn, &guide, Some("forever"), now), Err(ApiError::BadRequest(_))));
  }
}
