//! Crisis hotlines, alerts, safety plans and staff statistics.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument, warn};

use crate::accounts::{full_name_of, require_staff};
use crate::db::{count, json_column};
use crate::domain::{AlertStatus, CrisisAlert, CrisisHotline, SafetyPlan, User};
use crate::error::ApiError;
use crate::protocol::{
  CreateAlertIn, CrisisAlertOut, CrisisStatsOut, MessageOut, RespondAlertIn, SafetyPlanSavedOut, SafetyPlanSections,
  SafetyPlanTemplate, SafetyPlanView,
};
use crate::util::{json_list, round_to, trunc_for_log};

pub fn list_hotlines(conn: &Connection) -> Result<Vec<CrisisHotline>, ApiError> {
  let mut stmt = conn.prepare(
    "SELECT id, name, description, hotline_type, phone_number, text_number, website, is_24_7, languages, country,
            is_active, priority_order
     FROM crisis_hotline WHERE is_active = 1 ORDER BY priority_order, name",
  )?;
  let rows = stmt.query_map([], |row| {
    Ok(CrisisHotline {
      id: row.get(0)?,
      name: row.get(1)?,
      description: row.get(2)?,
      hotline_type: row.get(3)?,
      phone_number: row.get(4)?,
      text_number: row.get(5)?,
      website: row.get(6)?,
      is_24_7: row.get(7)?,
      languages: json_column(row, 8, "languages")?,
      country: row.get(9)?,
      is_active: row.get(10)?,
      priority_order: row.get(11)?,
    })
  })?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

const ALERT_COLUMNS: &str = "id, user_id, alert_type, severity_level, trigger_content, context_data, status, responder_id,
   response_notes, follow_up_required, follow_up_completed, follow_up_date, created_at, acknowledged_at, resolved_at";

fn alert_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CrisisAlert> {
  Ok(CrisisAlert {
    id: row.get(0)?,
    user_id: row.get(1)?,
    alert_type: row.get(2)?,
    severity_level: row.get(3)?,
    trigger_content: row.get(4)?,
    context_data: json_column(row, 5, "context_data")?,
    status: row.get(6)?,
    responder_id: row.get(7)?,
    response_notes: row.get(8)?,
    follow_up_required: row.get(9)?,
    follow_up_completed: row.get(10)?,
    follow_up_date: row.get(11)?,
    created_at: row.get(12)?,
    acknowledged_at: row.get(13)?,
    resolved_at: row.get(14)?,
  })
}

fn alert_out(conn: &Connection, a: CrisisAlert) -> Result<CrisisAlertOut, ApiError> {
  let responder_name = match a.responder_id {
    Some(id) => Some(full_name_of(conn, id)?),
    None => None,
  };
  Ok(CrisisAlertOut {
    id: a.id,
    user: a.user_id,
    user_name: full_name_of(conn, a.user_id)?,
    alert_type: a.alert_type,
    severity_level: a.severity_level,
    trigger_content: a.trigger_content,
    context_data: a.context_data,
    status: a.status,
    responder: a.responder_id,
    responder_name,
    response_notes: a.response_notes,
    follow_up_required: a.follow_up_required,
    follow_up_completed: a.follow_up_completed,
    follow_up_date: a.follow_up_date,
    created_at: a.created_at,
    acknowledged_at: a.acknowledged_at,
    resolved_at: a.resolved_at,
  })
}

fn fetch_alert(conn: &Connection, id: i64) -> Result<Option<CrisisAlert>, ApiError> {
  let sql = format!("SELECT {ALERT_COLUMNS} FROM crisis_alert WHERE id = ?1");
  Ok(conn.query_row(&sql, [id], alert_from_row).optional()?)
}

/// Users see only their own alerts; guides and admins see every alert. Newest first.
pub fn list_alerts(conn: &Connection, caller: &User) -> Result<Vec<CrisisAlertOut>, ApiError> {
  let staff = caller.role.is_staff_role();
  let sql = format!(
    "SELECT {ALERT_COLUMNS} FROM crisis_alert WHERE (?1 OR user_id = ?2) ORDER BY created_at DESC, id DESC"
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(params![staff, caller.id], alert_from_row)?
    .collect::<Result<Vec<_>, _>>()?;
  rows.into_iter().map(|a| alert_out(conn, a)).collect()
}

/// Alerts raised by the guide's active clients. Newest first.
pub fn alerts_for_guide(conn: &Connection, guide_id: i64) -> Result<Vec<CrisisAlertOut>, ApiError> {
  let sql = format!(
    "SELECT {ALERT_COLUMNS} FROM crisis_alert
     WHERE user_id IN (SELECT client_id FROM guide_client_assignment WHERE guide_id = ?1 AND is_active = 1)
     ORDER BY created_at DESC, id DESC"
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map([guide_id], alert_from_row)?.collect::<Result<Vec<_>, _>>()?;
  rows.into_iter().map(|a| alert_out(conn, a)).collect()
}

pub fn get_alert(conn: &Connection, caller: &User, id: i64) -> Result<CrisisAlertOut, ApiError> {
  match fetch_alert(conn, id)? {
    Some(a) if caller.role.is_staff_role() || a.user_id == caller.id => alert_out(conn, a),
    _ => Err(ApiError::not_found("Not found.")),
  }
}

#[instrument(level = "info", skip(conn, caller, input), fields(user_id = caller.id))]
pub fn create_alert(conn: &Connection, caller: &User, input: &CreateAlertIn) -> Result<CrisisAlertOut, ApiError> {
  let context = input.context_data.clone().unwrap_or_else(|| serde_json::json!({}));
  if !context.is_object() {
    return Err(ApiError::bad_request("context_data must be a JSON object."));
  }
  conn.execute(
    "INSERT INTO crisis_alert (user_id, alert_type, severity_level, trigger_content, context_data, status, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      caller.id,
      input.alert_type,
      input.severity_level,
      input.trigger_content,
      context.to_string(),
      AlertStatus::Active,
      Utc::now()
    ],
  )?;
  let id = conn.last_insert_rowid();
  warn!(
    target: "crisis",
    alert_id = id,
    severity = %input.severity_level,
    alert_type = %input.alert_type,
    trigger = %trunc_for_log(&input.trigger_content, 80),
    "Crisis alert created"
  );
  let alert = fetch_alert(conn, id)?.ok_or_else(|| ApiError::internal("created alert vanished"))?;
  alert_out(conn, alert)
}

/// Guide/admin response to an alert. `escalate` records the responder without changing status.
#[instrument(level = "info", skip(conn, caller, input), fields(responder_id = caller.id, action = %input.action))]
pub fn respond_to_alert(conn: &Connection, caller: &User, id: i64, input: &RespondAlertIn) -> Result<MessageOut, ApiError> {
  require_staff(caller)?;
  if fetch_alert(conn, id)?.is_none() {
    return Err(ApiError::not_found("Alert not found"));
  }
  let (status, message) = match input.action.as_str() {
    "acknowledge" => (Some(AlertStatus::Acknowledged), "Alert acknowledged successfully"),
    "resolve" => (Some(AlertStatus::Resolved), "Alert resolved successfully"),
    "escalate" => (None, "Alert escalated successfully"),
    _ => return Err(ApiError::bad_request("Invalid action")),
  };
  conn.execute(
    "UPDATE crisis_alert SET
       status = COALESCE(?2, status),
       acknowledged_at = CASE WHEN ?2 = 'acknowledged' THEN ?6 ELSE acknowledged_at END,
       resolved_at = CASE WHEN ?2 = 'resolved' THEN ?6 ELSE resolved_at END,
       follow_up_completed = CASE WHEN ?2 = 'resolved' THEN 1 ELSE follow_up_completed END,
       responder_id = ?3,
       response_notes = ?4,
       follow_up_date = COALESCE(?5, follow_up_date)
     WHERE id = ?1",
    params![id, status, caller.id, input.response_notes, input.follow_up_date, Utc::now()],
  )?;

  if input.action == "escalate" {
    warn!(target: "crisis", alert_id = id, "Crisis alert escalated");
  } else {
    info!(target: "crisis", alert_id = id, action = %input.action, "Crisis alert updated");
  }
  Ok(MessageOut { message: message.into() })
}

//
// Safety plans
//

const PLAN_COLUMNS: &str = "id, warning_signs, triggers, coping_strategies, distractions, support_contacts,
   professional_contacts, environment_safety, emergency_contacts, emergency_plan, created_at, updated_at, last_reviewed";

fn plan_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SafetyPlan> {
  Ok(SafetyPlan {
    id: row.get(0)?,
    warning_signs: json_column(row, 1, "warning_signs")?,
    triggers: json_column(row, 2, "triggers")?,
    coping_strategies: json_column(row, 3, "coping_strategies")?,
    distractions: json_column(row, 4, "distractions")?,
    support_contacts: json_column(row, 5, "support_contacts")?,
    professional_contacts: json_column(row, 6, "professional_contacts")?,
    environment_safety: json_column(row, 7, "environment_safety")?,
    emergency_contacts: json_column(row, 8, "emergency_contacts")?,
    emergency_plan: row.get(9)?,
    created_at: row.get(10)?,
    updated_at: row.get(11)?,
    last_reviewed: row.get(12)?,
  })
}

/// The caller's saved plan, or a blank template when none exists yet.
pub fn safety_plan_view(conn: &Connection, user_id: i64) -> Result<SafetyPlanView, ApiError> {
  let sql = format!("SELECT {PLAN_COLUMNS} FROM crisis_user_safety_plan WHERE user_id = ?1");
  Ok(match conn.query_row(&sql, [user_id], plan_from_row).optional()? {
    Some(plan) => SafetyPlanView::Saved(plan),
    None => SafetyPlanView::Template(SafetyPlanTemplate { template: true, sections: SafetyPlanSections::default() }),
  })
}

/// Create or replace the caller's plan. Every save counts as a review.
#[instrument(level = "info", skip(conn, input))]
pub fn save_safety_plan(
  conn: &Connection,
  user_id: i64,
  input: &SafetyPlanSections,
  now: DateTime<Utc>,
) -> Result<SafetyPlanSavedOut, ApiError> {
  conn.execute(
    "INSERT INTO crisis_user_safety_plan
       (user_id, warning_signs, triggers, coping_strategies, distractions, support_contacts, professional_contacts,
        environment_safety, emergency_contacts, emergency_plan, created_at, updated_at, last_reviewed)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, ?11)
     ON CONFLICT(user_id) DO UPDATE SET
       warning_signs = excluded.warning_signs,
       triggers = excluded.triggers,
       coping_strategies = excluded.coping_strategies,
       distractions = excluded.distractions,
       support_contacts = excluded.support_contacts,
       professional_contacts = excluded.professional_contacts,
       environment_safety = excluded.environment_safety,
       emergency_contacts = excluded.emergency_contacts,
       emergency_plan = excluded.emergency_plan,
       updated_at = excluded.updated_at,
       last_reviewed = excluded.last_reviewed",
    params![
      user_id,
      json_list(&input.warning_signs),
      json_list(&input.triggers),
      json_list(&input.coping_strategies),
      json_list(&input.distractions),
      json_list(&input.support_contacts),
      json_list(&input.professional_contacts),
      json_list(&input.environment_safety),
      json_list(&input.emergency_contacts),
      input.emergency_plan,
      now
    ],
  )?;
  let plan_id: i64 =
    conn.query_row("SELECT id FROM crisis_user_safety_plan WHERE user_id = ?1", [user_id], |row| row.get(0))?;
  info!(
    target: "crisis",
    plan_id,
    support_contacts = input.support_contacts.len(),
    emergency_contacts = input.emergency_contacts.len(),
    "Safety plan saved"
  );
  Ok(SafetyPlanSavedOut { message: "Safety plan saved successfully".into(), plan_id })
}

//
// Statistics
//

/// Alert and safety plan counts for guides and admins.
pub fn crisis_stats(conn: &Connection, caller: &User, now: DateTime<Utc>) -> Result<CrisisStatsOut, ApiError> {
  require_staff(caller)?;
  let week_ago = now - Duration::days(7);

  let mut stmt =
    conn.prepare("SELECT created_at, acknowledged_at FROM crisis_alert WHERE acknowledged_at IS NOT NULL")?;
  let minutes = stmt
    .query_map([], |row| {
      let created: DateTime<Utc> = row.get(0)?;
      let acknowledged: DateTime<Utc> = row.get(1)?;
      Ok((acknowledged - created).num_seconds() as f64 / 60.0)
    })?
    .collect::<Result<Vec<_>, _>>()?;
  let response_time_avg =
    (!minutes.is_empty()).then(|| round_to(minutes.iter().sum::<f64>() / minutes.len() as f64, 1));

  Ok(CrisisStatsOut {
    total_alerts: count(conn, "SELECT COUNT(*) FROM crisis_alert", &[])?,
    active_alerts: count(conn, "SELECT COUNT(*) FROM crisis_alert WHERE status = ?1", &[&AlertStatus::Active])?,
    high_risk_alerts: count(
      conn,
      "SELECT COUNT(*) FROM crisis_alert WHERE severity_level IN ('high', 'imminent')",
      &[],
    )?,
    resolved_alerts: count(conn, "SELECT COUNT(*) FROM crisis_alert WHERE status = ?1", &[&AlertStatus::Resolved])?,
    users_with_safety_plans: count(conn, "SELECT COUNT(*) FROM crisis_user_safety_plan", &[])?,
    alerts_this_week: count(conn, "SELECT COUNT(*) FROM crisis_alert WHERE created_at >= ?1", &[&week_ago])?,
    response_time_avg,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::accounts::tests::register;
  use crate::config::AppConfig;
  use crate::db::open_memory_database;
  use crate::domain::{AlertType, Role, SeverityLevel};
  use crate::seeds::apply_seeds;

  fn seeded() -> Connection {
    let mut conn = open_memory_database().unwrap();
    apply_seeds(&mut conn, &AppConfig::default()).unwrap();
    conn
  }

  fn alert_in() -> CreateAlertIn {
    CreateAlertIn {
      alert_type: AlertType::SelfReported,
      severity_level: SeverityLevel::High,
      trigger_content: "I need help".into(),
      context_data: None,
    }
  }

  fn respond(action: &str) -> RespondAlertIn {
    RespondAlertIn { action: action.into(), response_notes: "called the student".into(), follow_up_date: None }
  }

  #[test]
  fn hotlines_are_ordered_by_priority() {
    let conn = seeded();
    let lines = list_hotlines(&conn).unwrap();
    assert_eq!(lines[0].phone_number, "911");
    let orders: Vec<u32> = lines.iter().map(|h| h.priority_order).collect();
    let mut sorted = orders.clone();
    sorted.sort();
    assert_eq!(orders, sorted);
    assert_eq!(lines[1].country, "United States");
  }

  #[test]
  fn alert_visibility_follows_role() {
    let conn = seeded();
    let ana = register(&conn, "ana", Role::User);
    let ben = register(&conn, "ben", Role::User);
    let guide = register(&conn, "gina", Role::Guide);

    let a = create_alert(&conn, &ana, &alert_in()).unwrap();
    assert_eq!(a.status, AlertStatus::Active);
    assert!(a.follow_up_required);
    assert_eq!(a.context_data, serde_json::json!({}));
    create_alert(&conn, &ben, &alert_in()).unwrap();

    assert_eq!(list_alerts(&conn, &ana).unwrap().len(), 1);
    assert_eq!(list_alerts(&conn, &guide).unwrap().len(), 2);
    assert!(get_alert(&conn, &ana, a.id).is_ok());
    assert!(matches!(get_alert(&conn, &ben, a.id), Err(ApiError::NotFound(_))));
    assert!(get_alert(&conn, &guide, a.id).is_ok());
  }

  #[test]
  fn non_object_context_is_rejected() {
    let conn = seeded();
    let ana = register(&conn, "ana", Role::User);
    let mut input = alert_in();
    input.context_data = Some(serde_json::json!([1, 2]));
    assert!(matches!(create_alert(&conn, &ana, &input), Err(ApiError::BadRequest(_))));
  }

  #[test]
  fn respond_transitions() {
    let conn = seeded();
    let ana = register(&conn, "ana", Role::User);
    let guide = register(&conn, "gina", Role::Guide);
    let a = create_alert(&conn, &ana, &alert_in()).unwrap();

    assert!(matches!(respond_to_alert(&conn, &ana, a.id, &respond("resolve")), Err(ApiError::Forbidden(_))));
    assert!(matches!(respond_to_alert(&conn, &guide, 999, &respond("resolve")), Err(ApiError::NotFound(_))));
    assert!(matches!(respond_to_alert(&conn, &guide, a.id, &respond("ignore")), Err(ApiError::BadRequest(_))));

    respond_to_alert(&conn, &guide, a.id, &respond("escalate")).unwrap();
    let after = get_alert(&conn, &guide, a.id).unwrap();
    assert_eq!(after.status, AlertStatus::Active);
    assert_eq!(after.responder, Some(guide.id));
    assert_eq!(after.responder_name.as_deref(), Some("gina Tester"));

    let msg = respond_to_alert(&conn, &guide, a.id, &respond("acknowledge")).unwrap();
    assert_eq!(msg.message, "Alert acknowledged successfully");
    let after = get_alert(&conn, &guide, a.id).unwrap();
    assert_eq!(after.status, AlertStatus::Acknowledged);
    assert!(after.acknowledged_at.is_some());

    let follow_up = Utc::now();
    let mut input = respond("resolve");
    input.follow_up_date = Some(follow_up);
    respond_to_alert(&conn, &guide, a.id, &input).unwrap();
    let after = get_alert(&conn, &ana, a.id).unwrap();
    assert_eq!(after.status, AlertStatus::Resolved);
    assert!(after.resolved_at.is_some());
    assert!(after.follow_up_completed);
    assert_eq!(after.follow_up_date, Some(follow_up));
    assert_eq!(after.response_notes, "called the student");
  }

  #[test]
  fn safety_plan_starts_as_template_then_upserts() {
    let conn = seeded();
    let ana = register(&conn, "ana", Role::User);
    match safety_plan_view(&conn, ana.id).unwrap() {
      SafetyPlanView::Template(t) => {
        assert!(t.template);
        assert!(t.sections.warning_signs.is_empty());
        assert_eq!(t.sections.emergency_plan, "");
      }
      SafetyPlanView::Saved(_) => panic!("expected a template"),
    }

    let mut input = SafetyPlanSections {
      warning_signs: vec![serde_json::json!("can't sleep")],
      support_contacts: vec![serde_json::json!({"name": "Sam", "phone": "555-0100"})],
      emergency_plan: "Call Sam, then 988".into(),
      ..Default::default()
    };
    let first = save_safety_plan(&conn, ana.id, &input, Utc::now()).unwrap();
    assert_eq!(first.message, "Safety plan saved successfully");

    input.warning_signs.push(serde_json::json!("skipping meals"));
    let second = save_safety_plan(&conn, ana.id, &input, Utc::now()).unwrap();
    assert_eq!(second.plan_id, first.plan_id);

    let SafetyPlanView::Saved(plan) = safety_plan_view(&conn, ana.id).unwrap() else {
      panic!("expected a saved plan");
    };
    assert_eq!(plan.warning_signs.len(), 2);
    assert_eq!(plan.support_contacts[0]["name"], "Sam");
    assert!(plan.last_reviewed.is_some());
    let out = serde_json::to_value(SafetyPlanView::Saved(plan)).unwrap();
    assert!(out.get("template").is_none());
  }

  #[test]
  fn crisis_stats_are_staff_only_and_count_alerts() {
    let conn = seeded();
    let ana = register(&conn, "ana", Role::User);
    let admin = register(&conn, "boss", Role::Admin);
    assert!(matches!(crisis_stats(&conn, &ana, Utc::now()), Err(ApiError::Forbidden(_))));

    let high = create_alert(&conn, &ana, &alert_in()).unwrap();
    let mut low = alert_in();
    low.severity_level = SeverityLevel::Low;
    create_alert(&conn, &ana, &low).unwrap();
    respond_to_alert(&conn, &admin, high.id, &respond("resolve")).unwrap();
    save_safety_plan(&conn, ana.id, &SafetyPlanSections::default(), Utc::now()).unwrap();

    let stats = crisis_stats(&conn, &admin, Utc::now()).unwrap();
    assert_eq!(stats.total_alerts, 2);
    assert_eq!(stats.active_alerts, 1);
    assert_eq!(stats.high_risk_alerts, 1);
    assert_eq!(stats.resolved_alerts, 1);
    assert_eq!(stats.users_with_safety_plans, 1);
    assert_eq!(stats.alerts_this_week, 2);
    assert_eq!(stats.response_time_avg, None);

    let later = crisis_stats(&conn, &admin, Utc::now() + Duration::days(8)).unwrap();
    assert_eq!(later.alerts_this_week, 0);
  }

  #[test]
  fn response_time_averages_acknowledged_alerts() {
    let conn = seeded();
    let ana = register(&conn, "ana", Role::User);
    let guide = register(&conn, "gina", Role::Guide);
    let a = create_alert(&conn, &ana, &alert_in()).unwrap();
    let b = create_alert(&conn, &ana, &alert_in()).unwrap();
    for (id, minutes) in [(a.id, 10), (b.id, 20)] {
      conn
        .execute(
          "UPDATE crisis_alert SET acknowledged_at = ?2 WHERE id = ?1",
          params![id, a.created_at + Duration::minutes(minutes)],
        )
        .unwrap();
      conn.execute("UPDATE crisis_alert SET created_at = ?2 WHERE id = ?1", params![id, a.created_at]).unwrap();
    }
    let stats = crisis_stats(&conn, &guide, Utc::now()).unwrap();
    assert_eq!(stats.response_time_avg, Some(15.0));
  }
}
