//! Mood tracking, daily challenges and the points ledger.

use chrono::{Days, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument};

use crate::db::json_column;
use crate::domain::{DailyChallenge, MoodEntry, UserChallengeCompletion, UserPoints};
use crate::error::ApiError;
use crate::protocol::{
  ChallengeCompletedOut, CompleteChallengeIn, MoodEntryCreatedOut, MoodEntryIn, MoodEntryPatch, MoodStatsOut,
  MoodTrendPoint, WellnessStatsOut,
};
use crate::util::{json_list, round_to};

pub const MOOD_ENTRY_POINTS: u32 = 5;
pub const DEFAULT_STATS_DAYS: i64 = 30;
const MOOD_NOTES_MAX: usize = 500;
const COMPLETION_NOTES_MAX: usize = 300;
const DUPLICATE_DATE: &str = "Mood entry for this date already exists.";

//
// Points
//

pub fn get_points(conn: &Connection, user_id: i64) -> Result<UserPoints, ApiError> {
  let found = conn
    .query_row(
      "SELECT total_points, current_streak, longest_streak, last_activity_date, level, points_to_next_level
       FROM wellness_user_points WHERE user_id = ?1",
      [user_id],
      |row| {
        Ok(UserPoints {
          total_points: row.get(0)?,
          current_streak: row.get(1)?,
          longest_streak: row.get(2)?,
          last_activity_date: row.get(3)?,
          level: row.get(4)?,
          points_to_next_level: row.get(5)?,
        })
      },
    )
    .optional()?;
  Ok(found.unwrap_or_default())
}

fn save_points(conn: &Connection, user_id: i64, p: &UserPoints) -> Result<(), ApiError> {
  let now = Utc::now();
  conn.execute(
    "INSERT INTO wellness_user_points
       (user_id, total_points, current_streak, longest_streak, last_activity_date, level, points_to_next_level, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
     ON CONFLICT(user_id) DO UPDATE SET
       total_points = excluded.total_points,
       current_streak = excluded.current_streak,
       longest_streak = excluded.longest_streak,
       last_activity_date = excluded.last_activity_date,
       level = excluded.level,
       points_to_next_level = excluded.points_to_next_level,
       updated_at = excluded.updated_at",
    params![
      user_id,
      p.total_points,
      p.current_streak,
      p.longest_streak,
      p.last_activity_date,
      p.level,
      p.points_to_next_level,
      now
    ],
  )?;
  Ok(())
}

/// Credit `points` for an activity on `today` and persist the ledger.
pub fn award_points(conn: &Connection, user_id: i64, points: u32, today: NaiveDate) -> Result<UserPoints, ApiError> {
  let mut ledger = get_points(conn, user_id)?;
  let before = ledger.level;
  ledger.add_points(points, today);
  save_points(conn, user_id, &ledger)?;
  if ledger.level > before {
    info!(target: "wellness", user_id, level = ledger.level, "Level up");
  }
  Ok(ledger)
}

//
// Mood entries
//

const MOOD_COLUMNS: &str =
  "id, user_id, mood_rating, energy_level, anxiety_level, sleep_quality, notes, activities, triggers, date, created_at";

fn mood_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MoodEntry> {
  Ok(MoodEntry {
    id: row.get(0)?,
    user_id: row.get(1)?,
    mood_rating: row.get(2)?,
    energy_level: row.get(3)?,
    anxiety_level: row.get(4)?,
    sleep_quality: row.get(5)?,
    notes: row.get(6)?,
    activities: json_column(row, 7, "activities")?,
    triggers: json_column(row, 8, "triggers")?,
    date: row.get(9)?,
    created_at: row.get(10)?,
  })
}

fn validate_mood(ratings: [(&str, u8); 4], notes: &str) -> Result<(), ApiError> {
  for (field, value) in ratings {
    if !(1..=5).contains(&value) {
      return Err(ApiError::bad_request(format!("{field} must be between 1 and 5.")));
    }
  }
  if notes.chars().count() > MOOD_NOTES_MAX {
    return Err(ApiError::bad_request("Ensure notes has no more than 500 characters."));
  }
  Ok(())
}

fn date_taken(conn: &Connection, user_id: i64, date: NaiveDate, except_id: Option<i64>) -> Result<bool, ApiError> {
  Ok(conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM wellness_mood_entry WHERE user_id = ?1 AND date = ?2 AND (?3 IS NULL OR id <> ?3))",
    params![user_id, date, except_id],
    |row| row.get(0),
  )?)
}

/// Newest first.
pub fn list_mood_entries(conn: &Connection, user_id: i64) -> Result<Vec<MoodEntry>, ApiError> {
  let sql = format!("SELECT {MOOD_COLUMNS} FROM wellness_mood_entry WHERE user_id = ?1 ORDER BY date DESC, id DESC");
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map([user_id], mood_from_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Record a mood entry and award the tracking points in one transaction.
#[instrument(level = "info", skip(conn, input))]
pub fn create_mood_entry(
  conn: &mut Connection,
  user_id: i64,
  input: &MoodEntryIn,
  today: NaiveDate,
) -> Result<MoodEntryCreatedOut, ApiError> {
  validate_mood(
    [
      ("mood_rating", input.mood_rating),
      ("energy_level", input.energy_level),
      ("anxiety_level", input.anxiety_level),
      ("sleep_quality", input.sleep_quality),
    ],
    &input.notes,
  )?;
  let date = input.date.unwrap_or(today);

  let tx = conn.transaction()?;
  if date_taken(&tx, user_id, date, None)? {
    return Err(ApiError::bad_request(DUPLICATE_DATE));
  }
  tx.execute(
    "INSERT INTO wellness_mood_entry
       (user_id, mood_rating, energy_level, anxiety_level, sleep_quality, notes, activities, triggers, date, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      user_id,
      input.mood_rating,
      input.energy_level,
      input.anxiety_level,
      input.sleep_quality,
      input.notes,
      json_list(&input.activities),
      json_list(&input.triggers),
      date,
      Utc::now()
    ],
  )?;
  let id = tx.last_insert_rowid();
  award_points(&tx, user_id, MOOD_ENTRY_POINTS, today)?;
  let sql = format!("SELECT {MOOD_COLUMNS} FROM wellness_mood_entry WHERE id = ?1");
  let entry = tx.query_row(&sql, [id], mood_from_row)?;
  tx.commit()?;

  info!(target: "wellness", id, %date, "Mood entry saved");
  Ok(MoodEntryCreatedOut {
    message: "Mood entry saved successfully".into(),
    points_earned: MOOD_ENTRY_POINTS,
    entry,
  })
}

/// One of the caller's own entries; other users' entries read as missing.
pub fn get_mood_entry(conn: &Connection, user_id: i64, id: i64) -> Result<MoodEntry, ApiError> {
  let sql = format!("SELECT {MOOD_COLUMNS} FROM wellness_mood_entry WHERE id = ?1");
  match conn.query_row(&sql, [id], mood_from_row).optional()? {
    Some(entry) if entry.user_id == user_id => Ok(entry),
    _ => Err(ApiError::not_found("Not found.")),
  }
}

/// Apply the supplied fields to an owned entry. Points are not re-awarded.
#[instrument(level = "info", skip(conn, patch))]
pub fn update_mood_entry(conn: &mut Connection, user_id: i64, id: i64, patch: &MoodEntryPatch) -> Result<MoodEntry, ApiError> {
  let tx = conn.transaction()?;
  let mut entry = get_mood_entry(&tx, user_id, id)?;
  entry.mood_rating = patch.mood_rating.unwrap_or(entry.mood_rating);
  entry.energy_level = patch.energy_level.unwrap_or(entry.energy_level);
  entry.anxiety_level = patch.anxiety_level.unwrap_or(entry.anxiety_level);
  entry.sleep_quality = patch.sleep_quality.unwrap_or(entry.sleep_quality);
  if let Some(notes) = &patch.notes {
    entry.notes = notes.clone();
  }
  if let Some(activities) = &patch.activities {
    entry.activities = activities.clone();
  }
  if let Some(triggers) = &patch.triggers {
    entry.triggers = triggers.clone();
  }
  validate_mood(
    [
      ("mood_rating", entry.mood_rating),
      ("energy_level", entry.energy_level),
      ("anxiety_level", entry.anxiety_level),
      ("sleep_quality", entry.sleep_quality),
    ],
    &entry.notes,
  )?;
  if let Some(date) = patch.date {
    if date_taken(&tx, user_id, date, Some(id))? {
      return Err(ApiError::bad_request(DUPLICATE_DATE));
    }
    entry.date = date;
  }

  tx.execute(
    "UPDATE wellness_mood_entry SET
       mood_rating = ?2, energy_level = ?3, anxiety_level = ?4, sleep_quality = ?5,
       notes = ?6, activities = ?7, triggers = ?8, date = ?9
     WHERE id = ?1",
    params![
      id,
      entry.mood_rating,
      entry.energy_level,
      entry.anxiety_level,
      entry.sleep_quality,
      entry.notes,
      json_list(&entry.activities),
      json_list(&entry.triggers),
      entry.date
    ],
  )?;
  tx.commit()?;
  info!(target: "wellness", id, date = %entry.date, "Mood entry updated");
  Ok(entry)
}

/// Remove an owned entry. Points already earned are kept.
#[instrument(level = "info", skip(conn))]
pub fn delete_mood_entry(conn: &Connection, user_id: i64, id: i64) -> Result<(), ApiError> {
  let entry = get_mood_entry(conn, user_id, id)?;
  conn.execute("DELETE FROM wellness_mood_entry WHERE id = ?1", [entry.id])?;
  info!(target: "wellness", id, date = %entry.date, "Mood entry deleted");
  Ok(())
}

fn avg2(values: impl Iterator<Item = u8>, n: usize) -> f64 {
  let sum: u32 = values.map(u32::from).sum();
  round_to(f64::from(sum) / n as f64, 2)
}

/// Averages and trend over entries dated within the last `days` days; `None` when there are none.
pub fn mood_stats(conn: &Connection, user_id: i64, days: i64, today: NaiveDate) -> Result<Option<MoodStatsOut>, ApiError> {
  let days = u64::try_from(days).map_err(|_| ApiError::bad_request("days must be a non-negative integer."))?;
  // `None` when the window reaches past the earliest representable date: no lower bound
  let start = today.checked_sub_days(Days::new(days));
  let sql = format!(
    "SELECT {MOOD_COLUMNS} FROM wellness_mood_entry WHERE user_id = ?1 AND (?2 IS NULL OR date >= ?2) ORDER BY date"
  );
  let mut stmt = conn.prepare(&sql)?;
  let entries = stmt
    .query_map(params![user_id, start], mood_from_row)?
    .collect::<Result<Vec<_>, _>>()?;
  if entries.is_empty() {
    return Ok(None);
  }

  let n = entries.len();
  Ok(Some(MoodStatsOut {
    average_mood: avg2(entries.iter().map(|e| e.mood_rating), n),
    average_energy: avg2(entries.iter().map(|e| e.energy_level), n),
    average_anxiety: avg2(entries.iter().map(|e| e.anxiety_level), n),
    average_sleep: avg2(entries.iter().map(|e| e.sleep_quality), n),
    total_entries: n,
    current_streak: get_points(conn, user_id)?.current_streak,
    mood_trend: entries
      .iter()
      .map(|e| MoodTrendPoint {
        date: e.date,
        mood: e.mood_rating,
        energy: e.energy_level,
        anxiety: e.anxiety_level,
        sleep: e.sleep_quality,
      })
      .collect(),
  }))
}

//
// Challenges
//

fn challenge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyChallenge> {
  Ok(DailyChallenge {
    id: row.get(0)?,
    title: row.get(1)?,
    description: row.get(2)?,
    challenge_type: row.get(3)?,
    instructions: row.get(4)?,
    points_reward: row.get(5)?,
    target_value: row.get(6)?,
    duration_minutes: row.get(7)?,
    is_active: row.get(8)?,
  })
}

const CHALLENGE_SELECT: &str = "SELECT id, title, description, challenge_type, instructions, points_reward,
   target_value, duration_minutes, is_active FROM wellness_daily_challenge";

pub fn list_active_challenges(conn: &Connection) -> Result<Vec<DailyChallenge>, ApiError> {
  let sql = format!("{CHALLENGE_SELECT} WHERE is_active = 1 ORDER BY id");
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map([], challenge_from_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Complete an active challenge for `today`: records the completion and credits
/// the challenge's reward in one transaction.
#[instrument(level = "info", skip(conn, input))]
pub fn complete_challenge(
  conn: &mut Connection,
  user_id: i64,
  challenge_id: i64,
  input: &CompleteChallengeIn,
  today: NaiveDate,
) -> Result<ChallengeCompletedOut, ApiError> {
  if input.notes.chars().count() > COMPLETION_NOTES_MAX {
    return Err(ApiError::bad_request("Ensure notes has no more than 300 characters."));
  }

  let tx = conn.transaction()?;
  let sql = format!("{CHALLENGE_SELECT} WHERE id = ?1 AND is_active = 1");
  let challenge = tx
    .query_row(&sql, [challenge_id], challenge_from_row)
    .optional()?
    .ok_or_else(|| ApiError::not_found("Challenge not found"))?;

  let done: bool = tx.query_row(
    "SELECT EXISTS(SELECT 1 FROM wellness_user_challenge_completion
       WHERE user_id = ?1 AND challenge_id = ?2 AND completion_date = ?3)",
    params![user_id, challenge_id, today],
    |row| row.get(0),
  )?;
  if done {
    return Err(ApiError::bad_request("Challenge already completed today"));
  }

  tx.execute(
    "INSERT INTO wellness_user_challenge_completion
       (user_id, challenge_id, completed_at, completion_date, completion_value, notes, points_earned)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![user_id, challenge_id, Utc::now(), today, input.completion_value, input.notes, challenge.points_reward],
  )?;
  let completion_id = tx.last_insert_rowid();
  award_points(&tx, user_id, challenge.points_reward, today)?;
  tx.commit()?;

  info!(target: "wellness", completion_id, challenge = %challenge.title, points = challenge.points_reward, "Challenge completed");
  Ok(ChallengeCompletedOut {
    message: "Challenge completed successfully".into(),
    points_earned: challenge.points_reward,
    completion_id,
  })
}

pub fn list_completions(conn: &Connection, user_id: i64) -> Result<Vec<UserChallengeCompletion>, ApiError> {
  let mut stmt = conn.prepare(
    "SELECT c.id, c.challenge_id, d.title, d.challenge_type, c.completion_date, c.completion_value, c.notes,
            c.points_earned, c.completed_at
     FROM wellness_user_challenge_completion c JOIN wellness_daily_challenge d ON d.id = c.challenge_id
     WHERE c.user_id = ?1 ORDER BY c.completed_at DESC, c.id DESC",
  )?;
  let rows = stmt.query_map([user_id], |row| {
    Ok(UserChallengeCompletion {
      id: row.get(0)?,
      challenge_id: row.get(1)?,
      challenge_title: row.get(2)?,
      challenge_type: row.get(3)?,
      completion_date: row.get(4)?,
      completion_value: row.get(5)?,
      notes: row.get(6)?,
      points_earned: row.get(7)?,
      completed_at: row.get(8)?,
    })
  })?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn wellness_stats(conn: &Connection, user_id: i64, today: NaiveDate) -> Result<WellnessStatsOut, ApiError> {
  let points = get_points(conn, user_id)?;
  let count = |sql: &str, args: &[&dyn rusqlite::ToSql]| -> Result<i64, ApiError> {
    Ok(conn.query_row(sql, args, |row| row.get(0))?)
  };
  Ok(WellnessStatsOut {
    total_points: points.total_points,
    current_level: points.level,
    challenges_completed_today: count(
      "SELECT COUNT(*) FROM wellness_user_challenge_completion WHERE user_id = ?1 AND completion_date = ?2",
      &[&user_id, &today],
    )?,
    challenges_completed_total: count(
      "SELECT COUNT(*) FROM wellness_user_challenge_completion WHERE user_id = ?1",
      &[&user_id],
    )?,
    current_streak: points.current_streak,
    mood_entries_count: count("SELECT COUNT(*) FROM wellness_mood_entry WHERE user_id = ?1", &[&user_id])?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::accounts::tests::register;
  use crate::config::AppConfig;
  use crate::db::open_memory_database;
  use crate::domain::Role;
  use crate::seeds::apply_seeds;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
  }

  fn seeded() -> Connection {
    let mut conn = open_memory_database().unwrap();
    apply_seeds(&mut conn, &AppConfig::default()).unwrap();
    conn
  }

  fn mood(rating: u8, date: Option<NaiveDate>) -> MoodEntryIn {
    MoodEntryIn {
      mood_rating: rating,
      energy_level: 3,
      anxiety_level: 2,
      sleep_quality: 4,
      notes: String::new(),
      activities: vec!["walk".into()],
      triggers: Vec::new(),
      date,
    }
  }

  #[test]
  fn mood_entry_awards_points_and_rejects_duplicate_date() {
    let mut conn = seeded();
    let u = register(&conn, "ana", Role::User);
    let out = create_mood_entry(&mut conn, u.id, &mood(4, None), day(10)).unwrap();
    assert_eq!(out.points_earned, 5);
    assert_eq!(out.entry.date, day(10));
    assert_eq!(out.entry.activities, vec!["walk".to_string()]);

    let p = get_points(&conn, u.id).unwrap();
    assert_eq!((p.total_points, p.current_streak), (5, 1));

    let err = create_mood_entry(&mut conn, u.id, &mood(2, Some(day(10))), day(10)).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert_eq!(get_points(&conn, u.id).unwrap().total_points, 5);
  }

  #[test]
  fn mood_ratings_are_bounded() {
    let mut conn = seeded();
    let u = register(&conn, "ana", Role::User);
    assert!(create_mood_entry(&mut conn, u.id, &mood(0, None), day(1)).is_err());
    assert!(create_mood_entry(&mut conn, u.id, &mood(6, None), day(1)).is_err());
    let mut long = mood(3, None);
    long.notes = "x".repeat(501);
    assert!(create_mood_entry(&mut conn, u.id, &long, day(1)).is_err());
    assert!(list_mood_entries(&conn, u.id).unwrap().is_empty());
  }

  #[test]
  fn stats_window_and_averages() {
    let mut conn = seeded();
    let u = register(&conn, "ana", Role::User);
    assert!(mood_stats(&conn, u.id, 30, day(20)).unwrap().is_none());

    create_mood_entry(&mut conn, u.id, &mood(5, Some(day(18))), day(18)).unwrap();
    create_mood_entry(&mut conn, u.id, &mood(4, Some(day(19))), day(19)).unwrap();
    create_mood_entry(&mut conn, u.id, &mood(4, Some(day(20))), day(20)).unwrap();
    create_mood_entry(&mut conn, u.id, &mood(1, Some(day(1))), day(20)).unwrap();

    let s = mood_stats(&conn, u.id, 7, day(20)).unwrap().unwrap();
    assert_eq!(s.total_entries, 3);
    assert_eq!(s.average_mood, 4.33);
    assert_eq!(s.average_sleep, 4.0);
    assert_eq!(s.mood_trend.first().unwrap().date, day(18));
    assert_eq!(s.current_streak, 3);

    assert_eq!(mood_stats(&conn, u.id, 30, day(20)).unwrap().unwrap().total_entries, 4);
    assert!(mood_stats(&conn, u.id, -1, day(20)).is_err());
    assert_eq!(list_mood_entries(&conn, u.id).unwrap()[0].date, day(20));
  }

  #[test]
  fn very_large_window_covers_every_entry() {
    let mut conn = seeded();
    let u = register(&conn, "ana", Role::User);
    create_mood_entry(&mut conn, u.id, &mood(3, Some(day(1))), day(20)).unwrap();
    create_mood_entry(&mut conn, u.id, &mood(5, Some(day(20))), day(20)).unwrap();
    for days in [100_000_000, i64::MAX] {
      let s = mood_stats(&conn, u.id, days, day(20)).unwrap().unwrap();
      assert_eq!(s.total_entries, 2);
      assert_eq!(s.average_mood, 4.0);
    }
  }

  #[test]
  fn mood_entry_detail_is_owner_only() {
    let mut conn = seeded();
    let ana = register(&conn, "ana", Role::User);
    let ben = register(&conn, "ben", Role::User);
    let id = create_mood_entry(&mut conn, ana.id, &mood(4, None), day(10)).unwrap().entry.id;

    assert_eq!(get_mood_entry(&conn, ana.id, id).unwrap().mood_rating, 4);
    assert!(matches!(get_mood_entry(&conn, ben.id, id), Err(ApiError::NotFound(_))));
    let patch = MoodEntryPatch { mood_rating: Some(1), ..Default::default() };
    assert!(matches!(update_mood_entry(&mut conn, ben.id, id, &patch), Err(ApiError::NotFound(_))));
    assert!(matches!(delete_mood_entry(&conn, ben.id, id), Err(ApiError::NotFound(_))));
    assert!(matches!(get_mood_entry(&conn, ana.id, 9999), Err(ApiError::NotFound(_))));
  }

  #[test]
  fn mood_entry_update_validates_and_keeps_points() {
    let mut conn = seeded();
    let u = register(&conn, "ana", Role::User);
    let first = create_mood_entry(&mut conn, u.id, &mood(4, Some(day(9))), day(10)).unwrap().entry;
    create_mood_entry(&mut conn, u.id, &mood(3, Some(day(10))), day(10)).unwrap();

    let patch = MoodEntryPatch {
      mood_rating: Some(2),
      notes: Some("rough morning".into()),
      triggers: Some(vec!["exams".into()]),
      ..Default::default()
    };
    let updated = update_mood_entry(&mut conn, u.id, first.id, &patch).unwrap();
    assert_eq!(updated.mood_rating, 2);
    assert_eq!(updated.energy_level, first.energy_level);
    assert_eq!(updated.activities, first.activities);
    assert_eq!(get_mood_entry(&conn, u.id, first.id).unwrap().triggers, vec!["exams".to_string()]);

    let clash = MoodEntryPatch { date: Some(day(10)), ..Default::default() };
    let err = update_mood_entry(&mut conn, u.id, first.id, &clash).unwrap_err();
    assert_eq!(err.to_string(), "Mood entry for this date already exists.");
    let same_day = MoodEntryPatch { date: Some(day(9)), ..Default::default() };
    assert!(update_mood_entry(&mut conn, u.id, first.id, &same_day).is_ok());
    let bad = MoodEntryPatch { sleep_quality: Some(9), ..Default::default() };
    assert!(matches!(update_mood_entry(&mut conn, u.id, first.id, &bad), Err(ApiError::BadRequest(_))));
    assert_eq!(get_mood_entry(&conn, u.id, first.id).unwrap().sleep_quality, first.sleep_quality);

    delete_mood_entry(&conn, u.id, first.id).unwrap();
    assert_eq!(list_mood_entries(&conn, u.id).unwrap().len(), 1);
    assert_eq!(get_points(&conn, u.id).unwrap().total_points, 10);
  }

  #[test]
  fn challenge_completes_once_per_day() {
    let mut conn = seeded();
    let u = register(&conn, "ana", Role::User);
    let challenge = list_active_challenges(&conn).unwrap().into_iter().find(|c| c.points_reward == 15).unwrap();

    let out = complete_challenge(&mut conn, u.id, challenge.id, &CompleteChallengeIn::default(), day(3)).unwrap();
    assert_eq!(out.points_earned, 15);
    let again = complete_challenge(&mut conn, u.id, challenge.id, &CompleteChallengeIn::default(), day(3)).unwrap_err();
    assert_eq!(again.to_string(), "Challenge already completed today");
    complete_challenge(&mut conn, u.id, challenge.id, &CompleteChallengeIn::default(), day(4)).unwrap();

    let p = get_points(&conn, u.id).unwrap();
    assert_eq!((p.total_points, p.current_streak, p.longest_streak), (30, 2, 2));

    let history = list_completions(&conn, u.id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].challenge_title, challenge.title);

    let stats = wellness_stats(&conn, u.id, day(4)).unwrap();
    assert_eq!(stats.challenges_completed_today, 1);
    assert_eq!(stats.challenges_completed_total, 2);
    assert_eq!(stats.total_points, 30);
  }

  #[test]
  fn unknown_or_inactive_challenge_is_not_found() {
    let mut conn = seeded();
    let u = register(&conn, "ana", Role::User);
    let err = complete_challenge(&mut conn, u.id, 9999, &CompleteChallengeIn::default(), day(1)).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let id = list_active_challenges(&conn).unwrap()[0].id;
    conn.execute("UPDATE wellness_daily_challenge SET is_active = 0 WHERE id = ?1", [id]).unwrap();
    let err = complete_challenge(&mut conn, u.id, id, &CompleteChallengeIn::default(), day(1)).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(get_points(&conn, u.id).unwrap(), UserPoints::default());
  }

  #[test]
  fn enough_points_level_up() {
    let conn = seeded();
    let u = register(&conn, "ana", Role::User);
    award_points(&conn, u.id, 95, day(1)).unwrap();
    let p = award_points(&conn, u.id, 10, day(1)).unwrap();
    assert_eq!(p.level, 2);
    assert_eq!(p.points_to_next_level, 200);
    assert_eq!(get_points(&conn, u.id).unwrap(), p);
  }
}
