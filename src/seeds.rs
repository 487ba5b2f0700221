//! Built-in content: the three screening instruments, their recommendations,
//! default crisis hotlines and daily challenges.
//!
//! Seeding is idempotent. Rows are matched by natural key (instrument name,
//! recommendation title per bucket, hotline name, challenge title) and only
//! missing ones are inserted, so config banks can be merged on every start.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{info, warn};

use crate::config::{AppConfig, ChallengeCfg, HotlineCfg, RecommendationCfg};
use crate::domain::{AnswerOption, ChallengeType, HotlineType, RiskLevel};
use crate::error::DatabaseError;
use crate::util::json_list;

struct InstrumentSeed {
  name: &'static str,
  display_name: &'static str,
  description: &'static str,
  instructions: &'static str,
  options: &'static [(&'static str, u32)],
  questions: &'static [&'static str],
}

const FREQUENCY_OPTIONS: &[(&str, u32)] = &[
  ("Not at all", 0),
  ("Several days", 1),
  ("More than half the days", 2),
  ("Nearly every day", 3),
];

const INTENSITY_OPTIONS: &[(&str, u32)] = &[
  ("Not at all", 0),
  ("A little bit", 1),
  ("Moderately", 2),
  ("Quite a bit", 3),
  ("Extremely", 4),
];

const INSTRUMENTS: &[InstrumentSeed] = &[
  InstrumentSeed {
    name: "PHQ9",
    display_name: "PHQ-9 Depression Screening",
    description: "Patient Health Questionnaire for depression severity.",
    instructions: "Over the last 2 weeks, how often have you been bothered by any of the following problems?",
    options: FREQUENCY_OPTIONS,
    questions: &[
      "Little interest or pleasure in doing things",
      "Feeling down, depressed, or hopeless",
      "Trouble falling or staying asleep, or sleeping too much",
      "Feeling tired or having little energy",
      "Poor appetite or overeating",
      "Feeling bad about yourself, or that you are a failure or have let yourself or your family down",
      "Trouble concentrating on things, such as reading or watching television",
      "Moving or speaking so slowly that other people could have noticed, or being so fidgety or restless that you have been moving around a lot more than usual",
      "Thoughts that you would be better off dead, or of hurting yourself in some way",
    ],
  },
  InstrumentSeed {
    name: "GAD7",
    display_name: "GAD-7 Anxiety Screening",
    description: "Generalized Anxiety Disorder scale.",
    instructions: "Over the last 2 weeks, how often have you been bothered by the following problems?",
    options: FREQUENCY_OPTIONS,
    questions: &[
      "Feeling nervous, anxious, or on edge",
      "Not being able to stop or control worrying",
      "Worrying too much about different things",
      "Trouble relaxing",
      "Being so restless that it is hard to sit still",
      "Becoming easily annoyed or irritable",
      "Feeling afraid, as if something awful might happen",
    ],
  },
  InstrumentSeed {
    name: "PCL5",
    display_name: "PCL-5 PTSD Checklist",
    description: "PTSD Checklist for DSM-5.",
    instructions: "In the past month, how much were you bothered by the following problems?",
    options: INTENSITY_OPTIONS,
    questions: &[
      "Repeated, disturbing, and unwanted memories of the stressful experience",
      "Repeated, disturbing dreams of the stressful experience",
      "Suddenly feeling or acting as if the stressful experience were actually happening again",
      "Feeling very upset when something reminded you of the stressful experience",
      "Having strong physical reactions when something reminded you of the stressful experience",
      "Avoiding memories, thoughts, or feelings related to the stressful experience",
      "Avoiding external reminders of the stressful experience",
      "Trouble remembering important parts of the stressful experience",
      "Having strong negative beliefs about yourself, other people, or the world",
      "Blaming yourself or someone else for the stressful experience or what happened after it",
      "Having strong negative feelings such as fear, horror, anger, guilt, or shame",
      "Loss of interest in activities that you used to enjoy",
      "Feeling distant or cut off from other people",
      "Trouble experiencing positive feelings",
      "Irritable behavior, angry outbursts, or acting aggressively",
      "Taking too many risks or doing things that could cause you harm",
      "Being superalert or watchful or on guard",
      "Feeling jumpy or easily startled",
      "Having difficulty concentrating",
      "Trouble falling or staying asleep",
    ],
  },
];

fn rec(
  assessment: &str,
  risk_level: RiskLevel,
  priority: u32,
  title: &str,
  description: &str,
  action_items: &[&str],
) -> RecommendationCfg {
  RecommendationCfg {
    assessment: assessment.into(),
    risk_level,
    title: title.into(),
    description: description.into(),
    action_items: action_items.iter().map(|s| s.to_string()).collect(),
    resources: Vec::new(),
    priority,
  }
}

pub fn builtin_recommendations() -> Vec<RecommendationCfg> {
  use RiskLevel::*;
  let crisis_resources = vec![
    serde_json::json!({"name": "988 Suicide & Crisis Lifeline", "phone": "988"}),
    serde_json::json!({"name": "Crisis Text Line", "text": "HOME to 741741"}),
  ];
  let mut recs = vec![
    rec("PHQ9", Minimal, 1, "Keep up healthy routines", "Your mood looks stable. Regular sleep, movement and social contact help keep it that way.", &["Log your mood daily", "Stay physically active"]),
    rec("PHQ9", Mild, 1, "Build small daily wins", "Mild low mood often responds well to structure and self-care.", &["Plan one enjoyable activity each day", "Keep a consistent sleep schedule"]),
    rec("PHQ9", Mild, 2, "Talk to someone you trust", "Sharing how you feel with a friend, family member or guide can lighten the load.", &["Reach out to one person this week"]),
    rec("PHQ9", Moderate, 1, "Consider professional support", "A counselor or therapist can help you work through persistent low mood.", &["Book a session with a counselor", "Share these results with your guide"]),
    rec("PHQ9", ModeratelySevere, 1, "Seek professional help soon", "Your symptoms are significant. Please contact a mental health professional in the coming days.", &["Contact a mental health professional", "Tell someone close to you how you feel"]),
    rec("PHQ9", Severe, 1, "Get help now", "Please reach out for immediate support. You do not have to handle this alone.", &["Call or text 988 if you are in crisis", "Contact a trusted adult or professional today"]),
    rec("PHQ9", Severe, 2, "Create a safety plan", "Write down warning signs, coping steps and people to contact when things get hard.", &["List three people you can call", "Remove means of self-harm from your space"]),
    rec("GAD7", Minimal, 1, "Maintain your balance", "Your anxiety levels look manageable. Keep using what works for you.", &["Practice a short breathing exercise daily"]),
    rec("GAD7", Mild, 1, "Try stress management techniques", "Breathing exercises, mindfulness and regular breaks can ease mild anxiety.", &["Do the 4-7-8 breathing exercise", "Limit caffeine"]),
    rec("GAD7", Moderate, 1, "Consider talking to a professional", "Ongoing worry that interferes with daily life is worth discussing with a counselor.", &["Schedule a check-in with your guide", "Track anxiety triggers in your mood log"]),
    rec("GAD7", Severe, 1, "Seek professional help", "Severe anxiety is treatable. Please reach out to a mental health professional.", &["Contact a mental health professional", "Use grounding techniques during panic"]),
    rec("PCL5", Minimal, 1, "Continue self-care", "You report few trauma-related symptoms. Keep looking after yourself.", &["Maintain supportive routines"]),
    rec("PCL5", Mild, 1, "Learn about trauma responses", "Understanding common reactions to stressful events can make them feel less overwhelming.", &["Read about trauma and stress responses", "Practice grounding exercises"]),
    rec("PCL5", Moderate, 1, "Get a professional evaluation", "A trauma-informed professional can assess your symptoms and discuss options.", &["Ask your guide for a referral"]),
    rec("PCL5", Severe, 1, "Seek trauma-focused care", "Your symptoms suggest significant distress. Trauma-focused therapy can help.", &["Contact a trauma-informed therapist", "Reach out to a crisis line if you feel unsafe"]),
  ];
  for r in recs.iter_mut().filter(|r| matches!(r.risk_level, Severe | ModeratelySevere)) {
    r.resources = crisis_resources.clone();
  }
  recs
}

fn hotline(
  name: &str,
  description: &str,
  hotline_type: HotlineType,
  phone_number: &str,
  text_number: &str,
  website: &str,
  priority_order: u32,
) -> HotlineCfg {
  HotlineCfg {
    name: name.into(),
    description: description.into(),
    hotline_type,
    phone_number: phone_number.into(),
    text_number: text_number.into(),
    website: website.into(),
    is_24_7: true,
    languages: vec!["English".into(), "Spanish".into()],
    country: None,
    priority_order,
  }
}

pub fn builtin_hotlines() -> Vec<HotlineCfg> {
  vec![
    hotline(
      "988 Suicide & Crisis Lifeline",
      "Free, confidential support for people in distress.",
      HotlineType::SuicidePrevention,
      "988",
      "988",
      "https://988lifeline.org",
      1,
    ),
    hotline(
      "Crisis Text Line",
      "Text HOME to reach a trained crisis counselor.",
      HotlineType::CrisisText,
      "",
      "741741",
      "https://www.crisistextline.org",
      2,
    ),
    hotline(
      "The Trevor Project",
      "Crisis support for LGBTQ+ young people.",
      HotlineType::Lgbtq,
      "1-866-488-7386",
      "678678",
      "https://www.thetrevorproject.org",
      3,
    ),
    hotline(
      "Emergency Services",
      "Call for immediate danger to life.",
      HotlineType::Emergency,
      "911",
      "",
      "",
      0,
    ),
  ]
}

fn challenge(
  title: &str,
  description: &str,
  challenge_type: ChallengeType,
  instructions: &str,
  points_reward: u32,
  duration_minutes: Option<u32>,
) -> ChallengeCfg {
  ChallengeCfg {
    title: title.into(),
    description: description.into(),
    challenge_type,
    instructions: instructions.into(),
    points_reward,
    target_value: None,
    duration_minutes,
  }
}

pub fn builtin_challenges() -> Vec<ChallengeCfg> {
  vec![
    challenge("Daily mood check-in", "Log how you feel today.", ChallengeType::MoodCheckin, "Open the mood tracker and record your mood, energy, anxiety and sleep.", 5, None),
    challenge("Box breathing", "Calm your nervous system with slow breathing.", ChallengeType::Breathing, "Breathe in for 4, hold for 4, out for 4, hold for 4. Repeat.", 10, Some(5)),
    challenge("Three good things", "Notice what went well.", ChallengeType::Gratitude, "Write down three things you are grateful for today.", 10, None),
    challenge("Take a walk", "Move your body for a little while.", ChallengeType::Physical, "Go for a walk outside or around your home.", 15, Some(15)),
    challenge("Reach out", "Connect with someone you care about.", ChallengeType::Social, "Send a message or call a friend or family member.", 10, None),
    challenge("Mindful minute", "Pause and pay attention to the present.", ChallengeType::Mindfulness, "Sit quietly and notice five things you can see, hear or feel.", 5, Some(1)),
  ]
}

/// Counts of rows inserted by one `apply_seeds` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
  pub instruments: usize,
  pub recommendations: usize,
  pub hotlines: usize,
  pub challenges: usize,
}

/// Insert built-in content plus the config banks, skipping rows that already exist.
pub fn apply_seeds(conn: &mut Connection, cfg: &AppConfig) -> Result<SeedSummary, DatabaseError> {
  let tx = conn.transaction()?;
  let mut summary = SeedSummary::default();

  let mut recommendations = Vec::new();
  if cfg.seed_instruments {
    for inst in INSTRUMENTS {
      if seed_instrument(&tx, inst)? {
        summary.instruments += 1;
      }
    }
    recommendations = builtin_recommendations();
  }
  recommendations.extend(cfg.recommendations.iter().cloned());
  for r in &recommendations {
    if seed_recommendation(&tx, r)? {
      summary.recommendations += 1;
    }
  }
  for h in builtin_hotlines().iter().chain(&cfg.hotlines) {
    if seed_hotline(&tx, h)? {
      summary.hotlines += 1;
    }
  }
  for c in builtin_challenges().iter().chain(&cfg.challenges) {
    if seed_challenge(&tx, c)? {
      summary.challenges += 1;
    }
  }

  tx.commit()?;
  if summary != SeedSummary::default() {
    info!(target: "haven_backend", ?summary, "Seed content inserted");
  }
  Ok(summary)
}

fn seed_instrument(tx: &Transaction<'_>, inst: &InstrumentSeed) -> Result<bool, DatabaseError> {
  let exists: bool = tx.query_row(
    "SELECT EXISTS(SELECT 1 FROM assessments_type WHERE name = ?1)",
    [inst.name],
    |row| row.get(0),
  )?;
  if exists {
    return Ok(false);
  }

  let options: Vec<AnswerOption> = inst
    .options
    .iter()
    .map(|(text, score)| AnswerOption { text: (*text).into(), score: *score })
    .collect();
  let per_question_max = inst.options.iter().map(|(_, s)| *s).max().unwrap_or(0);
  let total_questions = inst.questions.len() as u32;

  tx.execute(
    "INSERT INTO assessments_type (name, display_name, description, instructions, total_questions, max_score, is_active, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
    params![
      inst.name,
      inst.display_name,
      inst.description,
      inst.instructions,
      total_questions,
      total_questions * per_question_max,
      Utc::now()
    ],
  )?;
  let type_id = tx.last_insert_rowid();
  let options_json = json_list(&options);
  let mut stmt = tx.prepare(
    "INSERT INTO assessments_question (assessment_type_id, question_number, question_text, options, is_reverse_scored)
     VALUES (?1, ?2, ?3, ?4, 0)",
  )?;
  for (i, text) in inst.questions.iter().enumerate() {
    stmt.execute(params![type_id, i as u32 + 1, text, options_json])?;
  }
  Ok(true)
}

fn seed_recommendation(tx: &Transaction<'_>, r: &RecommendationCfg) -> Result<bool, DatabaseError> {
  let type_id: Option<i64> = tx
    .query_row("SELECT id FROM assessments_type WHERE name = ?1", [&r.assessment], |row| row.get(0))
    .optional()?;
  let Some(type_id) = type_id else {
    warn!(target: "haven_backend", assessment = %r.assessment, title = %r.title, "Skipping recommendation for unknown instrument");
    return Ok(false);
  };
  let exists: bool = tx.query_row(
    "SELECT EXISTS(SELECT 1 FROM assessments_recommendation WHERE assessment_type_id = ?1 AND risk_level = ?2 AND title = ?3)",
    params![type_id, r.risk_level, r.title],
    |row| row.get(0),
  )?;
  if exists {
    return Ok(false);
  }
  tx.execute(
    "INSERT INTO assessments_recommendation (assessment_type_id, risk_level, title, description, action_items, resources, priority)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      type_id,
      r.risk_level,
      r.title,
      r.description,
      json_list(&r.action_items),
      json_list(&r.resources),
      r.priority
    ],
  )?;
  Ok(true)
}

fn seed_hotline(tx: &Transaction<'_>, h: &HotlineCfg) -> Result<bool, DatabaseError> {
  let exists: bool = tx.query_row(
    "SELECT EXISTS(SELECT 1 FROM crisis_hotline WHERE name = ?1)",
    [&h.name],
    |row| row.get(0),
  )?;
  if exists {
    return Ok(false);
  }
  tx.execute(
    "INSERT INTO crisis_hotline
       (name, description, hotline_type, phone_number, text_number, website, is_24_7, languages, country, priority_order)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, COALESCE(?9, 'United States'), ?10)",
    params![
      h.name,
      h.description,
      h.hotline_type,
      h.phone_number,
      h.text_number,
      h.website,
      h.is_24_7,
      json_list(&h.languages),
      h.country,
      h.priority_order
    ],
  )?;
  Ok(true)
}

fn seed_challenge(tx: &Transaction<'_>, c: &ChallengeCfg) -> Result<bool, DatabaseError> {
  let exists: bool = tx.query_row(
    "SELECT EXISTS(SELECT 1 FROM wellness_daily_challenge WHERE title = ?1)",
    [&c.title],
    |row| row.get(0),
  )?;
  if exists {
    return Ok(false);
  }
  tx.execute(
    "INSERT INTO wellness_daily_challenge
       (title, description, challenge_type, instructions, points_reward, target_value, duration_minutes, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      c.title,
      c.description,
      c.challenge_type,
      c.instructions,
      c.points_reward,
      c.target_value,
      c.duration_minutes,
      Utc::now()
    ],
  )?;
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::parse_config;
  use crate::db::open_memory_database;

  fn instrument_shape(conn: &Connection, name: &str) -> (u32, u32, i64) {
    conn
      .query_row(
        "SELECT t.total_questions, t.max_score, (SELECT COUNT(*) FROM assessments_question q WHERE q.assessment_type_id = t.id)
         FROM assessments_type t WHERE t.name = ?1",
        [name],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .unwrap()
  }

  #[test]
  fn instruments_have_expected_shape() {
    let mut conn = open_memory_database().unwrap();
    apply_seeds(&mut conn, &AppConfig::default()).unwrap();
    assert_eq!(instrument_shape(&conn, "PHQ9"), (9, 27, 9));
    assert_eq!(instrument_shape(&conn, "GAD7"), (7, 21, 7));
    assert_eq!(instrument_shape(&conn, "PCL5"), (20, 80, 20));
  }

  #[test]
  fn every_produced_bucket_has_a_recommendation() {
    let recs = builtin_recommendations();
    for (name, levels) in [
      ("PHQ9", &[RiskLevel::Minimal, RiskLevel::Mild, RiskLevel::Moderate, RiskLevel::ModeratelySevere, RiskLevel::Severe][..]),
      ("GAD7", &[RiskLevel::Minimal, RiskLevel::Mild, RiskLevel::Moderate, RiskLevel::Severe][..]),
      ("PCL5", &[RiskLevel::Minimal, RiskLevel::Mild, RiskLevel::Moderate, RiskLevel::Severe][..]),
    ] {
      for level in levels {
        assert!(recs.iter().any(|r| r.assessment == name && r.risk_level == *level), "{name}/{level}");
      }
    }
  }

  #[test]
  fn seeding_twice_inserts_nothing_new() {
    let mut conn = open_memory_database().unwrap();
    let first = apply_seeds(&mut conn, &AppConfig::default()).unwrap();
    assert_eq!(first.instruments, 3);
    assert_eq!(first.hotlines, builtin_hotlines().len());
    let second = apply_seeds(&mut conn, &AppConfig::default()).unwrap();
    assert_eq!(second, SeedSummary::default());
  }

  #[test]
  fn config_banks_are_merged() {
    let cfg = parse_config(
      r#"
        [[hotlines]]
        name = "Local Youth Line"
        hotline_type = "teen_specific"
        phone_number = "555-0100"
        country = "Canada"

        [[challenges]]
        title = "Read a chapter"
        challenge_type = "learning"

        [[recommendations]]
        assessment = "GAD7"
        risk_level = "mild"
        title = "Try a worry journal"
        description = "Write worries down for ten minutes, then close the notebook."
        priority = 3

        [[recommendations]]
        assessment = "UNKNOWN"
        risk_level = "mild"
        title = "ignored"
        description = "no such instrument"
      "#,
    )
    .unwrap();
    let mut conn = open_memory_database().unwrap();
    let summary = apply_seeds(&mut conn, &cfg).unwrap();
    assert_eq!(summary.hotlines, builtin_hotlines().len() + 1);
    assert_eq!(summary.challenges, builtin_challenges().len() + 1);
    assert_eq!(summary.recommendations, builtin_recommendations().len() + 1);

    let country: String = conn
      .query_row("SELECT country FROM crisis_hotline WHERE name = 'Local Youth Line'", [], |r| r.get(0))
      .unwrap();
    assert_eq!(country, "Canada");
    let points: u32 = conn
      .query_row("SELECT points_reward FROM wellness_daily_challenge WHERE title = 'Read a chapter'", [], |r| r.get(0))
      .unwrap();
    assert_eq!(points, 5);
  }

  #[test]
  fn instruments_can_be_disabled() {
    let mut conn = open_memory_database().unwrap();
    let cfg = AppConfig { seed_instruments: false, ..AppConfig::default() };
    let summary = apply_seeds(&mut conn, &cfg).unwrap();
    assert_eq!(summary.instruments, 0);
    assert_eq!(summary.recommendations, 0);
    assert!(summary.hotlines > 0);
  }
}
