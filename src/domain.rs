//! Domain models: roles, risk levels, instruments, wellness and crisis records.
//!
//! Enums are stored as their snake_case string form in SQLite and on the wire.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;

/// Enum with a fixed string form shared by serde, SQLite and `FromStr`.
macro_rules! str_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum $name {
      $(#[serde(rename = $s)] $variant),+
    }

    impl $name {
      pub fn as_str(&self) -> &'static str {
        match self {
          $(Self::$variant => $s),+
        }
      }
    }

    impl std::str::FromStr for $name {
      type Err = DatabaseError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($s => Ok(Self::$variant)),+,
          _ => Err(DatabaseError::InvalidEnum {
            field: stringify!($name).into(),
            value: s.into(),
          }),
        }
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl ToSql for $name {
      fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
      }
    }

    impl FromSql for $name {
      fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
          .as_str()?
          .parse()
          .map_err(|e: DatabaseError| FromSqlError::Other(Box::new(e)))
      }
    }
  };
}

str_enum!(Role {
  User => "user",
  Guide => "guide",
  Admin => "admin",
});

str_enum!(
  /// Categorical severity bucket derived from a normalized assessment score.
  RiskLevel {
    Minimal => "minimal",
    Mild => "mild",
    Moderate => "moderate",
    ModeratelySevere => "moderately_severe",
    Severe => "severe",
  }
);

str_enum!(RequestType {
  NewAssessment => "new_assessment",
  ModifyAssessment => "modify_assessment",
  AddQuestions => "add_questions",
  ModifyScoring => "modify_scoring",
});

str_enum!(RequestStatus {
  Pending => "pending",
  Approved => "approved",
  Rejected => "rejected",
  InProgress => "in_progress",
  Completed => "completed",
});

str_enum!(AssignmentPriority {
  Low => "low",
  Medium => "medium",
  High => "high",
});

str_enum!(ChallengeType {
  MoodCheckin => "mood_checkin",
  Breathing => "breathing",
  Gratitude => "gratitude",
  Physical => "physical",
  Social => "social",
  Learning => "learning",
  Mindfulness => "mindfulness",
});

str_enum!(HotlineType {
  SuicidePrevention => "suicide_prevention",
  CrisisText => "crisis_text",
  DomesticViolence => "domestic_violence",
  SubstanceAbuse => "substance_abuse",
  Lgbtq => "lgbtq",
  TeenSpecific => "teen_specific",
  GeneralMentalHealth => "general_mental_health",
  Emergency => "emergency",
});

str_enum!(AlertType {
  SelfReported => "self_reported",
  SentimentDetected => "sentiment_detected",
  AssessmentTriggered => "assessment_triggered",
  KeywordDetected => "keyword_detected",
  BehaviorPattern => "behavior_pattern",
});

str_enum!(SeverityLevel {
  Low => "low",
  Moderate => "moderate",
  High => "high",
  Imminent => "imminent",
});

str_enum!(AlertStatus {
  Active => "active",
  Acknowledged => "acknowledged",
  Resolved => "resolved",
  FalsePositive => "false_positive",
});

str_enum!(ContactType {
  Phone => "phone",
  Email => "email",
  InPerson => "in_person",
  Video => "video",
});

str_enum!(ContactOutcome {
  Positive => "positive",
  Neutral => "neutral",
  Concerning => "concerning",
});

impl Default for AssignmentPriority {
  fn default() -> Self { AssignmentPriority::Medium }
}

impl Role {
  pub fn is_staff_role(&self) -> bool {
    matches!(self, Role::Guide | Role::Admin)
  }
}

//
// Accounts
//

#[derive(Clone, Debug, Serialize)]
pub struct User {
  pub id: i64,
  pub email: String,
  pub username: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  pub age: Option<u32>,
  pub onboarding_completed: bool,
  pub is_active: bool,
  pub date_joined: DateTime<Utc>,
}

impl User {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name).trim().to_string()
  }
}

//
// Assessments
//

/// One selectable answer. A missing score counts as zero.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnswerOption {
  #[serde(default)] pub text: String,
  #[serde(default)] pub score: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct AssessmentType {
  pub id: i64,
  pub name: String,
  pub display_name: String,
  pub description: String,
  pub instructions: String,
  pub total_questions: u32,
  pub max_score: u32,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AssessmentQuestion {
  pub id: i64,
  #[serde(skip)]
  pub assessment_type_id: i64,
  pub question_number: u32,
  pub question_text: String,
  pub options: Vec<AnswerOption>,
  pub is_reverse_scored: bool,
}

/// Copy of a recommendation taken when an assessment is submitted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecommendationSnapshot {
  pub title: String,
  pub description: String,
  #[serde(default)] pub action_items: Vec<String>,
  #[serde(default)] pub resources: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AssessmentRecommendation {
  pub id: i64,
  #[serde(rename = "assessment_type")]
  pub assessment_type_id: i64,
  pub risk_level: RiskLevel,
  pub title: String,
  pub description: String,
  pub action_items: Vec<String>,
  pub resources: Vec<serde_json::Value>,
  pub priority: u32,
}

impl AssessmentRecommendation {
  pub fn snapshot(&self) -> RecommendationSnapshot {
    RecommendationSnapshot {
      title: self.title.clone(),
      description: self.description.clone(),
      action_items: self.action_items.clone(),
      resources: self.resources.clone(),
    }
  }
}

#[derive(Clone, Debug)]
pub struct AssessmentRequest {
  pub id: i64,
  pub requester_id: i64,
  pub request_type: RequestType,
  pub title: String,
  pub description: String,
  pub justification: String,
  pub target_assessment_id: Option<i64>,
  pub proposed_questions: Vec<serde_json::Value>,
  pub expected_outcomes: String,
  pub status: RequestStatus,
  pub admin_notes: String,
  pub reviewed_by: Option<i64>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct ClientAssessmentAssignment {
  pub id: i64,
  pub guide_id: i64,
  pub client_id: i64,
  pub assessment_type_id: i64,
  pub assigned_date: DateTime<Utc>,
  pub due_date: Option<DateTime<Utc>>,
  pub priority: AssignmentPriority,
  pub notes: String,
  pub is_completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub reminder_sent: bool,
}

//
// Wellness
//

#[derive(Clone, Debug, Serialize)]
pub struct MoodEntry {
  pub id: i64,
  #[serde(skip)]
  pub user_id: i64,
  pub mood_rating: u8,
  pub energy_level: u8,
  pub anxiety_level: u8,
  pub sleep_quality: u8,
  pub notes: String,
  pub activities: Vec<String>,
  pub triggers: Vec<String>,
  pub date: NaiveDate,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DailyChallenge {
  pub id: i64,
  pub title: String,
  pub description: String,
  pub challenge_type: ChallengeType,
  pub instructions: String,
  pub points_reward: u32,
  pub target_value: Option<u32>,
  pub duration_minutes: Option<u32>,
  pub is_active: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserChallengeCompletion {
  pub id: i64,
  #[serde(rename = "challenge")]
  pub challenge_id: i64,
  pub challenge_title: String,
  pub challenge_type: ChallengeType,
  pub completion_date: NaiveDate,
  pub completion_value: Option<u32>,
  pub notes: String,
  pub points_earned: u32,
  pub completed_at: DateTime<Utc>,
}

/// Points, streak and level bookkeeping for one user.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct UserPoints {
  pub total_points: u32,
  pub current_streak: u32,
  pub longest_streak: u32,
  pub last_activity_date: Option<NaiveDate>,
  pub level: u32,
  pub points_to_next_level: u32,
}

impl Default for UserPoints {
  fn default() -> Self {
    Self {
      total_points: 0,
      current_streak: 0,
      longest_streak: 0,
      last_activity_date: None,
      level: 1,
      points_to_next_level: 100,
    }
  }
}

impl UserPoints {
  /// Credit points for an activity on `today`, extending or restarting the streak
  /// and levelling up as many times as the new total allows.
  pub fn add_points(&mut self, points: u32, today: NaiveDate) {
    self.total_points += points;

    let yesterday = today.pred_opt();
    if self.last_activity_date.is_some() && self.last_activity_date == yesterday {
      self.current_streak += 1;
    } else if self.last_activity_date != Some(today) {
      self.current_streak = 1;
    }
    if self.current_streak > self.longest_streak {
      self.longest_streak = self.current_streak;
    }
    self.last_activity_date = Some(today);

    while self.total_points >= self.points_to_next_level {
      self.level += 1;
      self.points_to_next_level = self.level * 100;
    }
  }
}

//
// Crisis
//

#[derive(Clone, Debug, Serialize)]
pub struct CrisisHotline {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub hotline_type: HotlineType,
  pub phone_number: String,
  pub text_number: String,
  pub website: String,
  pub is_24_7: bool,
  pub languages: Vec<String>,
  pub country: String,
  pub is_active: bool,
  pub priority_order: u32,
}

#[derive(Clone, Debug)]
pub struct CrisisAlert {
  pub id: i64,
  pub user_id: i64,
  pub alert_type: AlertType,
  pub severity_level: SeverityLevel,
  pub trigger_content: String,
  pub context_data: serde_json::Value,
  pub status: AlertStatus,
  pub responder_id: Option<i64>,
  pub response_notes: String,
  pub follow_up_required: bool,
  pub follow_up_completed: bool,
  pub follow_up_date: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub acknowledged_at: Option<DateTime<Utc>>,
  pub resolved_at: Option<DateTime<Utc>>,
}

/// Personal safety plan. List sections hold free-form JSON items (strings or contact objects).
#[derive(Clone, Debug, Serialize)]
pub struct SafetyPlan {
  pub id: i64,
  pub warning_signs: Vec<serde_json::Value>,
  pub triggers: Vec<serde_json::Value>,
  pub coping_strategies: Vec<serde_json::Value>,
  pub distractions: Vec<serde_json::Value>,
  pub support_contacts: Vec<serde_json::Value>,
  pub professional_contacts: Vec<serde_json::Value>,
  pub environment_safety: Vec<serde_json::Value>,
  pub emergency_contacts: Vec<serde_json::Value>,
  pub emergency_plan: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub last_reviewed: Option<DateTime<Utc>>,
}

//
// Guide caseload
//

#[derive(Clone, Debug)]
pub struct ClientAssignment {
  pub id: i64,
  pub client_id: i64,
  pub assigned_date: DateTime<Utc>,
  pub is_active: bool,
  pub notes: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClientContact {
  pub id: i64,
  pub client_id: i64,
  pub contact_type: ContactType,
  pub notes: String,
  pub outcome: ContactOutcome,
  pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FollowUp {
  pub id: i64,
  pub client_id: i64,
  pub client_name: String,
  pub scheduled_date: DateTime<Utc>,
  pub notes: String,
  pub completed: bool,
  pub created_at: DateTime<Utc>,
}
