//! Loading service configuration (storage + optional seed banks) from TOML.
//!
//! See `AppConfig` for the expected schema. Example:
//!
//! ```toml
//! database_path = "/var/lib/haven/haven.sqlite3"
//! seed_instruments = true
//!
//! [[recommendations]]
//! assessment = "GAD7"
//! risk_level = "mild"
//! title = "Box breathing"
//! description = "Four counts in, hold, out, hold."
//! action_items = ["Practice twice a day"]
//! priority = 3
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{ChallengeType, HotlineType, RiskLevel};

pub const DEFAULT_DATABASE_PATH: &str = "haven.sqlite3";

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
  #[serde(default = "default_database_path")]
  pub database_path: String,
  #[serde(default = "default_true")]
  pub seed_instruments: bool,
  #[serde(default)]
  pub recommendations: Vec<RecommendationCfg>,
  #[serde(default)]
  pub hotlines: Vec<HotlineCfg>,
  #[serde(default)]
  pub challenges: Vec<ChallengeCfg>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_path: default_database_path(),
      seed_instruments: true,
      recommendations: Vec::new(),
      hotlines: Vec::new(),
      challenges: Vec::new(),
    }
  }
}

fn default_database_path() -> String { DEFAULT_DATABASE_PATH.into() }
fn default_true() -> bool { true }
fn default_priority() -> u32 { 1 }
fn default_points() -> u32 { 5 }

/// Recommendation entry keyed by instrument name and risk level.
#[derive(Clone, Debug, Deserialize)]
pub struct RecommendationCfg {
  pub assessment: String,
  pub risk_level: RiskLevel,
  pub title: String,
  pub description: String,
  #[serde(default)] pub action_items: Vec<String>,
  #[serde(default)] pub resources: Vec<serde_json::Value>,
  #[serde(default = "default_priority")] pub priority: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HotlineCfg {
  pub name: String,
  #[serde(default)] pub description: String,
  pub hotline_type: HotlineType,
  pub phone_number: String,
  #[serde(default)] pub text_number: String,
  #[serde(default)] pub website: String,
  #[serde(default = "default_true")] pub is_24_7: bool,
  #[serde(default)] pub languages: Vec<String>,
  #[serde(default)] pub country: Option<String>,
  #[serde(default)] pub priority_order: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCfg {
  pub title: String,
  #[serde(default)] pub description: String,
  pub challenge_type: ChallengeType,
  #[serde(default)] pub instructions: String,
  #[serde(default = "default_points")] pub points_reward: u32,
  #[serde(default)] pub target_value: Option<u32>,
  #[serde(default)] pub duration_minutes: Option<u32>,
}

/// Parse configuration from TOML text.
pub fn parse_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Load `AppConfig` from HAVEN_CONFIG_PATH, then apply the DATABASE_PATH override.
/// Any IO or parse error is logged and defaults are used instead.
pub fn load_config_from_env() -> AppConfig {
  let mut cfg = match std::env::var("HAVEN_CONFIG_PATH").ok() {
    Some(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match parse_config(&s) {
        Ok(cfg) => {
          info!(target: "haven_backend", %path, "Loaded config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "haven_backend", %path, error = %e, "Failed to parse TOML config");
          AppConfig::default()
        }
      },
      Err(e) => {
        error!(target: "haven_backend", %path, error = %e, "Failed to read TOML config file");
        AppConfig::default()
      }
    },
    None => AppConfig::default(),
  };

  if let Ok(path) = std::env::var("DATABASE_PATH") {
    if !path.is_empty() {
      cfg.database_path = path;
    }
  }
  cfg
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_gives_defaults() {
    let cfg = parse_config("").unwrap();
    assert_eq!(cfg.database_path, DEFAULT_DATABASE_PATH);
    assert!(cfg.seed_instruments);
    assert!(cfg.recommendations.is_empty());
  }

  #[test]
  fn banks_parse_with_defaults() {
    let cfg = parse_config(
      r#"
      database_path = ":memory:"
      seed_instruments = false

      [[recommendations]]
      assessment = "GAD7"
      risk_level = "mild"
      title = "Box breathing"
      description = "Four counts in, hold, out, hold."

      [[hotlines]]
      name = "Local line"
      hotline_type = "teen_specific"
      phone_number = "555-0100"

      [[challenges]]
      title = "Stretch"
      challenge_type = "physical"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.database_path, ":memory:");
    assert!(!cfg.seed_instruments);
    assert_eq!(cfg.recommendations[0].risk_level, RiskLevel::Mild);
    assert_eq!(cfg.recommendations[0].priority, 1);
    assert!(cfg.hotlines[0].is_24_7);
    assert_eq!(cfg.challenges[0].points_reward, 5);
  }

  #[test]
  fn unknown_risk_level_is_a_parse_error() {
    let res = parse_config(
      r#"
      [[recommendations]]
      assessment = "GAD7"
      risk_level = "catastrophic"
      title = "t"
      description = "d"
      "#,
    );
    assert!(res.is_err());
  }
}
