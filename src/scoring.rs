//! Assessment scoring: option resolution, reverse scoring, risk buckets and
//! interpretation text.
//!
//! Everything here is pure. The transactional pipeline that feeds it lives in
//! `assessments::take_assessment`.

use crate::domain::{AnswerOption, RiskLevel};
use crate::util::fill_template;

const GENERIC_INTERPRETATION: &str =
  "Your total score is {score}. Please consult with a mental health professional for proper evaluation.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
  /// `selected_option_index` does not address an option of the question.
  OptionOutOfRange { index: usize, available: usize },
}

/// Score credited for picking `index` among `options`.
///
/// Reverse-scored questions are inverted against the highest option score.
pub fn resolve_option_score(
  options: &[AnswerOption],
  index: usize,
  is_reverse_scored: bool,
) -> Result<u32, ScoreError> {
  let option = options.get(index).ok_or(ScoreError::OptionOutOfRange {
    index,
    available: options.len(),
  })?;
  if !is_reverse_scored {
    return Ok(option.score);
  }
  let max = options.iter().map(|o| o.score).max().unwrap_or(0);
  Ok(max.saturating_sub(option.score))
}

/// Total score as a percentage of the instrument maximum.
///
/// Multiplies before dividing so exact bucket boundaries (e.g. 20%) stay exact.
/// A zero maximum yields 0.
pub fn percentage(total_score: u32, max_score: u32) -> f64 {
  if max_score == 0 {
    return 0.0;
  }
  (f64::from(total_score) * 100.0) / f64::from(max_score)
}

/// Percentage rounded to one decimal, as shown to clients.
pub fn percentage_score(total_score: u32, max_score: u32) -> f64 {
  crate::util::round_to(percentage(total_score, max_score), 1)
}

/// Map a percentage onto the instrument's severity buckets.
pub fn risk_level_for(instrument: &str, percentage: f64) -> RiskLevel {
  match instrument {
    "PHQ9" => {
      if percentage <= 20.0 {
        RiskLevel::Minimal
      } else if percentage <= 40.0 {
        RiskLevel::Mild
      } else if percentage <= 60.0 {
        RiskLevel::Moderate
      } else if percentage <= 80.0 {
        RiskLevel::ModeratelySevere
      } else {
        RiskLevel::Severe
      }
    }
    // PCL-5 cut points are exclusive.
    "PCL5" => {
      if percentage < 50.0 {
        RiskLevel::Minimal
      } else if percentage < 65.0 {
        RiskLevel::Mild
      } else if percentage < 80.0 {
        RiskLevel::Moderate
      } else {
        RiskLevel::Severe
      }
    }
    // GAD7 uses the same quartiles as the generic table.
    _ => {
      if percentage <= 25.0 {
        RiskLevel::Minimal
      } else if percentage <= 50.0 {
        RiskLevel::Mild
      } else if percentage <= 75.0 {
        RiskLevel::Moderate
      } else {
        RiskLevel::Severe
      }
    }
  }
}

pub fn calculate_risk_level(instrument: &str, total_score: u32, max_score: u32) -> RiskLevel {
  risk_level_for(instrument, percentage(total_score, max_score))
}

fn static_interpretation(instrument: &str, level: RiskLevel) -> Option<&'static str> {
  use RiskLevel::*;
  let text = match (instrument, level) {
    ("PHQ9", Minimal) => "Your responses suggest minimal depression symptoms. This is a positive sign for your mental health.",
    ("PHQ9", Mild) => "Your responses suggest mild depression symptoms. Consider speaking with a mental health professional.",
    ("PHQ9", Moderate) => "Your responses suggest moderate depression symptoms. We recommend seeking professional support.",
    ("PHQ9", ModeratelySevere) => "Your responses suggest moderately severe depression symptoms. Professional help is strongly recommended.",
    ("PHQ9", Severe) => "Your responses suggest severe depression symptoms. Please seek immediate professional help.",

    ("GAD7", Minimal) => "Your responses suggest minimal anxiety symptoms.",
    ("GAD7", Mild) => "Your responses suggest mild anxiety symptoms. Consider stress management techniques.",
    ("GAD7", Moderate) => "Your responses suggest moderate anxiety symptoms. Professional support may be helpful.",
    ("GAD7", Severe) => "Your responses suggest severe anxiety symptoms. Please consider seeking professional help.",

    ("PCL5", Minimal) => "Your responses suggest minimal PTSD symptoms.",
    ("PCL5", Mild) => "Your responses suggest some trauma-related symptoms. Consider speaking with a professional.",
    ("PCL5", Moderate) => "Your responses suggest moderate PTSD symptoms. Professional evaluation is recommended.",
    ("PCL5", Severe) => "Your responses suggest significant PTSD symptoms. Please seek professional help.",

    _ => return None,
  };
  Some(text)
}

/// Interpretation text for a result; instruments or levels without a fixed
/// text get the generic message carrying the raw score.
pub fn interpretation(instrument: &str, level: RiskLevel, total_score: u32) -> String {
  match static_interpretation(instrument, level) {
    Some(text) => text.to_string(),
    None => fill_template(GENERIC_INTERPRETATION, &[("score", &total_score.to_string())]),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn opts(scores: &[u32]) -> Vec<AnswerOption> {
    scores
      .iter()
      .enumerate()
      .map(|(i, s)| AnswerOption { text: format!("option {i}"), score: *s })
      .collect()
  }

  #[test]
  fn forward_scored_option_takes_its_score() {
    assert_eq!(resolve_option_score(&opts(&[0, 1, 2, 3]), 2, false), Ok(2));
  }

  #[test]
  fn reverse_scored_option_is_inverted_against_max() {
    let o = opts(&[0, 1, 2, 3]);
    assert_eq!(resolve_option_score(&o, 0, true), Ok(3));
    assert_eq!(resolve_option_score(&o, 3, true), Ok(0));
    assert_eq!(resolve_option_score(&o, 1, true), Ok(2));
  }

  #[test]
  fn out_of_range_index_is_rejected() {
    assert_eq!(
      resolve_option_score(&opts(&[0, 1]), 2, false),
      Err(ScoreError::OptionOutOfRange { index: 2, available: 2 })
    );
    assert!(resolve_option_score(&[], 0, true).is_err());
  }

  #[test]
  fn option_without_score_counts_as_zero() {
    let o: Vec<AnswerOption> = serde_json::from_str(r#"[{"text":"a"},{"text":"b","score":4}]"#).unwrap();
    assert_eq!(resolve_option_score(&o, 0, false), Ok(0));
    assert_eq!(resolve_option_score(&o, 0, true), Ok(4));
  }

  #[test]
  fn phq9_boundaries_fall_in_lower_bucket() {
    assert_eq!(risk_level_for("PHQ9", 0.0), RiskLevel::Minimal);
    assert_eq!(risk_level_for("PHQ9", 20.0), RiskLevel::Minimal);
    assert_eq!(risk_level_for("PHQ9", 20.1), RiskLevel::Mild);
    assert_eq!(risk_level_for("PHQ9", 40.0), RiskLevel::Mild);
    assert_eq!(risk_level_for("PHQ9", 60.0), RiskLevel::Moderate);
    assert_eq!(risk_level_for("PHQ9", 80.0), RiskLevel::ModeratelySevere);
    assert_eq!(risk_level_for("PHQ9", 80.5), RiskLevel::Severe);
  }

  #[test]
  fn gad7_boundaries() {
    assert_eq!(risk_level_for("GAD7", 25.0), RiskLevel::Minimal);
    assert_eq!(risk_level_for("GAD7", 50.0), RiskLevel::Mild);
    assert_eq!(risk_level_for("GAD7", 75.0), RiskLevel::Moderate);
    assert_eq!(risk_level_for("GAD7", 75.1), RiskLevel::Severe);
  }

  #[test]
  fn pcl5_boundaries_are_exclusive() {
    assert_eq!(risk_level_for("PCL5", 49.9), RiskLevel::Minimal);
    assert_eq!(risk_level_for("PCL5", 50.0), RiskLevel::Mild);
    assert_eq!(risk_level_for("PCL5", 65.0), RiskLevel::Moderate);
    assert_eq!(risk_level_for("PCL5", 80.0), RiskLevel::Severe);
  }

  #[test]
  fn unknown_instrument_uses_generic_quartiles() {
    assert_eq!(risk_level_for("WHO5", 25.0), RiskLevel::Minimal);
    assert_eq!(risk_level_for("WHO5", 50.0), RiskLevel::Mild);
    assert_eq!(risk_level_for("WHO5", 51.0), RiskLevel::Moderate);
    assert_eq!(risk_level_for("WHO5", 100.0), RiskLevel::Severe);
  }

  #[test]
  fn exact_boundary_from_integer_scores() {
    // 2/10 and 4/10 are exactly 20% and 40%.
    assert_eq!(calculate_risk_level("PHQ9", 2, 10), RiskLevel::Minimal);
    assert_eq!(calculate_risk_level("PHQ9", 4, 10), RiskLevel::Mild);
    assert_eq!(calculate_risk_level("PHQ9", 6, 10), RiskLevel::Moderate);
  }

  #[test]
  fn phq9_score_ten_is_mild() {
    assert_eq!(percentage_score(10, 27), 37.0);
    let lvl = calculate_risk_level("PHQ9", 10, 27);
    assert_eq!(lvl, RiskLevel::Mild);
    assert_eq!(
      interpretation("PHQ9", lvl, 10),
      "Your responses suggest mild depression symptoms. Consider speaking with a mental health professional."
    );
  }

  #[test]
  fn zero_max_score_is_minimal() {
    assert_eq!(percentage(5, 0), 0.0);
    assert_eq!(calculate_risk_level("PHQ9", 5, 0), RiskLevel::Minimal);
  }

  #[test]
  fn missing_interpretation_falls_back_to_generic_text() {
    assert_eq!(
      interpretation("GAD7", RiskLevel::ModeratelySevere, 17),
      "Your total score is 17. Please consult with a mental health professional for proper evaluation."
    );
    assert!(interpretation("WHO5", RiskLevel::Mild, 3).starts_with("Your total score is 3."));
  }
}
