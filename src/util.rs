//! Small utility helpers used across modules.

/// Substitute `{key}` placeholders in interpretation templates.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  pairs.iter().fold(tpl.to_string(), |acc, (k, v)| acc.replace(&format!("{{{k}}}"), v))
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value * factor).round() / factor
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with free-text payloads such as crisis trigger content.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} chars total)", head, s.chars().count())
  }
}

/// JSON text for a list column; a failed encode stores an empty list.
pub fn json_list<T: serde::Serialize>(items: &[T]) -> String {
  serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}
