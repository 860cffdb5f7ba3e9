use serde::{Deserialize, Serialize};

/// Self-reported condition from the sheet's 1-5 check-in score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
  Excellent,
  Good,
  Fair,
  Poor,
}

impl Condition {
  /// Map the sheet's 1-5 score to a condition label.
  /// Anything outside 1-5 (missing, unparseable, out of range) is Good.
  pub fn from_score(score: i64) -> Self {
    match score {
      5 => Condition::Excellent,
      4 => Condition::Good,
      3 => Condition::Fair,
      2 | 1 => Condition::Poor,
      _ => Condition::Good,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Condition::Excellent => "Excellent",
      Condition::Good => "Good",
      Condition::Fair => "Fair",
      Condition::Poor => "Poor",
    }
  }
}

/// One attended training session for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLog {
  /// Athlete name, always non-empty for any retained record
  pub name: String,
  /// Submission date (YYYY-MM-DD), empty when the source field was absent
  pub timestamp: String,
  pub training_type: String,
  /// Self-reported intensity 1-10; 0 means no data
  pub intensity: i64,
  /// Average heart rate in BPM; 0 means no data
  pub heart_rate: i64,
  pub notes: String,
  pub condition: Condition,
}
