//! Deterministic aggregate statistics and athlete lookup
//!
//! Computed locally from the record set; the LLM interprets these numbers
//! rather than doing the math itself.

use crate::models::TrainingLog;
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Aggregate Stats
/// ---------------------------------------------------------------------------

/// Summary statistics for one athlete's filtered log set.
///
/// Zero heart-rate or intensity entries mean "no data" and are excluded
/// from the averages; an average with no positive samples is `None`,
/// which is distinct from an average of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteStats {
  pub count: usize,
  pub avg_heart_rate: Option<i64>,
  pub avg_intensity: Option<f64>,
}

impl AthleteStats {
  /// Compute stats for one athlete's records; `None` on an empty set so
  /// "no data" is distinguishable from a zero average.
  pub fn compute(logs: &[TrainingLog]) -> Option<Self> {
    if logs.is_empty() {
      return None;
    }

    let heart_rates: Vec<i64> = logs
      .iter()
      .map(|l| l.heart_rate)
      .filter(|&hr| hr > 0)
      .collect();

    let avg_heart_rate = if heart_rates.is_empty() {
      None
    } else {
      let mean = heart_rates.iter().sum::<i64>() as f64 / heart_rates.len() as f64;
      Some(mean.round() as i64)
    };

    let intensities: Vec<i64> = logs
      .iter()
      .map(|l| l.intensity)
      .filter(|&i| i > 0)
      .collect();

    let avg_intensity = if intensities.is_empty() {
      None
    } else {
      let mean = intensities.iter().sum::<i64>() as f64 / intensities.len() as f64;
      // One decimal place for display
      Some((mean * 10.0).round() / 10.0)
    };

    Some(Self {
      count: logs.len(),
      avg_heart_rate,
      avg_intensity,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Athlete Lookup
/// ---------------------------------------------------------------------------

/// Find the first record whose name contains the search term,
/// case-insensitively. Record order is insertion order from ingestion.
pub fn find_athlete<'a>(records: &'a [TrainingLog], term: &str) -> Option<&'a TrainingLog> {
  let needle = term.trim().to_lowercase();
  if needle.is_empty() {
    return None;
  }
  records
    .iter()
    .find(|r| r.name.to_lowercase().contains(&needle))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Condition;

  fn log(name: &str, heart_rate: i64, intensity: i64) -> TrainingLog {
    TrainingLog {
      name: name.to_string(),
      timestamp: "2024-04-01".to_string(),
      training_type: "러닝".to_string(),
      intensity,
      heart_rate,
      notes: String::new(),
      condition: Condition::Good,
    }
  }

  #[test]
  fn test_avg_heart_rate_ignores_zero_entries() {
    let logs = vec![
      log("minji", 0, 5),
      log("minji", 120, 6),
      log("minji", 140, 7),
      log("minji", 0, 0),
      log("minji", 130, 8),
    ];

    let stats = AthleteStats::compute(&logs).unwrap();
    assert_eq!(stats.count, 5);
    // round((120 + 140 + 130) / 3) = 130
    assert_eq!(stats.avg_heart_rate, Some(130));
  }

  #[test]
  fn test_all_zero_heart_rates_yield_none() {
    let logs = vec![log("minji", 0, 5), log("minji", 0, 6)];
    let stats = AthleteStats::compute(&logs).unwrap();
    assert_eq!(stats.avg_heart_rate, None);
  }

  #[test]
  fn test_avg_intensity_one_decimal() {
    let logs = vec![log("minji", 140, 5), log("minji", 150, 6), log("minji", 145, 6)];
    let stats = AthleteStats::compute(&logs).unwrap();
    // (5 + 6 + 6) / 3 = 5.666... -> 5.7
    assert_eq!(stats.avg_intensity, Some(5.7));
  }

  #[test]
  fn test_empty_set_yields_no_stats() {
    assert_eq!(AthleteStats::compute(&[]), None);
  }

  #[test]
  fn test_lookup_is_case_insensitive_substring() {
    let records = vec![log("강종원", 150, 7), log("minji", 140, 5)];
    let found = find_athlete(&records, "MIN").unwrap();
    assert_eq!(found.name, "minji");
  }

  #[test]
  fn test_lookup_first_match_wins() {
    let records = vec![log("minji", 140, 5), log("minjae", 150, 7)];
    let found = find_athlete(&records, "min").unwrap();
    assert_eq!(found.name, "minji");
  }

  #[test]
  fn test_lookup_miss() {
    let records = vec![log("minji", 140, 5)];
    assert!(find_athlete(&records, "seojun").is_none());
    assert!(find_athlete(&records, "   ").is_none());
  }
}
