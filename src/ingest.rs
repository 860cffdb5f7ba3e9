//! CSV ingestion and row-to-record mapping
//!
//! The club's attendance form exports to a published sheet whose column
//! headers drift between form edits. Columns are resolved once per batch
//! against an ordered rule table; each row then maps independently to a
//! `TrainingLog` or is dropped, never failing the batch.

use crate::models::{Condition, TrainingLog};
use csv::StringRecord;
use thiserror::Error;

/// ---------------------------------------------------------------------------
/// Sheet Column Headers
/// ---------------------------------------------------------------------------

const HEADER_NAME: &str = "이름 (필수)(*)";
const HEADER_NAME_ALIAS: &str = "이름";
const HEADER_TRAINING_TYPE: &str = "오늘 달린거리는?(*)";
const HEADER_TIMESTAMP: &str = "응답일시";
const HEADER_CONDITION: &str = "컨디션 체크(*)";
const HEADER_NOTES: &str = "굿송에게 바란다.";
const HEADER_NOTES_ALIAS: &str = "메모";

// These two headers carry volatile suffixes in the form, so they are
// matched by substring rather than exact text.
const MARKER_INTENSITY: &str = "보강훈련 강도";
const MARKER_HEART_RATE: &str = "평균 심박수";

const DEFAULT_TRAINING_TYPE: &str = "러닝";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum IngestError {
  #[error("CSV parse failed: {0}")]
  Csv(#[from] csv::Error),
}

/// ---------------------------------------------------------------------------
/// Header Resolution
/// ---------------------------------------------------------------------------

/// How a canonical field recognizes its column header
#[derive(Debug, Clone, Copy)]
enum HeaderRule {
  Exact(&'static str),
  Contains(&'static str),
}

impl HeaderRule {
  fn matches(&self, header: &str) -> bool {
    match self {
      HeaderRule::Exact(expected) => header == *expected,
      HeaderRule::Contains(marker) => header.contains(marker),
    }
  }
}

/// Column indices resolved once per ingestion batch
#[derive(Debug, Clone)]
struct ColumnMap {
  name: Option<usize>,
  training_type: Option<usize>,
  intensity: Option<usize>,
  heart_rate: Option<usize>,
  timestamp: Option<usize>,
  condition: Option<usize>,
  notes: Option<usize>,
}

impl ColumnMap {
  fn resolve(headers: &StringRecord) -> Self {
    Self {
      name: find_column(headers, &[
        HeaderRule::Exact(HEADER_NAME),
        HeaderRule::Exact(HEADER_NAME_ALIAS),
      ]),
      training_type: find_column(headers, &[HeaderRule::Exact(HEADER_TRAINING_TYPE)]),
      intensity: find_column(headers, &[HeaderRule::Contains(MARKER_INTENSITY)]),
      heart_rate: find_column(headers, &[HeaderRule::Contains(MARKER_HEART_RATE)]),
      timestamp: find_column(headers, &[HeaderRule::Exact(HEADER_TIMESTAMP)]),
      condition: find_column(headers, &[HeaderRule::Exact(HEADER_CONDITION)]),
      notes: find_column(headers, &[
        HeaderRule::Exact(HEADER_NOTES),
        HeaderRule::Exact(HEADER_NOTES_ALIAS),
      ]),
    }
  }

  fn field<'a>(&self, row: &'a StringRecord, index: Option<usize>) -> &'a str {
    index.and_then(|i| row.get(i)).unwrap_or("")
  }
}

/// First header matching any rule, in rule order (primary before alias)
fn find_column(headers: &StringRecord, rules: &[HeaderRule]) -> Option<usize> {
  for rule in rules {
    if let Some(index) = headers.iter().position(|h| rule.matches(h.trim())) {
      return Some(index);
    }
  }
  None
}

/// ---------------------------------------------------------------------------
/// Value Coercion
/// ---------------------------------------------------------------------------

/// Parse the leading integer of a cell ("7 (매우 힘듦)" -> 7), 0 on failure
fn parse_leading_int(value: &str) -> i64 {
  let trimmed = value.trim();
  let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
  digits.parse().unwrap_or(0)
}

/// Strip every non-digit character and parse the rest ("approx 150 bpm" -> 150)
fn parse_digits_only(value: &str) -> i64 {
  let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
  digits.parse().unwrap_or(0)
}

/// ---------------------------------------------------------------------------
/// Row Mapping
/// ---------------------------------------------------------------------------

/// Map one raw row to a record. Pure and total: a row with an empty name
/// (under either accepted header) is rejected with `None`, everything else
/// degrades field-by-field to defaults.
fn map_row(columns: &ColumnMap, row: &StringRecord) -> Option<TrainingLog> {
  let name = columns.field(row, columns.name).trim();
  if name.is_empty() {
    return None;
  }

  let training_type = match columns.field(row, columns.training_type).trim() {
    "" => DEFAULT_TRAINING_TYPE,
    value => value,
  };

  let intensity = parse_leading_int(columns.field(row, columns.intensity));
  let heart_rate = parse_digits_only(columns.field(row, columns.heart_rate));

  // Keep only the date component of "2024-04-02 07:14:33"
  let timestamp = columns
    .field(row, columns.timestamp)
    .split(' ')
    .next()
    .unwrap_or("")
    .to_string();

  let condition = Condition::from_score(parse_leading_int(columns.field(row, columns.condition)));
  let notes = columns.field(row, columns.notes).trim().to_string();

  Some(TrainingLog {
    name: name.to_string(),
    timestamp,
    training_type: training_type.to_string(),
    intensity,
    heart_rate,
    notes,
    condition,
  })
}

/// ---------------------------------------------------------------------------
/// Batch Parsing
/// ---------------------------------------------------------------------------

/// Parse a full CSV document into the record set.
///
/// The first row defines column names. Malformed individual rows are
/// skipped; only an unreadable header row fails the whole document.
pub fn parse_records(csv_text: &str) -> Result<Vec<TrainingLog>, IngestError> {
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .from_reader(csv_text.as_bytes());

  let columns = ColumnMap::resolve(reader.headers()?);

  let records = reader
    .records()
    .filter_map(|row| row.ok())
    .filter_map(|row| map_row(&columns, &row))
    .collect();

  Ok(records)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  const SHEET: &str = "\
응답일시,이름 (필수)(*),오늘 달린거리는?(*),보강훈련 강도 (1~10),나의 평균 심박수 입력,컨디션 체크(*),굿송에게 바란다.
2024-04-01 21:30:00,강종원,10km,7 (힘듦),approx 150 bpm,5,페이스 유지가 쉬웠어요
2024-04-02 07:14:33,minji,5km,3,142,4,
2024-04-03 20:02:10,  ,러닝,5,150,3,이름 없는 행
2024-04-04 06:58:41,박서준,,n/a,n/a,9,장거리 준비중";

  #[test]
  fn test_rows_without_name_are_dropped() {
    let records = parse_records(SHEET).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| !r.name.trim().is_empty()));
  }

  #[test]
  fn test_heart_rate_strips_non_digits() {
    let records = parse_records(SHEET).unwrap();
    assert_eq!(records[0].heart_rate, 150);
    assert_eq!(records[1].heart_rate, 142);
    // "n/a" has no digits at all
    assert_eq!(records[2].heart_rate, 0);
  }

  #[test]
  fn test_intensity_parses_leading_integer() {
    let records = parse_records(SHEET).unwrap();
    assert_eq!(records[0].intensity, 7);
    assert_eq!(records[1].intensity, 3);
    assert_eq!(records[2].intensity, 0);
  }

  #[test]
  fn test_timestamp_truncates_to_date() {
    let records = parse_records(SHEET).unwrap();
    assert_eq!(records[0].timestamp, "2024-04-01");
    assert_eq!(records[1].timestamp, "2024-04-02");
  }

  #[test]
  fn test_condition_mapping_and_default() {
    let records = parse_records(SHEET).unwrap();
    assert_eq!(records[0].condition, Condition::Excellent);
    assert_eq!(records[1].condition, Condition::Good);
    // Score 9 is out of range -> Good
    assert_eq!(records[2].condition, Condition::Good);
  }

  #[test]
  fn test_missing_training_type_uses_default() {
    let records = parse_records(SHEET).unwrap();
    assert_eq!(records[2].training_type, DEFAULT_TRAINING_TYPE);
  }

  #[test]
  fn test_name_alias_header() {
    let sheet = "이름,오늘 달린거리는?(*)\n강종원,5km\n,3km";
    let records = parse_records(sheet).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "강종원");
  }

  #[test]
  fn test_notes_alias_header() {
    let sheet = "이름,메모\nminji,회복주로 진행";
    let records = parse_records(sheet).unwrap();
    assert_eq!(records[0].notes, "회복주로 진행");
  }

  #[test]
  fn test_marker_headers_match_volatile_suffixes() {
    let sheet = "이름,오늘의 보강훈련 강도는? (1~10),오늘 나의 평균 심박수 기록\nminji,8 / 10,155bpm";
    let records = parse_records(sheet).unwrap();
    assert_eq!(records[0].intensity, 8);
    assert_eq!(records[0].heart_rate, 155);
  }

  #[test]
  fn test_ragged_rows_do_not_abort_batch() {
    let sheet = "응답일시,이름 (필수)(*),컨디션 체크(*)\n2024-04-01 08:00:00,강종원\n2024-04-02 08:00:00,minji,4";
    let records = parse_records(sheet).unwrap();
    assert_eq!(records.len(), 2);
    // Short row degrades to the condition default
    assert_eq!(records[0].condition, Condition::Good);
    assert_eq!(records[1].condition, Condition::Good);
  }

  #[test]
  fn test_parsing_is_idempotent() {
    let first = parse_records(SHEET).unwrap();
    let second = parse_records(SHEET).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn test_quoted_fields_with_commas() {
    let sheet = "이름,굿송에게 바란다.\n강종원,\"무릎 통증, 내일은 휴식\"";
    let records = parse_records(sheet).unwrap();
    assert_eq!(records[0].notes, "무릎 통증, 내일은 휴식");
  }
}
