//! Top-level session state and control flow
//!
//! One `AppState` owns the in-memory record set for the page session.
//! The set is rebuilt from scratch on every refresh and published as one
//! wholesale replacement behind an `Arc`, so readers always observe either
//! the complete old set or the complete new set, never an interleaving.

use crate::ingest::{self, IngestError};
use crate::llm;
use crate::models::{FeedbackResult, TrainingLog};
use crate::sheet::{SheetClient, SheetError};
use crate::stats::{self, AthleteStats};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("Sheet fetch failed: {0}")]
  Sheet(#[from] SheetError),

  #[error("Ingestion failed: {0}")]
  Ingest(#[from] IngestError),

  #[error("Refresh superseded by a newer request")]
  Superseded,
}

/// ---------------------------------------------------------------------------
/// Search Results
/// ---------------------------------------------------------------------------

/// Everything the results view needs for one athlete, replaced wholesale
/// on the next search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
  pub name: String,
  /// The athlete's sessions in chronological order
  pub logs: Vec<TrainingLog>,
  pub stats: Option<AthleteStats>,
  pub feedback: FeedbackResult,
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
  Found(Box<SearchResult>),
  /// No athlete matched; existing selection state is untouched
  NotFound,
}

/// ---------------------------------------------------------------------------
/// Application State
/// ---------------------------------------------------------------------------

pub struct AppState {
  sheet: SheetClient,
  records: RwLock<Arc<Vec<TrainingLog>>>,
  refresh_generation: AtomicU64,
  /// At most one feedback request in flight per session
  search_gate: Mutex<()>,
  last_result: RwLock<Option<SearchResult>>,
}

impl AppState {
  pub fn new(sheet: SheetClient) -> Self {
    Self {
      sheet,
      records: RwLock::new(Arc::new(Vec::new())),
      refresh_generation: AtomicU64::new(0),
      search_gate: Mutex::new(()),
      last_result: RwLock::new(None),
    }
  }

  pub fn from_env() -> Result<Self, SessionError> {
    Ok(Self::new(SheetClient::from_env()?))
  }

  /// Snapshot of the current record set
  pub async fn records(&self) -> Arc<Vec<TrainingLog>> {
    self.records.read().await.clone()
  }

  pub async fn last_result(&self) -> Option<SearchResult> {
    self.last_result.read().await.clone()
  }

  /// ---------------------------------------------------------------------------
  /// Refresh (fetch -> parse -> publish)
  /// ---------------------------------------------------------------------------

  /// Re-fetch the sheet and rebuild the record set from scratch.
  ///
  /// On failure the last-good set is retained. A refresh that was
  /// superseded by a newer one drops its stale result instead of
  /// publishing it.
  pub async fn refresh(&self) -> Result<usize, SessionError> {
    let generation = self.refresh_generation.fetch_add(1, Ordering::SeqCst) + 1;

    let csv_text = self.sheet.fetch_csv().await?;
    let records = ingest::parse_records(&csv_text)?;

    if self.refresh_generation.load(Ordering::SeqCst) != generation {
      return Err(SessionError::Superseded);
    }

    let count = records.len();
    *self.records.write().await = Arc::new(records);

    tracing::info!(count, "record set replaced");
    Ok(count)
  }

  /// ---------------------------------------------------------------------------
  /// Search (lookup -> stats -> feedback)
  /// ---------------------------------------------------------------------------

  /// Find an athlete by case-insensitive substring, then compute their
  /// stats and request coaching feedback. Feedback never fails (fallback
  /// content on any service fault), so a match always yields a result.
  pub async fn search(&self, term: &str) -> SearchOutcome {
    let _in_flight = self.search_gate.lock().await;

    let records = self.records().await;

    let Some(found) = stats::find_athlete(&records, term) else {
      return SearchOutcome::NotFound;
    };
    let name = found.name.clone();

    let mut logs: Vec<TrainingLog> = records
      .iter()
      .filter(|l| l.name == name)
      .cloned()
      .collect();
    logs.sort_by_key(session_date);

    let athlete_stats = AthleteStats::compute(&logs);
    let feedback = llm::get_feedback(&name, &logs).await;

    let result = SearchResult {
      name,
      logs,
      stats: athlete_stats,
      feedback,
    };

    *self.last_result.write().await = Some(result.clone());
    SearchOutcome::Found(Box::new(result))
  }
}

/// Chronological sort key; unparseable dates sort first, ties keep the
/// raw string order
fn session_date(log: &TrainingLog) -> (Option<NaiveDate>, String) {
  (
    NaiveDate::parse_from_str(&log.timestamp, "%Y-%m-%d").ok(),
    log.timestamp.clone(),
  )
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
