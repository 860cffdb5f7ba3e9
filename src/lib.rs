pub mod app;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod sheet;
pub mod stats;

pub use app::{AppState, SearchOutcome, SearchResult, SessionError};
pub use models::{Condition, FeedbackResult, TrainingLog};
pub use stats::AthleteStats;
