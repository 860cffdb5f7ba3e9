use serde::{Deserialize, Serialize};

/// Coaching feedback for one athlete, produced per search.
///
/// Replaced wholesale on the next search; the feedback requester guarantees
/// one of these is always available (fallback content on any service fault).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResult {
  /// Single narrative coaching summary
  pub narrative: String,
  /// Short actionable guidelines, three by convention
  pub recommendations: Vec<String>,
}
