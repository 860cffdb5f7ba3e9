//! LLM integration for coaching feedback
//!
//! This module handles communication with the Gemini API for generating
//! a narrative coaching summary and recommendations per athlete.
//!
//! Faults never escape this boundary: any failure (missing key, network,
//! service error, malformed response) degrades to deterministic fallback
//! content so the caller always has something to render.

use crate::models::{FeedbackResult, TrainingLog};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-3-flash-preview";
const REQUEST_TIMEOUT_SECONDS: u64 = 60;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Gemini API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
  contents: Vec<Content>,
  system_instruction: Content,
  generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
  parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
  text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
  error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
  message: String,
}

/// Requested output shape: a single narrative plus short recommendations
fn response_schema() -> serde_json::Value {
  serde_json::json!({
    "type": "OBJECT",
    "properties": {
      "narrative": {
        "type": "STRING",
        "description": "Coaching summary grounded in the athlete's data"
      },
      "recommendations": {
        "type": "ARRAY",
        "items": { "type": "STRING" },
        "description": "Three actionable guidelines"
      }
    },
    "required": ["narrative", "recommendations"]
  })
}

/// ---------------------------------------------------------------------------
/// Gemini Client
/// ---------------------------------------------------------------------------

pub struct GeminiClient {
  client: Client,
  api_key: String,
  base_url: String,
}

impl GeminiClient {
  pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, LlmError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
      .build()
      .map_err(|e| LlmError::Request(e.to_string()))?;

    Ok(Self {
      client,
      api_key: api_key.into(),
      base_url: base_url.into(),
    })
  }

  /// Create a client, loading the API key from the environment
  pub fn from_env() -> Result<Self, LlmError> {
    let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
    Self::new(api_key, GEMINI_API_BASE)
  }

  /// One structured-output generation call. Exactly one attempt, no retry.
  pub async fn request_feedback(
    &self,
    name: &str,
    logs: &[TrainingLog],
  ) -> Result<FeedbackResult, LlmError> {
    let request = GenerateRequest {
      contents: vec![Content {
        parts: vec![Part {
          text: build_prompt(name, logs),
        }],
      }],
      system_instruction: Content {
        parts: vec![Part {
          text: include_str!("prompts/coach_system.txt").to_string(),
        }],
      },
      generation_config: GenerationConfig {
        response_mime_type: "application/json".to_string(),
        response_schema: response_schema(),
      },
    };

    let url = format!(
      "{}/models/{}:generateContent",
      self.base_url, GEMINI_MODEL
    );

    let response = self
      .client
      .post(&url)
      .header("x-goog-api-key", &self.api_key)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let generate_response: GenerateResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    // Extract text from the first candidate's first part
    let text = generate_response
      .candidates
      .into_iter()
      .filter_map(|c| c.content)
      .flat_map(|c| c.parts)
      .map(|p| p.text)
      .next()
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    let json_str = extract_json(&text)?;

    let feedback: FeedbackResult = serde_json::from_str(&json_str)
      .map_err(|e| LlmError::Parse(format!("{}: {}", e, json_str)))?;

    Ok(feedback)
  }
}

/// ---------------------------------------------------------------------------
/// Prompt Construction
/// ---------------------------------------------------------------------------

/// Summarize the athlete's logs one line per session for the prompt
fn build_prompt(name: &str, logs: &[TrainingLog]) -> String {
  let log_summary = logs
    .iter()
    .map(|l| {
      format!(
        "- Date: {}, Activity: {}, Intensity: {}/10, Avg HR: {} BPM, Notes: {}, Condition: {}",
        l.timestamp,
        l.training_type,
        l.intensity,
        l.heart_rate,
        l.notes,
        l.condition.as_str()
      )
    })
    .collect::<Vec<_>>()
    .join("\n");

  format!(
    r#"Write a performance report for club member '{}' based on their recent training data.

TRAINING DATA:
{}

Respond with valid JSON matching the requested schema: a "narrative" string and a "recommendations" array of exactly three guidelines."#,
    name, log_summary
  )
}

/// ---------------------------------------------------------------------------
/// Public Entry Point with Fallback
/// ---------------------------------------------------------------------------

/// Request coaching feedback for one athlete.
///
/// This never fails: on any fault the deterministic fallback content is
/// returned so the caller always has a renderable `FeedbackResult`.
pub async fn get_feedback(name: &str, logs: &[TrainingLog]) -> FeedbackResult {
  let result = match GeminiClient::from_env() {
    Ok(client) => client.request_feedback(name, logs).await,
    Err(e) => Err(e),
  };

  match result {
    Ok(feedback) => feedback,
    Err(e) => {
      tracing::warn!(error = %e, athlete = name, "feedback service unavailable, using fallback");
      fallback_feedback(name)
    }
  }
}

/// Fixed locally-constructed feedback used when the service is unavailable
fn fallback_feedback(name: &str) -> FeedbackResult {
  FeedbackResult {
    narrative: format!(
      "{}, we're taking a close look at your recent training data. The overall \
       picture shows a steady rhythm, and a more detailed analysis will be with \
       you shortly. Keep it up!",
      name
    ),
    recommendations: vec![
      "Keep a consistent training frequency to build cardiovascular endurance".to_string(),
      "Spend at least 15 minutes on dynamic and static stretching before and after sessions"
        .to_string(),
      "Plan recovery runs on days when your condition score is low".to_string(),
    ],
  }
}

/// Extract JSON from a model response (handles markdown code fences)
fn extract_json(text: &str) -> Result<String, LlmError> {
  // Try direct parse first
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  // Last resort: first { to last }
  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    return Ok(text[start..=end].to_string());
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
