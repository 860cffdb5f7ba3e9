//! Published-sheet CSV source
//!
//! The club attendance form publishes to a fixed Google Sheets CSV export
//! URL. Each fetch appends a cache-busting timestamp parameter so the
//! published snapshot is not served stale from an intermediate cache.

use chrono::Utc;
use reqwest::Client;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vTL-7osicYdHztOycmQngj3FA4NU56okNHSg0q7lqlfBeb9oL73mPqxcRB8oKfe2QigzGsuk3xVPeNj/pub?output=csv";
const FETCH_TIMEOUT_SECONDS: u64 = 30;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SheetError {
  #[error("Invalid sheet URL: {0}")]
  InvalidUrl(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Sheet responded with HTTP {0}")]
  Status(u16),
}

/// ---------------------------------------------------------------------------
/// Sheet Client
/// ---------------------------------------------------------------------------

pub struct SheetClient {
  client: Client,
  url: String,
}

impl SheetClient {
  pub fn new(url: impl Into<String>) -> Result<Self, SheetError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(FETCH_TIMEOUT_SECONDS))
      .build()?;

    Ok(Self {
      client,
      url: url.into(),
    })
  }

  /// Build a client for the published club sheet, honoring a
  /// `SHEET_CSV_URL` override from the environment.
  pub fn from_env() -> Result<Self, SheetError> {
    let url = env::var("SHEET_CSV_URL").unwrap_or_else(|_| DEFAULT_SHEET_URL.to_string());
    Self::new(url)
  }

  /// Fetch the full CSV document as text.
  pub async fn fetch_csv(&self) -> Result<String, SheetError> {
    let url = self.cache_busted_url()?;

    tracing::info!(url = %url, "fetching sheet CSV");

    let response = self.client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(SheetError::Status(status.as_u16()));
    }

    Ok(response.text().await?)
  }

  fn cache_busted_url(&self) -> Result<Url, SheetError> {
    let mut url =
      Url::parse(&self.url).map_err(|e| SheetError::InvalidUrl(e.to_string()))?;

    url
      .query_pairs_mut()
      .append_pair("t", &Utc::now().timestamp_millis().to_string());

    Ok(url)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_fetch_csv_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/pub")
      .match_query(mockito::Matcher::Regex("t=\\d+".to_string()))
      .with_status(200)
      .with_header("content-type", "text/csv")
      .with_body("이름,메모\nminji,ok")
      .create_async()
      .await;

    let client = SheetClient::new(format!("{}/pub", server.url())).unwrap();
    let csv_text = client.fetch_csv().await.unwrap();

    assert!(csv_text.contains("minji"));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_fetch_csv_http_error() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/pub")
      .match_query(mockito::Matcher::Any)
      .with_status(500)
      .create_async()
      .await;

    let client = SheetClient::new(format!("{}/pub", server.url())).unwrap();
    let result = client.fetch_csv().await;

    assert!(matches!(result, Err(SheetError::Status(500))));
  }

  #[test]
  fn test_cache_busted_url_appends_timestamp() {
    let client = SheetClient::new("https://example.com/pub?output=csv").unwrap();
    let url = client.cache_busted_url().unwrap();

    assert!(url.as_str().contains("output=csv"));
    assert!(url.query_pairs().any(|(k, _)| k == "t"));
  }

  #[test]
  fn test_invalid_url() {
    let client = SheetClient::new("not a url").unwrap();
    assert!(matches!(
      client.cache_busted_url(),
      Err(SheetError::InvalidUrl(_))
    ));
  }
}
