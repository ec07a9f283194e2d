//! Error types for the storefront API client.

use thiserror::Error;

/// Maximum length of a response body echoed into an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Errors surfaced by the storefront API client.
///
/// These propagate to the caller unchanged; the cache layer never stores
/// them and never retries on the caller's behalf.
#[derive(Error, Debug)]
pub enum ApiError {
  #[error("resource not found: {0}")]
  NotFound(String),

  #[error("invalid request: {0}")]
  BadRequest(String),

  #[error("rate limited by the server")]
  RateLimited,

  #[error("server error: {0}")]
  Server(String),

  #[error("unexpected response (status {status}): {body}")]
  UnexpectedStatus { status: u16, body: String },

  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("invalid response payload: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("invalid API base URL: {0}")]
  BaseUrl(#[from] url::ParseError),
}

impl ApiError {
  /// Truncate a response body to keep error messages readable.
  fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
      body.to_string()
    } else {
      let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
      format!("{}... (truncated, {} total bytes)", truncated, body.len())
    }
  }

  /// Map an HTTP status and response body onto an error variant.
  pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
    let truncated = Self::truncate_body(body);
    match status.as_u16() {
      400 => ApiError::BadRequest(truncated),
      404 => ApiError::NotFound(truncated),
      429 => ApiError::RateLimited,
      500..=599 => ApiError::Server(truncated),
      other => ApiError::UnexpectedStatus {
        status: other,
        body: truncated,
      },
    }
  }
}
