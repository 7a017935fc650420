//! Fetch error types.

use thiserror::Error;

/// Why a remote refresh failed.
///
/// Variants carry rendered messages rather than source errors so a single
/// refresh outcome can be cloned out to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  #[error("Invalid URL {url}: {message}")]
  InvalidUrl { url: String, message: String },

  #[error("Request to {url} failed: {message}")]
  Transport { url: String, message: String },

  #[error("{url} returned {status}: {message}")]
  Status {
    url: String,
    status: u16,
    message: String,
  },

  #[error("Invalid response: {0}")]
  Decode(String),

  #[error("Transform failed: {0}")]
  Transform(String),

  #[error("Refresh task aborted: {0}")]
  Aborted(String),
}

impl FetchError {
  /// HTTP status for failures reported by the server.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<serde_json::Error> for FetchError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}
