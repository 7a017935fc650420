//! Remote JSON source behind the cache.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// Fetches a URL and returns its parsed JSON body.
///
/// Implementations own their timeout policy; the cache layer adds none.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
  async fn request(&self, url: &str) -> Result<Value, FetchError>;
}
