//! Per-call options and result metadata for cache-aside fetches.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Post-fetch transformation from the raw response to the cached payload.
pub type Transform<T> = Arc<dyn Fn(Value) -> color_eyre::Result<T> + Send + Sync>;

/// Per-call configuration for [`CacheLayer::fetch_with_cache`](super::CacheLayer::fetch_with_cache).
pub struct FetchOptions<T> {
  /// Overrides the layer's default TTL for the entry written by this call
  pub ttl: Option<Duration>,
  /// Applied once to a successful response, before it is persisted
  pub transform: Option<Transform<T>>,
}

impl<T> FetchOptions<T> {
  pub fn new() -> Self {
    Self {
      ttl: None,
      transform: None,
    }
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  pub fn with_transform<F>(mut self, transform: F) -> Self
  where
    F: Fn(Value) -> color_eyre::Result<T> + Send + Sync + 'static,
  {
    self.transform = Some(Arc::new(transform));
    self
  }
}

impl<T> Default for FetchOptions<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Clone for FetchOptions<T> {
  fn clone(&self) -> Self {
    Self {
      ttl: self.ttl,
      transform: self.transform.clone(),
    }
  }
}

impl<T> fmt::Debug for FetchOptions<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FetchOptions")
      .field("ttl", &self.ttl)
      .field("transform", &self.transform.is_some())
      .finish()
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a fresh cache hit.
  pub fn from_cache(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at,
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Refresh failed, serving the last known (possibly stale) cached data
  Offline,
}

impl fmt::Display for CacheSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Network => "network",
      Self::CacheFresh => "cache",
      Self::Offline => "stale cache",
    };
    f.write_str(s)
  }
}
