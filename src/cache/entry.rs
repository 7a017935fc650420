//! The envelope persisted for every cached resource.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached payload together with the metadata needed to judge its freshness.
///
/// The payload is always post-transform data. `ttl_ms` is recorded at write
/// time so entries written under different policies can share one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  /// Caller-supplied identifier of the resource
  pub key: String,
  /// The cached value
  pub payload: T,
  /// Write time, milliseconds since the Unix epoch
  pub stored_at: i64,
  /// Validity window in milliseconds; absent means "use the default"
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ttl_ms: Option<i64>,
}

impl<T> CacheEntry<T> {
  pub fn new(key: impl Into<String>, payload: T, stored_at: i64, ttl: Duration) -> Self {
    Self {
      key: key.into(),
      payload,
      stored_at,
      ttl_ms: Some(ttl.num_milliseconds()),
    }
  }

  /// Effective validity window for this entry, in milliseconds.
  pub fn ttl_ms_or(&self, default_ttl: Duration) -> i64 {
    self
      .ttl_ms
      .unwrap_or_else(|| default_ttl.num_milliseconds())
  }

  /// An entry is fresh iff `now - stored_at < ttl`.
  ///
  /// Computed on raw milliseconds: stored envelopes may carry any `i64`.
  pub fn is_fresh_at(&self, now_ms: i64, default_ttl: Duration) -> bool {
    let age = now_ms.saturating_sub(self.stored_at);
    age < self.ttl_ms_or(default_ttl)
  }

  pub fn stored_at_utc(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(self.stored_at)
  }
}
