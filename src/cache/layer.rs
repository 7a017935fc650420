//! Cache layer that orchestrates caching logic with network fetching.

use chrono::Duration;
use futures::future::{BoxFuture, FutureExt};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::entry::CacheEntry;
use super::flight::{FlightGroup, RefreshOutcome};
use super::storage::CacheStore;
use super::traits::{CacheResult, FetchOptions};
use crate::error::FetchError;
use crate::remote::RemoteFetcher;

/// Validity window for entries written without an explicit TTL.
pub const DEFAULT_TTL: Duration = Duration::hours(24);

/// Cache layer that manages caching logic and network fetching.
///
/// Reads go to the store first; stale or missing entries are refreshed from
/// the remote fetcher, and when that fails the last stored value of any age
/// is served instead. Store failures never reach the caller.
pub struct CacheLayer<S: ?Sized, R: ?Sized> {
  store: Arc<S>,
  fetcher: Arc<R>,
  clock: Arc<dyn Clock>,
  /// TTL applied to writes that don't specify one, and to entries without one
  default_ttl: Duration,
  /// Present when concurrent refreshes of one key are coalesced
  flights: Option<Arc<FlightGroup>>,
}

impl<S, R> CacheLayer<S, R> {
  /// Create a new cache layer over the given store and fetcher.
  #[cfg(test)]
  pub fn new(store: S, fetcher: R) -> Self {
    Self::from_shared(Arc::new(store), Arc::new(fetcher))
  }
}

impl<S: ?Sized, R: ?Sized> CacheLayer<S, R> {
  /// Create a cache layer from already shared collaborators.
  pub fn from_shared(store: Arc<S>, fetcher: Arc<R>) -> Self {
    Self {
      store,
      fetcher,
      clock: Arc::new(SystemClock),
      default_ttl: DEFAULT_TTL,
      flights: None,
    }
  }

  /// Set the TTL used when neither the call nor the entry specifies one.
  pub fn with_default_ttl(mut self, default_ttl: Duration) -> Self {
    self.default_ttl = default_ttl;
    self
  }

  /// Replace the time source.
  #[cfg(test)]
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Coalesce concurrent refreshes of the same key into one remote fetch.
  ///
  /// A caller that joins a refresh already in flight gets the leader's result:
  /// the payload, transform and TTL are those of the call that started it, and
  /// the joining call's own [`FetchOptions`] are not used. Callers sharing a
  /// key must agree on its options.
  pub fn with_single_flight(mut self) -> Self {
    self.flights = Some(Arc::new(FlightGroup::new()));
    self
  }

  /// Check whether an entry is still within its validity window.
  pub fn is_fresh<T>(&self, entry: Option<&CacheEntry<T>>) -> bool {
    entry.is_some_and(|e| e.is_fresh_at(self.clock.now_ms(), self.default_ttl))
  }
}

impl<S, R> CacheLayer<S, R>
where
  S: CacheStore + ?Sized + 'static,
  R: RemoteFetcher + ?Sized + 'static,
{
  /// Read the stored entry for `key` without any freshness check.
  ///
  /// Store errors and undecodable envelopes are logged and read as a miss.
  pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
    let raw = match self.store.get_item(key).await {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(key, error = %e, "cache read failed");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(entry) => Some(entry),
      Err(e) => {
        warn!(key, error = %e, "discarding undecodable cache entry");
        None
      }
    }
  }

  /// Store `payload` under `key`, stamped with the current time and `ttl`.
  ///
  /// Failures are logged; the next read of `key` simply misses.
  pub async fn set<T: Serialize>(&self, key: &str, payload: &T, ttl: Duration) {
    let entry = CacheEntry::new(key, payload, self.clock.now_ms(), ttl);
    let raw = match serde_json::to_string(&entry) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(key, error = %e, "failed to serialize cache entry");
        return;
      }
    };

    match self.store.set_item(key, raw).await {
      Ok(()) => debug!(key, ttl_ms = ttl.num_milliseconds(), "cache entry written"),
      Err(e) => warn!(key, error = %e, "cache write failed"),
    }
  }

  /// Delete the entry for `key`. Clearing a missing key is a no-op.
  pub async fn clear(&self, key: &str) {
    match self.store.remove_item(key).await {
      Ok(()) => debug!(key, "cache entry cleared"),
      Err(e) => warn!(key, error = %e, "cache clear failed"),
    }
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately
  /// 2. If stale/missing, fetch from network, transform and store
  /// 3. On any refresh failure, return the stored entry regardless of age
  /// 4. With nothing stored, return the refresh error
  ///
  /// The refresh runs as its own task: a caller that stops waiting does not
  /// stop the fetch or the write that follows it.
  pub async fn fetch_with_cache<T>(
    &self,
    key: &str,
    url: &str,
    options: FetchOptions<T>,
  ) -> Result<CacheResult<T>, FetchError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
  {
    // Check cache first
    let cached = self.get::<T>(key).await;
    if let Some(entry) = cached.filter(|e| self.is_fresh(Some(e))) {
      debug!(key, "cache hit");
      let cached_at = entry.stored_at_utc();
      return Ok(CacheResult::from_cache(entry.payload, cached_at));
    }

    debug!(key, url, "cache miss, refreshing");
    let start = || self.spawn_refresh(key.to_string(), url.to_string(), options);
    let outcome = match &self.flights {
      Some(flights) => flights.run(key, start).await,
      None => start().await,
    };

    let err = match outcome.and_then(|payload| Ok(serde_json::from_value::<T>(payload)?)) {
      Ok(data) => return Ok(CacheResult::from_network(data)),
      Err(err) => err,
    };

    // Refresh failed - serve whatever is stored, however old
    match self.get::<T>(key).await {
      Some(entry) => {
        warn!(key, error = %err, "refresh failed, serving stale cache");
        let cached_at = entry.stored_at_utc();
        Ok(CacheResult::offline(entry.payload, cached_at))
      }
      None => {
        warn!(key, error = %err, "refresh failed with nothing cached");
        Err(err)
      }
    }
  }

  fn spawn_refresh<T>(
    &self,
    key: String,
    url: String,
    options: FetchOptions<T>,
  ) -> BoxFuture<'static, RefreshOutcome>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
  {
    let layer = self.clone();
    let task = tokio::spawn(async move { layer.refresh(&key, &url, options).await });

    async move {
      match task.await {
        Ok(outcome) => outcome,
        Err(e) => Err(FetchError::Aborted(e.to_string())),
      }
    }
    .boxed()
  }

  /// Fetch, transform and persist. Returns the payload as it was stored.
  async fn refresh<T>(&self, key: &str, url: &str, options: FetchOptions<T>) -> RefreshOutcome
  where
    T: Serialize + DeserializeOwned,
  {
    let raw = self.fetcher.request(url).await?;

    let payload: T = match &options.transform {
      Some(transform) => transform(raw).map_err(|e| FetchError::Transform(format!("{:#}", e)))?,
      None => serde_json::from_value(raw)?,
    };

    // Encode before writing so an unencodable payload never reaches the store
    let value = serde_json::to_value(&payload)?;
    self
      .set(key, &value, options.ttl.unwrap_or(self.default_ttl))
      .await;

    Ok(value)
  }
}

impl<S: ?Sized, R: ?Sized> Clone for CacheLayer<S, R> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      fetcher: Arc::clone(&self.fetcher),
      clock: Arc::clone(&self.clock),
      default_ttl: self.default_ttl,
      flights: self.flights.clone(),
    }
  }
}
