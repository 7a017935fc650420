//! Single-flight deduplication of concurrent refreshes.
//!
//! Callers refreshing the same key while a refresh is already running await
//! that refresh instead of starting their own. The map entry is removed once
//! the leading caller sees the refresh settle, or is dropped.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::FetchError;

/// Outcome of a refresh: the serialized payload that was cached.
pub type RefreshOutcome = Result<Value, FetchError>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct Flight {
  id: u64,
  refresh: SharedRefresh,
}

/// Map from key to the refresh currently in flight for it.
#[derive(Default)]
pub struct FlightGroup {
  inflight: Mutex<HashMap<String, Flight>>,
  next_id: AtomicU64,
}

impl FlightGroup {
  pub fn new() -> Self {
    Self::default()
  }

  /// Join the refresh in flight for `key`, or start one with `start`.
  pub async fn run<F>(&self, key: &str, start: F) -> RefreshOutcome
  where
    F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
  {
    let (refresh, leader) = {
      let mut inflight = self.lock();
      match inflight.get(key) {
        Some(flight) => (flight.refresh.clone(), None),
        None => {
          let id = self.next_id.fetch_add(1, Ordering::Relaxed);
          let refresh = start().shared();
          inflight.insert(
            key.to_string(),
            Flight {
              id,
              refresh: refresh.clone(),
            },
          );
          (refresh, Some(id))
        }
      }
    };

    let _guard = leader.map(|id| FlightGuard {
      group: self,
      key,
      id,
    });

    refresh.await
  }

  /// Number of keys with a refresh in flight.
  #[cfg(test)]
  pub fn in_flight(&self) -> usize {
    self.lock().len()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Flight>> {
    // The map holds no invariants a panicking holder could break
    self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Clears the leader's map entry when it settles or is dropped.
struct FlightGuard<'a> {
  group: &'a FlightGroup,
  key: &'a str,
  id: u64,
}

impl Drop for FlightGuard<'_> {
  fn drop(&mut self) {
    let mut inflight = self.group.lock();
    if inflight.get(self.key).is_some_and(|f| f.id == self.id) {
      inflight.remove(self.key);
    }
  }
}
