//! Test doubles for the cache layer's collaborators.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::storage::CacheStore;
use crate::error::FetchError;
use crate::remote::RemoteFetcher;

/// Fetcher that replays queued responses, or per-URL responses when routed.
#[derive(Default)]
pub struct ScriptedFetcher {
  queue: Mutex<VecDeque<Result<Value, FetchError>>>,
  routes: Mutex<HashMap<String, Result<Value, FetchError>>>,
  requested: Mutex<Vec<String>>,
  calls: AtomicUsize,
  delay: Option<Duration>,
}

impl ScriptedFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue a response for the next unrouted request.
  pub fn respond(self, response: Result<Value, FetchError>) -> Self {
    self.queue.lock().unwrap().push_back(response);
    self
  }

  /// Answer every request for `url` with `response`.
  pub fn route(self, url: &str, response: Result<Value, FetchError>) -> Self {
    self
      .routes
      .lock()
      .unwrap()
      .insert(url.to_string(), response);
    self
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn requested(&self) -> Vec<String> {
    self.requested.lock().unwrap().clone()
  }
}

#[async_trait]
impl RemoteFetcher for ScriptedFetcher {
  async fn request(&self, url: &str) -> Result<Value, FetchError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.requested.lock().unwrap().push(url.to_string());

    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }

    if let Some(response) = self.routes.lock().unwrap().get(url) {
      return response.clone();
    }

    self
      .queue
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| {
        Err(FetchError::Transport {
          url: url.to_string(),
          message: "no scripted response".to_string(),
        })
      })
  }
}

/// Store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
  async fn get_item(&self, key: &str) -> Result<Option<String>> {
    Err(eyre!("disk unavailable reading {}", key))
  }

  async fn set_item(&self, key: &str, _value: String) -> Result<()> {
    Err(eyre!("disk unavailable writing {}", key))
  }

  async fn remove_item(&self, key: &str) -> Result<()> {
    Err(eyre!("disk unavailable deleting {}", key))
  }
}
