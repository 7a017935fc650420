//! Cache store trait and its backends.
//!
//! Stores are dumb key/value persistence: string keys, opaque string values,
//! no knowledge of TTLs. All freshness decisions happen in the cache layer.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Trait for cache storage backends.
#[async_trait]
pub trait CacheStore: Send + Sync {
  /// Read the raw value stored under `key`.
  async fn get_item(&self, key: &str) -> Result<Option<String>>;

  /// Write `value` under `key`, replacing any previous value.
  async fn set_item(&self, key: &str, value: String) -> Result<()>;

  /// Delete the value under `key`. Deleting a missing key is not an error.
  async fn remove_item(&self, key: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

#[async_trait]
impl CacheStore for NoopStore {
  async fn get_item(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  async fn set_item(&self, _key: &str, _value: String) -> Result<()> {
    Ok(()) // Discard
  }

  async fn remove_item(&self, _key: &str) -> Result<()> {
    Ok(())
  }
}

/// Process-local store backed by a hash map.
#[derive(Default)]
pub struct MemoryStore {
  items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of stored items.
  #[cfg(test)]
  pub async fn len(&self) -> usize {
    self.items.read().await.len()
  }
}

#[async_trait]
impl CacheStore for MemoryStore {
  async fn get_item(&self, key: &str) -> Result<Option<String>> {
    Ok(self.items.read().await.get(key).cloned())
  }

  async fn set_item(&self, key: &str, value: String) -> Result<()> {
    self.items.write().await.insert(key.to_string(), value);
    Ok(())
  }

  async fn remove_item(&self, key: &str) -> Result<()> {
    self.items.write().await.remove(key);
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
///
/// rusqlite is blocking, so every statement runs on the blocking pool.
pub struct SqliteStore {
  conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the store at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory database.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Arc::new(Mutex::new(conn)),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("storefront-cache").join("cache.db"))
  }

  /// Run `f` against the connection on the blocking pool.
  async fn with_conn<F, T>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let conn = Arc::clone(&self.conn);
    tokio::task::spawn_blocking(move || {
      let conn = conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
      f(&conn)
    })
    .await
    .map_err(|e| eyre!("Cache database task failed: {}", e))?
  }
}

/// Schema for the key/value table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

#[async_trait]
impl CacheStore for SqliteStore {
  async fn get_item(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_string();
    self
      .with_conn(move |conn| {
        conn
          .query_row(
            "SELECT value FROM kv_cache WHERE key = ?",
            params![key],
            |row| row.get(0),
          )
          .optional()
          .map_err(|e| eyre!("Failed to read cache item {}: {}", key, e))
      })
      .await
  }

  async fn set_item(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_string();
    self
      .with_conn(move |conn| {
        conn
          .execute(
            "INSERT OR REPLACE INTO kv_cache (key, value, written_at)
             VALUES (?, ?, datetime('now'))",
            params![key, value],
          )
          .map_err(|e| eyre!("Failed to store cache item {}: {}", key, e))?;
        Ok(())
      })
      .await
  }

  async fn remove_item(&self, key: &str) -> Result<()> {
    let key = key.to_string();
    self
      .with_conn(move |conn| {
        conn
          .execute("DELETE FROM kv_cache WHERE key = ?", params![key])
          .map_err(|e| eyre!("Failed to delete cache item {}: {}", key, e))?;
        Ok(())
      })
      .await
  }
}
