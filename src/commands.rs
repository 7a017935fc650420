use chrono::Duration;
use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;

use crate::cache::{CacheEntry, CacheLayer, CacheResult, CacheStore, FetchOptions};
use crate::config::StorefrontConfig;
use crate::remote::RemoteFetcher;
use crate::storefront::{CachedStorefrontClient, StorefrontKey};

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// Read a URL through the cache under KEY
  Fetch {
    key: String,
    url: String,
    /// TTL for the entry written on refresh
    #[arg(long)]
    ttl_ms: Option<i64>,
    /// Cache only the value at this JSON pointer (e.g. /data/items)
    #[arg(long)]
    pointer: Option<String>,
  },
  /// Show the stored entry for KEY, fresh or not
  Get { key: String },
  /// Delete the stored entry for KEY
  Clear { key: String },
  /// List products, optionally from one collection
  Products {
    #[arg(long)]
    collection: Option<String>,
    /// Drop the cached copy first
    #[arg(long)]
    refresh: bool,
  },
  /// Show one product by handle
  Product {
    handle: String,
    #[arg(long)]
    refresh: bool,
  },
  /// List collections
  Collections {
    #[arg(long)]
    refresh: bool,
  },
}

/// Run a subcommand, writing payloads to `out` as pretty JSON.
pub async fn run<S, R>(
  command: Command,
  cache: CacheLayer<S, R>,
  storefront: &StorefrontConfig,
  out: &mut impl Write,
) -> Result<()>
where
  S: CacheStore + ?Sized + 'static,
  R: RemoteFetcher + ?Sized + 'static,
{
  match command {
    Command::Fetch {
      key,
      url,
      ttl_ms,
      pointer,
    } => {
      let mut options = FetchOptions::<Value>::new();
      if let Some(ttl) = ttl_ms {
        let ttl = Duration::try_milliseconds(ttl)
          .ok_or_else(|| eyre!("--ttl-ms out of range: {}", ttl))?;
        options = options.with_ttl(ttl);
      }
      if let Some(pointer) = pointer {
        options = options.with_transform(move |raw| select(raw, &pointer));
      }

      let result = cache.fetch_with_cache(&key, &url, options).await?;
      emit(out, result)
    }
    Command::Get { key } => {
      let entry = cache.get::<Value>(&key).await;
      let fresh = cache.is_fresh(entry.as_ref());
      match entry {
        Some(entry) => write_json(out, &describe(&entry, fresh)),
        None => Err(eyre!("No cache entry for {}", key)),
      }
    }
    Command::Clear { key } => {
      cache.clear(&key).await;
      Ok(())
    }
    Command::Products {
      collection,
      refresh,
    } => {
      let client = CachedStorefrontClient::new(storefront, cache)?;
      if refresh {
        client
          .invalidate(&StorefrontKey::Products {
            collection: collection.clone(),
          })
          .await;
      }
      emit(out, client.products(collection.as_deref()).await?)
    }
    Command::Product { handle, refresh } => {
      let client = CachedStorefrontClient::new(storefront, cache)?;
      if refresh {
        client
          .invalidate(&StorefrontKey::Product {
            handle: handle.clone(),
          })
          .await;
      }
      emit(out, client.product(&handle).await?)
    }
    Command::Collections { refresh } => {
      let client = CachedStorefrontClient::new(storefront, cache)?;
      if refresh {
        client.invalidate(&StorefrontKey::Collections).await;
      }
      emit(out, client.collections().await?)
    }
  }
}

/// JSON-pointer transform for `fetch --pointer`.
fn select(raw: Value, pointer: &str) -> Result<Value> {
  raw
    .pointer(pointer)
    .cloned()
    .ok_or_else(|| eyre!("Nothing at JSON pointer {}", pointer))
}

fn describe(entry: &CacheEntry<Value>, fresh: bool) -> Value {
  json!({
    "key": entry.key,
    "fresh": fresh,
    "stored_at": entry.stored_at_utc().map(|t| t.to_rfc3339()),
    "ttl_ms": entry.ttl_ms,
    "payload": entry.payload,
  })
}

fn emit<T: Serialize>(out: &mut impl Write, result: CacheResult<T>) -> Result<()> {
  match result.cached_at {
    Some(at) => eprintln!("source: {} (cached {})", result.source, at.to_rfc3339()),
    None => eprintln!("source: {}", result.source),
  }
  write_json(out, &result.data)
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
  serde_json::to_writer_pretty(&mut *out, value)?;
  writeln!(out)?;
  Ok(())
}
