mod cache;
mod commands;
mod config;
mod error;
mod logging;
mod remote;
mod storefront;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheLayer, CacheStore, MemoryStore, NoopStore, SqliteStore};
use crate::config::{Backend, Config};
use crate::remote::HttpFetcher;

#[derive(Parser, Debug)]
#[command(name = "storefront-cache")]
#[command(about = "Cache-aside reads of a storefront catalogue API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/storefront-cache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Bypass the cache store entirely
  #[arg(long)]
  no_cache: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if args.no_cache {
    config.cache.enabled = false;
  }

  let _log_guard = logging::init(&config.logging)?;

  let cache = build_cache(&config)?;
  let mut stdout = std::io::stdout().lock();
  commands::run(args.command, cache, &config.storefront, &mut stdout).await
}

/// Wire the configured store and the HTTP fetcher into a cache layer.
fn build_cache(config: &Config) -> Result<CacheLayer<dyn CacheStore, HttpFetcher>> {
  let store: Arc<dyn CacheStore> = if !config.cache.enabled {
    Arc::new(NoopStore)
  } else {
    match config.cache.backend {
      Backend::Memory => Arc::new(MemoryStore::new()),
      Backend::Sqlite => match &config.cache.path {
        Some(path) => Arc::new(SqliteStore::open_at(path)?),
        None => Arc::new(SqliteStore::open()?),
      },
    }
  };
  debug!(
    enabled = config.cache.enabled,
    backend = ?config.cache.backend,
    "cache store ready"
  );

  let fetcher = HttpFetcher::new(&config.remote, Config::get_access_token())?;
  let cache = CacheLayer::from_shared(store, Arc::new(fetcher))
    .with_default_ttl(config.cache.default_ttl()?);

  Ok(if config.cache.single_flight {
    cache.with_single_flight()
  } else {
    cache
  })
}
