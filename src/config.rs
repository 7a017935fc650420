use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable holding the storefront access token.
pub const TOKEN_ENV: &str = "STOREFRONT_CACHE_TOKEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub cache: CacheConfig,
  pub remote: RemoteConfig,
  pub storefront: StorefrontConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  /// SQLite database on disk, survives restarts
  #[default]
  Sqlite,
  /// Process memory only
  Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// When false nothing is stored and every read goes to the network
  pub enabled: bool,
  pub backend: Backend,
  /// SQLite database path (defaults to the user data directory)
  pub path: Option<PathBuf>,
  /// TTL for entries written without an explicit one
  pub default_ttl_ms: i64,
  /// Coalesce concurrent refreshes of the same key
  pub single_flight: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      backend: Backend::default(),
      path: None,
      default_ttl_ms: crate::cache::DEFAULT_TTL.num_milliseconds(),
      single_flight: false,
    }
  }
}

impl CacheConfig {
  pub fn default_ttl(&self) -> Result<Duration> {
    Duration::try_milliseconds(self.default_ttl_ms)
      .ok_or_else(|| eyre!("cache.default_ttl_ms out of range: {}", self.default_ttl_ms))
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
  /// Whole-request timeout
  pub timeout_secs: u64,
  pub user_agent: String,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      timeout_secs: 30,
      user_agent: concat!("storefront-cache/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
  /// Root of the storefront API, e.g. https://shop.example.com/api/
  pub base_url: Option<String>,
  /// TTL for catalogue responses (defaults to the cache default)
  pub catalog_ttl_ms: Option<i64>,
}

impl StorefrontConfig {
  /// Parsed base URL, always ending in a slash so paths join beneath it.
  pub fn base_url(&self) -> Result<Url> {
    let raw = self
      .base_url
      .as_deref()
      .ok_or_else(|| eyre!("storefront.base_url is not configured"))?;

    let raw = if raw.ends_with('/') {
      raw.to_string()
    } else {
      format!("{}/", raw)
    };

    Url::parse(&raw).map_err(|e| eyre!("Invalid storefront.base_url {}: {}", raw, e))
  }

  pub fn catalog_ttl(&self) -> Result<Option<Duration>> {
    self
      .catalog_ttl_ms
      .map(|ms| {
        Duration::try_milliseconds(ms)
          .ok_or_else(|| eyre!("storefront.catalog_ttl_ms out of range: {}", ms))
      })
      .transpose()
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Filter directive used when RUST_LOG is unset
  pub level: String,
  /// Log directory (defaults to the user data directory)
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./storefront-cache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storefront-cache/config.yaml
  ///
  /// Defaults apply when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("storefront-cache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storefront-cache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the storefront access token from the environment, if set.
  pub fn get_access_token() -> Option<String> {
    std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert!(config.cache.enabled);
    assert_eq!(config.cache.backend, Backend::Sqlite);
    assert_eq!(config.cache.default_ttl().unwrap(), Duration::hours(24));
    assert!(!config.cache.single_flight);
    assert_eq!(config.remote.timeout_secs, 30);
    assert_eq!(config.logging.level, "info");
  }

  #[test]
  fn test_load_partial_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "cache:\n  backend: memory\n  default_ttl_ms: 5000\n  single_flight: true\nstorefront:\n  base_url: https://shop.test/api\n  catalog_ttl_ms: 60000\n"
    )
    .unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.cache.backend, Backend::Memory);
    assert_eq!(config.cache.default_ttl().unwrap(), Duration::seconds(5));
    assert!(config.cache.single_flight);
    assert!(config.cache.enabled);
    assert_eq!(
      config.storefront.catalog_ttl().unwrap(),
      Some(Duration::minutes(1))
    );
    assert_eq!(
      config.storefront.base_url().unwrap().as_str(),
      "https://shop.test/api/"
    );
    assert_eq!(config.remote.timeout_secs, 30);
  }

  #[test]
  fn test_out_of_range_ttls_are_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "cache:\n  default_ttl_ms: -9223372036854775808\nstorefront:\n  catalog_ttl_ms: -9223372036854775808\n"
    )
    .unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    let err = config.cache.default_ttl().unwrap_err();
    assert!(err.to_string().contains("cache.default_ttl_ms out of range"));
    let err = config.storefront.catalog_ttl().unwrap_err();
    assert!(err.to_string().contains("storefront.catalog_ttl_ms out of range"));
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_invalid_yaml_is_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "cache: [unclosed").unwrap();
    assert!(Config::load(Some(file.path())).is_err());
  }

  #[test]
  fn test_base_url_required_for_storefront() {
    let config = StorefrontConfig::default();
    assert!(config.base_url().is_err());
  }
}
