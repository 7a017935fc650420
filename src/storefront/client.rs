//! Storefront client that reads the catalogue through the cache layer.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;
use url::Url;

use crate::cache::{CacheLayer, CacheResult, CacheStore, FetchOptions};
use crate::config::StorefrontConfig;
use crate::error::FetchError;
use crate::remote::RemoteFetcher;

use super::api_types::{ApiCollectionsResponse, ApiProductResponse, ApiProductsResponse};
use super::keys::StorefrontKey;
use super::types::{Collection, Product, ProductSummary};

/// Storefront client with transparent caching support.
///
/// Responses are converted to domain types before they are cached, and
/// stale data is served when the API can't be reached.
pub struct CachedStorefrontClient<S: ?Sized, R: ?Sized> {
  base_url: Url,
  cache: CacheLayer<S, R>,
  /// Overrides the cache default for catalogue entries
  catalog_ttl: Option<Duration>,
}

impl<S: ?Sized, R: ?Sized> Clone for CachedStorefrontClient<S, R> {
  fn clone(&self) -> Self {
    Self {
      base_url: self.base_url.clone(),
      cache: self.cache.clone(),
      catalog_ttl: self.catalog_ttl,
    }
  }
}

impl<S, R> CachedStorefrontClient<S, R>
where
  S: CacheStore + ?Sized + 'static,
  R: RemoteFetcher + ?Sized + 'static,
{
  /// Create a new cached storefront client.
  pub fn new(config: &StorefrontConfig, cache: CacheLayer<S, R>) -> Result<Self> {
    Ok(Self {
      base_url: config.base_url()?,
      cache,
      catalog_ttl: config.catalog_ttl()?,
    })
  }

  /// List products, optionally only those in `collection`.
  pub async fn products(&self, collection: Option<&str>) -> Result<CacheResult<Vec<ProductSummary>>> {
    let key = StorefrontKey::Products {
      collection: collection.map(String::from),
    };

    self
      .fetch(&key, |raw| {
        let response: ApiProductsResponse = serde_json::from_value(raw)?;
        Ok(
          response
            .products
            .into_iter()
            .map(|p| p.into_summary())
            .collect(),
        )
      })
      .await
  }

  /// Get a single product by handle.
  pub async fn product(&self, handle: &str) -> Result<CacheResult<Product>> {
    let key = StorefrontKey::Product {
      handle: handle.to_string(),
    };

    self
      .fetch(&key, |raw| {
        let response: ApiProductResponse = serde_json::from_value(raw)?;
        Ok(response.product.into_full())
      })
      .await
  }

  /// List all collections.
  pub async fn collections(&self) -> Result<CacheResult<Vec<Collection>>> {
    self
      .fetch(&StorefrontKey::Collections, |raw| {
        let response: ApiCollectionsResponse = serde_json::from_value(raw)?;
        Ok(
          response
            .collections
            .into_iter()
            .map(Collection::from)
            .collect(),
        )
      })
      .await
  }

  /// Drop the cached copy of a resource so the next read refetches it.
  pub async fn invalidate(&self, key: &StorefrontKey) {
    info!(resource = %key.description(), "invalidating");
    self.cache.clear(&key.cache_key()).await;
  }

  fn url_for(&self, key: &StorefrontKey) -> Result<Url> {
    self
      .base_url
      .join(&key.path())
      .map_err(|e| eyre!("Failed to build URL for {}: {}", key.description(), e))
  }

  async fn fetch<T, F>(&self, key: &StorefrontKey, transform: F) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: Fn(serde_json::Value) -> Result<T> + Send + Sync + 'static,
  {
    let url = self.url_for(key)?;
    let mut options = FetchOptions::new().with_transform(transform);
    if let Some(ttl) = self.catalog_ttl {
      options = options.with_ttl(ttl);
    }

    let result = self
      .cache
      .fetch_with_cache(&key.cache_key(), url.as_str(), options)
      .await
      .map_err(|e: FetchError| eyre!("Failed to load {}: {}", key.description(), e))?;

    info!(resource = %key.description(), source = %result.source, "loaded");
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::ScriptedFetcher;
  use crate::cache::{CacheSource, ManualClock, MemoryStore};
  use serde_json::json;
  use std::sync::Arc;

  const NOW: i64 = 1_700_000_000_000;
  const BASE: &str = "https://shop.test/api";

  fn config() -> StorefrontConfig {
    StorefrontConfig {
      base_url: Some(BASE.to_string()),
      catalog_ttl_ms: Some(60_000),
    }
  }

  fn client(
    fetcher: ScriptedFetcher,
  ) -> (
    CachedStorefrontClient<MemoryStore, ScriptedFetcher>,
    Arc<ScriptedFetcher>,
    Arc<ManualClock>,
  ) {
    let fetcher = Arc::new(fetcher);
    let clock = Arc::new(ManualClock::at_ms(NOW));
    let cache = CacheLayer::from_shared(Arc::new(MemoryStore::new()), Arc::clone(&fetcher))
      .with_clock(clock.clone());
    let client = CachedStorefrontClient::new(&config(), cache).unwrap();
    (client, fetcher, clock)
  }

  fn products_body() -> serde_json::Value {
    json!({
      "products": [
        {
          "id": 1,
          "handle": "linen-shirt",
          "title": "Linen Shirt",
          "variants": [{"id": 11, "price": "45.00", "available": true}]
        },
        {
          "id": 2,
          "handle": "wool-coat",
          "title": "Wool Coat",
          "variants": [{"id": 21, "price": "180.00", "available": false}]
        }
      ]
    })
  }

  #[tokio::test]
  async fn test_products_transformed_and_cached() {
    let fetcher = ScriptedFetcher::new().route(
      "https://shop.test/api/products.json",
      Ok(products_body()),
    );
    let (client, fetcher, _) = client(fetcher);

    let first = client.products(None).await.unwrap();
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.data[0].handle, "linen-shirt");
    assert!(!first.data[1].available);

    let second = client.products(None).await.unwrap();
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(second.data, first.data);
    assert_eq!(fetcher.calls(), 1);
  }

  #[tokio::test]
  async fn test_catalog_ttl_applies() {
    let fetcher = ScriptedFetcher::new().route(
      "https://shop.test/api/products.json",
      Ok(products_body()),
    );
    let (client, fetcher, clock) = client(fetcher);

    client.products(None).await.unwrap();
    clock.advance(Duration::seconds(60));
    let refreshed = client.products(None).await.unwrap();

    assert_eq!(refreshed.source, CacheSource::Network);
    assert_eq!(fetcher.calls(), 2);
  }

  #[tokio::test]
  async fn test_collection_scoped_products_use_collection_path() {
    let fetcher = ScriptedFetcher::new().route(
      "https://shop.test/api/collections/summer/products.json",
      Ok(products_body()),
    );
    let (client, fetcher, _) = client(fetcher);

    let result = client.products(Some("Summer")).await.unwrap();
    assert_eq!(result.data.len(), 2);
    assert_eq!(
      fetcher.requested(),
      vec!["https://shop.test/api/collections/summer/products.json"]
    );
  }

  #[tokio::test]
  async fn test_product_served_stale_when_api_down() {
    let fetcher = ScriptedFetcher::new()
      .respond(Ok(json!({
        "product": {"id": 1, "handle": "linen-shirt", "title": "Linen Shirt"}
      })))
      .respond(Err(FetchError::Status {
        url: "https://shop.test/api/products/linen-shirt.json".to_string(),
        status: 503,
        message: String::new(),
      }));
    let (client, _, clock) = client(fetcher);

    client.product("linen-shirt").await.unwrap();
    clock.advance(Duration::hours(1));

    let stale = client.product("linen-shirt").await.unwrap();
    assert_eq!(stale.source, CacheSource::Offline);
    assert_eq!(stale.data.title, "Linen Shirt");
  }

  #[tokio::test]
  async fn test_collections_error_when_nothing_cached() {
    let (client, _, _) = client(ScriptedFetcher::new());
    let err = client.collections().await.unwrap_err();
    assert!(err.to_string().contains("all collections"));
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let fetcher = ScriptedFetcher::new().route(
      "https://shop.test/api/collections.json",
      Ok(json!({"collections": [{"id": 5, "handle": "summer", "title": "Summer", "description": ""}]})),
    );
    let (client, fetcher, _) = client(fetcher);

    let first = client.collections().await.unwrap();
    assert_eq!(first.data[0].description, None);

    client.invalidate(&StorefrontKey::Collections).await;
    let second = client.collections().await.unwrap();

    assert_eq!(second.source, CacheSource::Network);
    assert_eq!(fetcher.calls(), 2);
  }
}
