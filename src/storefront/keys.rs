//! Cache keys and endpoints for storefront resources.

use sha2::{Digest, Sha256};

/// Storefront resources served through the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorefrontKey {
  /// Product listing, optionally scoped to a collection
  Products { collection: Option<String> },
  /// A single product by handle
  Product { handle: String },
  /// All collections
  Collections,
}

impl StorefrontKey {
  /// Stable, fixed-length key for the cache store.
  pub fn cache_key(&self) -> String {
    let input = match self {
      Self::Products { collection } => format!(
        "products:{}",
        collection.as_deref().map(normalize_handle).unwrap_or_default()
      ),
      Self::Product { handle } => format!("product:{}", normalize_handle(handle)),
      Self::Collections => "collections".to_string(),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("storefront:{}", hex::encode(hasher.finalize()))
  }

  /// API path, relative to the storefront base URL.
  pub fn path(&self) -> String {
    match self {
      Self::Products { collection: None } => "products.json".to_string(),
      Self::Products {
        collection: Some(c),
      } => format!("collections/{}/products.json", normalize_handle(c)),
      Self::Product { handle } => format!("products/{}.json", normalize_handle(handle)),
      Self::Collections => "collections.json".to_string(),
    }
  }

  /// Human readable description for logs.
  pub fn description(&self) -> String {
    match self {
      Self::Products { collection } => {
        if let Some(c) = collection {
          format!("products in collection {}", c)
        } else {
          "all products".to_string()
        }
      }
      Self::Product { handle } => format!("product {}", handle),
      Self::Collections => "all collections".to_string(),
    }
  }
}

/// Handles are case-insensitive slugs.
fn normalize_handle(handle: &str) -> String {
  handle.trim().to_lowercase()
}
