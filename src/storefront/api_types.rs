//! Serde-deserializable types matching storefront API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs. Conversions run
//! as cache transforms, so only domain types are ever persisted.

use serde::Deserialize;

use super::types::{Collection, Product, ProductSummary, Variant};

// ============================================================================
// Response envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProductsResponse {
  #[serde(default)]
  pub products: Vec<ApiProduct>,
}

#[derive(Debug, Deserialize)]
pub struct ApiProductResponse {
  pub product: ApiProduct,
}

#[derive(Debug, Deserialize)]
pub struct ApiCollectionsResponse {
  #[serde(default)]
  pub collections: Vec<ApiCollection>,
}

// ============================================================================
// Products
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProduct {
  pub id: u64,
  pub handle: String,
  pub title: String,
  /// HTML description
  pub body_html: Option<String>,
  pub vendor: Option<String>,
  pub product_type: Option<String>,
  #[serde(default)]
  pub tags: ApiTags,
  #[serde(default)]
  pub variants: Vec<ApiVariant>,
  #[serde(default)]
  pub images: Vec<ApiImage>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiVariant {
  pub id: u64,
  #[serde(default)]
  pub title: String,
  pub price: String,
  #[serde(default)]
  pub available: bool,
  pub sku: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiImage {
  pub src: String,
}

/// Tags arrive either as a list or as one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiTags {
  List(Vec<String>),
  Joined(String),
}

impl Default for ApiTags {
  fn default() -> Self {
    Self::List(Vec::new())
  }
}

impl ApiTags {
  fn into_vec(self) -> Vec<String> {
    let tags = match self {
      Self::List(tags) => tags,
      Self::Joined(s) => s.split(',').map(String::from).collect(),
    };
    tags
      .into_iter()
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .collect()
  }
}

impl ApiProduct {
  fn lowest_price(&self) -> Option<String> {
    self
      .variants
      .iter()
      .filter_map(|v| v.price.parse::<f64>().ok().map(|p| (p, &v.price)))
      .min_by(|a, b| a.0.total_cmp(&b.0))
      .map(|(_, price)| price.clone())
  }

  pub fn into_summary(self) -> ProductSummary {
    let price = self.lowest_price();
    ProductSummary {
      id: self.id,
      available: self.variants.iter().any(|v| v.available),
      image: self.images.into_iter().next().map(|i| i.src),
      handle: self.handle,
      title: self.title,
      vendor: self.vendor.filter(|v| !v.is_empty()),
      price,
    }
  }

  pub fn into_full(self) -> Product {
    Product {
      id: self.id,
      handle: self.handle,
      title: self.title,
      description: self.body_html.filter(|d| !d.is_empty()),
      vendor: self.vendor.filter(|v| !v.is_empty()),
      product_type: self.product_type.filter(|t| !t.is_empty()),
      tags: self.tags.into_vec(),
      variants: self.variants.into_iter().map(Variant::from).collect(),
      images: self.images.into_iter().map(|i| i.src).collect(),
      updated_at: self.updated_at,
    }
  }
}

impl From<ApiVariant> for Variant {
  fn from(v: ApiVariant) -> Self {
    Self {
      id: v.id,
      title: v.title,
      price: v.price,
      available: v.available,
      sku: v.sku.filter(|s| !s.is_empty()),
    }
  }
}

// ============================================================================
// Collections
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiCollection {
  pub id: u64,
  pub handle: String,
  pub title: String,
  pub description: Option<String>,
}

impl From<ApiCollection> for Collection {
  fn from(c: ApiCollection) -> Self {
    Self {
      id: c.id,
      handle: c.handle,
      title: c.title,
      description: c.description.filter(|d| !d.is_empty()),
    }
  }
}
