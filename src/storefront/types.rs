use serde::{Deserialize, Serialize};

/// Product summary for list views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
  pub id: u64,
  pub handle: String,
  pub title: String,
  pub vendor: Option<String>,
  /// Lowest variant price, as sent by the API (decimal string)
  pub price: Option<String>,
  pub available: bool,
  pub image: Option<String>,
}

/// Full product details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: u64,
  pub handle: String,
  pub title: String,
  pub description: Option<String>,
  pub vendor: Option<String>,
  pub product_type: Option<String>,
  pub tags: Vec<String>,
  pub variants: Vec<Variant>,
  pub images: Vec<String>,
  pub updated_at: Option<String>,
}

/// Purchasable variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
  pub id: u64,
  pub title: String,
  pub price: String,
  pub available: bool,
  pub sku: Option<String>,
}

/// Collection summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
  pub id: u64,
  pub handle: String,
  pub title: String,
  pub description: Option<String>,
}
