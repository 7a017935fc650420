//! Storefront catalogue read through the cache.

mod api_types;
mod client;
mod keys;
mod types;

pub use client::CachedStorefrontClient;
pub use keys::StorefrontKey;
