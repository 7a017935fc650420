//! Cache-aside data access over a dumb key/value store.
//!
//! This module provides a generic caching mechanism that:
//! - Serves entries still inside their TTL without touching the network
//! - Refreshes stale or missing entries from a remote JSON source
//! - Transforms responses before persisting, so the store only holds payloads
//! - Serves stale entries when the refresh fails (offline mode)

mod clock;
mod entry;
mod flight;
mod layer;
mod storage;
#[cfg(test)]
pub(crate) mod testing;
mod traits;

pub use entry::CacheEntry;
pub use layer::{CacheLayer, DEFAULT_TTL};
pub use storage::{CacheStore, MemoryStore, NoopStore, SqliteStore};
pub use traits::{CacheResult, CacheSource, FetchOptions};

#[cfg(test)]
pub(crate) use clock::ManualClock;
