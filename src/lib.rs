//! Caching client for a storefront REST API.
//!
//! The core is a TTL-based response cache over a pluggable key-value store:
//! reads consult the cache first and only reach the network on a miss,
//! stale entries are evicted eagerly at read time, and storage failures
//! degrade to "no cache" instead of failing the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use storecache::{CachedStoreClient, CacheLayer, Config, StoreClient};
//!
//! let config = Config::load(None)?;
//! let store = config.cache.build_store()?;
//! let cache = CacheLayer::with_policy(store, config.cache.policy());
//! let client = CachedStoreClient::new(StoreClient::new(&config.api.base_url)?, cache);
//!
//! // Served from cache within the TTL; fetched live otherwise
//! let products = client.list_products(&Default::default()).await?;
//! ```

pub mod api;
pub mod cache;
pub mod config;

pub use api::{ApiError, CachedStoreClient, StoreClient, StoreQueryKey};
pub use cache::{
  CacheError, CacheLayer, CachePolicy, CacheResult, CacheSource, CacheStats, FetchOptions,
  KeyValueStore, MemoryStore, QueryKey, SqliteStore,
};
pub use config::{Config, ConfigError};
