//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single cached record, as persisted in the key-value store.
///
/// Entries are serialized to JSON; `stored_at` is compared against the
/// layer's TTL on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  /// The cached payload
  pub payload: T,
  /// When the payload was written
  pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
  /// Wrap a payload, stamped with the current time.
  pub fn new(payload: T) -> Self {
    Self {
      payload,
      stored_at: Utc::now(),
    }
  }

  /// Whether this entry has outlived `ttl` as of `now`.
  pub fn is_stale(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
    now - self.stored_at >= ttl
  }
}

/// Trait for logical resource identifiers that can be turned into cache keys.
///
/// Implementors provide a namespace (used for prefix invalidation) and a
/// normalized parameter string. The derived key is the namespace alone, or
/// `namespace:<sha256(params)>` when parameters are present. Derivation is
/// pure and deterministic.
pub trait QueryKey {
  /// Namespace for this resource, e.g. "products" or "product:p1".
  fn namespace(&self) -> String;

  /// Normalized parameters; empty when the namespace alone identifies the
  /// resource.
  fn params(&self) -> String {
    String::new()
  }

  /// Storage key derived from namespace and parameters.
  fn cache_key(&self) -> String {
    let params = self.params();
    if params.is_empty() {
      self.namespace()
    } else {
      format!("{}:{}", self.namespace(), hash_params(&params))
    }
  }

  /// Human-readable description for log lines.
  fn description(&self) -> String;
}

/// SHA-256 hash for stable, fixed-length key segments.
pub fn hash_params(params: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(params.as_bytes());
  hex::encode(hasher.finalize())
}

/// Result from a cache-aware fetch, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was stored (if served from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a result served from a fresh cache entry.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where fetched data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the backing retrieval function
  Network,
  /// Data served from a fresh cache entry
  Cache,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  struct TestKey {
    namespace: String,
    params: String,
  }

  impl QueryKey for TestKey {
    fn namespace(&self) -> String {
      self.namespace.clone()
    }

    fn params(&self) -> String {
      self.params.clone()
    }

    fn description(&self) -> String {
      self.namespace.clone()
    }
  }

  #[test]
  fn test_entry_fresh_within_ttl() {
    let entry = CacheEntry::new(42);
    assert!(!entry.is_stale(Duration::milliseconds(5000), Utc::now()));
  }

  #[test]
  fn test_entry_stale_at_ttl_boundary() {
    let mut entry = CacheEntry::new(42);
    entry.stored_at = Utc::now() - Duration::milliseconds(5000);
    // now - stored_at >= ttl counts as stale, not merely greater-than
    assert!(entry.is_stale(Duration::milliseconds(5000), Utc::now()));
  }

  #[test]
  fn test_zero_ttl_is_always_stale() {
    let entry = CacheEntry::new(42);
    assert!(entry.is_stale(Duration::zero(), entry.stored_at));
  }

  #[test]
  fn test_hash_params_deterministic() {
    assert_eq!(hash_params("category=phones"), hash_params("category=phones"));
    assert_ne!(hash_params("category=phones"), hash_params("category=laptops"));
  }

  #[test]
  fn test_cache_key_without_params_is_namespace() {
    let key = TestKey {
      namespace: "product:p1".to_string(),
      params: String::new(),
    };
    assert_eq!(key.cache_key(), "product:p1");
  }

  #[test]
  fn test_cache_key_with_params_appends_hash() {
    let key = TestKey {
      namespace: "products".to_string(),
      params: "limit=50".to_string(),
    };
    let expected = format!("products:{}", hash_params("limit=50"));
    assert_eq!(key.cache_key(), expected);
  }
}
