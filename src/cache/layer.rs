//! Cache layer that orchestrates staleness checks with network fetching.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::storage::KeyValueStore;
use super::traits::{CacheEntry, CacheResult};

/// Prefix prepended to every logical key before it reaches the store, so a
/// shared store can host other data without collisions.
const KEY_PREFIX: &str = "storecache:v1:";

/// Default entry time-to-live (5 minutes).
const DEFAULT_TTL_MS: i64 = 300_000;

/// Derive the namespaced storage key for a logical key.
pub fn storage_key(key: &str) -> String {
  format!("{}{}", KEY_PREFIX, key)
}

/// Tuning knobs for a cache layer.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
  /// How long an entry may be served after being stored
  pub ttl: Duration,
  /// When false, every read misses and every write is discarded
  pub enabled: bool,
}

impl Default for CachePolicy {
  fn default() -> Self {
    Self {
      ttl: Duration::milliseconds(DEFAULT_TTL_MS),
      enabled: true,
    }
  }
}

/// Per-call overrides for [`CacheLayer::fetch_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
  /// Override the layer's TTL for this call
  pub ttl: Option<Duration>,
  /// Override the layer's enabled flag for this call
  pub enabled: Option<bool>,
}

/// Snapshot of cache counters and store usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
  /// Reads served from a fresh entry
  pub hits: u64,
  /// Reads that found nothing usable
  pub misses: u64,
  /// Entries currently in the store
  pub entries: usize,
  /// Total size of the serialized entries
  pub approx_bytes: usize,
}

#[derive(Default)]
struct Counters {
  hits: AtomicU64,
  misses: AtomicU64,
}

/// Cache layer over a pluggable key-value store.
///
/// The layer is an explicitly constructed object holding its configuration;
/// clone it (cheap, the store is shared) or pass it by reference to
/// consumers. Storage and serialization failures degrade to "no cache":
/// they are logged and never surface to callers. Concurrent fetches for the
/// same key are not de-duplicated; each miss invokes its own fetcher and
/// the last store wins.
pub struct CacheLayer<S: KeyValueStore> {
  store: Arc<S>,
  policy: CachePolicy,
  counters: Arc<Counters>,
}

impl<S: KeyValueStore> CacheLayer<S> {
  /// Create a cache layer with the default policy.
  pub fn new(store: S) -> Self {
    Self::with_policy(store, CachePolicy::default())
  }

  /// Create a cache layer with an explicit policy.
  pub fn with_policy(store: S, policy: CachePolicy) -> Self {
    Self {
      store: Arc::new(store),
      policy,
      counters: Arc::new(Counters::default()),
    }
  }

  /// Replace the TTL, keeping the rest of the policy.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.policy.ttl = ttl;
    self
  }

  /// The layer's configured policy.
  pub fn policy(&self) -> CachePolicy {
    self.policy
  }

  /// Store a payload under `key`, stamped with the current time.
  ///
  /// Returns whether the entry was written. Serialization and store
  /// failures are logged and reported as a plain `false` so a failed write
  /// degrades to "no cache" instead of failing the caller.
  pub fn store<T: Serialize>(&self, key: &str, payload: &T) -> bool {
    if !self.policy.enabled {
      return false;
    }
    self.write_entry(key, payload)
  }

  fn write_entry<T: Serialize>(&self, key: &str, payload: &T) -> bool {
    let entry = CacheEntry::new(payload);
    let raw = match serde_json::to_string(&entry) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(key, error = %e, "cache entry serialization failed, continuing uncached");
        return false;
      }
    };

    match self.store.set(&storage_key(key), &raw) {
      Ok(()) => {
        debug!(key, "cache set");
        true
      }
      Err(e) => {
        warn!(key, error = %e, "cache write failed, continuing uncached");
        false
      }
    }
  }

  /// Read a fresh payload for `key`.
  ///
  /// Absent, malformed, and unreadable entries are all misses. A stale
  /// entry is deleted at the moment staleness is detected, so a subsequent
  /// read misses without consulting the TTL again.
  pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    if !self.policy.enabled {
      return None;
    }
    self.read_entry(key, self.policy.ttl).map(|entry| entry.payload)
  }

  fn read_entry<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<CacheEntry<T>> {
    let skey = storage_key(key);

    let raw = match self.store.get(&skey) {
      Ok(Some(raw)) => raw,
      Ok(None) => {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        return None;
      }
      Err(e) => {
        warn!(key, error = %e, "cache read failed, treating as miss");
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        return None;
      }
    };

    let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key, error = %e, "malformed cache entry, treating as miss");
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        return None;
      }
    };

    if entry.is_stale(ttl, Utc::now()) {
      debug!(key, "cache entry stale, evicting");
      if let Err(e) = self.store.delete(&skey) {
        warn!(key, error = %e, "failed to evict stale entry");
      }
      self.counters.misses.fetch_add(1, Ordering::Relaxed);
      return None;
    }

    self.counters.hits.fetch_add(1, Ordering::Relaxed);
    debug!(key, "cache hit");
    Some(entry)
  }

  /// Delete the entry at `key`, fresh or not.
  ///
  /// Works even with caching disabled, so data busted while the cache is
  /// off cannot resurface after it is re-enabled.
  pub fn invalidate(&self, key: &str) -> bool {
    match self.store.delete(&storage_key(key)) {
      Ok(()) => {
        debug!(key, "cache invalidated");
        true
      }
      Err(e) => {
        warn!(key, error = %e, "cache invalidation failed");
        false
      }
    }
  }

  /// Delete every entry whose logical key starts with `prefix`, matched
  /// literally ("product:" does not clear "products"). Returns the number
  /// of entries removed.
  pub fn invalidate_prefix(&self, prefix: &str) -> usize {
    let skey_prefix = storage_key(prefix);

    let keys = match self.store.keys() {
      Ok(keys) => keys,
      Err(e) => {
        warn!(prefix, error = %e, "cache key listing failed, nothing invalidated");
        return 0;
      }
    };

    let mut removed = 0;
    for key in keys.iter().filter(|k| k.starts_with(&skey_prefix)) {
      match self.store.delete(key) {
        Ok(()) => removed += 1,
        Err(e) => warn!(key = key.as_str(), error = %e, "cache invalidation failed"),
      }
    }

    debug!(prefix, removed, "cache prefix invalidated");
    removed
  }

  /// Fetch with the layer's configured policy.
  ///
  /// See [`CacheLayer::fetch_with`] for the contract.
  pub async fn fetch<T, E, F, Fut>(&self, key: &str, fetcher: F) -> Result<CacheResult<T>, E>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    self.fetch_with(key, FetchOptions::default(), fetcher).await
  }

  /// Fetch orchestration: consult the cache, fall back to `fetcher`.
  ///
  /// 1. With caching disabled, go straight to the fetcher.
  /// 2. On a fresh hit, return the payload; the fetcher is not invoked.
  /// 3. On a miss, invoke the fetcher.
  /// 4. On success, store the result best-effort and return it.
  /// 5. On failure, propagate the error unchanged; failures are never
  ///    cached, and a stale entry encountered during the miss check is
  ///    already gone.
  pub async fn fetch_with<T, E, F, Fut>(
    &self,
    key: &str,
    options: FetchOptions,
    fetcher: F,
  ) -> Result<CacheResult<T>, E>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let enabled = options.enabled.unwrap_or(self.policy.enabled);
    let ttl = options.ttl.unwrap_or(self.policy.ttl);

    if enabled {
      if let Some(entry) = self.read_entry::<T>(key, ttl) {
        return Ok(CacheResult::from_cache(entry.payload, entry.stored_at));
      }
    }

    let data = fetcher().await?;

    if enabled {
      self.write_entry(key, &data);
    }

    Ok(CacheResult::from_network(data))
  }

  /// Invalidate then fetch, forcing a live retrieval.
  pub async fn refetch<T, E, F, Fut>(&self, key: &str, fetcher: F) -> Result<CacheResult<T>, E>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    self.invalidate(key);
    self.fetch(key, fetcher).await
  }

  /// Snapshot of hit/miss counters and store usage.
  ///
  /// Counters are process-local and shared across clones of the layer.
  pub fn stats(&self) -> CacheStats {
    let mut entries = 0;
    let mut approx_bytes = 0;

    match self.store.keys() {
      Ok(keys) => {
        for key in keys.iter().filter(|k| k.starts_with(KEY_PREFIX)) {
          entries += 1;
          if let Ok(Some(raw)) = self.store.get(key) {
            approx_bytes += raw.len();
          }
        }
      }
      Err(e) => warn!(error = %e, "cache key listing failed, stats incomplete"),
    }

    CacheStats {
      hits: self.counters.hits.load(Ordering::Relaxed),
      misses: self.counters.misses.load(Ordering::Relaxed),
      entries,
      approx_bytes,
    }
  }
}

impl<S: KeyValueStore> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      policy: self.policy,
      counters: Arc::clone(&self.counters),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStore;
  use crate::cache::traits::CacheSource;
  use std::sync::atomic::AtomicUsize;

  fn layer_with_ttl_ms(ttl_ms: i64) -> CacheLayer<MemoryStore> {
    CacheLayer::with_policy(
      MemoryStore::new(),
      CachePolicy {
        ttl: Duration::milliseconds(ttl_ms),
        enabled: true,
      },
    )
  }

  /// Serialize an entry whose stored_at lies `age_ms` in the past.
  fn backdated_entry<T: Serialize>(payload: T, age_ms: i64) -> String {
    let entry = CacheEntry {
      payload,
      stored_at: Utc::now() - Duration::milliseconds(age_ms),
    };
    serde_json::to_string(&entry).unwrap()
  }

  fn seed_backdated<T: Serialize>(layer: &CacheLayer<MemoryStore>, key: &str, payload: T, age_ms: i64) {
    layer
      .store
      .set(&storage_key(key), &backdated_entry(payload, age_ms))
      .unwrap();
  }

  #[test]
  fn test_store_read_roundtrip() {
    let layer = layer_with_ttl_ms(5000);

    assert!(layer.store("products:list", &vec!["p1".to_string()]));
    assert_eq!(layer.read::<Vec<String>>("products:list"), Some(vec!["p1".to_string()]));
  }

  #[test]
  fn test_read_after_invalidate_misses() {
    let layer = layer_with_ttl_ms(5000);

    layer.store("k", &1u32);
    assert!(layer.invalidate("k"));
    assert_eq!(layer.read::<u32>("k"), None);
  }

  #[test]
  fn test_stale_entry_evicted_on_read() {
    let layer = layer_with_ttl_ms(5000);
    seed_backdated(&layer, "k", 1u32, 6000);

    assert_eq!(layer.read::<u32>("k"), None);
    // The entry was deleted, not merely skipped: the raw value is gone
    assert_eq!(layer.store.get(&storage_key("k")).unwrap(), None);
    assert_eq!(layer.read::<u32>("k"), None);
  }

  #[test]
  fn test_malformed_entry_is_a_miss() {
    let layer = layer_with_ttl_ms(5000);
    layer.store.set(&storage_key("k"), "not json").unwrap();

    assert_eq!(layer.read::<u32>("k"), None);
  }

  #[test]
  fn test_invalidate_prefix_is_literal() {
    let layer = layer_with_ttl_ms(5000);
    layer.store("products:a", &1u32);
    layer.store("products:b", &2u32);
    layer.store("product:p1", &3u32);

    assert_eq!(layer.invalidate_prefix("products"), 2);
    assert_eq!(layer.read::<u32>("product:p1"), Some(3));
  }

  #[test]
  fn test_disabled_layer_never_stores_or_reads() {
    let layer = CacheLayer::with_policy(
      MemoryStore::new(),
      CachePolicy {
        ttl: Duration::milliseconds(5000),
        enabled: false,
      },
    );

    assert!(!layer.store("k", &1u32));
    assert_eq!(layer.read::<u32>("k"), None);
  }

  #[tokio::test]
  async fn test_fetch_hit_skips_fetcher() {
    let layer = layer_with_ttl_ms(5000);
    layer.store("products:list", &vec!["p1".to_string()]);

    let calls = AtomicUsize::new(0);
    let result = layer
      .fetch("products:list", || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, String>(vec!["p2".to_string()]) }
      })
      .await
      .unwrap();

    assert_eq!(result.data, vec!["p1".to_string()]);
    assert_eq!(result.source, CacheSource::Cache);
    assert!(result.cached_at.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_fetch_miss_invokes_fetcher_and_stores() {
    let layer = layer_with_ttl_ms(5000);

    let calls = AtomicUsize::new(0);
    let result = layer
      .fetch("products:list", || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, String>(vec!["p1".to_string()]) }
      })
      .await
      .unwrap();

    assert_eq!(result.data, vec!["p1".to_string()]);
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(layer.read::<Vec<String>>("products:list"), Some(vec!["p1".to_string()]));
  }

  #[tokio::test]
  async fn test_fetch_after_ttl_refreshes_entry() {
    let layer = layer_with_ttl_ms(5000);
    seed_backdated(&layer, "products:list", vec!["p1".to_string()], 6000);

    let result = layer
      .fetch("products:list", || async { Ok::<_, String>(vec!["p2".to_string()]) })
      .await
      .unwrap();

    assert_eq!(result.data, vec!["p2".to_string()]);
    assert_eq!(result.source, CacheSource::Network);
    // The store now holds the new value with a fresh timestamp
    assert_eq!(layer.read::<Vec<String>>("products:list"), Some(vec!["p2".to_string()]));
  }

  #[tokio::test]
  async fn test_fetch_error_propagates_and_caches_nothing() {
    let layer = layer_with_ttl_ms(5000);

    let result = layer
      .fetch::<Vec<String>, _, _, _>("products:list", || async {
        Err::<Vec<String>, _>("network error".to_string())
      })
      .await;

    assert_eq!(result.unwrap_err(), "network error");
    assert_eq!(layer.stats().entries, 0);
    assert_eq!(layer.read::<Vec<String>>("products:list"), None);
  }

  #[tokio::test]
  async fn test_fetch_disabled_invokes_fetcher_every_call() {
    let layer = CacheLayer::with_policy(
      MemoryStore::new(),
      CachePolicy {
        ttl: Duration::milliseconds(5000),
        enabled: false,
      },
    );
    // A previously stored value must not short-circuit anything
    layer.write_entry("k", &vec!["stored".to_string()]);

    let calls = AtomicUsize::new(0);
    for _ in 0..3 {
      let result = layer
        .fetch("k", || {
          calls.fetch_add(1, Ordering::SeqCst);
          async { Ok::<_, String>(vec!["live".to_string()]) }
        })
        .await
        .unwrap();
      assert_eq!(result.data, vec!["live".to_string()]);
      assert_eq!(result.source, CacheSource::Network);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_fetch_with_ttl_override() {
    let layer = layer_with_ttl_ms(5000);
    seed_backdated(&layer, "product:p1", "phone".to_string(), 6000);

    // Under the layer TTL this entry is stale, but the per-call override
    // keeps it alive
    let calls = AtomicUsize::new(0);
    let result = layer
      .fetch_with(
        "product:p1",
        FetchOptions {
          ttl: Some(Duration::milliseconds(600_000)),
          enabled: None,
        },
        || {
          calls.fetch_add(1, Ordering::SeqCst);
          async { Ok::<_, String>("fresh".to_string()) }
        },
      )
      .await
      .unwrap();

    assert_eq!(result.data, "phone");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_refetch_forces_live_retrieval() {
    let layer = layer_with_ttl_ms(5000);
    layer.store("k", &"cached".to_string());

    let result = layer
      .refetch("k", || async { Ok::<_, String>("live".to_string()) })
      .await
      .unwrap();

    assert_eq!(result.data, "live");
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(layer.read::<String>("k"), Some("live".to_string()));
  }

  #[tokio::test]
  async fn test_stats_track_hits_and_misses() {
    let layer = layer_with_ttl_ms(5000);

    assert_eq!(layer.read::<u32>("absent"), None);
    layer.store("k", &1u32);
    assert_eq!(layer.read::<u32>("k"), Some(1));
    assert_eq!(layer.read::<u32>("k"), Some(1));

    let stats = layer.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert!(stats.approx_bytes > 0);
  }
}
