//! Cache error types.

use thiserror::Error;

/// Errors arising from the backing key-value store or entry serialization.
///
/// These only cross the public API from explicit store constructors; inside
/// the cache layer every one of them is recovered, logged, and treated as a
/// cache miss.
#[derive(Error, Debug)]
pub enum CacheError {
  /// Failed to open the backing store.
  #[error("failed to open cache store: {0}")]
  Open(String),

  /// A store operation failed.
  #[error("store operation failed: {0}")]
  Store(String),

  /// The store's lock was poisoned by a panicking thread.
  #[error("cache store lock poisoned")]
  LockPoisoned,

  /// Entry serialization or deserialization failed.
  #[error("cache entry serialization failed: {0}")]
  Serialization(#[from] serde_json::Error),
}
