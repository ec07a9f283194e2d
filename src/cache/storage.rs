//! Key-value store trait and its in-memory and SQLite backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::error::CacheError;

/// Trait for cache storage backends.
///
/// Keys and values are plain strings; serialization is the layer's concern.
/// Implementations may fail on quota or I/O problems; the cache layer treats
/// every failure as a miss.
pub trait KeyValueStore: Send + Sync {
  /// Look up the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

  /// Write `value` under `key`, overwriting any existing value.
  fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

  /// Remove the value stored under `key`. Removing an absent key is not an
  /// error.
  fn delete(&self, key: &str) -> Result<(), CacheError>;

  /// All keys currently present. Used for prefix invalidation and stats.
  fn keys(&self) -> Result<Vec<String>, CacheError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
  fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
    (**self).set(key, value)
  }

  fn delete(&self, key: &str) -> Result<(), CacheError> {
    (**self).delete(key)
  }

  fn keys(&self) -> Result<Vec<String>, CacheError> {
    (**self).keys()
  }
}

/// A store selected at runtime from configuration.
pub type BoxedStore = Box<dyn KeyValueStore>;

/// In-memory store backed by a mutex-guarded map.
///
/// Nothing survives the process; useful for tests and for running with an
/// ephemeral cache.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
    let entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
    let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<(), CacheError> {
    let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
    entries.remove(key);
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>, CacheError> {
    let entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
    Ok(entries.keys().cloned().collect())
  }
}

/// Schema for the key-value table.
const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// SQLite-backed durable store. A single table holds the serialized entries.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open a store at the default location under the platform data directory.
  pub fn open_default() -> Result<Self, CacheError> {
    Self::open(&Self::default_path()?)
  }

  /// Open a store at an explicit path, creating parent directories as
  /// needed.
  pub fn open(path: &Path) -> Result<Self, CacheError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| CacheError::Open(format!("failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      CacheError::Open(format!("failed to open cache database at {}: {}", path.display(), e))
    })?;

    Self::from_connection(conn)
  }

  /// Open an ephemeral in-memory store.
  pub fn open_in_memory() -> Result<Self, CacheError> {
    let conn = Connection::open_in_memory()
      .map_err(|e| CacheError::Open(format!("failed to open in-memory database: {}", e)))?;

    Self::from_connection(conn)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf, CacheError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| CacheError::Open("could not determine data directory".to_string()))?;

    Ok(data_dir.join("storecache").join("cache.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self, CacheError> {
    conn
      .execute_batch(KV_SCHEMA)
      .map_err(|e| CacheError::Open(format!("failed to run cache migrations: {}", e)))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
    self.conn.lock().map_err(|_| CacheError::LockPoisoned)
  }
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
    let conn = self.lock()?;

    conn
      .query_row("SELECT value FROM kv_cache WHERE key = ?", params![key], |row| row.get(0))
      .optional()
      .map_err(|e| CacheError::Store(e.to_string()))
  }

  fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
    let conn = self.lock()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_cache (key, value) VALUES (?, ?)",
        params![key, value],
      )
      .map_err(|e| CacheError::Store(e.to_string()))?;

    Ok(())
  }

  fn delete(&self, key: &str) -> Result<(), CacheError> {
    let conn = self.lock()?;

    conn
      .execute("DELETE FROM kv_cache WHERE key = ?", params![key])
      .map_err(|e| CacheError::Store(e.to_string()))?;

    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>, CacheError> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT key FROM kv_cache")
      .map_err(|e| CacheError::Store(e.to_string()))?;

    let keys = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| CacheError::Store(e.to_string()))?
      .collect::<Result<Vec<String>, _>>()
      .map_err(|e| CacheError::Store(e.to_string()))?;

    Ok(keys)
  }
}
