//! Configuration loading.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cache::{BoxedStore, CacheError, CachePolicy, MemoryStore, SqliteStore};

/// Default API base URL (a locally running backend).
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Errors from loading or parsing a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  NotFound(PathBuf),

  #[error("failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    source: serde_yaml::Error,
  },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the storefront API
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

/// Which store backs the cache.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
  /// Durable SQLite database
  #[default]
  Sqlite,
  /// Ephemeral in-process map
  Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Entry time-to-live in milliseconds
  #[serde(default = "default_ttl_ms")]
  pub ttl_ms: u64,
  /// Whether caching is enabled at all
  #[serde(default = "default_enabled")]
  pub enabled: bool,
  #[serde(default)]
  pub backend: CacheBackend,
  /// Explicit database path for the sqlite backend; defaults to the
  /// platform data directory
  #[serde(default)]
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_ms: default_ttl_ms(),
      enabled: default_enabled(),
      backend: CacheBackend::default(),
      path: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_ttl_ms() -> u64 {
  CachePolicy::default().ttl.num_milliseconds() as u64
}

fn default_enabled() -> bool {
  CachePolicy::default().enabled
}

impl CacheConfig {
  /// Translate into a cache layer policy.
  pub fn policy(&self) -> CachePolicy {
    CachePolicy {
      ttl: chrono::Duration::milliseconds(self.ttl_ms as i64),
      enabled: self.enabled,
    }
  }

  /// Construct the configured store backend.
  pub fn build_store(&self) -> Result<BoxedStore, CacheError> {
    match self.backend {
      CacheBackend::Memory => Ok(Box::new(MemoryStore::new())),
      CacheBackend::Sqlite => {
        let store = match &self.path {
          Some(path) => SqliteStore::open(path)?,
          None => SqliteStore::open_default()?,
        };
        Ok(Box::new(store))
      }
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./storecache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storecache/config.yaml
  ///
  /// Defaults apply when no file exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ConfigError::NotFound(p.to_path_buf()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("storecache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storecache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.cache.ttl_ms, 300_000);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.backend, CacheBackend::Sqlite);
  }

  #[test]
  fn test_parse_full_config() {
    let raw = r#"
api:
  base_url: https://store.example.com/api
cache:
  ttl_ms: 60000
  enabled: false
  backend: memory
"#;

    let config: Config = serde_yaml::from_str(raw).unwrap();
    assert_eq!(config.api.base_url, "https://store.example.com/api");
    assert_eq!(config.cache.ttl_ms, 60_000);
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
  }

  #[test]
  fn test_partial_config_keeps_defaults() {
    let raw = r#"
cache:
  ttl_ms: 1000
"#;

    let config: Config = serde_yaml::from_str(raw).unwrap();
    assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.cache.ttl_ms, 1000);
    assert!(config.cache.enabled);
  }

  #[test]
  fn test_policy_conversion() {
    let config = CacheConfig {
      ttl_ms: 5000,
      enabled: true,
      backend: CacheBackend::Memory,
      path: None,
    };

    let policy = config.policy();
    assert_eq!(policy.ttl, chrono::Duration::milliseconds(5000));
    assert!(policy.enabled);
  }
}
