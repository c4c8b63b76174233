//! In-process region store built on moka.

use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::storage::RegionStore;
use crate::config::{RegionConfig, StoreKind, MAX_EXPIRY_SECS};
use crate::error::Result;

/// Concurrent in-memory store honoring the region's capacity and expiry settings.
pub struct MemoryStore {
  cache: Cache<String, Arc<[u8]>>,
}

impl MemoryStore {
  /// Expiry settings above [`MAX_EXPIRY_SECS`] are clamped to it.
  pub fn new(config: &RegionConfig) -> Self {
    let max_expiry = Duration::from_secs(MAX_EXPIRY_SECS);
    let mut builder = Cache::builder();
    if let Some(max_entries) = config.max_entries {
      builder = builder.max_capacity(max_entries);
    }
    if let Some(ttl) = config.time_to_live() {
      builder = builder.time_to_live(ttl.min(max_expiry));
    }
    if let Some(tti) = config.time_to_idle() {
      builder = builder.time_to_idle(tti.min(max_expiry));
    }

    Self {
      cache: builder.build(),
    }
  }
}

impl RegionStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    Ok(self.cache.get(key).map(|data| data.to_vec()))
  }

  fn put(&self, key: &str, value: &[u8]) -> Result<()> {
    self.cache.insert(key.to_string(), Arc::from(value));
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<bool> {
    Ok(self.cache.remove(key).is_some())
  }

  fn clear(&self) -> Result<()> {
    self.cache.invalidate_all();
    self.cache.run_pending_tasks();
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(self.cache.iter().map(|(key, _)| key.as_ref().clone()).collect())
  }

  fn len(&self) -> Result<usize> {
    // entry_count() lags behind pending writes; iterate for an exact figure
    Ok(self.cache.iter().count())
  }

  fn evict_expired(&self) -> Result<()> {
    self.cache.run_pending_tasks();
    Ok(())
  }

  fn kind(&self) -> StoreKind {
    StoreKind::Memory
  }
}

impl std::fmt::Debug for MemoryStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MemoryStore")
      .field("entries", &self.cache.entry_count())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_put_get_remove() {
    let store = MemoryStore::new(&RegionConfig::default());
    store.put("k", b"v").unwrap();
    assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));

    assert!(store.remove("k").unwrap());
    assert!(store.get("k").unwrap().is_none());
    assert!(!store.remove("k").unwrap());
  }

  #[test]
  fn test_clear_empties_keys() {
    let store = MemoryStore::new(&RegionConfig::default());
    for key in ["a", "b", "c"] {
      store.put(key, b"1").unwrap();
    }

    let mut keys = store.keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["a", "b", "c"]);

    store.clear().unwrap();
    assert!(store.keys().unwrap().is_empty());
    assert!(store.is_empty().unwrap());
  }

  #[test]
  fn test_time_to_live_expires_entries() {
    let config = RegionConfig {
      time_to_live_secs: Some(1),
      ..RegionConfig::default()
    };
    let store = MemoryStore::new(&config);
    store.put("k", b"v").unwrap();
    assert!(store.get("k").unwrap().is_some());

    std::thread::sleep(Duration::from_millis(1100));
    assert!(store.get("k").unwrap().is_none());
  }

  #[test]
  fn test_expiry_beyond_limit_is_clamped() {
    let config = RegionConfig {
      time_to_live_secs: Some(40_000_000_000),
      time_to_idle_secs: Some(u64::MAX),
      ..RegionConfig::default()
    };
    let store = MemoryStore::new(&config);
    store.put("k", b"v").unwrap();
    assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
  }

  #[test]
  fn test_capacity_is_bounded() {
    let config = RegionConfig {
      max_entries: Some(10),
      ..RegionConfig::default()
    };
    let store = MemoryStore::new(&config);
    for i in 0..100 {
      store.put(&i.to_string(), b"x").unwrap();
    }
    store.evict_expired().unwrap();
    assert!(store.len().unwrap() <= 10);
  }
}
