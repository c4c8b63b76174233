//! A named cache region: one store plus its configuration and counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::storage::RegionStore;
use crate::config::{RegionConfig, StoreKind};
use crate::error::Result;

/// Point-in-time counters for a region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionStats {
  pub hits: u64,
  pub misses: u64,
  pub puts: u64,
  pub removals: u64,
  pub entries: usize,
}

impl RegionStats {
  /// Fraction of reads that hit, or 0.0 before the first read.
  pub fn hit_ratio(&self) -> f64 {
    let reads = self.hits + self.misses;
    if reads == 0 {
      0.0
    } else {
      self.hits as f64 / reads as f64
    }
  }
}

/// A live region. Shared between callers as `Arc<Region>`.
pub struct Region {
  name: String,
  config: RegionConfig,
  store: Box<dyn RegionStore>,
  hits: AtomicU64,
  misses: AtomicU64,
  puts: AtomicU64,
  removals: AtomicU64,
}

impl Region {
  pub fn new(name: impl Into<String>, config: RegionConfig, store: Box<dyn RegionStore>) -> Self {
    Self {
      name: name.into(),
      config,
      store,
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
      puts: AtomicU64::new(0),
      removals: AtomicU64::new(0),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn config(&self) -> &RegionConfig {
    &self.config
  }

  /// The kind of store actually backing the region.
  /// Differs from the configured kind when caching is disabled.
  pub fn store_kind(&self) -> StoreKind {
    self.store.kind()
  }

  pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let value = self.store.get(key)?;
    let counter = if value.is_some() {
      &self.hits
    } else {
      &self.misses
    };
    counter.fetch_add(1, Ordering::Relaxed);
    Ok(value)
  }

  pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
    self.store.put(key, value)?;
    self.puts.fetch_add(1, Ordering::Relaxed);
    Ok(())
  }

  /// Remove `key`, returning whether it was present. Only actual removals
  /// are counted.
  pub fn remove(&self, key: &str) -> Result<bool> {
    let removed = self.store.remove(key)?;
    if removed {
      self.removals.fetch_add(1, Ordering::Relaxed);
    }
    Ok(removed)
  }

  pub fn clear(&self) -> Result<()> {
    self.store.clear()
  }

  pub fn keys(&self) -> Result<Vec<String>> {
    self.store.keys()
  }

  pub fn len(&self) -> Result<usize> {
    self.store.len()
  }

  pub fn is_empty(&self) -> Result<bool> {
    self.store.is_empty()
  }

  pub fn evict_expired(&self) -> Result<()> {
    self.store.evict_expired()
  }

  pub fn stats(&self) -> Result<RegionStats> {
    Ok(RegionStats {
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
      puts: self.puts.load(Ordering::Relaxed),
      removals: self.removals.load(Ordering::Relaxed),
      entries: self.store.len()?,
    })
  }
}

impl std::fmt::Debug for Region {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Region")
      .field("name", &self.name)
      .field("store", &self.store.kind())
      .field("config", &self.config)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::memory::MemoryStore;

  fn memory_region(name: &str) -> Region {
    let config = RegionConfig::default();
    let store = Box::new(MemoryStore::new(&config));
    Region::new(name, config, store)
  }

  #[test]
  fn test_stats_count_hits_and_misses() {
    let region = memory_region("users");
    assert!(region.get("a").unwrap().is_none());
    region.put("a", b"1").unwrap();
    assert!(region.get("a").unwrap().is_some());
    assert!(region.get("a").unwrap().is_some());
    assert!(region.remove("a").unwrap());

    let stats = region.stats().unwrap();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.puts, 1);
    assert_eq!(stats.removals, 1);
    assert_eq!(stats.entries, 0);
    assert!((stats.hit_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
  }

  #[test]
  fn test_removing_absent_key_is_not_counted() {
    let region = memory_region("users");
    assert!(!region.remove("missing").unwrap());
    region.put("a", b"1").unwrap();
    assert!(region.remove("a").unwrap());
    assert!(!region.remove("a").unwrap());

    assert_eq!(region.stats().unwrap().removals, 1);
  }

  #[test]
  fn test_hit_ratio_without_reads() {
    assert_eq!(RegionStats::default().hit_ratio(), 0.0);
  }

  #[test]
  fn test_store_kind_and_name() {
    let region = memory_region("orders");
    assert_eq!(region.name(), "orders");
    assert_eq!(region.store_kind(), StoreKind::Memory);
  }
}
