//! Region registry: maps region names to live regions.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::memory::MemoryStore;
use super::region::Region;
use super::storage::{NoopStore, RegionStore, SqliteStore};
use crate::config::{CacheConfig, RegionConfig, StoreKind};
use crate::error::{CacheError, Result};

/// Owns every region for the lifetime of the application.
///
/// Construct one at startup, share it behind an `Arc`, and call
/// [`shutdown`](Self::shutdown) on the way out. Regions named in the config
/// are created eagerly; any other name gets a region with the default
/// settings on first use.
pub struct RegionRegistry {
  regions: DashMap<String, Arc<Region>>,
  config: CacheConfig,
}

impl RegionRegistry {
  /// Create the registry and start every configured region.
  pub fn new(config: CacheConfig) -> Result<Self> {
    let registry = Self {
      regions: DashMap::new(),
      config,
    };

    for (name, region_config) in &registry.config.regions {
      let region = registry.create_region(name, region_config)?;
      registry.regions.insert(name.clone(), Arc::new(region));
    }

    info!(
      regions = registry.regions.len(),
      enabled = registry.config.enabled,
      "cache registry started"
    );

    Ok(registry)
  }

  pub fn config(&self) -> &CacheConfig {
    &self.config
  }

  /// Resolve `name` to its region, creating it if needed.
  ///
  /// At most one region is ever created per name: racing first calls all
  /// receive the same `Arc`. A failed creation leaves the name unregistered.
  ///
  /// Creation runs while holding the write lock of the map shard that `name`
  /// hashes to. Opening a disk region can wait up to the SQLite busy timeout,
  /// and during that time other first-time resolves on the same shard wait
  /// too. Names that already exist are read without the write lock.
  pub fn resolve(&self, name: &str) -> Result<Arc<Region>> {
    if let Some(region) = self.regions.get(name) {
      return Ok(Arc::clone(region.value()));
    }

    let entry = self
      .regions
      .entry(name.to_string())
      .or_try_insert_with(|| {
        let region_config = match self.config.region(name) {
          Some(config) => config,
          None => {
            warn!("Could not find cache config [{}], using default.", name);
            &self.config.default_region
          }
        };
        let region = self.create_region(name, region_config)?;
        debug!("Cache [{}] started.", name);
        Ok::<_, CacheError>(Arc::new(region))
      })?;

    Ok(Arc::clone(entry.value()))
  }

  /// Names of all live regions, sorted.
  pub fn region_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.regions.iter().map(|e| e.key().clone()).collect();
    names.sort();
    names
  }

  /// Evict expired entries and drop every region.
  ///
  /// Later calls to `resolve` start regions afresh; disk regions pick up
  /// whatever they persisted.
  pub fn shutdown(&self) {
    for entry in self.regions.iter() {
      if let Err(e) = entry.value().evict_expired() {
        warn!(region = %entry.key(), error = %e, "failed to evict expired entries on shutdown");
      }
    }
    let count = self.regions.len();
    self.regions.clear();
    info!(regions = count, "cache registry shut down");
  }

  fn create_region(&self, name: &str, config: &RegionConfig) -> Result<Region> {
    if let Some(reason) = config.expiry_error() {
      return Err(CacheError::InvalidConfig {
        region: name.to_string(),
        reason,
      });
    }

    let store: Box<dyn RegionStore> = if !self.config.enabled {
      Box::new(NoopStore)
    } else {
      match config.store {
        StoreKind::Memory => Box::new(MemoryStore::new(config)),
        StoreKind::Disk => Box::new(SqliteStore::open(&self.config.db_path(), name, config)?),
        StoreKind::Noop => Box::new(NoopStore),
      }
    };

    Ok(Region::new(name, config.clone(), store))
  }
}

impl std::fmt::Debug for RegionRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RegionRegistry")
      .field("regions", &self.region_names())
      .field("enabled", &self.config.enabled)
      .finish()
  }
}
