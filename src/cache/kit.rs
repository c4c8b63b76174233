//! Cache façade: typed get/put over named regions with load-on-miss.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::loader::DataLoader;
use super::region::{Region, RegionStats};
use super::registry::RegionRegistry;
use crate::error::{CacheError, LoaderError, Result};

/// Typed access to cache regions.
///
/// Keys and values are stored JSON-encoded, so any serde type works. A stored
/// `null` is a value, not a miss: `get::<_, Option<T>>` returns `Some(None)`
/// for it and `None` only when the key is absent.
///
/// Every call resolves its region through the shared [`RegionRegistry`],
/// creating the region with default settings if it is not configured.
#[derive(Clone)]
pub struct CacheKit {
  registry: Arc<RegionRegistry>,
}

impl CacheKit {
  pub fn new(registry: Arc<RegionRegistry>) -> Self {
    Self { registry }
  }

  pub fn registry(&self) -> &Arc<RegionRegistry> {
    &self.registry
  }

  /// Resolve a region directly.
  pub fn region(&self, region: &str) -> Result<Arc<Region>> {
    self.registry.resolve(region)
  }

  /// Insert or overwrite an entry.
  pub fn put<K, V>(&self, region: &str, key: &K, value: &V) -> Result<()>
  where
    K: Serialize + ?Sized,
    V: Serialize + ?Sized,
  {
    let region = self.registry.resolve(region)?;
    let key = encode_key(key)?;
    let data = serde_json::to_vec(value)?;
    region.put(&key, &data)
  }

  /// Get an entry, or `None` if the key is absent.
  pub fn get<K, V>(&self, region: &str, key: &K) -> Result<Option<V>>
  where
    K: Serialize + ?Sized,
    V: DeserializeOwned,
  {
    let region = self.registry.resolve(region)?;
    let key = encode_key(key)?;
    match region.get(&key)? {
      Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
      None => Ok(None),
    }
  }

  /// Remove an entry; a no-op when the key is absent.
  pub fn remove<K>(&self, region: &str, key: &K) -> Result<()>
  where
    K: Serialize + ?Sized,
  {
    let region = self.registry.resolve(region)?;
    region.remove(&encode_key(key)?)?;
    Ok(())
  }

  /// Remove every entry in the region.
  pub fn remove_all(&self, region: &str) -> Result<()> {
    self.registry.resolve(region)?.clear()
  }

  /// Snapshot of the region's keys, in no particular order.
  pub fn keys<K>(&self, region: &str) -> Result<Vec<K>>
  where
    K: DeserializeOwned,
  {
    let region = self.registry.resolve(region)?;
    region
      .keys()?
      .iter()
      .map(|key| serde_json::from_str(key).map_err(CacheError::from))
      .collect()
  }

  /// Get an entry, calling `loader` and caching its result on a miss.
  ///
  /// The loader runs at most once per call and only on a miss. Concurrent
  /// callers that miss together may each run their loader; the last `put`
  /// wins. A failing loader surfaces as [`CacheError::Loader`] and nothing is
  /// stored.
  pub fn get_or_load<K, V, L>(&self, region: &str, key: &K, loader: L) -> Result<V>
  where
    K: Serialize + ?Sized,
    V: Serialize + DeserializeOwned,
    L: DataLoader<V>,
  {
    if let Some(value) = self.get(region, key)? {
      return Ok(value);
    }

    let value = loader
      .load()
      .map_err(|source| self.loader_error(region, key, source))?;
    self.put(region, key, &value)?;
    Ok(value)
  }

  /// Async counterpart of [`get_or_load`](Self::get_or_load).
  ///
  /// Same guarantees: one loader call per miss, no coalescing across callers.
  pub async fn get_or_load_async<K, V, F, Fut, E>(
    &self,
    region: &str,
    key: &K,
    loader: F,
  ) -> Result<V>
  where
    K: Serialize + ?Sized,
    V: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<V, E>>,
    E: Into<LoaderError>,
  {
    if let Some(value) = self.get(region, key)? {
      return Ok(value);
    }

    let value = loader()
      .await
      .map_err(|e| self.loader_error(region, key, e.into()))?;
    self.put(region, key, &value)?;
    Ok(value)
  }

  pub fn stats(&self, region: &str) -> Result<RegionStats> {
    self.registry.resolve(region)?.stats()
  }

  fn loader_error<K>(&self, region: &str, key: &K, source: LoaderError) -> CacheError
  where
    K: Serialize + ?Sized,
  {
    let key = encode_key(key).unwrap_or_else(|_| "<unencodable>".to_string());
    debug!(region, key = %key, error = %source, "loader failed");
    CacheError::Loader {
      region: region.to_string(),
      key,
      source,
    }
  }
}

fn encode_key<K: Serialize + ?Sized>(key: &K) -> Result<String> {
  Ok(serde_json::to_string(key)?)
}
