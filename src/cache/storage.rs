//! Region store trait and SQLite implementation.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::config::{RegionConfig, StoreKind};
use crate::error::{CacheError, Result};

/// Byte-level key/value store backing a single region.
///
/// Keys arrive already encoded by the façade; stores never interpret them.
/// Implementations must be safe to call from many threads at once.
pub trait RegionStore: Send + Sync {
  /// Get the raw value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

  /// Insert or overwrite an entry.
  fn put(&self, key: &str, value: &[u8]) -> Result<()>;

  /// Remove an entry, returning whether one was there. Removing a missing
  /// key is not an error.
  fn remove(&self, key: &str) -> Result<bool>;

  /// Remove every entry in the region.
  fn clear(&self) -> Result<()>;

  /// Snapshot of the live keys, in no particular order.
  fn keys(&self) -> Result<Vec<String>>;

  /// Number of live entries.
  fn len(&self) -> Result<usize>;

  fn is_empty(&self) -> Result<bool> {
    Ok(self.len()? == 0)
  }

  /// Drop entries whose time-to-live or time-to-idle has passed.
  fn evict_expired(&self) -> Result<()> {
    Ok(())
  }

  fn kind(&self) -> StoreKind;
}

/// Store that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

impl RegionStore for NoopStore {
  fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &str, _value: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<bool> {
    Ok(false)
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  fn len(&self) -> Result<usize> {
    Ok(0)
  }

  fn kind(&self) -> StoreKind {
    StoreKind::Noop
  }
}

/// SQLite-backed region store.
///
/// All disk regions share one table, partitioned by region name. Timestamps
/// are unix milliseconds.
pub struct SqliteStore {
  region: String,
  conn: Mutex<Connection>,
  max_entries: Option<u64>,
  time_to_live: Option<Duration>,
  time_to_idle: Option<Duration>,
}

/// Schema for region entries.
const REGION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS region_entries (
    region TEXT NOT NULL,
    entry_key TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at INTEGER NOT NULL,
    accessed_at INTEGER NOT NULL,
    PRIMARY KEY (region, entry_key)
);

CREATE INDEX IF NOT EXISTS idx_region_entries_accessed
    ON region_entries(region, accessed_at);
"#;

impl SqliteStore {
  /// Open (or create) the database at `path` and bind this store to `region`.
  pub fn open(path: &Path, region: &str, config: &RegionConfig) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }

    let conn = Connection::open(path).map_err(|source| CacheError::Store {
      region: region.to_string(),
      source,
    })?;

    Self::with_connection(conn, region, config)
  }

  /// Open a private in-memory database. Entries vanish with the store.
  pub fn open_in_memory(region: &str, config: &RegionConfig) -> Result<Self> {
    let conn = Connection::open_in_memory().map_err(|source| CacheError::Store {
      region: region.to_string(),
      source,
    })?;

    Self::with_connection(conn, region, config)
  }

  fn with_connection(conn: Connection, region: &str, config: &RegionConfig) -> Result<Self> {
    let store = Self {
      region: region.to_string(),
      conn: Mutex::new(conn),
      max_entries: config.max_entries,
      time_to_live: config.time_to_live(),
      time_to_idle: config.time_to_idle(),
    };
    store.run_migrations()?;

    Ok(store)
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .busy_timeout(Duration::from_secs(5))
      .map_err(|e| self.store_error(e))?;
    conn
      .execute_batch(REGION_SCHEMA)
      .map_err(|e| self.store_error(e))?;

    Ok(())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| CacheError::LockPoisoned(e.to_string()))
  }

  fn store_error(&self, source: rusqlite::Error) -> CacheError {
    CacheError::Store {
      region: self.region.clone(),
      source,
    }
  }

  /// Oldest `cached_at` and `accessed_at` values that are still live.
  /// `None` means the corresponding expiry is not configured.
  fn live_after(&self, now: i64) -> (Option<i64>, Option<i64>) {
    // Durations past i64 milliseconds never expire
    let cutoff = |d: Duration| {
      i64::try_from(d.as_millis())
        .ok()
        .and_then(|ms| now.checked_sub(ms))
        .unwrap_or(i64::MIN)
    };
    (self.time_to_live.map(cutoff), self.time_to_idle.map(cutoff))
  }

  fn is_expired(&self, now: i64, cached_at: i64, accessed_at: i64) -> bool {
    let (ttl_cutoff, tti_cutoff) = self.live_after(now);
    ttl_cutoff.is_some_and(|c| cached_at <= c) || tti_cutoff.is_some_and(|c| accessed_at <= c)
  }

  /// Trim the region back to `max_entries`, least recently accessed first.
  fn enforce_capacity(&self, conn: &Connection) -> Result<()> {
    let Some(max_entries) = self.max_entries else {
      return Ok(());
    };

    let evicted = conn
      .execute(
        "DELETE FROM region_entries WHERE region = ?1 AND entry_key IN (
           SELECT entry_key FROM region_entries WHERE region = ?1
           ORDER BY accessed_at DESC, rowid DESC
           LIMIT -1 OFFSET ?2
         )",
        params![self.region, max_entries as i64],
      )
      .map_err(|e| self.store_error(e))?;

    if evicted > 0 {
      tracing::debug!(region = %self.region, evicted, "evicted entries over capacity");
    }

    Ok(())
  }
}

impl RegionStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let conn = self.lock()?;
    let now = Utc::now().timestamp_millis();

    let row: Option<(Vec<u8>, i64, i64)> = conn
      .query_row(
        "SELECT data, cached_at, accessed_at FROM region_entries
         WHERE region = ? AND entry_key = ?",
        params![self.region, key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()
      .map_err(|e| self.store_error(e))?;

    let Some((data, cached_at, accessed_at)) = row else {
      return Ok(None);
    };

    if self.is_expired(now, cached_at, accessed_at) {
      conn
        .execute(
          "DELETE FROM region_entries WHERE region = ? AND entry_key = ?",
          params![self.region, key],
        )
        .map_err(|e| self.store_error(e))?;
      return Ok(None);
    }

    conn
      .execute(
        "UPDATE region_entries SET accessed_at = ? WHERE region = ? AND entry_key = ?",
        params![now, self.region, key],
      )
      .map_err(|e| self.store_error(e))?;

    Ok(Some(data))
  }

  fn put(&self, key: &str, value: &[u8]) -> Result<()> {
    let conn = self.lock()?;
    let now = Utc::now().timestamp_millis();

    conn
      .execute(
        "INSERT OR REPLACE INTO region_entries (region, entry_key, data, cached_at, accessed_at)
         VALUES (?, ?, ?, ?, ?)",
        params![self.region, key, value, now, now],
      )
      .map_err(|e| self.store_error(e))?;

    self.enforce_capacity(&conn)
  }

  fn remove(&self, key: &str) -> Result<bool> {
    let conn = self.lock()?;

    let deleted = conn
      .execute(
        "DELETE FROM region_entries WHERE region = ? AND entry_key = ?",
        params![self.region, key],
      )
      .map_err(|e| self.store_error(e))?;

    Ok(deleted > 0)
  }

  fn clear(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        "DELETE FROM region_entries WHERE region = ?",
        params![self.region],
      )
      .map_err(|e| self.store_error(e))?;

    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let (ttl_cutoff, tti_cutoff) = self.live_after(Utc::now().timestamp_millis());

    let mut stmt = conn
      .prepare(
        "SELECT entry_key FROM region_entries
         WHERE region = ?1
           AND (?2 IS NULL OR cached_at > ?2)
           AND (?3 IS NULL OR accessed_at > ?3)",
      )
      .map_err(|e| self.store_error(e))?;

    let keys = stmt
      .query_map(params![self.region, ttl_cutoff, tti_cutoff], |row| {
        row.get(0)
      })
      .map_err(|e| self.store_error(e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| self.store_error(e))?;

    Ok(keys)
  }

  fn len(&self) -> Result<usize> {
    let conn = self.lock()?;
    let (ttl_cutoff, tti_cutoff) = self.live_after(Utc::now().timestamp_millis());

    let count: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM region_entries
         WHERE region = ?1
           AND (?2 IS NULL OR cached_at > ?2)
           AND (?3 IS NULL OR accessed_at > ?3)",
        params![self.region, ttl_cutoff, tti_cutoff],
        |row| row.get(0),
      )
      .map_err(|e| self.store_error(e))?;

    Ok(count as usize)
  }

  fn evict_expired(&self) -> Result<()> {
    let (ttl_cutoff, tti_cutoff) = self.live_after(Utc::now().timestamp_millis());
    if ttl_cutoff.is_none() && tti_cutoff.is_none() {
      return Ok(());
    }

    let conn = self.lock()?;
    let evicted = conn
      .execute(
        "DELETE FROM region_entries
         WHERE region = ?1
           AND ((?2 IS NOT NULL AND cached_at <= ?2)
             OR (?3 IS NOT NULL AND accessed_at <= ?3))",
        params![self.region, ttl_cutoff, tti_cutoff],
      )
      .map_err(|e| self.store_error(e))?;

    tracing::debug!(region = %self.region, evicted, "evicted expired entries");
    Ok(())
  }

  fn kind(&self) -> StoreKind {
    StoreKind::Disk
  }
}
