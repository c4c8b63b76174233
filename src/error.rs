//! Error types for the cache and dialect layers.

use thiserror::Error;

/// Boxed error produced by a data loader.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by cache regions and the [`CacheKit`](crate::cache::CacheKit) façade.
#[derive(Debug, Error)]
pub enum CacheError {
  /// The backing store of a region failed.
  #[error("cache store error in region [{region}]: {source}")]
  Store {
    region: String,
    #[source]
    source: rusqlite::Error,
  },

  /// A key or value could not be (de)serialized.
  #[error("failed to serialize cache entry: {0}")]
  Serialization(#[from] serde_json::Error),

  /// The loader passed to `get_or_load` failed; nothing was cached.
  #[error("failed to load value for key {key} in region [{region}]: {source}")]
  Loader {
    region: String,
    key: String,
    #[source]
    source: LoaderError,
  },

  /// A region's settings are out of range.
  #[error("invalid config for cache region [{region}]: {reason}")]
  InvalidConfig { region: String, reason: String },

  #[error("lock poisoned: {0}")]
  LockPoisoned(String),

  #[error("cache io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = CacheError> = std::result::Result<T, E>;

/// Errors raised while building or binding SQL.
#[derive(Debug, Error)]
pub enum DialectError {
  #[error("page number and page size must be greater than 0 (got page {page_number}, size {page_size})")]
  InvalidPage { page_number: u64, page_size: u64 },

  #[error("unknown dialect: {0}")]
  UnknownDialect(String),

  #[error("no column to update in table {0}")]
  NothingToUpdate(String),

  #[error("failed to bind parameter {index}: {source}")]
  Bind {
    index: usize,
    #[source]
    source: rusqlite::Error,
  },

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),
}
