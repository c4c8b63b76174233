use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dialect::DialectKind;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// SQL dialect used by the `sql` commands (defaults to mysql)
  #[serde(default)]
  pub dialect: DialectKind,
  /// Log bound statement parameters at debug level
  #[serde(default)]
  pub show_sql: bool,
  #[serde(default)]
  pub logging: LoggingConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Default level filter, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Optional log file; rolled daily next to the given path
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// When false, every region discards writes and misses on reads
  #[serde(default = "default_enabled")]
  pub enabled: bool,
  /// Directory holding `cache.db` for disk regions
  pub data_dir: Option<PathBuf>,
  /// Settings used for regions that are not configured by name
  #[serde(default)]
  pub default_region: RegionConfig,
  #[serde(default)]
  pub regions: BTreeMap<String, RegionConfig>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      data_dir: None,
      default_region: RegionConfig::default(),
      regions: BTreeMap::new(),
    }
  }
}

fn default_enabled() -> bool {
  true
}

impl CacheConfig {
  /// Path of the SQLite file backing disk regions.
  pub fn db_path(&self) -> PathBuf {
    let dir = self.data_dir.clone().unwrap_or_else(|| {
      dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ormkit")
    });
    dir.join("cache.db")
  }

  /// Look up the configuration for a named region.
  pub fn region(&self, name: &str) -> Option<&RegionConfig> {
    self.regions.get(name)
  }
}

/// Where a region keeps its entries.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
  /// In-process moka cache
  #[default]
  Memory,
  /// SQLite table, survives restarts
  Disk,
  /// Discards everything
  #[serde(rename = "none")]
  Noop,
}

impl std::fmt::Display for StoreKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Self::Memory => "memory",
      Self::Disk => "disk",
      Self::Noop => "none",
    };
    f.write_str(name)
  }
}

/// Longest accepted time-to-live or time-to-idle (1000 years).
pub const MAX_EXPIRY_SECS: u64 = 1000 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RegionConfig {
  #[serde(default)]
  pub store: StoreKind,
  /// Upper bound on entries; least recently used entries are evicted first
  pub max_entries: Option<u64>,
  /// Entries expire this long after they were written
  pub time_to_live_secs: Option<u64>,
  /// Entries expire this long after they were last read or written
  pub time_to_idle_secs: Option<u64>,
}

impl RegionConfig {
  pub fn time_to_live(&self) -> Option<Duration> {
    self.time_to_live_secs.map(Duration::from_secs)
  }

  pub fn time_to_idle(&self) -> Option<Duration> {
    self.time_to_idle_secs.map(Duration::from_secs)
  }

  /// Describe the first expiry setting above [`MAX_EXPIRY_SECS`], if any.
  pub fn expiry_error(&self) -> Option<String> {
    [
      ("time_to_live_secs", self.time_to_live_secs),
      ("time_to_idle_secs", self.time_to_idle_secs),
    ]
    .into_iter()
    .find_map(|(field, secs)| {
      secs
        .filter(|&secs| secs > MAX_EXPIRY_SECS)
        .map(|secs| format!("{} = {} exceeds the maximum of {}", field, secs, MAX_EXPIRY_SECS))
    })
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ormkit.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ormkit/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
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
    let local = PathBuf::from("ormkit.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ormkit").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse configuration from a YAML document.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }
}
