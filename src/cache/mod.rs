//! Region cache for data access layers.
//!
//! This module provides named cache regions behind a single façade:
//! - Regions are resolved by name; unknown names get default settings
//! - Each region is backed by moka (memory), SQLite (disk) or nothing
//! - `CacheKit::get_or_load` fills misses from a caller-supplied loader
//!
//! The registry is created once at startup and handed to whoever needs it;
//! there is no global cache manager.

mod kit;
mod loader;
mod memory;
mod region;
mod registry;
mod storage;

pub use kit::CacheKit;
pub use loader::DataLoader;
pub use memory::MemoryStore;
pub use region::{Region, RegionStats};
pub use registry::RegionRegistry;
pub use storage::{NoopStore, RegionStore, SqliteStore};
