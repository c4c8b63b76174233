//! ormkit: SQL dialects and a region cache for a small ORM.
//!
//! - [`dialect`] turns table metadata and values into per-database SQL text.
//! - [`cache`] provides named cache regions behind the [`cache::CacheKit`] façade.

pub mod cache;
pub mod config;
pub mod dialect;
pub mod error;
pub mod logging;

#[cfg(test)]
mod test_support;
