//! Loaders produce values for cache misses.

use crate::error::LoaderError;

/// Produces a value when `get_or_load` misses.
///
/// Any `FnOnce() -> Result<V, E>` closure is a loader. Types that carry their
/// own lookup state (a repository handle, a query) can implement this
/// directly.
pub trait DataLoader<V> {
  fn load(self) -> Result<V, LoaderError>;
}

impl<V, E, F> DataLoader<V> for F
where
  F: FnOnce() -> Result<V, E>,
  E: Into<LoaderError>,
{
  fn load(self) -> Result<V, LoaderError> {
    self().map_err(Into::into)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Constant(u32);

  impl DataLoader<u32> for Constant {
    fn load(self) -> Result<u32, LoaderError> {
      Ok(self.0)
    }
  }

  #[test]
  fn test_closure_loader() {
    let loader = || Ok::<_, std::io::Error>("value".to_string());
    assert_eq!(loader.load().unwrap(), "value");
  }

  #[test]
  fn test_closure_loader_error_is_boxed() {
    let loader = || Err::<u32, _>(std::io::Error::other("db down"));
    let err = loader.load().unwrap_err();
    assert_eq!(err.to_string(), "db down");
  }

  #[test]
  fn test_named_loader() {
    assert_eq!(Constant(7).load().unwrap(), 7);
  }
}
