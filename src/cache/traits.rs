//! Core types for the caching system.

/// Result from a cache-aside read, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Data decoded from a cache entry.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  /// Data read from the system of record.
  pub fn from_origin(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Origin,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// A live, decodable cache entry
  Cache,
  /// The system of record, after a miss or an unreadable entry
  Origin,
}
