//! Cache layer that orchestrates cache-aside reads and invalidation.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use super::storage::CacheStore;
use super::traits::CacheResult;

/// Cache layer that keeps whole-collection snapshots in a [`CacheStore`].
///
/// Cache failures never reach the caller: unreadable or undecodable entries
/// count as misses and failed writes are only logged. The only error a read
/// can return is the loader's.
///
/// Every invalidation bumps a generation shared by all clones. A load that
/// started before an invalidation does not write its result back, so a
/// snapshot read before a sync cannot outlive the sync's invalidation.
pub struct CacheLayer<S: CacheStore> {
  storage: Arc<S>,
  /// How long a written snapshot stays valid
  ttl: Duration,
  generation: Arc<Mutex<u64>>,
}

impl<S: CacheStore> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      ttl: Duration::from_secs(5 * 60),
      generation: Arc::default(),
    }
  }

  /// Set the time-to-live of written snapshots.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Read `key` with a cache-aside strategy.
  ///
  /// 1. Look up the key - a decodable entry is returned immediately
  /// 2. On a miss, a read error or a decode error, call `loader`
  /// 3. Store the loaded value under `key` (best effort), unless the layer
  ///    was invalidated while loading
  pub async fn get_or_load<T, F, Fut>(&self, key: &str, loader: F) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    match self.storage.get(key) {
      Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
        Ok(data) => {
          debug!(key, "Cache hit");
          return Ok(CacheResult::from_cache(data));
        }
        Err(e) => debug!(key, error = %e, "Discarding undecodable cache entry"),
      },
      Ok(None) => debug!(key, "Cache miss"),
      Err(e) => debug!(key, error = %e, "Cache read failed, treating as miss"),
    }

    let started = self.current_generation();
    let data = loader().await?;
    self.store(key, &data, started);

    Ok(CacheResult::from_origin(data))
  }

  /// Drop the entry under `key` so the next read goes to the origin.
  pub fn invalidate(&self, key: &str) -> Result<()> {
    let mut generation = self
      .generation
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *generation += 1;
    self.storage.delete(key)
  }

  fn current_generation(&self) -> Option<u64> {
    self.generation.lock().ok().map(|generation| *generation)
  }

  fn store<T: Serialize>(&self, key: &str, data: &T, started: Option<u64>) {
    let bytes = match serde_json::to_vec(data) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(key, error = %e, "Failed to serialize cache entry");
        return;
      }
    };

    // Held across the write so an invalidation cannot slip in between
    let Ok(generation) = self.generation.lock() else {
      warn!(key, "Cache generation lock poisoned, skipping write");
      return;
    };
    if started != Some(*generation) {
      debug!(key, "Cache invalidated during load, skipping write");
      return;
    }

    if let Err(e) = self.storage.set(key, &bytes, self.ttl) {
      warn!(key, error = %e, "Failed to write cache entry");
    }
  }
}

impl<S: CacheStore> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      ttl: self.ttl,
      generation: Arc::clone(&self.generation),
    }
  }
}
