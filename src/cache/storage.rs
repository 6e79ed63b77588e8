//! Cache storage trait and SQLite implementation.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;
use std::time::Duration;

use crate::db::{format_timestamp, parse_timestamp};

/// Trait for key-value cache backends with per-entry expiry.
pub trait CacheStore: Send + Sync {
  /// Get the value stored under `key`, if present and not expired.
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

  /// Store `value` under `key` for `ttl`.
  fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

  /// Remove `key`. Deleting a missing key is not an error.
  fn delete(&self, key: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopCacheStore;

impl CacheStore for NoopCacheStore {
  fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<()> {
    Ok(()) // Discard
  }

  fn delete(&self, _key: &str) -> Result<()> {
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
///
/// Expired rows read as misses and are removed on the read that finds them.
pub struct SqliteCacheStore {
  conn: Mutex<Connection>,
}

impl SqliteCacheStore {
  /// Wrap a connection whose schema has already been migrated.
  pub fn new(conn: Connection) -> Self {
    Self {
      conn: Mutex::new(conn),
    }
  }
}

impl CacheStore for SqliteCacheStore {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let entry: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT value, expires_at FROM cache_entries WHERE key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

    let (value, expires_at) = match entry {
      Some(entry) => entry,
      None => return Ok(None),
    };

    if parse_timestamp(&expires_at)? <= Utc::now() {
      conn
        .execute("DELETE FROM cache_entries WHERE key = ?", params![key])
        .map_err(|e| eyre!("Failed to purge expired cache entry {}: {}", key, e))?;
      return Ok(None);
    }

    Ok(Some(value))
  }

  fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
    let ttl = chrono::Duration::from_std(ttl).map_err(|e| eyre!("Invalid cache TTL: {}", e))?;
    let expires_at = Utc::now()
      .checked_add_signed(ttl)
      .map(format_timestamp)
      .ok_or_else(|| eyre!("Cache TTL out of range"))?;

    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)",
        params![key, value, expires_at],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;

    Ok(())
  }

  fn delete(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM cache_entries WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to delete cache entry {}: {}", key, e))?;

    Ok(())
  }
}
