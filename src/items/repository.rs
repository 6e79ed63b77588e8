//! System of record for synced items.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::sync::Mutex;

use super::types::{Item, NewItem};
use crate::db::{format_timestamp, parse_timestamp};

/// Trait for item storage backends.
pub trait ItemStore: Send + Sync {
  /// Insert `item`, or overwrite the row with the same `external_id`.
  fn upsert(&self, item: &NewItem) -> Result<()>;

  /// All items, most recently created first.
  fn all_items(&self) -> Result<Vec<Item>>;
}

/// SQLite-based item storage.
///
/// Overwrites keep the row id and `created_at` and bump `updated_at`.
pub struct SqliteItemStore {
  conn: Mutex<Connection>,
}

impl SqliteItemStore {
  /// Wrap a connection whose schema has already been migrated.
  pub fn new(conn: Connection) -> Self {
    Self {
      conn: Mutex::new(conn),
    }
  }
}

impl ItemStore for SqliteItemStore {
  fn upsert(&self, item: &NewItem) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let now = format_timestamp(Utc::now());

    conn
      .execute(
        "INSERT INTO items (external_id, name, type, data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(external_id) DO UPDATE SET
           name = excluded.name,
           type = excluded.type,
           data = excluded.data,
           updated_at = excluded.updated_at",
        params![item.external_id, item.name, item.item_type, item.data, now],
      )
      .map_err(|e| eyre!("Failed to save item {}: {}", item.external_id, e))?;

    Ok(())
  }

  fn all_items(&self) -> Result<Vec<Item>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT id, name, type, external_id, data, created_at, updated_at
         FROM items
         ORDER BY id DESC",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, String>(3)?,
          row.get::<_, String>(4)?,
          row.get::<_, String>(5)?,
          row.get::<_, String>(6)?,
        ))
      })
      .map_err(|e| eyre!("Failed to query items: {}", e))?;

    let mut items = Vec::new();
    for row in rows {
      let (id, name, item_type, external_id, data, created_at, updated_at) =
        row.map_err(|e| eyre!("Failed to read item row: {}", e))?;
      items.push(Item {
        id,
        name,
        item_type,
        external_id,
        data,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
      });
    }

    Ok(items)
  }
}
