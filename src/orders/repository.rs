//! SQLite queries behind the order reports.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::sync::Mutex;

use super::types::{CustomerSpend, NewOrder, OrderStatusSummary};
use crate::db::format_timestamp;

pub struct SqliteOrderStore {
  conn: Mutex<Connection>,
}

impl SqliteOrderStore {
  /// Wrap a connection whose schema has already been migrated.
  pub fn new(conn: Connection) -> Self {
    Self {
      conn: Mutex::new(conn),
    }
  }

  /// Insert `order` and return its row id.
  pub fn record(&self, order: &NewOrder) -> Result<i64> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT INTO orders (customer_id, amount_cents, status, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
          order.customer_id,
          order.amount_cents,
          order.status.as_str(),
          format_timestamp(order.created_at)
        ],
      )
      .map_err(|e| eyre!("Failed to save order for {}: {}", order.customer_id, e))?;

    Ok(conn.last_insert_rowid())
  }

  /// Count and amount per status of the orders created at or after `since`,
  /// sorted by status.
  pub fn summary_by_status(&self, since: DateTime<Utc>) -> Result<Vec<OrderStatusSummary>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // Fixed-width UTC timestamps compare correctly as text
    let mut stmt = conn
      .prepare(
        "SELECT status, COUNT(*), SUM(amount_cents)
         FROM orders
         WHERE created_at >= ?1
         GROUP BY status
         ORDER BY status",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows = stmt
      .query_map(params![format_timestamp(since)], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, i64>(1)?,
          row.get::<_, i64>(2)?,
        ))
      })
      .map_err(|e| eyre!("Failed to query order summary: {}", e))?;

    let mut summaries = Vec::new();
    for row in rows {
      let (status, count, total_amount_cents) =
        row.map_err(|e| eyre!("Failed to read order summary row: {}", e))?;
      summaries.push(OrderStatusSummary {
        status: status.parse()?,
        count: count as u64,
        total_amount_cents,
      });
    }

    Ok(summaries)
  }

  /// The `limit` customers with the highest total over paid orders.
  pub fn top_customers_by_spend(&self, limit: usize) -> Result<Vec<CustomerSpend>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT customer_id, SUM(amount_cents) AS total_spend
         FROM orders
         WHERE status = 'PAID'
         GROUP BY customer_id
         ORDER BY total_spend DESC, customer_id
         LIMIT ?1",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows = stmt
      .query_map(params![limit as i64], |row| {
        Ok(CustomerSpend {
          customer_id: row.get(0)?,
          total_spend_cents: row.get(1)?,
        })
      })
      .map_err(|e| eyre!("Failed to query top customers: {}", e))?;

    rows
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read customer row: {}", e))
  }
}
