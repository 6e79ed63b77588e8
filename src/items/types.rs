use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::upstream::Payload;

/// A synced record as stored in the system of record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  pub id: i64,
  pub name: String,
  #[serde(rename = "type")]
  pub item_type: String,
  pub external_id: String,
  /// Full upstream payload (JSON)
  pub data: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Write-side shape of an item, keyed by `external_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
  pub external_id: String,
  pub name: String,
  pub item_type: String,
  pub data: String,
}

impl NewItem {
  /// Map an upstream payload fetched from `source_url`.
  ///
  /// The identity is the payload's `id`; payloads without one are keyed by
  /// the URL they were fetched from.
  pub fn from_payload(payload: &Payload, source_url: &str, item_type: &str) -> Self {
    Self {
      external_id: payload
        .identity()
        .unwrap_or_else(|| source_url.to_string()),
      name: payload.field_string("name").unwrap_or_default(),
      item_type: item_type.to_string(),
      data: payload.raw().to_string(),
    }
  }
}

/// Outcome of one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  /// Entries returned by the listing
  pub listed: usize,
  /// Entries without a usable detail URL
  pub skipped: usize,
  pub fetch_failures: usize,
  pub persisted: usize,
  pub persist_failures: usize,
}
