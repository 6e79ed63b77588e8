//! Serde-deserializable types matching upstream listing responses.

use serde::Deserialize;
use serde_json::Value;

/// One page of a listing endpoint, e.g. `GET /pokemon?limit=20`.
///
/// Entries are kept loosely typed so a single malformed entry cannot fail
/// the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Listing {
  #[serde(default)]
  pub count: Option<u64>,
  #[serde(default)]
  pub next: Option<String>,
  #[serde(default)]
  pub results: Vec<Value>,
}

impl Listing {
  /// Detail URL of a listing entry, if it has a usable one.
  pub fn detail_url(entry: &Value) -> Option<&str> {
    entry
      .get("url")
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|url| !url.is_empty())
  }
}
