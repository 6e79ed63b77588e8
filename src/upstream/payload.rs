//! Opaque upstream objects and best-effort field extraction.

use serde_json::{Map, Value};

/// A single upstream object, kept verbatim.
///
/// Only JSON objects are accepted. The raw text is what gets persisted; the
/// decoded map is used for identity and name extraction.
#[derive(Debug, Clone)]
pub struct Payload {
  raw: String,
  object: Map<String, Value>,
}

impl Payload {
  pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
    let object: Map<String, Value> = serde_json::from_slice(bytes)?;
    Ok(Self {
      raw: String::from_utf8_lossy(bytes).into_owned(),
      object,
    })
  }

  /// The payload exactly as received.
  pub fn raw(&self) -> &str {
    &self.raw
  }

  /// String rendering of `field`.
  ///
  /// Strings are returned as-is, numbers in decimal form (integers stay
  /// integral), anything else as compact JSON. Missing and `null` fields
  /// yield `None`.
  pub fn field_string(&self, field: &str) -> Option<String> {
    match self.object.get(field)? {
      Value::Null => None,
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      other => Some(other.to_string()),
    }
  }

  /// Upstream identity (`id`), if present and non-empty.
  pub fn identity(&self) -> Option<String> {
    self.field_string("id").filter(|id| !id.is_empty())
  }
}
