use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Report, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Days covered by the status summary unless told otherwise
pub const DEFAULT_SUMMARY_DAYS: i64 = 30;
/// Size of the top customers ranking unless told otherwise
pub const DEFAULT_TOP_CUSTOMERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
  Pending,
  Paid,
  Cancelled,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Paid => "PAID",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = Report;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_uppercase().as_str() {
      "PENDING" => Ok(OrderStatus::Pending),
      "PAID" => Ok(OrderStatus::Paid),
      "CANCELLED" => Ok(OrderStatus::Cancelled),
      other => Err(eyre!("Unknown order status: {}", other)),
    }
  }
}

/// Write-side shape of an order. Amounts are in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
  pub customer_id: String,
  pub amount_cents: i64,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

/// Order count and amount for one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusSummary {
  pub status: OrderStatus,
  pub count: u64,
  pub total_amount_cents: i64,
}

/// Paid amount of one customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSpend {
  pub customer_id: String,
  pub total_spend_cents: i64,
}
