//! Order analytics over the local orders table.

pub mod repository;
pub mod types;

pub use repository::SqliteOrderStore;
pub use types::{CustomerSpend, NewOrder, OrderStatus, OrderStatusSummary};
