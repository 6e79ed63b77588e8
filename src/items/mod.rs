//! Synced items: storage, sync pipeline and cached reads.

pub mod repository;
pub mod service;
pub mod types;

pub use repository::{ItemStore, SqliteItemStore};
pub use service::ItemService;
pub use types::{Item, NewItem, SyncReport};
