//! Time-boxed cache in front of the system of record.
//!
//! This module provides a storage-agnostic cache-aside mechanism that:
//! - Caches whole collections under a single key with a fixed TTL
//! - Treats unreadable or undecodable entries as misses
//! - Never fails a read because the cache could not be written

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStore, NoopCacheStore, SqliteCacheStore};
pub use traits::{CacheResult, CacheSource};
