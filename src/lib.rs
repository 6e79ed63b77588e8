//! Periodic sync of a paginated HTTP API into SQLite, read through a TTL cache.

pub mod cache;
pub mod config;
pub mod db;
pub mod items;
pub mod logging;
pub mod orders;
pub mod upstream;

#[cfg(test)]
mod testing;
