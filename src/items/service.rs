//! Sync pipeline and cache-aside reads for items.

use color_eyre::eyre::{Report, WrapErr};
use color_eyre::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::repository::ItemStore;
use super::types::{Item, NewItem, SyncReport};
use crate::cache::{CacheLayer, CacheStore};
use crate::upstream::{ApiClient, FetchError, Listing};

pub const DEFAULT_CACHE_KEY: &str = "api:items";
pub const DEFAULT_ITEM_TYPE: &str = "pokemon";

/// Item service: pulls items from upstream and serves them through the cache.
///
/// All collaborators are injected. Clones share the same store, cache and
/// sync guard, so one instance can be handed to every task.
pub struct ItemService<S: ItemStore, C: CacheStore> {
  client: ApiClient,
  store: Arc<S>,
  cache: CacheLayer<C>,
  cache_key: String,
  item_type: String,
  /// Serializes syncs within the process
  sync_guard: Arc<Mutex<()>>,
}

impl<S: ItemStore, C: CacheStore> ItemService<S, C> {
  pub fn new(client: ApiClient, store: S, cache: CacheLayer<C>) -> Self {
    Self {
      client,
      store: Arc::new(store),
      cache,
      cache_key: DEFAULT_CACHE_KEY.to_string(),
      item_type: DEFAULT_ITEM_TYPE.to_string(),
      sync_guard: Arc::new(Mutex::new(())),
    }
  }

  /// Set the key holding the cached item collection.
  pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
    self.cache_key = key.into();
    self
  }

  /// Set the classification stored with every synced item.
  pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
    self.item_type = item_type.into();
    self
  }

  /// Fetch the listing and every item behind it, store them, then drop the
  /// cached collection.
  ///
  /// Only a failed listing (or cancellation) fails the sync. Items that
  /// cannot be fetched or stored are logged and counted in the report.
  pub async fn sync_items(&self, cancel: &CancellationToken) -> Result<SyncReport> {
    let _guard = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(Report::new(FetchError::Cancelled).wrap_err("Sync cancelled")),
      guard = self.sync_guard.lock() => guard,
    };

    info!("Starting item sync");

    let listing = self
      .client
      .fetch_listing(None, cancel)
      .await
      .wrap_err("Failed to fetch item listing")?;

    let mut report = SyncReport {
      listed: listing.results.len(),
      ..SyncReport::default()
    };

    for entry in &listing.results {
      let Some(url) = Listing::detail_url(entry) else {
        report.skipped += 1;
        continue;
      };

      let payload = match self.client.fetch_detail(url, cancel).await {
        Ok(payload) => payload,
        Err(FetchError::Cancelled) => {
          return Err(Report::new(FetchError::Cancelled).wrap_err("Sync cancelled"));
        }
        Err(e) => {
          warn!(url, error = %e, "Failed to fetch item details");
          report.fetch_failures += 1;
          continue;
        }
      };

      let item = NewItem::from_payload(&payload, url, &self.item_type);
      match self.store.upsert(&item) {
        Ok(()) => report.persisted += 1,
        Err(e) => {
          warn!(external_id = %item.external_id, error = %e, "Failed to save item");
          report.persist_failures += 1;
        }
      }
    }

    if let Err(e) = self.cache.invalidate(&self.cache_key) {
      warn!(key = %self.cache_key, error = %e, "Failed to invalidate item cache");
    }

    info!(
      listed = report.listed,
      persisted = report.persisted,
      skipped = report.skipped,
      fetch_failures = report.fetch_failures,
      persist_failures = report.persist_failures,
      "Item sync finished"
    );

    Ok(report)
  }

  /// All items, newest first, from the cache when it holds a usable snapshot.
  pub async fn get_all_items(&self) -> Result<Vec<Item>> {
    let store = Arc::clone(&self.store);
    let result = self
      .cache
      .get_or_load(&self.cache_key, || async move {
        store.all_items().wrap_err("Failed to get items")
      })
      .await?;

    Ok(result.data)
  }
}

impl<S: ItemStore, C: CacheStore> Clone for ItemService<S, C> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      store: Arc::clone(&self.store),
      cache: self.cache.clone(),
      cache_key: self.cache_key.clone(),
      item_type: self.item_type.clone(),
      sync_guard: Arc::clone(&self.sync_guard),
    }
  }
}
