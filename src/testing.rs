//! Shared fixtures for unit tests: in-process upstream server and store stubs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use color_eyre::{eyre::eyre, Result};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::cache::CacheStore;
use crate::config::UpstreamConfig;
use crate::db::Database;
use crate::items::{Item, ItemStore, NewItem, SqliteItemStore};

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
  serve_with(|_| router).await
}

/// Like [`serve`], but the router is built knowing its own base URL.
pub async fn serve_with<F>(build: F) -> String
where
  F: FnOnce(&str) -> Router,
{
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let base = format!("http://{}", listener.local_addr().unwrap());
  let router = build(&base);
  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });
  base
}

/// Upstream settings pointing at `base_url` with millisecond backoff.
pub fn test_upstream_config(base_url: &str, max_retries: u32) -> UpstreamConfig {
  UpstreamConfig {
    base_url: base_url.to_string(),
    max_retries,
    backoff_base_ms: 1,
    timeout_secs: 5,
    ..UpstreamConfig::default()
  }
}

/// Fake paginated API: `GET /pokemon?limit=n` and `GET /pokemon/{id}`.
#[derive(Default)]
pub struct FakeUpstream {
  base: String,
  /// Listing size before the `limit` cut
  pub total: usize,
  /// Detail ids that always answer 500
  pub failing: HashSet<usize>,
  /// Detail ids whose payload has no `id` field
  pub anonymous: HashSet<usize>,
  /// Listing entries without a `url`
  pub without_url: HashSet<usize>,
  /// Detail ids that never answer
  pub stalled: HashSet<usize>,
  /// Signalled when a request for a stalled id arrives
  pub stall_reached: Notify,
  /// Status returned by the listing endpoint instead of a page
  pub listing_status: Option<StatusCode>,
  pub listing_hits: AtomicUsize,
  pub detail_hits: AtomicUsize,
}

impl FakeUpstream {
  pub fn new(total: usize) -> Self {
    Self {
      total,
      ..Self::default()
    }
  }

  /// Start serving and return the shared state together with the base URL.
  pub async fn start(mut self) -> (Arc<Self>, String) {
    let mut state = None;
    let base = serve_with(|base| {
      self.base = base.to_string();
      let shared = Arc::new(self);
      state = Some(shared.clone());
      Router::new()
        .route("/pokemon", get(listing))
        .route("/pokemon/{id}", get(detail))
        .with_state(shared)
    })
    .await;
    (state.unwrap(), base)
  }

  pub fn detail_url(&self, id: usize) -> String {
    format!("{}/pokemon/{}", self.base, id)
  }
}

async fn listing(
  State(upstream): State<Arc<FakeUpstream>>,
  Query(params): Query<HashMap<String, String>>,
) -> Response {
  upstream.listing_hits.fetch_add(1, Ordering::SeqCst);
  if let Some(status) = upstream.listing_status {
    return status.into_response();
  }

  let limit = params
    .get("limit")
    .and_then(|l| l.parse().ok())
    .unwrap_or(upstream.total);

  let results: Vec<_> = (1..=upstream.total.min(limit))
    .map(|id| {
      if upstream.without_url.contains(&id) {
        json!({ "name": format!("poke-{}", id) })
      } else {
        json!({ "name": format!("poke-{}", id), "url": upstream.detail_url(id) })
      }
    })
    .collect();

  Json(json!({ "count": upstream.total, "next": null, "results": results })).into_response()
}

async fn detail(State(upstream): State<Arc<FakeUpstream>>, Path(id): Path<usize>) -> Response {
  upstream.detail_hits.fetch_add(1, Ordering::SeqCst);
  if upstream.stalled.contains(&id) {
    upstream.stall_reached.notify_one();
    tokio::time::sleep(Duration::from_secs(3600)).await;
  }
  if upstream.failing.contains(&id) {
    return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
  }

  let revision = upstream.listing_hits.load(Ordering::SeqCst);
  if upstream.anonymous.contains(&id) {
    return Json(json!({ "name": format!("poke-{}", id), "revision": revision })).into_response();
  }
  Json(json!({ "id": id, "name": format!("poke-{}", id), "revision": revision })).into_response()
}

/// In-memory cache store that records TTLs and can be told to fail.
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
  entries: Arc<Mutex<HashMap<String, (Vec<u8>, Duration)>>>,
  fail_reads: Arc<AtomicBool>,
  fail_writes: Arc<AtomicBool>,
}

impl MemoryCacheStore {
  pub fn fail_reads(&self, fail: bool) {
    self.fail_reads.store(fail, Ordering::SeqCst);
  }

  pub fn fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  /// Bytes stored under `key`, bypassing failure injection.
  pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
    self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
  }

  pub fn put_raw(&self, key: &str, value: &[u8]) {
    self
      .entries
      .lock()
      .unwrap()
      .insert(key.to_string(), (value.to_vec(), Duration::from_secs(60)));
  }

  pub fn ttl_of(&self, key: &str) -> Option<Duration> {
    self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
  }
}

impl CacheStore for MemoryCacheStore {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(eyre!("cache unavailable"));
    }
    Ok(self.raw(key))
  }

  fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(eyre!("cache unavailable"));
    }
    self
      .entries
      .lock()
      .unwrap()
      .insert(key.to_string(), (value.to_vec(), ttl));
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<()> {
    self.entries.lock().unwrap().remove(key);
    Ok(())
  }
}

/// SQLite item store that counts calls and can reject chosen identities.
#[derive(Clone)]
pub struct CountingItemStore {
  inner: Arc<SqliteItemStore>,
  reads: Arc<AtomicUsize>,
  writes: Arc<AtomicUsize>,
  rejected: Arc<Mutex<HashSet<String>>>,
}

impl CountingItemStore {
  pub fn new() -> Self {
    let conn = Database::open_in_memory().unwrap().into_connection();
    Self {
      inner: Arc::new(SqliteItemStore::new(conn)),
      reads: Arc::default(),
      writes: Arc::default(),
      rejected: Arc::default(),
    }
  }

  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }

  pub fn writes(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  pub fn reject(&self, external_id: &str) {
    self.rejected.lock().unwrap().insert(external_id.to_string());
  }
}

impl ItemStore for CountingItemStore {
  fn upsert(&self, item: &NewItem) -> Result<()> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    if self.rejected.lock().unwrap().contains(&item.external_id) {
      return Err(eyre!("constraint violation for {}", item.external_id));
    }
    self.inner.upsert(item)
  }

  fn all_items(&self) -> Result<Vec<Item>> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    self.inner.all_items()
  }
}
