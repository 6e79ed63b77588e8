use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::api_types::Listing;
use super::error::FetchError;
use super::payload::Payload;
use super::retry::RetryPolicy;
use crate::config::UpstreamConfig;

/// Upstream API client with bounded retries
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  resource: String,
  limit: u32,
  retry: RetryPolicy,
}

impl ApiClient {
  pub fn new(config: &UpstreamConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .user_agent(&config.user_agent)
      .timeout(config.timeout())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid upstream base URL {}: {}", config.base_url, e))?;

    Ok(Self {
      http,
      base_url,
      resource: config.resource.clone(),
      limit: config.limit,
      retry: RetryPolicy::from_config(config),
    })
  }

  /// `{base}/{resource}?limit={limit}`
  pub fn listing_url(&self, limit: u32) -> Result<Url, FetchError> {
    let base = self.base_url.as_str().trim_end_matches('/');
    let resource = self.resource.trim_matches('/');
    let mut url = Url::parse(&format!("{}/{}", base, resource))?;
    url
      .query_pairs_mut()
      .append_pair("limit", &limit.to_string());
    Ok(url)
  }

  /// Fetch one listing page; `None` uses the configured page size
  pub async fn fetch_listing(
    &self,
    limit: Option<u32>,
    cancel: &CancellationToken,
  ) -> Result<Listing, FetchError> {
    let url = self.listing_url(limit.unwrap_or(self.limit))?;
    self.get_json(url.as_str(), cancel).await
  }

  /// Fetch the detail object behind a listing entry
  pub async fn fetch_detail(
    &self,
    url: &str,
    cancel: &CancellationToken,
  ) -> Result<Payload, FetchError> {
    let url = Url::parse(url)?;
    self
      .get_with_retry(&url, cancel, |body| Ok(Payload::from_slice(body)?))
      .await
  }

  /// GET `url` and decode the JSON body into `T`
  pub async fn get_json<T: DeserializeOwned>(
    &self,
    url: &str,
    cancel: &CancellationToken,
  ) -> Result<T, FetchError> {
    let url = Url::parse(url)?;
    self
      .get_with_retry(&url, cancel, |body| Ok(serde_json::from_slice(body)?))
      .await
  }

  async fn get_with_retry<T, D>(
    &self,
    url: &Url,
    cancel: &CancellationToken,
    decode: D,
  ) -> Result<T, FetchError>
  where
    D: Fn(&[u8]) -> Result<T, FetchError>,
  {
    let decode = &decode;
    self
      .retry
      .run(cancel, move |attempt| async move {
        debug!(%url, attempt, "GET");
        let body = self.get_once(url).await?;
        decode(&body)
      })
      .await
  }

  /// Single GET without retries. Non-2xx statuses become errors.
  async fn get_once(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
    let response = self.http.get(url.clone()).send().await?;
    let status = response.status();

    if status.is_success() {
      return Ok(response.bytes().await?.to_vec());
    }

    let body = response.text().await.unwrap_or_default();
    Err(FetchError::from_status(status.as_u16(), body))
  }
}
