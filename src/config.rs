use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub upstream: UpstreamConfig,
  pub cache: CacheConfig,
  pub database: DatabaseConfig,
  pub sync: SyncConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
  /// Base URL of the upstream API, without a trailing resource
  pub base_url: String,
  /// Listed resource, appended to `base_url`
  pub resource: String,
  /// Page size requested by the listing call
  pub limit: u32,
  /// Additional attempts after the first one
  pub max_retries: u32,
  /// Delay before the first retry; doubles on every further retry
  pub backoff_base_ms: u64,
  /// Upper bound for a single backoff delay (uncapped if unset)
  pub max_backoff_secs: Option<u64>,
  /// Per-request timeout
  pub timeout_secs: u64,
  /// Stop retrying on non-retryable status codes (anything but 429/503)
  pub fail_fast_on_terminal: bool,
  /// Classification stored with every synced item
  pub item_type: String,
  pub user_agent: String,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      base_url: "https://pokeapi.co/api/v2".to_string(),
      resource: "pokemon".to_string(),
      limit: 20,
      max_retries: 3,
      backoff_base_ms: 1000,
      max_backoff_secs: None,
      timeout_secs: 10,
      fail_fast_on_terminal: false,
      item_type: "pokemon".to_string(),
      user_agent: concat!("itemsync/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

impl UpstreamConfig {
  pub fn backoff_base(&self) -> Duration {
    Duration::from_millis(self.backoff_base_ms)
  }

  pub fn max_backoff(&self) -> Option<Duration> {
    self.max_backoff_secs.map(Duration::from_secs)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Disable to read straight from the database every time
  pub enabled: bool,
  /// Key holding the serialized item collection
  pub key: String,
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      key: "api:items".to_string(),
      ttl_secs: 300,
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.ttl_secs)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  /// SQLite file (defaults to $XDG_DATA_HOME/itemsync/itemsync.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Cadence of `itemsync run`
  pub interval_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self { interval_secs: 900 }
  }
}

impl SyncConfig {
  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Also write daily-rolling log files into this directory
  pub directory: Option<PathBuf>,
  /// Default filter when RUST_LOG is not set
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      directory: None,
      level: "info".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./itemsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/itemsync/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    Ok(config.apply_env())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("itemsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("itemsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty document deserializes to unit, not to an empty mapping
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Apply environment overrides.
  ///
  /// Checks ITEMSYNC_BASE_URL.
  pub fn apply_env(mut self) -> Self {
    if let Ok(base_url) = std::env::var("ITEMSYNC_BASE_URL") {
      if !base_url.is_empty() {
        self.upstream.base_url = base_url;
      }
    }
    self
  }
}
