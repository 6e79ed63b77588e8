use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use itemsync::cache::{CacheLayer, CacheStore, NoopCacheStore, SqliteCacheStore};
use itemsync::config::Config;
use itemsync::db::Database;
use itemsync::items::{ItemService, ItemStore, SqliteItemStore};
use itemsync::orders::types::{DEFAULT_SUMMARY_DAYS, DEFAULT_TOP_CUSTOMERS};
use itemsync::orders::{NewOrder, OrderStatus, SqliteOrderStore};
use itemsync::upstream::ApiClient;

#[derive(Parser, Debug)]
#[command(name = "itemsync")]
#[command(about = "Sync records from a paginated HTTP API and serve them from a TTL cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./itemsync.yaml or $XDG_CONFIG_HOME/itemsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// SQLite database file
  #[arg(long)]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run one sync and print its report
  Sync,
  /// Print all stored items as JSON
  Items,
  /// Sync now and then on every interval until Ctrl-C
  Run {
    /// Seconds between syncs (overrides sync.interval_secs)
    #[arg(long)]
    interval: Option<u64>,
  },
  /// Record orders and print order reports
  Orders {
    #[command(subcommand)]
    command: OrdersCommand,
  },
}

#[derive(Subcommand, Debug)]
enum OrdersCommand {
  /// Record one order
  Add {
    #[arg(long)]
    customer: String,
    /// Amount in cents
    #[arg(long)]
    amount_cents: i64,
    /// PENDING, PAID or CANCELLED
    #[arg(long, default_value = "PENDING")]
    status: OrderStatus,
  },
  /// Order count and amount per status over recent days
  Summary {
    #[arg(long, default_value_t = DEFAULT_SUMMARY_DAYS)]
    days: i64,
  },
  /// Customers with the highest paid total
  TopCustomers {
    #[arg(long, default_value_t = DEFAULT_TOP_CUSTOMERS)]
    limit: usize,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(database) = args.database {
    config.database.path = Some(database);
  }

  let _log_guard = itemsync::logging::init(&config.log)?;

  let client = ApiClient::new(&config.upstream)?;
  let store = SqliteItemStore::new(open_connection(&config)?);

  if config.cache.enabled {
    let cache = SqliteCacheStore::new(open_connection(&config)?);
    dispatch(args.command, build_service(&config, client, store, cache), &config).await
  } else {
    dispatch(args.command, build_service(&config, client, store, NoopCacheStore), &config).await
  }
}

fn open_connection(config: &Config) -> Result<rusqlite::Connection> {
  Ok(Database::open(config.database.path.as_deref())?.into_connection())
}

fn open_order_store(config: &Config) -> Result<SqliteOrderStore> {
  Ok(SqliteOrderStore::new(open_connection(config)?))
}

fn run_orders(command: OrdersCommand, store: SqliteOrderStore) -> Result<()> {
  match command {
    OrdersCommand::Add {
      customer,
      amount_cents,
      status,
    } => {
      let id = store.record(&NewOrder {
        customer_id: customer,
        amount_cents,
        status,
        created_at: chrono::Utc::now(),
      })?;
      info!(id, "Order recorded");
    }
    OrdersCommand::Summary { days } => {
      let since = chrono::Duration::try_days(days)
        .and_then(|window| chrono::Utc::now().checked_sub_signed(window))
        .ok_or_else(|| eyre!("--days out of range: {}", days))?;
      let summary = store.summary_by_status(since)?;
      println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    OrdersCommand::TopCustomers { limit } => {
      let customers = store.top_customers_by_spend(limit)?;
      println!("{}", serde_json::to_string_pretty(&customers)?);
    }
  }

  Ok(())
}

fn build_service<S: ItemStore, C: CacheStore>(
  config: &Config,
  client: ApiClient,
  store: S,
  cache: C,
) -> ItemService<S, C> {
  let cache = CacheLayer::new(cache).with_ttl(config.cache.ttl());
  ItemService::new(client, store, cache)
    .with_cache_key(config.cache.key.clone())
    .with_item_type(config.upstream.item_type.clone())
}

async fn dispatch<S, C>(command: Command, service: ItemService<S, C>, config: &Config) -> Result<()>
where
  S: ItemStore,
  C: CacheStore,
{
  match command {
    Command::Sync => {
      let cancel = shutdown_token();
      let report = service.sync_items(&cancel).await?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Command::Items => {
      let items = service.get_all_items().await?;
      println!("{}", serde_json::to_string_pretty(&items)?);
    }
    Command::Run { interval } => {
      let interval = interval
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| config.sync.interval());
      run_periodic(service, interval).await;
    }
    Command::Orders { command } => run_orders(command, open_order_store(config)?)?,
  }

  Ok(())
}

/// Token cancelled on Ctrl-C.
fn shutdown_token() -> CancellationToken {
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("Shutdown requested");
      trigger.cancel();
    }
  });
  cancel
}

async fn run_periodic<S, C>(service: ItemService<S, C>, interval: std::time::Duration)
where
  S: ItemStore,
  C: CacheStore,
{
  let cancel = shutdown_token();
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

  info!(?interval, "Running scheduled syncs");

  loop {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => break,
      _ = ticker.tick() => {}
    }

    match service.sync_items(&cancel).await {
      Ok(report) if report.fetch_failures + report.persist_failures > 0 => {
        warn!(?report, "Scheduled sync completed with failures");
      }
      Ok(_) => info!("Scheduled sync completed successfully"),
      Err(e) if cancel.is_cancelled() => {
        info!("Scheduled sync interrupted: {}", e);
        break;
      }
      Err(e) => error!("Scheduled sync failed: {:#}", e),
    }
  }

  info!("Stopped scheduled syncs");
}
