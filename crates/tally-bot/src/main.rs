//! tally-bot server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid with
//! `TALLY_*` environment variables, opens the SQLite store, starts the
//! reconciliation loop and serves the Telegram webhook over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tally_bot::{AppState, BotConfig, HttpBillingProvider, TelegramApi};
use tally_core::{dispatch::Dispatcher, reconcile::Reconciler};
use tally_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tally billing notification bot")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TALLY"))
    .build()
    .context("failed to read config file")?;

  let cfg: BotConfig = settings
    .try_deserialize()
    .context("failed to deserialise BotConfig")?;
  let sweep_interval = cfg
    .sweep_interval()
    .context("sweep_interval_secs must be at least 1")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let provider = HttpBillingProvider::new(&cfg.billing_base_url)
    .context("failed to build billing client")?;
  let provider = Arc::new(provider);

  let telegram = TelegramApi::with_base_url(&cfg.bot_token, &cfg.telegram_api_url)
    .context("failed to build Telegram client")?;
  let telegram = Arc::new(telegram);

  if let Some(public_url) = &cfg.public_url {
    let webhook_url = format!("{}/webhook", public_url.trim_end_matches('/'));
    telegram
      .set_webhook(&webhook_url, cfg.webhook_secret.as_deref())
      .await
      .with_context(|| format!("failed to register webhook {webhook_url}"))?;
    tracing::info!("Webhook registered at {webhook_url}");
  }

  // Background sweep.
  let reconciler = Reconciler::new(
    store.clone(),
    provider.clone(),
    telegram.clone(),
    sweep_interval,
  );
  let sweep = tokio::spawn(async move { reconciler.run().await });

  let state = AppState {
    dispatcher:     Arc::new(Dispatcher::new(store, provider)),
    telegram,
    webhook_secret: cfg.webhook_secret.as_deref().map(Arc::from),
  };

  let app = tally_bot::router(state);
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  sweep.abort();
  tracing::info!("Shut down");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!("failed to listen for Ctrl-C: {e}");
    std::future::pending::<()>().await;
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
