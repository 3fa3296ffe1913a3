//! Telegram front end for the Tally relay.
//!
//! Receives updates on an axum webhook, hands them to the
//! [`Dispatcher`](tally_core::dispatch::Dispatcher) and delivers its replies
//! through the [`TelegramApi`]. The billing cabinet is reached through
//! [`HttpBillingProvider`].

pub mod billing;
pub mod error;
pub mod telegram;

pub use billing::{HttpBillingProvider, ProviderError};
pub use error::Error;
pub use telegram::{TelegramApi, TelegramError};

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  body::Bytes,
  extract::State,
  http::{HeaderMap, StatusCode},
  routing::{get, post},
};
use serde::Deserialize;
use subtle::ConstantTimeEq as _;
use tally_core::{
  dispatch::Dispatcher,
  provider::BillingProvider,
  reply::MessageSink,
  store::UserStore,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use telegram::Update;

/// Header Telegram echoes the `secret_token` from `setWebhook` in.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `TALLY_*`
/// environment variables.
///
/// No `Debug`: it holds the bot token.
#[derive(Deserialize, Clone)]
pub struct BotConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub bot_token:           String,
  #[serde(default)]
  pub webhook_secret:      Option<String>,
  /// Externally reachable base URL; `setWebhook` is called with
  /// `<public_url>/webhook` when present.
  #[serde(default)]
  pub public_url:          Option<String>,
  #[serde(default = "default_telegram_api_url")]
  pub telegram_api_url:    String,
  pub billing_base_url:    String,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
}

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_telegram_api_url() -> String { "https://api.telegram.org".to_owned() }
fn default_store_path() -> PathBuf { PathBuf::from("tally.db") }
fn default_sweep_interval_secs() -> u64 { 4 * 60 * 60 }

impl BotConfig {
  /// Pause between reconciliation sweeps; `None` when configured as zero.
  pub fn sweep_interval(&self) -> Option<Duration> {
    (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the webhook handler.
pub struct AppState<S, P> {
  pub dispatcher:     Arc<Dispatcher<S, P>>,
  pub telegram:       Arc<TelegramApi>,
  pub webhook_secret: Option<Arc<str>>,
}

// Derived `Clone` would demand `S: Clone` and `P: Clone`.
impl<S, P> Clone for AppState<S, P> {
  fn clone(&self) -> Self {
    Self {
      dispatcher:     Arc::clone(&self.dispatcher),
      telegram:       Arc::clone(&self.telegram),
      webhook_secret: self.webhook_secret.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`]: `POST /webhook` for Telegram updates and
/// `GET /health` for liveness probes.
pub fn router<S, P>(state: AppState<S, P>) -> Router
where
  S: UserStore + 'static,
  P: BillingProvider + 'static,
{
  Router::new()
    .route("/webhook", post(webhook::<S, P>))
    .route("/health", get(health))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> &'static str { "ok" }

/// `POST /webhook`
///
/// Rejects requests without the configured secret, then handles the update
/// and answers 200 whatever the outcome of the handling itself.
async fn webhook<S, P>(
  State(state): State<AppState<S, P>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<StatusCode, Error>
where
  S: UserStore + 'static,
  P: BillingProvider + 'static,
{
  if let Some(secret) = &state.webhook_secret {
    let presented = headers.get(SECRET_HEADER).map(|v| v.as_bytes()).unwrap_or_default();
    if !secret_matches(secret, presented) {
      return Err(Error::Unauthorized);
    }
  }

  let update: Update =
    serde_json::from_slice(&body).map_err(|e| Error::BadRequest(e.to_string()))?;
  let update_id = update.update_id;

  let Some(update) = update.into_inbound() else {
    debug!(update_id, "ignoring update without command text");
    return Ok(StatusCode::OK);
  };

  let reply = state.dispatcher.handle(&update.inbound).await;
  if let Err(e) = state.telegram.send(&reply).await {
    warn!(chat = %reply.chat(), error = %e, "failed to deliver reply");
  }

  if let Some(callback_id) = &update.callback_id
    && let Err(e) = state.telegram.answer_callback_query(callback_id).await
  {
    warn!(update_id, error = %e, "failed to answer callback query");
  }

  Ok(StatusCode::OK)
}

/// Constant-time comparison of the configured secret with the presented one.
fn secret_matches(expected: &str, presented: &[u8]) -> bool {
  let expected = expected.as_bytes();
  expected.len() == presented.len() && bool::from(expected.ct_eq(presented))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
