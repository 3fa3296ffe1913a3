//! Raw HTTP calls to the Telegram Bot API.
//!
//! Wraps reqwest for `sendMessage`, `sendDocument`, `answerCallbackQuery` and
//! `setWebhook`, and implements [`MessageSink`] on top of the first two.

use std::time::Duration;

use reqwest::{Client, multipart};
use serde::de::DeserializeOwned;
use serde_json::json;
use tally_core::{
  reply::{DocumentReply, Markup, MessageSink, Reply, TextReply},
  user::ChatId,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{ApiResponse, ReplyMarkup, SentMessage};

#[derive(Debug, Error)]
pub enum TelegramError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The Bot API answered with `ok: false`.
  #[error("telegram api error: {0}")]
  Api(String),

  #[error("encoding error: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Low-level Telegram Bot API client.
///
/// Cheap to share: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct TelegramApi {
  client:   Client,
  base_url: String,
}

impl TelegramApi {
  /// Create a client for `bot_token` against the public Bot API.
  pub fn new(bot_token: &str) -> Result<Self, TelegramError> {
    Self::with_base_url(bot_token, "https://api.telegram.org")
  }

  /// Create a client with a custom API host (self-hosted Bot API, tests).
  pub fn with_base_url(bot_token: &str, base_url: &str) -> Result<Self, TelegramError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self {
      client,
      base_url: format!("{}/bot{}", base_url.trim_end_matches('/'), bot_token),
    })
  }

  fn url(&self, method: &str) -> String { format!("{}/{method}", self.base_url) }

  async fn check<T: DeserializeOwned>(
    method: &str,
    resp: reqwest::Response,
  ) -> Result<Option<T>, TelegramError> {
    let api_resp: ApiResponse<T> = resp.json().await?;
    if !api_resp.ok {
      let desc = api_resp.description.unwrap_or_default();
      warn!("{method} failed: {desc}");
      return Err(TelegramError::Api(desc));
    }
    Ok(api_resp.result)
  }

  /// Send a text message. Returns the sent message's id.
  pub async fn send_message(
    &self,
    chat: ChatId,
    text: &str,
    markup: Option<&Markup>,
  ) -> Result<i64, TelegramError> {
    let mut body = json!({
      "chat_id": chat.0,
      "text": text,
    });
    if let Some(markup) = markup {
      body["reply_markup"] = serde_json::to_value(ReplyMarkup::from(markup))?;
    }

    debug!(chat = chat.0, "sendMessage");

    let resp = self
      .client
      .post(self.url("sendMessage"))
      .json(&body)
      .send()
      .await?;

    let sent: Option<SentMessage> = Self::check("sendMessage", resp).await?;
    Ok(sent.map_or(0, |m| m.message_id))
  }

  /// Upload a document as `multipart/form-data`.
  pub async fn send_document(
    &self,
    chat: ChatId,
    file_name: &str,
    caption: &str,
    content: Vec<u8>,
    markup: Option<&Markup>,
  ) -> Result<i64, TelegramError> {
    let part = multipart::Part::bytes(content)
      .file_name(file_name.to_owned())
      .mime_str("application/pdf")?;

    let mut form = multipart::Form::new()
      .text("chat_id", chat.0.to_string())
      .text("caption", caption.to_owned())
      .part("document", part);
    if let Some(markup) = markup {
      form = form.text("reply_markup", serde_json::to_string(&ReplyMarkup::from(markup))?);
    }

    debug!(chat = chat.0, file_name, "sendDocument");

    let resp = self
      .client
      .post(self.url("sendDocument"))
      .multipart(form)
      .send()
      .await?;

    let sent: Option<SentMessage> = Self::check("sendDocument", resp).await?;
    Ok(sent.map_or(0, |m| m.message_id))
  }

  /// Acknowledge a button press (dismisses the loading spinner).
  pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
    let resp = self
      .client
      .post(self.url("answerCallbackQuery"))
      .json(&json!({ "callback_query_id": callback_query_id }))
      .send()
      .await?;

    Self::check::<bool>("answerCallbackQuery", resp).await?;
    Ok(())
  }

  /// Point Telegram at our webhook. `secret` is echoed back by Telegram in
  /// the `X-Telegram-Bot-Api-Secret-Token` header of every update.
  pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), TelegramError> {
    let mut body = json!({
      "url": url,
      "allowed_updates": ["message", "callback_query"],
    });
    if let Some(secret) = secret {
      body["secret_token"] = json!(secret);
    }

    let resp = self
      .client
      .post(self.url("setWebhook"))
      .json(&body)
      .send()
      .await?;

    Self::check::<bool>("setWebhook", resp).await?;
    Ok(())
  }
}

impl MessageSink for TelegramApi {
  type Error = TelegramError;

  async fn send(&self, reply: &Reply) -> Result<(), TelegramError> {
    match reply {
      Reply::Text(TextReply { chat, text, markup }) => {
        self.send_message(*chat, text, markup.as_ref()).await?;
      }
      Reply::Document(DocumentReply { chat, file_name, caption, content, markup }) => {
        self
          .send_document(*chat, file_name, caption, content.clone(), markup.as_ref())
          .await?;
      }
    }
    Ok(())
  }
}
