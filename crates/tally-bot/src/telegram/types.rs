//! Serde types for the Telegram Bot API.
//!
//! Only the fields the relay needs are deserialized; unknown fields are
//! ignored.

use serde::{Deserialize, Serialize};
use tally_core::{
  dispatch::Inbound,
  reply::Markup,
  user::{ChatId, UserId},
};

/// Generic Telegram API response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
  pub ok:          bool,
  pub description: Option<String>,
  pub result:      Option<T>,
}

/// An update delivered to the webhook.
#[derive(Debug, Deserialize)]
pub struct Update {
  pub update_id:      i64,
  pub message:        Option<Message>,
  pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
  pub message_id: i64,
  pub from:       Option<User>,
  pub chat:       Chat,
  pub text:       Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
  pub id:       i64,
  pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
  pub id: i64,
}

/// A press on an inline keyboard button.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
  pub id:      String,
  pub from:    User,
  pub message: Option<Message>,
  pub data:    Option<String>,
}

/// An update reduced to what the dispatcher needs, plus the callback query to
/// acknowledge when it came from a button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
  pub inbound:     Inbound,
  pub callback_id: Option<String>,
}

impl Update {
  /// Normalise text messages and button presses into the same shape.
  /// Returns `None` for updates that carry no command text.
  pub fn into_inbound(self) -> Option<InboundUpdate> {
    if let Some(cb) = self.callback_query {
      let text = cb.data?;
      // Private chats share their id with the user, so that is the fallback
      // when the button's message is too old to be included.
      let chat = cb.message.map_or(cb.from.id, |m| m.chat.id);
      return Some(InboundUpdate {
        inbound:     Inbound { text, user: UserId(cb.from.id), chat: ChatId(chat) },
        callback_id: Some(cb.id),
      });
    }

    let msg = self.message?;
    let user = msg.from?;
    let text = msg.text?;
    Some(InboundUpdate {
      inbound:     Inbound { text, user: UserId(user.id), chat: ChatId(msg.chat.id) },
      callback_id: None,
    })
  }
}

// ─── Outbound markup ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
  Keyboard(ReplyKeyboardMarkup),
  Inline(InlineKeyboardMarkup),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardMarkup {
  pub keyboard:        Vec<Vec<KeyboardButton>>,
  pub resize_keyboard: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
  pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
  pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
  pub text:          String,
  pub callback_data: String,
}

impl From<&Markup> for ReplyMarkup {
  fn from(markup: &Markup) -> Self {
    match markup {
      // Quick actions share a single row.
      Markup::QuickActions(actions) => Self::Keyboard(ReplyKeyboardMarkup {
        keyboard:        vec![
          actions.iter().map(|a| KeyboardButton { text: a.clone() }).collect(),
        ],
        resize_keyboard: true,
      }),
      // One account per row.
      Markup::Choices(choices) => Self::Inline(InlineKeyboardMarkup {
        inline_keyboard: choices
          .iter()
          .map(|c| {
            vec![InlineKeyboardButton {
              text:          c.label.clone(),
              callback_data: c.payload.clone(),
            }]
          })
          .collect(),
      }),
    }
  }
}

/// Sent message result; only the id is of interest.
#[derive(Debug, Deserialize)]
pub struct SentMessage {
  pub message_id: i64,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tally_core::{
    command::{Command, CommandKind},
    reply::Choice,
  };

  #[test]
  fn text_message_becomes_inbound() {
    let json = r#"{
      "update_id": 431,
      "message": {
        "message_id": 1,
        "from": {"id": 100500, "is_bot": false, "first_name": "A", "username": "ololo"},
        "chat": {"id": 404040, "type": "private"},
        "date": 1700000000,
        "text": "/get"
      }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    let inbound = update.into_inbound().unwrap();
    assert_eq!(inbound.inbound, Inbound {
      text: "/get".into(),
      user: UserId(100500),
      chat: ChatId(404040),
    });
    assert_eq!(inbound.callback_id, None);
  }

  #[test]
  fn callback_uses_payload_and_message_chat() {
    let json = r#"{
      "update_id": 432,
      "callback_query": {
        "id": "12123",
        "from": {"id": 100500, "is_bot": false, "first_name": "A"},
        "message": {
          "message_id": 2,
          "chat": {"id": 404040, "type": "private"},
          "date": 1700000000,
          "text": "Which account?"
        },
        "data": "/get account_0"
      }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    let inbound = update.into_inbound().unwrap();
    assert_eq!(inbound.inbound.text, "/get account_0");
    assert_eq!(inbound.inbound.user, UserId(100500));
    assert_eq!(inbound.inbound.chat, ChatId(404040));
    assert_eq!(inbound.callback_id.as_deref(), Some("12123"));
  }

  #[test]
  fn callback_without_message_falls_back_to_sender() {
    let json = r#"{
      "update_id": 433,
      "callback_query": {"id": "1", "from": {"id": 77, "first_name": "A"}, "data": "/help"}
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    assert_eq!(update.into_inbound().unwrap().inbound.chat, ChatId(77));
  }

  #[test]
  fn updates_without_text_are_ignored() {
    let sticker = r#"{
      "update_id": 434,
      "message": {"message_id": 3, "from": {"id": 1, "first_name": "A"}, "chat": {"id": 1}}
    }"#;
    let update: Update = serde_json::from_str(sticker).unwrap();
    assert!(update.into_inbound().is_none());

    let edited = r#"{"update_id": 435, "edited_message": {}}"#;
    let update: Update = serde_json::from_str(edited).unwrap();
    assert!(update.into_inbound().is_none());
  }

  #[test]
  fn quick_actions_serialise_as_resized_reply_keyboard() {
    let markup = ReplyMarkup::from(&Markup::QuickActions(vec!["/get".into(), "/receipt".into()]));
    assert_eq!(
      serde_json::to_value(markup).unwrap(),
      json!({
        "keyboard": [[{"text": "/get"}, {"text": "/receipt"}]],
        "resize_keyboard": true,
      }),
    );
  }

  #[test]
  fn choices_serialise_one_button_per_row() {
    let markup = ReplyMarkup::from(&Markup::Choices(vec![
      Choice::new("Addr1", &Command::for_account(CommandKind::GetStatus, "1")),
      Choice::new("Addr2", &Command::for_account(CommandKind::GetStatus, "2")),
    ]));
    assert_eq!(
      serde_json::to_value(markup).unwrap(),
      json!({
        "inline_keyboard": [
          [{"text": "Addr1", "callback_data": "/get 1"}],
          [{"text": "Addr2", "callback_data": "/get 2"}],
        ],
      }),
    );
  }
}
