//! Outbound replies and the `MessageSink` trait.
//!
//! A [`Reply`] is transport-neutral: the Telegram adapter maps [`Markup`] onto
//! reply keyboards and inline keyboards, but nothing here knows about that.

use std::future::Future;

use crate::{command::Command, user::ChatId};

/// Keyboard attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
  /// Persistent quick-reply keyboard; each entry is sent back as typed text.
  QuickActions(Vec<String>),
  /// One inline button per row; pressing it sends `payload` back.
  Choices(Vec<Choice>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
  pub label:   String,
  /// Itself a valid command string.
  pub payload: String,
}

impl Choice {
  pub fn new(label: impl Into<String>, command: &Command) -> Self {
    Self { label: label.into(), payload: command.to_string() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReply {
  pub chat:   ChatId,
  pub text:   String,
  pub markup: Option<Markup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReply {
  pub chat:      ChatId,
  pub file_name: String,
  pub caption:   String,
  pub content:   Vec<u8>,
  pub markup:    Option<Markup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
  Text(TextReply),
  Document(DocumentReply),
}

impl Reply {
  pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
    Self::Text(TextReply { chat, text: text.into(), markup: None })
  }

  pub fn chat(&self) -> ChatId {
    match self {
      Self::Text(t) => t.chat,
      Self::Document(d) => d.chat,
    }
  }

  pub fn markup(&self) -> Option<&Markup> {
    match self {
      Self::Text(t) => t.markup.as_ref(),
      Self::Document(d) => d.markup.as_ref(),
    }
  }

  /// Attach `markup`, replacing any keyboard already present.
  pub fn with_markup(mut self, markup: Markup) -> Self {
    match &mut self {
      Self::Text(t) => t.markup = Some(markup),
      Self::Document(d) => d.markup = Some(markup),
    }
    self
  }

  /// Text body for messages, caption for documents.
  pub fn body(&self) -> &str {
    match self {
      Self::Text(t) => &t.text,
      Self::Document(d) => &d.caption,
    }
  }
}

/// Delivers replies to their chat.
pub trait MessageSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send<'a>(
    &'a self,
    reply: &'a Reply,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
