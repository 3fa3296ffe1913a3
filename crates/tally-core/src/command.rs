//! Command parsing.
//!
//! The same grammar serves typed text and inline-button payloads: a selector
//! button carries `"<keyword> <account>"`, which is produced by
//! [`Command::for_account`] and read back by [`parse`]. The parser never needs
//! to know which of the two sources the text came from.

use std::fmt;

use strum::EnumString;

use crate::{Error, Result};

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum CommandKind {
  #[strum(serialize = "/reg")]
  Register,
  #[strum(serialize = "/notify")]
  Subscribe,
  #[strum(serialize = "/get")]
  GetStatus,
  #[strum(serialize = "/receipt")]
  GetDocument,
  #[strum(serialize = "/help")]
  Help,
  /// Produced by the dispatcher for text that failed to parse.
  #[strum(disabled)]
  Unknown,
}

impl CommandKind {
  pub fn keyword(self) -> Option<&'static str> {
    match self {
      Self::Register => Some("/reg"),
      Self::Subscribe => Some("/notify"),
      Self::GetStatus => Some("/get"),
      Self::GetDocument => Some("/receipt"),
      Self::Help => Some("/help"),
      Self::Unknown => None,
    }
  }

  /// Commands that operate on one of the user's linked accounts.
  pub fn is_account_scoped(self) -> bool {
    matches!(self, Self::Subscribe | Self::GetStatus | Self::GetDocument)
  }
}

/// A validated command. Built fresh per inbound update and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub kind: CommandKind,
  pub args: Vec<String>,
}

impl Command {
  pub fn new(kind: CommandKind) -> Self { Self { kind, args: Vec::new() } }

  pub fn unknown() -> Self { Self::new(CommandKind::Unknown) }

  /// The command a selector button re-issues once the user picks `number`.
  pub fn for_account(kind: CommandKind, number: impl Into<String>) -> Self {
    Self { kind, args: vec![number.into()] }
  }

  /// The explicitly requested account number, if any.
  pub fn account(&self) -> Option<&str> {
    if !self.kind.is_account_scoped() {
      return None;
    }
    self.args.first().map(String::as_str).filter(|a| !a.is_empty())
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.kind.keyword().unwrap_or("?"))?;
    for arg in &self.args {
      write!(f, " {arg}")?;
    }
    Ok(())
  }
}

// ─── Tokenizer ───────────────────────────────────────────────────────────────

/// Punctuation allowed inside tokens, so emails and passwords survive intact.
const TOKEN_PUNCTUATION: &[char] =
  &['.', ';', '@', ',', '!', '#', '$', '&', '^', '-', '_', '=', '*', '+'];

fn is_token_char(c: char) -> bool {
  c.is_alphanumeric() || TOKEN_PUNCTUATION.contains(&c)
}

/// Split `text` into word-like tokens, left to right.
///
/// A `/` always starts a new token; anything that is neither a token
/// character nor `/` is a delimiter.
pub fn tokenize(text: &str) -> Vec<&str> {
  fn flush<'a>(tokens: &mut Vec<&'a str>, token: &'a str) {
    if !token.is_empty() && token != "/" {
      tokens.push(token);
    }
  }

  let mut tokens = Vec::new();
  let mut start: Option<usize> = None;

  for (i, c) in text.char_indices() {
    if c == '/' {
      if let Some(s) = start.take() {
        flush(&mut tokens, &text[s..i]);
      }
      start = Some(i);
    } else if is_token_char(c) {
      start.get_or_insert(i);
    } else if let Some(s) = start.take() {
      flush(&mut tokens, &text[s..i]);
    }
  }
  if let Some(s) = start {
    flush(&mut tokens, &text[s..]);
  }

  tokens
}

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Parse raw user text (or a button payload) into a [`Command`].
///
/// The keyword is matched against the first token. In group chats Telegram
/// appends the bot name (`/get@tally_bot`); that suffix is ignored. Extra
/// trailing tokens are ignored for every command.
pub fn parse(text: &str) -> Result<Command> {
  let tokens = tokenize(text);
  let Some((head, rest)) = tokens.split_first() else {
    return Err(Error::Parse(text.to_owned()));
  };

  let keyword = head.split_once('@').map_or(*head, |(k, _)| k);
  let kind: CommandKind =
    keyword.parse().map_err(|_| Error::Parse(text.to_owned()))?;

  let args: Vec<String> = match kind {
    CommandKind::Register => match rest {
      [login, password, ..] => vec![(*login).to_owned(), (*password).to_owned()],
      _ => return Err(Error::Parse(text.to_owned())),
    },
    CommandKind::Subscribe | CommandKind::GetStatus | CommandKind::GetDocument => {
      rest.iter().take(1).map(|a| (*a).to_owned()).collect()
    }
    CommandKind::Help | CommandKind::Unknown => Vec::new(),
  };

  Ok(Command { kind, args })
}
