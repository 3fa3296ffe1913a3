//! Users, their credentials, and their per-account subscriptions.
//!
//! A [`User`] is owned by the storage backend. The engine loads one record,
//! mutates it for the duration of a single request or reconciliation step,
//! and writes the whole record back.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

// ─── Identities ──────────────────────────────────────────────────────────────

/// Opaque identity of the person talking to the bot.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Opaque delivery target (a chat) that outbound messages are sent to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Login and password for the billing provider's personal cabinet.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
  pub login:    String,
  pub password: String,
}

impl Credentials {
  pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
    Self { login: login.into(), password: password.into() }
  }

  /// A stub user has empty credentials until `/reg` succeeds.
  pub fn is_empty(&self) -> bool { self.login.is_empty() }
}

// Keeps the password out of logs.
impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("login", &self.login)
      .field("password", &"<redacted>")
      .finish()
  }
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// An opt-in to change notifications for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub account_number: String,
  pub chat:           ChatId,
  /// Fingerprint of the last snapshot delivered; empty means never observed.
  pub last_seen:      String,
}

impl Subscription {
  pub fn has_baseline(&self) -> bool { !self.last_seen.is_empty() }
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:            UserId,
  pub credentials:   Credentials,
  /// Keyed by account number.
  pub subscriptions: BTreeMap<String, Subscription>,
}

impl User {
  /// A freshly seen identity with no credentials and no subscriptions.
  pub fn stub(id: UserId) -> Self {
    Self {
      id,
      credentials: Credentials::default(),
      subscriptions: BTreeMap::new(),
    }
  }

  pub fn is_registered(&self) -> bool { !self.credentials.is_empty() }

  /// Insert or replace the subscription for `subscription.account_number`.
  pub fn subscribe(&mut self, subscription: Subscription) {
    self
      .subscriptions
      .insert(subscription.account_number.clone(), subscription);
  }
}
