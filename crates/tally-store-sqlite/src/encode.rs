//! Row types and conversions between SQLite columns and domain types.
//!
//! Timestamps are stored as RFC 3339 strings; identities as integers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tally_core::user::{ChatId, Credentials, Subscription, User, UserId};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

/// A `users` row.
pub struct RawUser {
  pub user_id:  i64,
  pub login:    String,
  pub password: String,
}

/// A `subscriptions` row.
pub struct RawSubscription {
  pub user_id:        i64,
  pub account_number: String,
  pub chat_id:        i64,
  pub last_seen:      String,
}

impl RawSubscription {
  pub fn into_subscription(self) -> Subscription {
    Subscription {
      account_number: self.account_number,
      chat:           ChatId(self.chat_id),
      last_seen:      self.last_seen,
    }
  }
}

impl RawUser {
  pub fn into_user(self, subscriptions: Vec<RawSubscription>) -> User {
    let subscriptions: BTreeMap<String, Subscription> = subscriptions
      .into_iter()
      .map(|raw| (raw.account_number.clone(), raw.into_subscription()))
      .collect();

    User {
      id: UserId(self.user_id),
      credentials: Credentials { login: self.login, password: self.password },
      subscriptions,
    }
  }
}
