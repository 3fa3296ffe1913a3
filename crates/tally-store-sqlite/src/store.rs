//! [`SqliteStore`]: the SQLite implementation of [`UserStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tally_core::{
  store::UserStore,
  user::{User, UserId},
};
use tracing::debug;

use crate::{
  Result,
  encode::{RawSubscription, RawUser, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally user store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn raw_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:  row.get(0)?,
    login:    row.get(1)?,
    password: row.get(2)?,
  })
}

fn raw_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSubscription> {
  Ok(RawSubscription {
    user_id:        row.get(0)?,
    account_number: row.get(1)?,
    chat_id:        row.get(2)?,
    last_seen:      row.get(3)?,
  })
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  type Error = crate::Error;

  async fn get(&self, id: UserId) -> Result<Option<User>> {
    let key = id.0;

    let raw: Option<(RawUser, Vec<RawSubscription>)> = self
      .conn
      .call(move |conn| {
        let user = conn
          .query_row(
            "SELECT user_id, login, password FROM users WHERE user_id = ?1",
            rusqlite::params![key],
            raw_user,
          )
          .optional()?;

        let Some(user) = user else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT user_id, account_number, chat_id, last_seen
             FROM subscriptions WHERE user_id = ?1
            ORDER BY account_number",
        )?;
        let subs = stmt
          .query_map(rusqlite::params![key], raw_subscription)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((user, subs)))
      })
      .await?;

    Ok(raw.map(|(user, subs)| user.into_user(subs)))
  }

  async fn put(&self, user: &User) -> Result<()> {
    let key      = user.id.0;
    let login    = user.credentials.login.clone();
    let password = user.credentials.password.clone();
    let now      = encode_dt(Utc::now());
    let subs: Vec<(String, i64, String)> = user
      .subscriptions
      .values()
      .map(|s| (s.account_number.clone(), s.chat.0, s.last_seen.clone()))
      .collect();

    debug!(user = key, subscriptions = subs.len(), "writing user");

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO users (user_id, login, password, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)
           ON CONFLICT(user_id) DO UPDATE SET
             login      = excluded.login,
             password   = excluded.password,
             updated_at = excluded.updated_at",
          rusqlite::params![key, login, password, now],
        )?;
        tx.execute(
          "DELETE FROM subscriptions WHERE user_id = ?1",
          rusqlite::params![key],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO subscriptions (user_id, account_number, chat_id, last_seen)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (account_number, chat_id, last_seen) in &subs {
            stmt.execute(rusqlite::params![key, account_number, chat_id, last_seen])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_all(&self) -> Result<Vec<User>> {
    let (raw_users, raw_subs): (Vec<RawUser>, Vec<RawSubscription>) = self
      .conn
      .call(|conn| {
        let users = conn
          .prepare("SELECT user_id, login, password FROM users ORDER BY user_id")?
          .query_map([], raw_user)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let subs = conn
          .prepare(
            "SELECT user_id, account_number, chat_id, last_seen
               FROM subscriptions ORDER BY user_id, account_number",
          )?
          .query_map([], raw_subscription)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((users, subs))
      })
      .await?;

    let mut by_user: HashMap<i64, Vec<RawSubscription>> = HashMap::new();
    for sub in raw_subs {
      by_user.entry(sub.user_id).or_default().push(sub);
    }

    Ok(
      raw_users
        .into_iter()
        .map(|user| {
          let subs = by_user.remove(&user.user_id).unwrap_or_default();
          user.into_user(subs)
        })
        .collect(),
    )
  }
}
