//! [`Dispatcher`] turns one inbound update into exactly one reply.
//!
//! Every branch ends in a well-formed [`Reply`]; collaborator failures are
//! logged and rendered as user-facing text, never propagated to the
//! transport.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  account::Account,
  command::{self, Command, CommandKind},
  format,
  provider::BillingProvider,
  reply::{DocumentReply, Reply},
  resolve::{Resolution, resolve},
  store::UserStore,
  user::{ChatId, Credentials, Subscription, User, UserId},
};

/// An inbound update normalised by the transport. For button presses `text`
/// is the callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
  pub text: String,
  pub user: UserId,
  pub chat: ChatId,
}

pub struct Dispatcher<S, P> {
  store:    Arc<S>,
  provider: Arc<P>,
}

impl<S, P> Dispatcher<S, P>
where
  S: UserStore,
  P: BillingProvider,
{
  pub fn new(store: Arc<S>, provider: Arc<P>) -> Self { Self { store, provider } }

  /// Handle one inbound update end to end.
  pub async fn handle(&self, inbound: &Inbound) -> Reply {
    self.ensure_user(inbound.user).await;

    let cmd = match command::parse(&inbound.text) {
      Ok(cmd) => cmd,
      Err(e) => {
        debug!(user = %inbound.user, error = %e, "unparseable command, showing help");
        Command::unknown()
      }
    };

    debug!(user = %inbound.user, kind = ?cmd.kind, "dispatching command");
    self.dispatch(&cmd, inbound.user, inbound.chat).await
  }

  /// Route an already parsed command.
  pub async fn dispatch(&self, cmd: &Command, user: UserId, chat: ChatId) -> Reply {
    match cmd.kind {
      CommandKind::Register => match cmd.args.as_slice() {
        [login, password, ..] => {
          self
            .register(user, chat, Credentials::new(login.as_str(), password.as_str()))
            .await
        }
        _ => help(chat),
      },
      CommandKind::Help | CommandKind::Unknown => help(chat),
      CommandKind::GetStatus | CommandKind::GetDocument | CommandKind::Subscribe => self
        .account_scoped(cmd, user, chat)
        .await
        .unwrap_or_else(|e| error_reply(&e, chat)),
    }
  }

  /// Create a stub record the first time an identity is seen.
  async fn ensure_user(&self, id: UserId) {
    match self.store.get(id).await {
      Ok(Some(_)) => {}
      Ok(None) => {
        info!(user = %id, "first contact, creating stub user");
        if let Err(e) = self.store.put(&User::stub(id)).await {
          warn!(user = %id, error = %e, "failed to create stub user");
        }
      }
      Err(e) => warn!(user = %id, error = %e, "failed to look up user"),
    }
  }

  // ── Register ──────────────────────────────────────────────────────────────

  async fn register(&self, id: UserId, chat: ChatId, credentials: Credentials) -> Reply {
    let accounts = match self.provider.list_accounts(&credentials).await {
      Ok(accounts) => accounts,
      Err(e) => {
        info!(user = %id, error = %e, "registration rejected by billing provider");
        return decorated(chat, format::WRONG_CREDENTIALS);
      }
    };

    let mut user = match self.store.get(id).await {
      Ok(existing) => existing.unwrap_or_else(|| User::stub(id)),
      Err(e) => {
        warn!(user = %id, error = %e, "failed to load user for registration");
        return decorated(chat, format::REGISTRATION_FAILED);
      }
    };
    user.credentials = credentials;

    if let Err(e) = self.store.put(&user).await {
      warn!(user = %id, error = %e, "failed to save registration");
      return decorated(chat, format::REGISTRATION_FAILED);
    }

    info!(user = %id, accounts = accounts.len(), "user registered");
    Reply::text(chat, format::registered(&accounts)).with_markup(format::quick_actions())
  }

  // ── Account-scoped commands ───────────────────────────────────────────────

  async fn account_scoped(&self, cmd: &Command, id: UserId, chat: ChatId) -> Result<Reply> {
    let user = self
      .store
      .get(id)
      .await
      .map_err(Error::store)?
      .filter(User::is_registered)
      .ok_or(Error::NotRegistered(id))?;

    let accounts = self
      .provider
      .list_accounts(&user.credentials)
      .await
      .map_err(Error::provider)?;

    let account = match resolve(cmd.account(), &accounts, cmd.kind) {
      Resolution::Resolved(account) => account,
      Resolution::Ambiguous { operation, accounts } => {
        return Ok(
          Reply::text(chat, format::choose_account(operation))
            .with_markup(format::account_selector(operation, &accounts)),
        );
      }
      Resolution::NotFound { requested: Some(number) } => {
        return Err(Error::AccountNotFound(number));
      }
      Resolution::NotFound { requested: None } => {
        return Ok(decorated(chat, format::NO_ACCOUNTS));
      }
    };

    debug!(user = %id, account = %account.number, "account resolved");

    let reply = match cmd.kind {
      CommandKind::GetStatus => self.status(&user, &account, chat).await,
      CommandKind::GetDocument => self.receipt(&user, &account, chat).await,
      CommandKind::Subscribe => self.subscribe(user, &account, chat).await,
      _ => help(chat),
    };
    Ok(reply)
  }

  async fn status(&self, user: &User, account: &Account, chat: ChatId) -> Reply {
    match self
      .provider
      .get_balance(&user.credentials, &account.number, Utc::now())
      .await
    {
      Ok(snapshot) => decorated(chat, format::balance(account, &snapshot)),
      Err(e) => {
        warn!(user = %user.id, account = %account.number, error = %e, "failed to fetch balance");
        decorated(chat, format::BALANCE_UNAVAILABLE)
      }
    }
  }

  async fn receipt(&self, user: &User, account: &Account, chat: ChatId) -> Reply {
    match self
      .provider
      .get_receipt(&user.credentials, &account.number)
      .await
    {
      Ok(content) => Reply::Document(DocumentReply {
        chat,
        file_name: format::receipt_file_name(account),
        caption: format::receipt_caption(account),
        content,
        markup: Some(format::quick_actions()),
      }),
      Err(e) => {
        warn!(user = %user.id, account = %account.number, error = %e, "failed to fetch receipt");
        decorated(chat, format::RECEIPT_UNAVAILABLE)
      }
    }
  }

  async fn subscribe(&self, mut user: User, account: &Account, chat: ChatId) -> Reply {
    // Best effort: without a baseline the next sweep establishes one silently.
    let last_seen = match self
      .provider
      .get_balance(&user.credentials, &account.number, Utc::now())
      .await
    {
      Ok(snapshot) => snapshot.fingerprint(),
      Err(e) => {
        debug!(user = %user.id, account = %account.number, error = %e, "no initial baseline");
        String::new()
      }
    };

    user.subscribe(Subscription {
      account_number: account.number.clone(),
      chat,
      last_seen,
    });

    if let Err(e) = self.store.put(&user).await {
      warn!(user = %user.id, error = %e, "failed to save subscription");
      return decorated(chat, format::SUBSCRIBE_FAILED);
    }

    info!(user = %user.id, account = %account.number, chat = %chat, "subscribed");
    decorated(chat, format::subscribed(account))
  }
}

// ─── Replies ─────────────────────────────────────────────────────────────────

fn help(chat: ChatId) -> Reply { Reply::text(chat, format::HELP) }

fn decorated(chat: ChatId, text: impl Into<String>) -> Reply {
  Reply::text(chat, text).with_markup(format::quick_actions())
}

fn error_reply(err: &Error, chat: ChatId) -> Reply {
  match err {
    Error::Parse(_) => help(chat),
    Error::NotRegistered(_) => decorated(chat, format::REGISTER_FIRST),
    Error::AccountNotFound(number) => decorated(chat, format::account_not_found(number)),
    Error::Provider(e) => {
      warn!(error = %e, "billing provider failure");
      decorated(chat, format::PROVIDER_UNAVAILABLE)
    }
    Error::Store(e) | Error::Delivery(e) => {
      warn!(error = %e, "internal failure while handling command");
      decorated(chat, format::PROFILE_UNAVAILABLE)
    }
  }
}
