//! [`Reconciler`], the periodic sweep that notifies subscribers of balance
//! changes.
//!
//! Each `(user, account)` pair is processed to completion before the next one
//! starts, and a failure on one pair never stops the others. The stored
//! baseline is written before the notification is attempted, so a failed
//! delivery is never repeated for the same change on a later tick.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  account::Account,
  format,
  provider::BillingProvider,
  reply::{MessageSink, Reply},
  store::UserStore,
  user::User,
};

/// Counters for one sweep, mostly for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
  pub users:     usize,
  /// Subscriptions whose snapshot was fetched and compared.
  pub checked:   usize,
  /// First observations, stored without notifying.
  pub baselined: usize,
  pub notified:  usize,
  pub skipped:   usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
  Unchanged,
  Baselined,
  Notified,
  Skipped,
}

pub struct Reconciler<S, P, M> {
  store:    Arc<S>,
  provider: Arc<P>,
  sink:     Arc<M>,
  interval: Duration,
}

impl<S, P, M> Reconciler<S, P, M>
where
  S: UserStore,
  P: BillingProvider,
  M: MessageSink,
{
  pub fn new(store: Arc<S>, provider: Arc<P>, sink: Arc<M>, interval: Duration) -> Self {
    Self { store, provider, sink, interval }
  }

  /// Sweep, sleep, repeat. Never returns; stop it by dropping or aborting the
  /// task it runs on.
  pub async fn run(&self) {
    info!(interval_secs = self.interval.as_secs(), "reconciliation loop started");
    loop {
      match self.tick().await {
        Ok(report) => info!(
          users = report.users,
          checked = report.checked,
          baselined = report.baselined,
          notified = report.notified,
          skipped = report.skipped,
          "sweep finished"
        ),
        Err(e) => warn!(error = %e, "sweep skipped"),
      }
      tokio::time::sleep(self.interval).await;
    }
  }

  /// One sweep over every stored user.
  ///
  /// Fails only when the users cannot be listed, in which case nothing at all
  /// is processed.
  pub async fn tick(&self) -> Result<TickReport> {
    let users = self.store.list_all().await.map_err(Error::store)?;

    let mut report = TickReport::default();
    for user in users {
      report.users += 1;
      self.reconcile_user(user, &mut report).await;
    }
    Ok(report)
  }

  async fn reconcile_user(&self, mut user: User, report: &mut TickReport) {
    if user.subscriptions.is_empty() {
      return;
    }
    debug!(user = %user.id, subscriptions = user.subscriptions.len(), "checking user");

    if !user.is_registered() {
      warn!(user = %user.id, "subscriptions without credentials, skipping user");
      report.skipped += user.subscriptions.len();
      return;
    }

    let accounts = match self.provider.list_accounts(&user.credentials).await {
      Ok(accounts) => accounts,
      Err(e) => {
        warn!(user = %user.id, error = %e, "cannot list accounts, skipping user");
        report.skipped += user.subscriptions.len();
        return;
      }
    };

    let numbers: Vec<String> = user.subscriptions.keys().cloned().collect();
    for number in numbers {
      match self.reconcile_one(&mut user, &accounts, &number).await {
        Outcome::Unchanged => report.checked += 1,
        Outcome::Baselined => {
          report.checked += 1;
          report.baselined += 1;
        }
        Outcome::Notified => {
          report.checked += 1;
          report.notified += 1;
        }
        Outcome::Skipped => report.skipped += 1,
      }
    }
  }

  async fn reconcile_one(&self, user: &mut User, accounts: &[Account], number: &str) -> Outcome {
    let Some(account) = accounts.iter().find(|a| a.number == number) else {
      warn!(user = %user.id, account = number, "subscribed account is no longer linked");
      return Outcome::Skipped;
    };

    let snapshot = match self
      .provider
      .get_balance(&user.credentials, number, Utc::now())
      .await
    {
      Ok(snapshot) => snapshot,
      Err(e) => {
        warn!(user = %user.id, account = number, error = %e, "cannot fetch balance");
        return Outcome::Skipped;
      }
    };
    if snapshot.is_empty() {
      warn!(user = %user.id, account = number, "provider returned an empty balance");
      return Outcome::Skipped;
    }
    let fresh = snapshot.fingerprint();

    let Some(sub) = user.subscriptions.get_mut(number) else {
      return Outcome::Skipped;
    };
    if sub.last_seen == fresh {
      debug!(user = %user.id, account = number, "balance unchanged");
      return Outcome::Unchanged;
    }
    let first_observation = !sub.has_baseline();
    let chat = sub.chat;
    let previous = std::mem::replace(&mut sub.last_seen, fresh);

    if let Err(e) = self.store.put(user).await {
      warn!(user = %user.id, account = number, error = %e, "cannot persist baseline");
      // Keep the in-memory record in step with the store so a later write for
      // this user in the same sweep does not swallow the change.
      if let Some(sub) = user.subscriptions.get_mut(number) {
        sub.last_seen = previous;
      }
      return Outcome::Skipped;
    }

    if first_observation {
      info!(user = %user.id, account = number, "baseline established");
      return Outcome::Baselined;
    }

    info!(user = %user.id, account = number, chat = %chat, "balance changed");
    let reply = Reply::text(chat, format::balance_changed(account, &snapshot))
      .with_markup(format::quick_actions());
    match self.sink.send(&reply).await {
      Ok(()) => Outcome::Notified,
      Err(e) => {
        warn!(user = %user.id, chat = %chat, error = %e, "notification not delivered");
        Outcome::Skipped
      }
    }
  }
}
