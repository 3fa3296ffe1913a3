//! In-memory collaborators for engine tests.

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, Utc};

use crate::{
  account::{Account, BalanceRow, Snapshot},
  provider::BillingProvider,
  reply::{MessageSink, Reply},
  store::UserStore,
  user::{ChatId, Credentials, Subscription, User, UserId},
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub String);

pub fn snapshot(period: &str, amount: &str) -> Snapshot {
  Snapshot {
    period: period.to_owned(),
    rows:   vec![BalanceRow { label: "Total".to_owned(), amount: amount.to_owned() }],
  }
}

pub fn registered_user(id: i64, login: &str) -> User {
  let mut user = User::stub(UserId(id));
  user.credentials = Credentials::new(login, "secret");
  user
}

pub fn subscription(number: &str, chat: i64, last_seen: &str) -> Subscription {
  Subscription {
    account_number: number.to_owned(),
    chat:           ChatId(chat),
    last_seen:      last_seen.to_owned(),
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
  users:     Mutex<BTreeMap<UserId, User>>,
  puts:      AtomicUsize,
  fail_get:  AtomicBool,
  fail_put:  AtomicBool,
  fail_list: AtomicBool,
}

impl MemoryStore {
  pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
    let store = Self::default();
    store
      .users
      .lock()
      .unwrap()
      .extend(users.into_iter().map(|u| (u.id, u)));
    store
  }

  pub fn user(&self, id: i64) -> Option<User> {
    self.users.lock().unwrap().get(&UserId(id)).cloned()
  }

  pub fn puts(&self) -> usize { self.puts.load(Ordering::SeqCst) }

  pub fn fail_get(&self, fail: bool) { self.fail_get.store(fail, Ordering::SeqCst) }

  pub fn fail_put(&self, fail: bool) { self.fail_put.store(fail, Ordering::SeqCst) }

  pub fn fail_list(&self, fail: bool) { self.fail_list.store(fail, Ordering::SeqCst) }
}

impl UserStore for MemoryStore {
  type Error = FakeError;

  async fn get(&self, id: UserId) -> Result<Option<User>, FakeError> {
    if self.fail_get.load(Ordering::SeqCst) {
      return Err(FakeError("get failed".into()));
    }
    Ok(self.users.lock().unwrap().get(&id).cloned())
  }

  async fn put(&self, user: &User) -> Result<(), FakeError> {
    if self.fail_put.load(Ordering::SeqCst) {
      return Err(FakeError("put failed".into()));
    }
    self.puts.fetch_add(1, Ordering::SeqCst);
    self.users.lock().unwrap().insert(user.id, user.clone());
    Ok(())
  }

  async fn list_all(&self) -> Result<Vec<User>, FakeError> {
    if self.fail_list.load(Ordering::SeqCst) {
      return Err(FakeError("list failed".into()));
    }
    Ok(self.users.lock().unwrap().values().cloned().collect())
  }
}

// ─── Provider ────────────────────────────────────────────────────────────────

/// Accounts keyed by login; balances keyed by account number.
#[derive(Default)]
pub struct FakeProvider {
  accounts:        Mutex<HashMap<String, Vec<Account>>>,
  balances:        Mutex<HashMap<String, Snapshot>>,
  broken_logins:   Mutex<HashSet<String>>,
  broken_receipts: Mutex<HashSet<String>>,
  list_calls:      AtomicUsize,
}

impl FakeProvider {
  pub fn with_accounts(self, login: &str, accounts: Vec<Account>) -> Self {
    self.accounts.lock().unwrap().insert(login.to_owned(), accounts);
    self
  }

  /// `n` accounts numbered `1..=n`, addressed `Addr1..`.
  pub fn with_numbered(self, login: &str, n: usize) -> Self {
    let accounts = (1..=n)
      .map(|i| Account::new(i.to_string(), format!("Addr{i}")))
      .collect();
    self.with_accounts(login, accounts)
  }

  pub fn with_balance(self, number: &str, snapshot: Snapshot) -> Self {
    self.set_balance(number, snapshot);
    self
  }

  pub fn set_balance(&self, number: &str, snapshot: Snapshot) {
    self.balances.lock().unwrap().insert(number.to_owned(), snapshot);
  }

  pub fn break_login(&self, login: &str) {
    self.broken_logins.lock().unwrap().insert(login.to_owned());
  }

  pub fn break_receipt(&self, number: &str) {
    self.broken_receipts.lock().unwrap().insert(number.to_owned());
  }

  pub fn list_calls(&self) -> usize { self.list_calls.load(Ordering::SeqCst) }
}

impl BillingProvider for FakeProvider {
  type Error = FakeError;

  async fn list_accounts(&self, credentials: &Credentials) -> Result<Vec<Account>, FakeError> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    if self.broken_logins.lock().unwrap().contains(&credentials.login) {
      return Err(FakeError("provider unreachable".into()));
    }
    self
      .accounts
      .lock()
      .unwrap()
      .get(&credentials.login)
      .cloned()
      .ok_or_else(|| FakeError("wrong credentials".into()))
  }

  async fn get_balance(
    &self,
    _credentials: &Credentials,
    account: &str,
    _as_of: DateTime<Utc>,
  ) -> Result<Snapshot, FakeError> {
    self
      .balances
      .lock()
      .unwrap()
      .get(account)
      .cloned()
      .ok_or_else(|| FakeError(format!("no balance for {account}")))
  }

  async fn get_receipt(&self, _credentials: &Credentials, account: &str) -> Result<Vec<u8>, FakeError> {
    if self.broken_receipts.lock().unwrap().contains(account) {
      return Err(FakeError("receipt unavailable".into()));
    }
    Ok(b"%PDF-1.4".to_vec())
  }
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Records every reply together with the store's write count at send time.
#[derive(Default)]
pub struct RecordingSink {
  sent:     Mutex<Vec<(Reply, usize)>>,
  observed: Option<Arc<MemoryStore>>,
  fail:     AtomicBool,
}

impl RecordingSink {
  pub fn observing(store: Arc<MemoryStore>) -> Self {
    Self { observed: Some(store), ..Self::default() }
  }

  pub fn sent(&self) -> Vec<Reply> {
    self.sent.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
  }

  pub fn puts_at_send(&self) -> Vec<usize> {
    self.sent.lock().unwrap().iter().map(|(_, p)| *p).collect()
  }

  pub fn fail(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst) }
}

impl MessageSink for RecordingSink {
  type Error = FakeError;

  async fn send(&self, reply: &Reply) -> Result<(), FakeError> {
    let puts = self.observed.as_ref().map_or(0, |s| s.puts());
    self.sent.lock().unwrap().push((reply.clone(), puts));
    if self.fail.load(Ordering::SeqCst) {
      return Err(FakeError("chat unreachable".into()));
    }
    Ok(())
  }
}
