//! The `BillingProvider` trait.
//!
//! Implemented by billing backends (e.g. the HTTP client in `tally-bot`).
//! There is no session object: the credentials travel with every call, so a
//! provider instance is shared freely between the dispatcher and the
//! reconciliation loop.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  account::{Account, Snapshot},
  user::Credentials,
};

pub trait BillingProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Accounts linked to the cabinet behind `credentials`. Rejected
  /// credentials are reported as an error.
  fn list_accounts<'a>(
    &'a self,
    credentials: &'a Credentials,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + 'a;

  /// Balance of `account` for the billing period containing `as_of`.
  fn get_balance<'a>(
    &'a self,
    credentials: &'a Credentials,
    account: &'a str,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + 'a;

  /// The latest receipt for `account` as a PDF document.
  fn get_receipt<'a>(
    &'a self,
    credentials: &'a Credentials,
    account: &'a str,
  ) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send + 'a;
}
