//! The `UserStore` trait.
//!
//! Implemented by storage backends (e.g. `tally-store-sqlite`). The store is
//! the only point of coordination between inbound handling and the
//! reconciliation loop; concurrent writes to the same user resolve as
//! last-write-wins.

use std::future::Future;

use crate::user::{User, UserId};

pub trait UserStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a user by identity. Returns `None` if never seen.
  fn get(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Write the whole record, replacing credentials and subscriptions.
  fn put<'a>(
    &'a self,
    user: &'a User,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every stored user, in identity order.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;
}
