//! Error types for `tally-core`.

use thiserror::Error;

use crate::user::UserId;

/// Boxed collaborator error, so the engine stays generic over backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or unknown command text. Always recoverable by showing help.
  #[error("cannot parse command: {0:?}")]
  Parse(String),

  #[error("user {0} has not registered credentials")]
  NotRegistered(UserId),

  #[error("billing provider error: {0}")]
  Provider(#[source] BoxError),

  #[error("account {0} is not among the linked accounts")]
  AccountNotFound(String),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("delivery error: {0}")]
  Delivery(#[source] BoxError),
}

impl Error {
  pub fn provider<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Provider(Box::new(e))
  }

  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn delivery<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Delivery(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
