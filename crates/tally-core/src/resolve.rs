//! Account resolution: which linked account does a command target?
//!
//! Pure and deterministic. The [`Resolution::Ambiguous`] branch carries the
//! attempted operation so the caller can build selector buttons whose payload
//! re-issues exactly that operation; there is no server-side pending state.

use crate::{account::Account, command::CommandKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  Resolved(Account),
  /// More than one account is linked and none was requested.
  Ambiguous {
    operation: CommandKind,
    accounts:  Vec<Account>,
  },
  /// `requested` is the explicitly requested number, or `None` when the user
  /// has no linked accounts at all.
  NotFound { requested: Option<String> },
}

/// Decide the target account for `operation`.
///
/// An explicitly requested number must match exactly; it is never replaced by
/// another account. Without a request a single linked account is selected
/// automatically and several produce [`Resolution::Ambiguous`].
pub fn resolve(
  requested: Option<&str>,
  linked: &[Account],
  operation: CommandKind,
) -> Resolution {
  let requested = requested.filter(|r| !r.is_empty());

  if linked.is_empty() {
    return Resolution::NotFound { requested: requested.map(str::to_owned) };
  }

  match (requested, linked) {
    (Some(number), _) => match linked.iter().find(|a| a.number == number) {
      Some(account) => Resolution::Resolved(account.clone()),
      None => Resolution::NotFound { requested: Some(number.to_owned()) },
    },
    (None, [only]) => Resolution::Resolved(only.clone()),
    (None, _) => Resolution::Ambiguous { operation, accounts: linked.to_vec() },
  }
}
