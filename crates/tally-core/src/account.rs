//! Accounts linked to a billing cabinet and the balance snapshots fetched for
//! them.
//!
//! Both are sourced live from the billing provider and never cached beyond a
//! single request or reconciliation step.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// A personal account linked to the user's billing cabinet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  /// Unique within one user's linked set.
  pub number:  String,
  /// Human-readable label, usually the postal address.
  pub address: String,
}

impl Account {
  pub fn new(number: impl Into<String>, address: impl Into<String>) -> Self {
    Self { number: number.into(), address: address.into() }
  }
}

/// One line item of a balance: what was charged or paid, and how much.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
  pub label:  String,
  pub amount: String,
}

/// The billing state of an account at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  /// Billing period label, e.g. "March 2024".
  pub period: String,
  #[serde(default)]
  pub rows:   Vec<BalanceRow>,
}

impl Snapshot {
  /// Neither a period nor any rows. The fingerprint of such a snapshot is
  /// empty, which is also the "never observed" marker, so it cannot serve as
  /// a baseline.
  pub fn is_empty(&self) -> bool { self.period.is_empty() && self.rows.is_empty() }

  /// Canonical text form. Two snapshots are the same state iff their
  /// fingerprints are equal; this is what gets stored as the last-seen value.
  pub fn fingerprint(&self) -> String {
    let mut out = self.period.clone();
    for row in &self.rows {
      let _ = write!(out, "\n{}={}", row.label, row.amount);
    }
    out
  }
}
