//! User-facing text and keyboards.

use std::fmt::Write as _;

use crate::{
  account::{Account, Snapshot},
  command::{Command, CommandKind},
  reply::{Choice, Markup},
};

pub const HELP: &str = "/reg <login> <password> – connect your billing cabinet\n\
                        /get – show the current balance\n\
                        /receipt – download the receipt as PDF\n\
                        /notify – get notified when the balance changes\n\
                        /help – show this message";

pub const REGISTER_FIRST: &str =
  "Connect your billing cabinet first: /reg <login> <password>";

pub const WRONG_CREDENTIALS: &str =
  "Wrong login or password. Please try again: /reg <login> <password>";

pub const REGISTRATION_FAILED: &str = "Could not save your registration, please try again later";

pub const PROFILE_UNAVAILABLE: &str = "Could not load your profile, please try again later";

pub const PROVIDER_UNAVAILABLE: &str =
  "The billing service is not responding, please try again later";

pub const BALANCE_UNAVAILABLE: &str = "Could not load the balance, please try again later";

pub const RECEIPT_UNAVAILABLE: &str = "Could not load the receipt";

pub const SUBSCRIBE_FAILED: &str = "Could not save the subscription, please try again later";

pub const NO_ACCOUNTS: &str = "No accounts are linked to your billing cabinet";

/// Persistent keyboard attached to most replies.
pub fn quick_actions() -> Markup {
  Markup::QuickActions(vec!["/get".to_owned(), "/receipt".to_owned()])
}

/// One button per account, labelled with its address, re-issuing `operation`.
pub fn account_selector(operation: CommandKind, accounts: &[Account]) -> Markup {
  Markup::Choices(
    accounts
      .iter()
      .map(|a| Choice::new(&a.address, &Command::for_account(operation, &a.number)))
      .collect(),
  )
}

fn operation_name(operation: CommandKind) -> &'static str {
  match operation {
    CommandKind::GetStatus => "get the balance",
    CommandKind::GetDocument => "get the receipt",
    CommandKind::Subscribe => "set up notifications",
    _ => "use",
  }
}

pub fn choose_account(operation: CommandKind) -> String {
  format!("Which account do you want to {}?", operation_name(operation))
}

pub fn account_not_found(number: &str) -> String {
  format!("Account {number} is not among the accounts linked to your billing cabinet")
}

pub fn registered(accounts: &[Account]) -> String {
  let listed = accounts
    .iter()
    .map(|a| format!("{} ({})", a.number, a.address))
    .collect::<Vec<_>>()
    .join(", ");
  format!("You have been registered. Your accounts are: {listed}")
}

pub fn balance(account: &Account, snapshot: &Snapshot) -> String {
  let mut out = format!("{}:\n{}\n", account.address, snapshot.period);
  for row in &snapshot.rows {
    let _ = writeln!(out, "{}: {}", row.label, row.amount);
  }
  out
}

pub fn balance_changed(account: &Account, snapshot: &Snapshot) -> String {
  format!("Balance updated:\n{}", balance(account, snapshot))
}

pub fn subscribed(account: &Account) -> String {
  format!(
    "You are subscribed to notifications for account {} ({})",
    account.number, account.address
  )
}

pub fn receipt_file_name(account: &Account) -> String { format!("{}.pdf", account.number) }

pub fn receipt_caption(account: &Account) -> String { format!("Receipt ({})", account.address) }
