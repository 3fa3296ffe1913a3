//! Core types and engine for the Tally billing notification relay.
//!
//! This crate turns user text into typed commands, resolves which linked
//! account a command targets, dispatches it against the collaborator traits,
//! and runs the periodic reconciliation sweep. It is deliberately free of HTTP
//! and database dependencies; the transport, the billing backend and the
//! storage backend live in other crates and plug in through the traits in
//! [`provider`], [`store`] and [`reply`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod provider;
pub mod reconcile;
pub mod reply;
pub mod resolve;
pub mod store;
pub mod user;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
