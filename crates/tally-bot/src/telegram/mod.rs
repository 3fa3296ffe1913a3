//! Telegram Bot API transport: serde types and the HTTP client that delivers
//! replies.

pub mod api;
pub mod types;

pub use api::{TelegramApi, TelegramError};
pub use types::{InboundUpdate, Update};
